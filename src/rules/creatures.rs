//! `Base_Stats.c`: one `[SPECIES_<TAG>] = { ... }` block per creature.
//!
//! Two layouts are in the wild and both are recognised: the legacy one with
//! numbered fields (`.type1`, `.ability1`, `.eggGroup1`) and the grouped one
//! (`.types = MON_TYPES(..)`, `.abilities = { .. }`, `.eggGroups = ..`).
//!
//! Only `.baseHP` is required. Other stats left out of a block are zero, as
//! they would be in the compiled struct.

use super::{SourceRecord, join_key, row};
use crate::engine::{Delimiters, RuleSetSpec};
use crate::error::RecordError;
use crate::normalize::{Symbols, humanize_constant};
use crate::schema::Row;
use crate::{EntityRecord, SourceKind, Value};

pub(crate) fn rule_set() -> RuleSetSpec {
    RuleSetSpec {
        kind: SourceKind::Creatures,
        tag_pattern: r"\[SPECIES_(\w+)\]\s*=\s*\{".to_string(),
        sentinels: vec!["NONE".to_string()],
        delimiters: Delimiters::Braces,
        fields: vec![
            field!("name", r"\.speciesName\s*=\s*([^\n]+)", "text"),
            field!("hp", r"\.baseHP\s*=\s*([^,;\n}]+)", "int", required),
            field!("attack", r"\.baseAttack\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("defense", r"\.baseDefense\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("sp_attack", r"\.baseSpAttack\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("sp_defense", r"\.baseSpDefense\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("speed", r"\.baseSpeed\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("type1", r"\.type1\s*=\s*(\w+)|\.types\s*=\s*(?:MON_TYPES\s*\(|\{)\s*(\w+)", "type"),
            field!(
                "type2",
                r"\.type2\s*=\s*(\w+)|\.types\s*=\s*(?:MON_TYPES\s*\(|\{)\s*\w+\s*,\s*(\w+)",
                "type"
            ),
            field!("ability1", r"\.ability1\s*=\s*(\w+)|\.abilities\s*=\s*\{\s*(\w+)", "ability"),
            field!("ability2", r"\.ability2\s*=\s*(\w+)|\.abilities\s*=\s*\{\s*\w+\s*,\s*(\w+)", "ability"),
            field!(
                "hidden_ability",
                r"\.hiddenAbility\s*=\s*(\w+)|\.abilities\s*=\s*\{\s*\w+\s*,\s*\w+\s*,\s*(\w+)",
                "ability"
            ),
            field!("catch_rate", r"\.catchRate\s*=\s*([^,;\n}]+)", "int"),
            field!("exp_yield", r"\.expYield\s*=\s*([^,;\n}]+)", "int"),
            field!(
                "egg_group1",
                r"\.eggGroup1\s*=\s*(\w+)|\.eggGroups\s*=\s*(?:MON_EGG_GROUPS\s*\(|\{)\s*(\w+)",
                "egg_group"
            ),
            field!(
                "egg_group2",
                r"\.eggGroup2\s*=\s*(\w+)|\.eggGroups\s*=\s*(?:MON_EGG_GROUPS\s*\(|\{)\s*\w+\s*,\s*(\w+)",
                "egg_group"
            ),
        ],
        children: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BaseStats {
    pub hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub sp_attack: i64,
    pub sp_defense: i64,
    pub speed: i64,
}

impl BaseStats {
    pub fn total(&self) -> i64 {
        self.hp + self.attack + self.defense + self.sp_attack + self.sp_defense + self.speed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Creature {
    pub key: String,
    pub name: String,
    pub stats: BaseStats,
    pub types: (Option<String>, Option<String>),
    pub abilities: [Option<String>; 2],
    pub hidden_ability: Option<String>,
    pub catch_rate: Option<i64>,
    pub exp_yield: Option<i64>,
    pub egg_groups: (Option<String>, Option<String>),
}

impl SourceRecord for Creature {
    const KIND: SourceKind = SourceKind::Creatures;

    fn from_record(record: EntityRecord, _symbols: &Symbols) -> Result<Self, RecordError> {
        // Keys come from the tag: every other source refers to creatures by
        // constant, and forms share their species name.
        let tag_name = humanize_constant(&record.tag);
        let key = join_key(&tag_name)?;
        let name = record.opt_str("name")?.unwrap_or(tag_name);

        let stats = BaseStats {
            hp: record.int("hp")?,
            attack: record.int("attack")?,
            defense: record.int("defense")?,
            sp_attack: record.int("sp_attack")?,
            sp_defense: record.int("sp_defense")?,
            speed: record.int("speed")?,
        };

        let type1 = record.opt_str("type1")?;
        let type2 = record.opt_str("type2")?.filter(|t| Some(t) != type1.as_ref());

        let egg_group1 = record.opt_str("egg_group1")?;
        let egg_group2 = record.opt_str("egg_group2")?.filter(|g| Some(g) != egg_group1.as_ref());

        Ok(Creature {
            key,
            name,
            stats,
            types: (type1, type2),
            abilities: [record.opt_str("ability1")?, record.opt_str("ability2")?],
            hidden_ability: record.opt_str("hidden_ability")?,
            catch_rate: record.get("catch_rate").as_int(),
            exp_yield: record.get("exp_yield").as_int(),
            egg_groups: (egg_group1, egg_group2),
        })
    }

    fn rows(&self) -> Vec<Row> {
        let s = &self.stats;
        vec![row([
            ("creature_key", Value::from(self.key.as_str())),
            ("name", Value::from(self.name.as_str())),
            ("hp", Value::Int(s.hp)),
            ("attack", Value::Int(s.attack)),
            ("defense", Value::Int(s.defense)),
            ("sp_attack", Value::Int(s.sp_attack)),
            ("sp_defense", Value::Int(s.sp_defense)),
            ("speed", Value::Int(s.speed)),
            ("bst", Value::Int(s.total())),
            ("type1", Value::from(self.types.0.clone())),
            ("type2", Value::from(self.types.1.clone())),
            ("ability1", Value::from(self.abilities[0].clone())),
            ("ability2", Value::from(self.abilities[1].clone())),
            ("hidden_ability", Value::from(self.hidden_ability.clone())),
            ("catch_rate", Value::from(self.catch_rate)),
            ("exp_yield", Value::from(self.exp_yield)),
            ("egg_group1", Value::from(self.egg_groups.0.clone())),
            ("egg_group2", Value::from(self.egg_groups.1.clone())),
        ])]
    }
}
