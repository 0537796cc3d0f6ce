//! `Evolution Table.c`: per-species lists of evolution tuples.
//!
//! ```c
//! [SPECIES_EEVEE] = {{EVO_ITEM, ITEM_FIRE_STONE, SPECIES_FLAREON, 0},
//!                    {EVO_FRIENDSHIP_DAY, 0, SPECIES_ESPEON, 0}},
//! ```
//!
//! Reverse transitions (a mega/gigantamax/primal form back to its base form,
//! or a mega evolution keyed on `ITEM_NONE`) are not evolutions and are
//! dropped here, as are `EVO_NONE` padding entries.

use super::{SourceRecord, join_key, row};
use crate::engine::{Delimiters, RuleSetSpec};
use crate::error::RecordError;
use crate::normalize::{SymbolKind, Symbols, humanize_constant, resolve_conditional};
use crate::schema::Row;
use crate::{EntityRecord, Fields, SourceKind, Value, field_opt_str, field_str};

const SPECIAL_FORM_MARKERS: [&str; 3] = ["_MEGA", "_GIGA", "_PRIMAL"];

const ITEM_METHODS: &[&str] = &[
    "EVO_ITEM",
    "EVO_ITEM_MALE",
    "EVO_ITEM_FEMALE",
    "EVO_ITEM_HOLD",
    "EVO_ITEM_HOLD_DAY",
    "EVO_ITEM_HOLD_NIGHT",
    "EVO_HOLD_ITEM_DAY",
    "EVO_HOLD_ITEM_NIGHT",
    "EVO_TRADE_ITEM",
    "EVO_MEGA_EVOLUTION",
    "EVO_PRIMAL_REVERSION",
];
const MOVE_TYPE_METHODS: &[&str] = &["EVO_MOVE_TYPE", "EVO_FRIENDSHIP_MOVE_TYPE"];
const SPECIES_METHODS: &[&str] = &["EVO_TRADE_SPECIFIC_MON", "EVO_OTHER_PARTY_MON", "EVO_SPECIFIC_MON_IN_PARTY"];
const PASSTHROUGH_METHODS: &[&str] = &["EVO_BEAUTY", "EVO_CRITICAL_HITS", "EVO_RECOIL_DAMAGE_MALE", "EVO_RECOIL_DAMAGE_FEMALE"];

pub(crate) fn rule_set() -> RuleSetSpec {
    RuleSetSpec {
        kind: SourceKind::Evolutions,
        tag_pattern: r"\[SPECIES_(\w+)\]\s*=\s*\{".to_string(),
        sentinels: vec!["NONE".to_string(), "EGG".to_string()],
        delimiters: Delimiters::Braces,
        fields: vec![],
        children: Some(child!(
            r"\{\s*(EVO_\w+)\s*,\s*([^,{}]+?)\s*,\s*(SPECIES_\w+)\s*(?:,[^{}]*)?\}",
            [("method", 1, "raw"), ("param", 2, "raw"), ("target", 3, "raw")]
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Evolution {
    pub to_key: String,
    pub to_name: String,
    pub method: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EvolutionSet {
    pub from_key: String,
    pub from_name: String,
    pub evolutions: Vec<Evolution>,
}

impl SourceRecord for EvolutionSet {
    const KIND: SourceKind = SourceKind::Evolutions;

    fn from_record(record: EntityRecord, symbols: &Symbols) -> Result<Self, RecordError> {
        let from_name = humanize_constant(&record.tag);
        let from_key = join_key(&from_name)?;

        let mut evolutions = Vec::new();
        for child in &record.children {
            if let Some(evo) = evolution(&record.tag, child, symbols)? {
                evolutions.push(evo);
            }
        }

        Ok(EvolutionSet { from_key, from_name, evolutions })
    }

    fn rows(&self) -> Vec<Row> {
        self.evolutions
            .iter()
            .map(|e| {
                row([
                    ("from_creature_key", Value::from(self.from_key.as_str())),
                    ("to_creature_key", Value::from(e.to_key.as_str())),
                    ("from_creature", Value::from(self.from_name.as_str())),
                    ("to_creature", Value::from(e.to_name.as_str())),
                    ("method", Value::from(e.method.as_str())),
                    ("condition", Value::from(e.condition.as_str())),
                ])
            })
            .collect()
    }
}

fn evolution(from_tag: &str, child: &Fields, symbols: &Symbols) -> Result<Option<Evolution>, RecordError> {
    let method = field_str(child, "method")?;
    let param = field_opt_str(child, "param")?.unwrap_or_default();
    let target = field_str(child, "target")?;
    let to_tag = target.strip_prefix("SPECIES_").unwrap_or(&target);

    if method == "EVO_NONE" || is_reverse(from_tag, to_tag, &method, &param) {
        tracing::trace!(from = from_tag, to = to_tag, %method, "evolution entry skipped");
        return Ok(None);
    }

    let to_name = humanize_constant(to_tag);
    Ok(Some(Evolution {
        to_key: join_key(&to_name)?,
        to_name,
        method: symbols.display(SymbolKind::EvolutionMethod, &method),
        condition: condition(&method, &param, symbols),
    }))
}

fn is_special_form(tag: &str) -> bool {
    SPECIAL_FORM_MARKERS.iter().any(|m| tag.contains(m))
}

fn is_reverse(from_tag: &str, to_tag: &str, method: &str, param: &str) -> bool {
    (is_special_form(from_tag) && !is_special_form(to_tag))
        || (method == "EVO_MEGA_EVOLUTION" && param.contains("ITEM_NONE"))
}

/// Human-readable condition for an evolution: a level, an item, a move, a
/// type, a species, a raw parameter, or nothing.
fn condition(method: &str, param: &str, symbols: &Symbols) -> String {
    let param = resolve_conditional(param);

    if method.starts_with("EVO_LEVEL") {
        return param.parse::<i64>().map_or_else(|_| param.to_string(), |lvl| lvl.to_string());
    }
    if ITEM_METHODS.contains(&method) {
        return symbols.display(SymbolKind::Item, param);
    }
    if method == "EVO_MOVE" {
        return symbols.display(SymbolKind::Move, param);
    }
    if MOVE_TYPE_METHODS.contains(&method) {
        return symbols.display(SymbolKind::Type, param);
    }
    if SPECIES_METHODS.contains(&method) {
        return symbols.display(SymbolKind::Species, param);
    }
    if PASSTHROUGH_METHODS.contains(&method) {
        return param.to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_by_method() {
        let s = Symbols::standard();
        assert_eq!(condition("EVO_LEVEL", " 16 ", &s), "16");
        assert_eq!(condition("EVO_LEVEL_NIGHT", "P_GEN_7 ? 20 : 30", &s), "20");
        assert_eq!(condition("EVO_ITEM", "ITEM_FIRE_STONE", &s), "Fire Stone");
        assert_eq!(condition("EVO_MOVE", "MOVE_ROLLOUT", &s), "Rollout");
        assert_eq!(condition("EVO_MOVE_TYPE", "TYPE_FAIRY", &s), "Fairy");
        assert_eq!(condition("EVO_TRADE_SPECIFIC_MON", "SPECIES_SHELMET", &s), "Shelmet");
        assert_eq!(condition("EVO_BEAUTY", "170", &s), "170");
        assert_eq!(condition("EVO_FRIENDSHIP", "0", &s), "");
    }

    #[test]
    fn reverse_evolutions() {
        assert!(is_reverse("CHARIZARD_MEGA_X", "CHARIZARD", "EVO_MEGA_EVOLUTION", "ITEM_NONE"));
        assert!(is_reverse("CHARIZARD", "CHARIZARD_MEGA_X", "EVO_MEGA_EVOLUTION", "ITEM_NONE"));
        assert!(!is_reverse("CHARIZARD", "CHARIZARD_MEGA_X", "EVO_MEGA_EVOLUTION", "ITEM_CHARIZARDITE_X"));
        assert!(!is_reverse("BULBASAUR", "IVYSAUR", "EVO_LEVEL", "16"));
    }
}
