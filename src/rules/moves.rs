//! `moves_info.h`: one `[MOVE_<TAG>] = { ... }` block per move.
//!
//! Move bodies are the gnarliest input: numeric fields are often
//! conditional-compilation ternaries, names and descriptions are
//! `COMPOUND_STRING` macros spread over several lines, and
//! `.additionalEffects` holds nested sub-structures.

use super::{SourceRecord, join_key, row};
use crate::engine::{Delimiters, RuleSetSpec};
use crate::error::RecordError;
use crate::normalize::{Symbols, humanize_constant};
use crate::schema::Row;
use crate::{EntityRecord, SourceKind, Value};

bitflags::bitflags! {
    /// Boolean properties of a move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MoveFlags: u16 {
        const CONTACT          = 1 << 0;
        const PUNCH            = 1 << 1;
        const BITE             = 1 << 2;
        const SOUND            = 1 << 3;
        const PULSE            = 1 << 4;
        const SLICING          = 1 << 5;
        const WIND             = 1 << 6;
        const SECONDARY_EFFECT = 1 << 7;
    }
}

/// Rule field, table column and flag bit, in column order.
const FLAG_COLUMNS: [(&str, &str, MoveFlags); 8] = [
    ("makes_contact", "makes_contact", MoveFlags::CONTACT),
    ("punching_move", "is_punch_move", MoveFlags::PUNCH),
    ("biting_move", "is_bite_move", MoveFlags::BITE),
    ("sound_move", "is_sound_move", MoveFlags::SOUND),
    ("pulse_move", "is_pulse_move", MoveFlags::PULSE),
    ("slicing_move", "is_slicing_move", MoveFlags::SLICING),
    ("wind_move", "is_wind_move", MoveFlags::WIND),
    ("additional_effects", "has_secondary_effect", MoveFlags::SECONDARY_EFFECT),
];

pub(crate) fn rule_set() -> RuleSetSpec {
    RuleSetSpec {
        kind: SourceKind::Moves,
        tag_pattern: r"\[MOVE_(\w+)\]\s*=\s*\{".to_string(),
        sentinels: vec!["NONE".to_string()],
        delimiters: Delimiters::Braces,
        fields: vec![
            field!("name", r"\.name\s*=\s*([^\n]+)", "text"),
            field!("type", r"\.type\s*=\s*([^,;\n}]+)", "type"),
            field!("category", r"\.category\s*=\s*([^,;\n}]+)", "category"),
            field!("power", r"\.power\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("accuracy", r"\.accuracy\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("pp", r"\.pp\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("priority", r"\.priority\s*=\s*([^,;\n}]+)", "int", default: Value::Int(0)),
            field!("effect", r"\.effect\s*=\s*([^,;\n}]+)", "raw"),
            field!(
                "description",
                r#"\.description\s*=\s*((?:COMPOUND_STRING|_)\s*\((?:"(?:[^"\\]|\\.)*"|[^)"])*\))"#,
                "text"
            ),
            field!("makes_contact", r"\.makesContact\s*=\s*([^,;\n}]+)", "flag"),
            field!("punching_move", r"\.punchingMove\s*=\s*([^,;\n}]+)", "flag"),
            field!("biting_move", r"\.bitingMove\s*=\s*([^,;\n}]+)", "flag"),
            field!("sound_move", r"\.soundMove\s*=\s*([^,;\n}]+)", "flag"),
            field!("pulse_move", r"\.pulseMove\s*=\s*([^,;\n}]+)", "flag"),
            field!("slicing_move", r"\.slicingMove\s*=\s*([^,;\n}]+)", "flag"),
            field!("wind_move", r"\.windMove\s*=\s*([^,;\n}]+)", "flag"),
            field!("additional_effects", r"\.additionalEffects\s*=", "present"),
        ],
        children: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MoveInfo {
    pub key: String,
    pub name: String,
    pub move_type: Option<String>,
    pub category: Option<String>,
    pub power: i64,
    pub accuracy: i64,
    pub pp: i64,
    pub priority: i64,
    pub effect: Option<String>,
    pub flags: MoveFlags,
    pub description: Option<String>,
}

impl MoveInfo {
    /// Minimal entry for a move known only by its key.
    pub fn from_key(key: &str) -> Self {
        MoveInfo {
            key: key.to_string(),
            name: humanize_constant(&key.to_ascii_uppercase()),
            move_type: None,
            category: None,
            power: 0,
            accuracy: 0,
            pp: 0,
            priority: 0,
            effect: None,
            flags: MoveFlags::empty(),
            description: None,
        }
    }
}

impl SourceRecord for MoveInfo {
    const KIND: SourceKind = SourceKind::Moves;

    fn from_record(record: EntityRecord, _symbols: &Symbols) -> Result<Self, RecordError> {
        let tag_name = humanize_constant(&record.tag);
        let key = join_key(&tag_name)?;
        let name = record.opt_str("name")?.unwrap_or(tag_name);

        let mut flags = MoveFlags::empty();
        for (field, _, bit) in FLAG_COLUMNS {
            flags.set(bit, record.flag(field)?);
        }

        Ok(MoveInfo {
            key,
            name,
            move_type: record.opt_str("type")?,
            category: record.opt_str("category")?,
            power: record.int("power")?,
            accuracy: record.int("accuracy")?,
            pp: record.int("pp")?,
            priority: record.int("priority")?,
            effect: record.opt_str("effect")?,
            flags,
            description: record.opt_str("description")?,
        })
    }

    fn rows(&self) -> Vec<Row> {
        let mut r = row([
            ("move_key", Value::from(self.key.as_str())),
            ("name", Value::from(self.name.as_str())),
            ("type", Value::from(self.move_type.clone())),
            ("category", Value::from(self.category.clone())),
            ("power", Value::Int(self.power)),
            ("accuracy", Value::Int(self.accuracy)),
            ("pp", Value::Int(self.pp)),
            ("priority", Value::Int(self.priority)),
            ("effect", Value::from(self.effect.clone())),
        ]);
        for (_, column, bit) in FLAG_COLUMNS {
            r.insert(column.to_string(), Value::Bool(self.flags.contains(bit)));
        }
        r.insert("description".to_string(), Value::from(self.description.clone()));
        vec![r]
    }
}
