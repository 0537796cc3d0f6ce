//! `Egg_Moves.c`: `egg_moves(SPECIES, MOVE_A, MOVE_B, ...)` macro calls.
//!
//! The block is delimited by the macro's parentheses; the tag pattern ends
//! inside them.

use super::{SourceRecord, join_key, row};
use crate::engine::{Delimiters, RuleSetSpec};
use crate::error::RecordError;
use crate::normalize::{Symbols, humanize_constant};
use crate::schema::Row;
use crate::{EntityRecord, SourceKind, Value, field_opt_str};

pub(crate) fn rule_set() -> RuleSetSpec {
    RuleSetSpec {
        kind: SourceKind::EggMoves,
        tag_pattern: r"egg_moves\s*\(\s*(\w+)\s*,".to_string(),
        // `species` is the parameter of the `egg_moves` macro definition.
        sentinels: vec!["NONE".to_string(), "EGG".to_string(), "species".to_string()],
        delimiters: Delimiters::Parens,
        fields: vec![],
        children: Some(child!(r"MOVE_\w+", [("move", 0, "move")])),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EggMoveSet {
    pub creature_key: String,
    pub move_keys: Vec<String>,
}

impl SourceRecord for EggMoveSet {
    const KIND: SourceKind = SourceKind::EggMoves;

    fn from_record(record: EntityRecord, _symbols: &Symbols) -> Result<Self, RecordError> {
        let creature_key = join_key(&humanize_constant(&record.tag))?;
        let mut move_keys = Vec::with_capacity(record.children.len());
        for child in &record.children {
            if let Some(name) = field_opt_str(child, "move")? {
                move_keys.push(join_key(&name)?);
            }
        }
        Ok(EggMoveSet { creature_key, move_keys })
    }

    fn rows(&self) -> Vec<Row> {
        self.move_keys
            .iter()
            .map(|move_key| {
                row([
                    ("creature_key", Value::from(self.creature_key.as_str())),
                    ("move_key", Value::from(move_key.as_str())),
                    ("learn_method", Value::from("egg")),
                    ("level", Value::Null),
                ])
            })
            .collect()
    }
}
