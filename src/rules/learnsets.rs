//! `Learnsets.c`: level-up learnset arrays.
//!
//! ```c
//! static const struct LevelUpMove sBulbasaurLevelUpLearnset[] = {
//!     LEVEL_UP_MOVE( 1, MOVE_TACKLE),
//!     LEVEL_UP_MOVE( 3, MOVE_GROWL),
//!     LEVEL_UP_END
//! };
//! ```
//!
//! The tag is the CamelCase array name (`NidoranF`, `MrMime`); it is split
//! into words before slugifying so it joins to the creature key.

use super::{SourceRecord, join_key, row};
use crate::engine::{Delimiters, RuleSetSpec};
use crate::error::RecordError;
use crate::normalize::{Symbols, humanize_camel};
use crate::schema::Row;
use crate::{EntityRecord, SourceKind, Value, field_int, field_opt_str};

pub(crate) fn rule_set() -> RuleSetSpec {
    RuleSetSpec {
        kind: SourceKind::Learnsets,
        tag_pattern: r"static\s+const\s+struct\s+LevelUpMove\s+s(\w+?)LevelUpLearnset\s*\[\s*\]\s*=\s*\{".to_string(),
        sentinels: vec!["Empty".to_string()],
        delimiters: Delimiters::Braces,
        fields: vec![],
        children: Some(child!(
            r"LEVEL_UP_MOVE\s*\(\s*([^,()]+?)\s*,\s*(MOVE_\w+)\s*\)",
            [("level", 1, "int"), ("move", 2, "move")]
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LevelUpLearnset {
    pub creature_key: String,
    /// `(level, move key)` in source order.
    pub entries: Vec<(i64, String)>,
}

impl SourceRecord for LevelUpLearnset {
    const KIND: SourceKind = SourceKind::Learnsets;

    fn from_record(record: EntityRecord, _symbols: &Symbols) -> Result<Self, RecordError> {
        let creature_key = join_key(&humanize_camel(&record.tag))?;

        let mut entries = Vec::with_capacity(record.children.len());
        for child in &record.children {
            // MOVE_NONE lines are padding.
            let Some(move_name) = field_opt_str(child, "move")? else {
                continue;
            };
            entries.push((field_int(child, "level")?, join_key(&move_name)?));
        }

        Ok(LevelUpLearnset { creature_key, entries })
    }

    fn rows(&self) -> Vec<Row> {
        self.entries
            .iter()
            .map(|(level, move_key)| {
                row([
                    ("creature_key", Value::from(self.creature_key.as_str())),
                    ("move_key", Value::from(move_key.as_str())),
                    ("learn_method", Value::from("level")),
                    ("level", Value::Int(*level)),
                ])
            })
            .collect()
    }
}
