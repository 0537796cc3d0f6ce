//! Per-kind rule sets and typed records.
//!
//! Each source kind lives in its own module with three parts:
//!
//! - `rule_set()`: the declarative field/child rules for that file format
//! - a typed record with a fixed field set, built from an [`EntityRecord`]
//! - the fan-out of that record into table rows
//!
//! Adding a source kind means adding a module here and a schema in
//! `schema.rs`; the engine itself does not change.

#[path = "rules/compatibility.rs"]
mod compatibility;
#[path = "rules/creatures.rs"]
mod creatures;
#[path = "rules/egg_moves.rs"]
mod egg_moves;
#[path = "rules/evolutions.rs"]
mod evolutions;
#[path = "rules/learnsets.rs"]
mod learnsets;
#[path = "rules/moves.rs"]
mod moves;


pub(crate) use compatibility::{TmCompatibility, TutorCompatibility};
pub(crate) use creatures::Creature;
pub(crate) use egg_moves::EggMoveSet;
pub(crate) use evolutions::EvolutionSet;
pub(crate) use learnsets::LevelUpLearnset;
pub(crate) use moves::{MoveFlags, MoveInfo};

use crate::engine::RuleSetSpec;
use crate::error::RecordError;
use crate::normalize::Symbols;
use crate::schema::Row;
use crate::{EntityRecord, SourceKind};

/// A typed entity recovered from one block.
pub(crate) trait SourceRecord: Sized {
    const KIND: SourceKind;

    fn from_record(record: EntityRecord, symbols: &Symbols) -> Result<Self, RecordError>;

    /// Loose rows for the kind's table; the table assembler orders and
    /// coerces them against the schema.
    fn rows(&self) -> Vec<Row>;
}

pub(crate) fn rule_set(kind: SourceKind) -> RuleSetSpec {
    match kind {
        SourceKind::Creatures => creatures::rule_set(),
        SourceKind::Moves => moves::rule_set(),
        SourceKind::Learnsets => learnsets::rule_set(),
        SourceKind::EggMoves => egg_moves::rule_set(),
        SourceKind::TmCompatibility | SourceKind::TutorCompatibility => compatibility::rule_set(kind),
        SourceKind::Evolutions => evolutions::rule_set(),
    }
}

/// Build a loose row from `(column, value)` pairs.
pub(crate) fn row<const N: usize>(cells: [(&str, crate::Value); N]) -> Row {
    cells.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Join key for a humanized tag; an empty key fails the record.
///
/// A digit run after a letter is its own key segment, so `PORYGON2`,
/// `Porygon2`, `ZYGARDE_10` and `Zygarde10` key the same way on both sides
/// of a join.
pub(crate) fn join_key(display_name: &str) -> Result<String, RecordError> {
    let key = crate::slugify(&split_digit_runs(display_name));
    if key.is_empty() { Err(RecordError::EmptyKey(display_name.to_string())) } else { Ok(key) }
}

fn split_digit_runs(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if c.is_ascii_digit() && prev.is_some_and(|p| p.is_alphabetic()) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
