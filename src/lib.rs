//! Carve semi-structured game-data dumps into normalized relational tables.
//!
//! Source files are C struct-literal text (`[TAG] = { .field = value, ... },`)
//! full of nested braces, conditional-compilation ternaries and string macros.
//! The crate recovers one record per block with declarative regex rules,
//! normalizes symbolic values, derives join keys with [`slugify`], validates
//! every table against the ones built before it and hands the result to a
//! [`TableSink`].
//!
//! ```text
//! raw text ─▶ segment ─▶ extract/normalize ─▶ typed record ─▶ rows
//!                                                              │
//!                     sink ◀─ catalog ◀─ validate ◀─ assemble ◀┘
//! ```
//!
//! Most callers only need [`build`] / [`build_with`] (or
//! [`build_in_memory`] in tests).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[macro_use]
mod macros;
mod api;
mod catalog;
mod config;
mod engine;
mod error;
mod normalize;
mod rules;
mod schema;
mod slug;

pub use api::{BuildSummary, SourceOutcome, build, build_in_memory, build_with};
pub use catalog::{Catalog, CatalogEntry, MemoryFetcher, MemorySink, SourceFetcher, TableHandle, TableSink};
pub use config::{BuildConfig, RuleOverride, SourceNames, SymbolOverrides};
pub use engine::{
    ChildFieldSpec, ChildSpec, Delimiters, FieldSpec, Pipeline, RuleSet, RuleSetSpec, StageMetrics, ValidationReport,
    builtin_rule_sets,
};
pub use error::{BuildError, ConfigError, FetchError, Issue, NormalizeError, RecordError, SinkError};
pub use normalize::{Normalizer, SymbolKind, Symbols};
pub use schema::{Column, ColumnType, ForeignKey, NormalizedTable, Row, TableSchema};
pub use slug::slugify;

// --- Shared vocabulary -------------------------------------------------------

/// The logical kinds of source file the pipeline knows how to read.
///
/// The declaration order is the scheduling order: later kinds validate their
/// foreign keys against tables produced by earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Creatures,
    Moves,
    Learnsets,
    EggMoves,
    TmCompatibility,
    TutorCompatibility,
    Evolutions,
}

impl SourceKind {
    pub const ALL: [SourceKind; 7] = [
        SourceKind::Creatures,
        SourceKind::Moves,
        SourceKind::Learnsets,
        SourceKind::EggMoves,
        SourceKind::TmCompatibility,
        SourceKind::TutorCompatibility,
        SourceKind::Evolutions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Creatures => "creatures",
            SourceKind::Moves => "moves",
            SourceKind::Learnsets => "learnsets",
            SourceKind::EggMoves => "egg_moves",
            SourceKind::TmCompatibility => "tm_compatibility",
            SourceKind::TutorCompatibility => "tutor_compatibility",
            SourceKind::Evolutions => "evolutions",
        }
    }

    /// The source is a collection of files (one per move) rather than one
    /// text; see [`SourceFetcher::list`](crate::SourceFetcher::list).
    pub fn is_collection(self) -> bool {
        matches!(self, SourceKind::TmCompatibility | SourceKind::TutorCompatibility)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed scalar extracted from source text or stored in a table cell.
///
/// Enum-like display strings ("Fire", "Physical") are carried as `Str`; the
/// distinction lives in the column type (`ColumnType::Enum`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Stable text form used when this value takes part in a key.
    pub(crate) fn key_text(&self) -> String {
        match self {
            Value::Null => "\u{2205}".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One delimited top-level block as found by the segmenter.
///
/// `body` is the text strictly between the block's opening delimiter and its
/// balanced closing delimiter. `start_offset` is the byte offset of the block
/// header in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawBlock<'t> {
    pub kind: SourceKind,
    pub tag: &'t str,
    pub body: &'t str,
    pub start_offset: usize,
}

/// Field name → value mapping, ordered like the rule set that produced it.
pub(crate) type Fields = IndexMap<String, Value>;

/// A record recovered from one block: scalar fields plus any repeated child
/// entries (learnset lines, evolution tuples, ...).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntityRecord {
    pub kind: SourceKind,
    pub tag: String,
    pub offset: usize,
    pub fields: Fields,
    pub children: Vec<Fields>,
}

impl EntityRecord {
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&Value::Null)
    }

    pub fn int(&self, field: &str) -> Result<i64, RecordError> {
        field_int(&self.fields, field)
    }

    pub fn opt_str(&self, field: &str) -> Result<Option<String>, RecordError> {
        field_opt_str(&self.fields, field)
    }

    pub fn flag(&self, field: &str) -> Result<bool, RecordError> {
        match self.get(field) {
            Value::Bool(v) => Ok(*v),
            Value::Null => Ok(false),
            _ => Err(RecordError::TypeMismatch { field: field.to_string(), expected: "bool" }),
        }
    }
}

pub(crate) fn field_int(fields: &Fields, field: &str) -> Result<i64, RecordError> {
    match fields.get(field) {
        Some(Value::Int(v)) => Ok(*v),
        None | Some(Value::Null) => Err(RecordError::MissingField(field.to_string())),
        Some(_) => Err(RecordError::TypeMismatch { field: field.to_string(), expected: "int" }),
    }
}

pub(crate) fn field_opt_str(fields: &Fields, field: &str) -> Result<Option<String>, RecordError> {
    match fields.get(field) {
        Some(Value::Str(s)) if !s.is_empty() => Ok(Some(s.clone())),
        None | Some(Value::Null) | Some(Value::Str(_)) => Ok(None),
        Some(_) => Err(RecordError::TypeMismatch { field: field.to_string(), expected: "string" }),
    }
}

pub(crate) fn field_str(fields: &Fields, field: &str) -> Result<String, RecordError> {
    field_opt_str(fields, field)?.ok_or_else(|| RecordError::MissingField(field.to_string()))
}
