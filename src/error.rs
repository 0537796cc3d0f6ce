//! Error taxonomy.
//!
//! Two families live here:
//!
//! - **Fatal** errors (`ConfigError`, `FetchError`, `SinkError`, `BuildError`)
//!   are returned through `Result` and stop a source kind or the whole run.
//! - **Recoverable** problems (`Issue`) are never raised. They are logged where
//!   they are found and aggregated into the table's `ValidationReport`, so one
//!   bad block cannot sink a multi-thousand-record file.

use crate::SourceKind;
use serde::Serialize;
use thiserror::Error;

/// A rule set or configuration that cannot be used.
///
/// Raised while compiling rule sets; it aborts processing of the affected
/// source kind only.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{kind}: field `{field}` uses unknown normalizer `{name}`")]
    UnknownNormalizer { kind: SourceKind, field: String, name: String },

    #[error("{kind}: invalid pattern for `{field}`: {source}")]
    InvalidPattern {
        kind: SourceKind,
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("{kind}: field `{field}` reads capture group {group} but the pattern has {available}")]
    InvalidGroup { kind: SourceKind, field: String, group: usize, available: usize },

    #[error("{kind}: tag pattern must have a capture group for the tag")]
    MissingTagGroup { kind: SourceKind },

    #[error("no rule set registered for source kind {0}")]
    MissingRuleSet(SourceKind),

    #[error("{kind}: override names unknown field `{field}`")]
    UnknownField { kind: SourceKind, field: String },

    #[error("failed to parse TOML: {0}")]
    Toml(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure reported by a `SourceFetcher`.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to read source `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("source `{0}` is not valid UTF-8")]
    Encoding(String),
}

/// Failure reported by a `TableSink`.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize table `{table}`: {reason}")]
    Serialize { table: String, reason: String },

    #[error("sink rejected table `{0}`")]
    Rejected(String),
}

/// Run-level fatal error.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("table `{0}` is already registered in the catalog")]
    CatalogConflict(String),
}

/// Why a single record could not become a typed entity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("required field `{0}` is missing")]
    MissingField(String),

    #[error("field `{field}` could not be parsed from `{raw}`: {reason}")]
    Unparseable { field: String, raw: String, reason: NormalizeError },

    #[error("field `{field}` is not a {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("column `{column}` expects {expected}, got `{value}`")]
    Coercion { column: String, expected: &'static str, value: String },

    #[error("record produced an empty join key from `{0}`")]
    EmptyKey(String),
}

/// A value normalizer could not make sense of a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("not an integer")]
    NotAnInteger,

    #[error("not a number")]
    NotANumber,

    #[error("empty value")]
    Empty,
}

/// A recoverable problem found while building a table.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    #[error("{source_kind}: malformed block `{tag}` at offset {offset}: {reason}")]
    MalformedBlock { source_kind: SourceKind, tag: String, offset: usize, reason: String },

    #[error("{source_kind}: invalid record `{tag}`: {reason}")]
    InvalidRecord { source_kind: SourceKind, tag: String, reason: String },

    #[error("{table}: duplicate primary key `{key}` (first occurrence kept)")]
    DuplicateKey { table: String, key: String },

    #[error("{table}: `{column}` = `{value}` has no match in `{references}`")]
    OrphanReference { table: String, column: String, value: String, references: String },
}

impl Issue {
    pub(crate) fn invalid(source_kind: SourceKind, tag: &str, err: &RecordError) -> Self {
        Issue::InvalidRecord { source_kind, tag: tag.to_string(), reason: err.to_string() }
    }
}
