//! Extraction and normalization engine.
//!
//! This module is the generic machinery behind every source kind. It knows
//! nothing about creatures or moves; that knowledge lives in declarative rule
//! sets under `src/rules/` and in the table schemas in `schema.rs`.
//!
//! ## How the parts work together
//!
//! ```text
//! RuleSetSpec ── overrides ── RuleSet::compile         (compiled_rules.rs)
//!                                   │
//! raw text ── segment ──────────────┼─▶ RawBlock        (segment.rs)
//!                                   │
//!                       RuleSet::extract                (extract.rs)
//!                         - every field rule on the whole body
//!                         - child rule for repeated entries
//!                         - value normalizers, defaults
//!                                   │
//!                       RecordAssembler::records        (records.rs)
//!                         - typed record per kind (SourceRecord)
//!                                   │
//!                       TableAssembler                  (assemble.rs)
//!                         - fan-out to rows, schema order, coercion
//!                                   │
//!                       validate                        (validate.rs)
//!                         - required columns, unique keys, foreign keys
//!                                   │
//!                                   v
//!                      NormalizedTable + ValidationReport
//! ```
//!
//! `pipeline.rs` drives the above once per table, in dependency order, and
//! hands finished tables to the sink.
//!
//! ## Responsibilities by module
//!
//! - `compiled_rules.rs`: rule-set declarations, overrides, compilation.
//! - `segment.rs`: balanced-delimiter block segmentation.
//! - `extract.rs`: field and child extraction from one block body.
//! - `records.rs`: lazy stream of typed records with interleaved issues.
//! - `assemble.rs`: candidate rows in schema shape.
//! - `validate.rs`: table invariants and the reference index.
//! - `metrics.rs`: validation reports and stage timings.
//! - `pipeline.rs`: scheduling, failure scoping, sink and catalog.
//!
//! ## Debugging
//!
//! Everything is logged through `tracing`; the CLI reads its filter from
//! `DEXCARVE_LOG` (for example `DEXCARVE_LOG=dexcarve=debug`).

#[path = "engine/assemble.rs"]
mod assemble;
#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/extract.rs"]
mod extract;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/pipeline.rs"]
mod pipeline;
#[path = "engine/records.rs"]
mod records;
#[path = "engine/segment.rs"]
mod segment;
#[path = "engine/validate.rs"]
mod validate;

pub use compiled_rules::{ChildFieldSpec, ChildSpec, Delimiters, FieldSpec, RuleSet, RuleSetSpec, builtin_rule_sets};
pub use metrics::{StageMetrics, ValidationReport};
pub use pipeline::Pipeline;

#[cfg(test)]
pub(crate) use records::{RecordAssembler, RecordItem};
