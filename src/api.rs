//! Entry points.
//!
//! [`build`] and [`build_with`] run the whole pipeline over any fetcher and
//! sink; [`build_in_memory`] is the shortcut for tests and embedding. Every
//! run returns a [`BuildSummary`] with per-source outcomes, per-table
//! validation reports and stage timings.

use crate::catalog::{Catalog, MemoryFetcher, MemorySink, SourceFetcher, TableSink};
use crate::config::BuildConfig;
use crate::engine::{Pipeline, StageMetrics, ValidationReport};
use crate::error::BuildError;
use crate::SourceKind;
use indexmap::IndexMap;
use serde::Serialize;
use std::time::Duration;

/// What happened to one source kind during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// The source was read; `records` typed records made it into the table.
    Built { records: usize },
    /// The fetcher has no such source.
    Missing,
    /// Skipped by configuration.
    Skipped,
    /// Rule set unusable or fetch failed; other kinds were unaffected.
    Failed { reason: String },
}

/// Result of [`build`], [`build_with`] and [`build_in_memory`].
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    /// Per source kind, in processing order.
    pub outcomes: IndexMap<SourceKind, SourceOutcome>,
    /// One report per table handed to the sink.
    pub reports: Vec<ValidationReport>,
    pub metrics: Vec<StageMetrics>,
    /// Tables registered in this run, in registration order.
    pub catalog: Catalog,
    /// The moves table was derived from learnset move keys.
    pub derived_moves: bool,
    /// Total elapsed time for the run.
    pub elapsed: Duration,
}

impl BuildSummary {
    pub fn outcome(&self, kind: SourceKind) -> Option<&SourceOutcome> {
        self.outcomes.get(&kind)
    }

    pub fn report(&self, table: &str) -> Option<&ValidationReport> {
        self.reports.iter().find(|r| r.table == table)
    }

    /// True when every table validated without rejections or orphans and no
    /// source kind failed.
    pub fn is_clean(&self) -> bool {
        self.reports.iter().all(ValidationReport::is_clean)
            && !self.outcomes.values().any(|o| matches!(o, SourceOutcome::Failed { .. }))
    }
}

/// Build every table with the default configuration.
pub fn build<F, S>(fetcher: &F, sink: &mut S) -> Result<BuildSummary, BuildError>
where
    F: SourceFetcher + ?Sized,
    S: TableSink + ?Sized,
{
    build_with(fetcher, sink, &BuildConfig::default())
}

/// Build every table with `config`.
///
/// Fails only when the configuration as a whole is invalid, when the sink
/// fails, or on a catalog conflict. Everything else ends up in the summary.
pub fn build_with<F, S>(fetcher: &F, sink: &mut S, config: &BuildConfig) -> Result<BuildSummary, BuildError>
where
    F: SourceFetcher + ?Sized,
    S: TableSink + ?Sized,
{
    let pipeline = Pipeline::new(config.clone())?;
    pipeline.run(fetcher, sink)
}

/// Build from in-memory sources keyed by the default source names and keep
/// the tables in a [`MemorySink`].
///
/// # Example
/// ```
/// use dexcarve::{Value, build_in_memory};
///
/// let (summary, sink) = build_in_memory([(
///     "Base_Stats.c",
///     "[SPECIES_TESTMON] = { .baseHP = 45, .baseAttack = 49, .baseDefense = 49, \
///      .baseSpAttack = 65, .baseSpDefense = 65, .baseSpeed = 45, \
///      .types = {TYPE_GRASS, TYPE_POISON} },",
/// )])
/// .unwrap();
///
/// let creatures = sink.table("creatures").unwrap();
/// let row = creatures.find("testmon").unwrap();
/// assert_eq!(row["type2"], Value::from("Poison"));
/// assert_eq!(summary.report("creatures").unwrap().rows_accepted, 1);
/// ```
pub fn build_in_memory<I, K, V>(sources: I) -> Result<(BuildSummary, MemorySink), BuildError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut fetcher = MemoryFetcher::new();
    for (name, text) in sources {
        fetcher.insert(name, text);
    }
    let mut sink = MemorySink::new();
    let summary = build(&fetcher, &mut sink)?;
    Ok((summary, sink))
}
