//! Pipeline orchestration.
//!
//! One run processes the source kinds strictly one table at a time, in a
//! fixed order, because later tables validate their foreign keys against the
//! key sets of earlier ones:
//!
//! ```text
//! creatures ─▶ moves ─▶ creature_moves ─▶ evolutions
//!                 ▲              │
//!                 └── derived ◀──┘  (only when the moves source is absent)
//! ```
//!
//! `creature_moves` is fed by four source kinds in turn: level-up learnsets,
//! egg moves, then the TM and tutor compatibility collections.
//!
//! Failures are scoped as narrowly as possible: a rule set that does not
//! compile or a source that cannot be fetched fails that source kind only.
//! Only sink failures and catalog conflicts abort the run.

use super::assemble::TableAssembler;
use super::compiled_rules::{RuleSet, RuleSetSpec, builtin_rule_sets};
use super::metrics::{StageMetrics, ValidationReport};
use super::records::RecordAssembler;
use super::validate::{ReferenceIndex, validate};
use crate::api::{BuildSummary, SourceOutcome};
use crate::catalog::{Catalog, SourceFetcher, TableSink};
use crate::config::BuildConfig;
use crate::error::{BuildError, ConfigError, FetchError};
use crate::normalize::Symbols;
use crate::rules::{
    Creature, EggMoveSet, EvolutionSet, LevelUpLearnset, MoveInfo, SourceRecord, TmCompatibility, TutorCompatibility,
};
use crate::schema::TableSchema;
use crate::{SourceKind, Value};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// A configured pipeline: symbol tables and one compiled rule set (or the
/// reason it failed to compile) per source kind.
#[derive(Debug)]
pub struct Pipeline {
    config: BuildConfig,
    symbols: Symbols,
    rule_sets: HashMap<SourceKind, Result<RuleSet, ConfigError>>,
}

/// Mutable state of one run. Dropped when the run ends.
struct RunState {
    refs: ReferenceIndex,
    catalog: Catalog,
    outcomes: IndexMap<SourceKind, SourceOutcome>,
    reports: Vec<ValidationReport>,
    metrics: Vec<StageMetrics>,
}

impl Pipeline {
    /// Pipeline over the built-in rule sets.
    pub fn new(config: BuildConfig) -> Result<Self, ConfigError> {
        Self::with_rule_sets(config, builtin_rule_sets())
    }

    /// Pipeline over caller-supplied rule sets. Kinds without a rule set fail
    /// with [`ConfigError::MissingRuleSet`] when the run reaches them.
    ///
    /// Returns an error only when the configuration itself is invalid; rule
    /// compile errors are kept per kind.
    pub fn with_rule_sets(config: BuildConfig, specs: Vec<RuleSetSpec>) -> Result<Self, ConfigError> {
        config.validate()?;
        let symbols = config.symbols();

        let mut specs: HashMap<SourceKind, RuleSetSpec> = specs.into_iter().map(|s| (s.kind, s)).collect();
        let mut rule_sets = HashMap::new();
        for kind in SourceKind::ALL {
            let compiled = match specs.remove(&kind) {
                None => Err(ConfigError::MissingRuleSet(kind)),
                Some(mut spec) => config
                    .overrides_for(kind)
                    .try_for_each(|o| spec.apply_override(o))
                    .and_then(|()| RuleSet::compile(&spec)),
            };
            if let Err(err) = &compiled {
                tracing::error!(%kind, %err, "rule set unusable");
            }
            rule_sets.insert(kind, compiled);
        }

        Ok(Pipeline { config, symbols, rule_sets })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Run every source kind to completion and hand each finished table to
    /// `sink`.
    pub fn run<F, S>(&self, fetcher: &F, sink: &mut S) -> Result<BuildSummary, BuildError>
    where
        F: SourceFetcher + ?Sized,
        S: TableSink + ?Sized,
    {
        let started = Instant::now();
        let mut state = RunState {
            refs: ReferenceIndex::new(),
            catalog: Catalog::new(),
            outcomes: IndexMap::new(),
            reports: Vec::new(),
            metrics: Vec::new(),
        };

        // creatures
        let clock = Instant::now();
        let mut asm = TableAssembler::new(TableSchema::creatures());
        if self.feed::<Creature, F>(fetcher, &mut asm, &mut state) {
            state.commit(asm, clock.elapsed(), sink)?;
        }

        // moves
        let clock = Instant::now();
        let mut asm = TableAssembler::new(TableSchema::moves());
        if self.feed::<MoveInfo, F>(fetcher, &mut asm, &mut state) {
            state.commit(asm, clock.elapsed(), sink)?;
        }

        // creature_moves, from four source kinds
        let clock = Instant::now();
        let mut asm = TableAssembler::new(TableSchema::creature_moves());
        let fed = [
            self.feed::<LevelUpLearnset, F>(fetcher, &mut asm, &mut state),
            self.feed::<EggMoveSet, F>(fetcher, &mut asm, &mut state),
            self.feed::<TmCompatibility, F>(fetcher, &mut asm, &mut state),
            self.feed::<TutorCompatibility, F>(fetcher, &mut asm, &mut state),
        ];
        let mut derived_moves = false;
        if fed.contains(&true) {
            let assembled = clock.elapsed();
            if self.config.derive_moves_from_learnsets && !state.catalog.contains(TableSchema::MOVES) {
                derive_moves(&asm, &mut state, sink)?;
                derived_moves = true;
            }
            state.commit(asm, assembled, sink)?;
        }

        // evolutions
        let clock = Instant::now();
        let mut asm = TableAssembler::new(TableSchema::evolutions());
        if self.feed::<EvolutionSet, F>(fetcher, &mut asm, &mut state) {
            state.commit(asm, clock.elapsed(), sink)?;
        }

        let summary = BuildSummary {
            outcomes: state.outcomes,
            reports: state.reports,
            metrics: state.metrics,
            catalog: state.catalog,
            derived_moves,
            elapsed: started.elapsed(),
        };
        tracing::info!(tables = summary.catalog.len(), elapsed = ?summary.elapsed, "build finished");
        Ok(summary)
    }

    /// Stream one source kind into `asm`. Returns whether the source was
    /// read; the outcome is recorded either way.
    fn feed<T, F>(&self, fetcher: &F, asm: &mut TableAssembler, state: &mut RunState) -> bool
    where
        T: SourceRecord,
        F: SourceFetcher + ?Sized,
    {
        let kind = T::KIND;
        let name = self.config.sources.get(kind);

        let outcome = if self.config.is_skipped(kind) {
            tracing::info!(%kind, "source kind skipped by configuration");
            SourceOutcome::Skipped
        } else {
            match self.rule_sets.get(&kind) {
                None => SourceOutcome::Failed { reason: ConfigError::MissingRuleSet(kind).to_string() },
                Some(Err(err)) => SourceOutcome::Failed { reason: err.to_string() },
                Some(Ok(rules)) => {
                    let loaded = if kind.is_collection() {
                        self.absorb_collection::<T, F>(fetcher, name, rules, asm)
                    } else {
                        fetcher.fetch(name).map(|text| text.map(|text| self.absorb_text::<T>(name, &text, rules, asm)))
                    };
                    match loaded {
                        Ok(None) => {
                            tracing::warn!(%kind, source = name, "source not found");
                            SourceOutcome::Missing
                        }
                        Err(err) => {
                            tracing::error!(%kind, source = name, %err, "source fetch failed");
                            SourceOutcome::Failed { reason: err.to_string() }
                        }
                        Ok(Some(records)) => {
                            tracing::info!(%kind, records, "source assembled");
                            SourceOutcome::Built { records }
                        }
                    }
                }
            }
        };

        let built = matches!(outcome, SourceOutcome::Built { .. });
        state.outcomes.insert(kind, outcome);
        built
    }

    fn absorb_text<T: SourceRecord>(&self, name: &str, text: &str, rules: &RuleSet, asm: &mut TableAssembler) -> usize {
        tracing::debug!(kind = %T::KIND, source = name, bytes = text.len(), "source loaded");
        asm.absorb(RecordAssembler::new(rules, &self.symbols).records::<T>(text))
    }

    /// Read every member of a collection into `asm`. A member that vanished
    /// between listing and fetching is skipped; any other fetch error fails
    /// the whole kind.
    fn absorb_collection<T, F>(
        &self,
        fetcher: &F,
        name: &str,
        rules: &RuleSet,
        asm: &mut TableAssembler,
    ) -> Result<Option<usize>, FetchError>
    where
        T: SourceRecord,
        F: SourceFetcher + ?Sized,
    {
        let Some(members) = fetcher.list(name)? else {
            return Ok(None);
        };
        let mut records = 0;
        for member in &members {
            match fetcher.fetch(member)? {
                Some(text) => records += self.absorb_text::<T>(member, &text, rules, asm),
                None => tracing::warn!(kind = %T::KIND, source = member.as_str(), "listed source not found"),
            }
        }
        tracing::debug!(kind = %T::KIND, source = name, files = members.len(), "collection loaded");
        Ok(Some(records))
    }
}

impl RunState {
    /// Validate, sink and register one table.
    fn commit<S: TableSink + ?Sized>(&mut self, asm: TableAssembler, assemble: Duration, sink: &mut S) -> Result<(), BuildError> {
        let clock = Instant::now();
        let (table, report) = validate(asm.finish(), &self.refs);
        let validate_time = clock.elapsed();

        self.refs.register(&table);
        let (name, primary_key, rows) = (table.name.clone(), table.primary_key.clone(), table.len());

        let clock = Instant::now();
        let handle = sink.accept(table)?;
        let sink_time = clock.elapsed();

        self.catalog.register(&name, handle, primary_key, rows)?;
        self.reports.push(report);
        self.metrics.push(StageMetrics { table: name, assemble, validate: validate_time, sink: sink_time });
        Ok(())
    }
}

/// Build a minimal moves table from the distinct move keys of the
/// creature_moves candidate rows, sorted by key.
fn derive_moves<S: TableSink + ?Sized>(source: &TableAssembler, state: &mut RunState, sink: &mut S) -> Result<(), BuildError> {
    let clock = Instant::now();
    let keys: BTreeSet<&str> = source.rows().iter().filter_map(|r| r.row.get("move_key").and_then(Value::as_str)).collect();
    tracing::info!(moves = keys.len(), "deriving moves table from learnsets");

    let mut asm = TableAssembler::new(TableSchema::moves());
    for key in keys {
        asm.push_rows(SourceKind::Learnsets, key, MoveInfo::from_key(key).rows());
    }
    state.commit(asm, clock.elapsed(), sink)
}
