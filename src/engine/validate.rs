//! Schema validation.
//!
//! Checks a candidate table against its schema and the tables already built
//! in this run, in three passes over the rows, in source order:
//!
//! 1. required (non-nullable) columns must be non-null, else the row is
//!    rejected
//! 2. primary keys must be unique; the first occurrence wins and later ones
//!    are rejected as [`Issue::DuplicateKey`]
//! 3. non-null foreign-key values must exist in the referenced table; a miss
//!    is reported as [`Issue::OrphanReference`] but the row is kept
//!
//! A foreign key whose referenced table was never built is not checked at
//! all; that is reported in the validation report, not as an orphan.

use super::assemble::CandidateTable;
use super::metrics::ValidationReport;
use crate::error::{Issue, RecordError};
use crate::schema::NormalizedTable;
use std::collections::{HashMap, HashSet};

/// Primary-key sets of the key-authority tables built so far.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReferenceIndex {
    keys: HashMap<String, HashSet<String>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a finished table. Only single-column keys can be referenced.
    pub fn register(&mut self, table: &NormalizedTable) {
        let [pk] = table.primary_key.as_slice() else {
            return;
        };
        let keys = table.column_values(pk).filter(|v| !v.is_null()).map(|v| v.key_text()).collect();
        self.keys.insert(table.name.clone(), keys);
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.keys.contains_key(table)
    }

    pub fn contains(&self, table: &str, key: &str) -> bool {
        self.keys.get(table).is_some_and(|keys| keys.contains(key))
    }
}

pub(crate) fn validate(candidate: CandidateTable, refs: &ReferenceIndex) -> (NormalizedTable, ValidationReport) {
    let CandidateTable { schema, rows, mut issues, rejected, malformed } = candidate;
    let table = schema.name;

    let mut report = ValidationReport { table: table.to_string(), malformed_blocks: malformed, ..Default::default() };
    let mut rows_rejected = rejected;

    let required: Vec<&str> = schema.columns.iter().filter(|c| !c.nullable).map(|c| c.name).collect();
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(rows.len());

    for candidate in rows {
        if let Some(column) = required.iter().find(|c| candidate.row.get(**c).is_none_or(|v| v.is_null())) {
            let issue = Issue::invalid(candidate.origin, &candidate.tag, &RecordError::MissingField(column.to_string()));
            tracing::warn!(%issue, table, "row rejected");
            issues.push(issue);
            rows_rejected += 1;
            continue;
        }

        let key = schema.key_of(&candidate.row);
        if !seen.insert(key.clone()) {
            let issue = Issue::DuplicateKey { table: table.to_string(), key };
            tracing::warn!(%issue, tag = %candidate.tag, "duplicate dropped");
            issues.push(issue);
            report.duplicate_keys += 1;
            rows_rejected += 1;
            continue;
        }

        accepted.push(candidate.row);
    }

    let mut orphan_pairs: HashSet<(String, String)> = HashSet::new();
    for fk in &schema.foreign_keys {
        if !refs.has_table(fk.references) {
            tracing::warn!(table, column = fk.column, references = fk.references, "referenced table absent, foreign key not checked");
            report.unchecked_foreign_keys.push(fk.column.to_string());
        }
    }

    for row in &accepted {
        let mut orphaned = false;
        for fk in schema.foreign_keys.iter().filter(|fk| refs.has_table(fk.references)) {
            let Some(value) = row.get(fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let value = value.key_text();
            if refs.contains(fk.references, &value) {
                continue;
            }
            orphaned = true;
            if orphan_pairs.insert((fk.column.to_string(), value.clone())) {
                let issue = Issue::OrphanReference {
                    table: table.to_string(),
                    column: fk.column.to_string(),
                    value: value.clone(),
                    references: fk.references.to_string(),
                };
                tracing::warn!(%issue, "orphan reference kept");
                issues.push(issue);
                report.orphaned_foreign_keys.push((fk.column.to_string(), value));
            }
        }
        if orphaned {
            report.rows_orphaned += 1;
        }
    }

    report.rows_accepted = accepted.len();
    report.rows_rejected = rows_rejected;
    report.rows_total = report.rows_accepted + rows_rejected;
    report.issues = issues;

    tracing::info!(
        table,
        accepted = report.rows_accepted,
        rejected = report.rows_rejected,
        orphaned = report.rows_orphaned,
        "table validated"
    );

    (NormalizedTable::new(&schema, accepted), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assemble::TableAssembler;
    use crate::schema::{Row, TableSchema};
    use crate::{SourceKind, Value};

    fn creature(key: &str) -> Row {
        let mut row = Row::new();
        row.insert("creature_key".into(), Value::from(key));
        row.insert("name".into(), Value::from(key));
        for stat in ["hp", "attack", "defense", "sp_attack", "sp_defense", "speed", "bst"] {
            row.insert(stat.into(), Value::Int(1));
        }
        row
    }

    fn learn(creature: &str, mv: &str, level: i64) -> Row {
        let mut row = Row::new();
        row.insert("creature_key".into(), Value::from(creature));
        row.insert("move_key".into(), Value::from(mv));
        row.insert("learn_method".into(), Value::from("level"));
        row.insert("level".into(), Value::Int(level));
        row
    }

    fn candidate(schema: TableSchema, origin: SourceKind, rows: Vec<Row>) -> CandidateTable {
        let mut asm = TableAssembler::new(schema);
        asm.push_rows(origin, "T", rows);
        asm.finish()
    }

    #[test]
    fn duplicate_keys_first_wins() {
        let mut first = creature("mr_mime");
        first.insert("name".into(), Value::from("Mr. Mime"));
        let mut second = creature("mr_mime");
        second.insert("name".into(), Value::from("Mr Mime"));

        let (table, report) = validate(
            candidate(TableSchema::creatures(), SourceKind::Creatures, vec![first, second, creature("abra")]),
            &ReferenceIndex::new(),
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.find("mr_mime").unwrap()["name"], Value::from("Mr. Mime"));
        assert_eq!(report.duplicate_keys, 1);
        assert_eq!((report.rows_total, report.rows_accepted, report.rows_rejected), (3, 2, 1));
        assert!(matches!(&report.issues[0], Issue::DuplicateKey { key, .. } if key == "mr_mime"));
    }

    #[test]
    fn null_required_column_rejects_row() {
        let mut broken = creature("abra");
        broken.insert("hp".into(), Value::Null);
        let (table, report) =
            validate(candidate(TableSchema::creatures(), SourceKind::Creatures, vec![broken]), &ReferenceIndex::new());
        assert!(table.is_empty());
        assert_eq!(report.rows_rejected, 1);
    }

    #[test]
    fn orphans_are_kept_and_reported() {
        let (creatures, _) =
            validate(candidate(TableSchema::creatures(), SourceKind::Creatures, vec![creature("bulbasaur")]), &ReferenceIndex::new());
        let mut refs = ReferenceIndex::new();
        refs.register(&creatures);

        let rows = vec![learn("bulbasaur", "tackle", 1), learn("ghostmon", "tackle", 1), learn("ghostmon", "growl", 4)];
        let (table, report) = validate(candidate(TableSchema::creature_moves(), SourceKind::Learnsets, rows), &refs);

        assert_eq!(table.len(), 3);
        assert_eq!(report.rows_orphaned, 2);
        assert_eq!(report.orphaned_foreign_keys, [("creature_key".to_string(), "ghostmon".to_string())]);
        assert_eq!(report.unchecked_foreign_keys, ["move_key".to_string()]);
    }

    #[test]
    fn composite_key_distinguishes_levels() {
        let rows = vec![learn("a", "tackle", 1), learn("a", "tackle", 5), learn("a", "tackle", 1)];
        let (table, report) = validate(candidate(TableSchema::creature_moves(), SourceKind::Learnsets, rows), &ReferenceIndex::new());
        assert_eq!(table.len(), 2);
        assert_eq!(report.duplicate_keys, 1);
    }

    #[test]
    fn reference_index_only_takes_single_keys() {
        let mut refs = ReferenceIndex::new();
        refs.register(&NormalizedTable::new(&TableSchema::creature_moves(), vec![]));
        assert!(!refs.has_table("creature_moves"));
    }
}
