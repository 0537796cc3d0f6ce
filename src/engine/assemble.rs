//! Table assembly: fan typed records out into schema-shaped candidate rows.
//!
//! The assembler keeps source order. One record can produce many rows (a
//! learnset produces one row per line); parent-level values are copied into
//! each child row by the record itself, never merged across records.

use super::records::RecordItem;
use crate::SourceKind;
use crate::error::Issue;
use crate::rules::SourceRecord;
use crate::schema::{Row, TableSchema};

/// A shaped row that has not been validated yet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CandidateRow {
    pub origin: SourceKind,
    pub tag: String,
    pub row: Row,
}

/// Everything the validator needs to finish one table.
#[derive(Debug, Clone)]
pub(crate) struct CandidateTable {
    pub schema: TableSchema,
    pub rows: Vec<CandidateRow>,
    pub issues: Vec<Issue>,
    /// Records or rows rejected before validation.
    pub rejected: usize,
    pub malformed: usize,
}

pub(crate) struct TableAssembler {
    table: CandidateTable,
}

impl TableAssembler {
    pub fn new(schema: TableSchema) -> Self {
        TableAssembler { table: CandidateTable { schema, rows: Vec::new(), issues: Vec::new(), rejected: 0, malformed: 0 } }
    }

    /// Fold a record stream into the table. Returns the number of records
    /// that made it through.
    pub fn absorb<T: SourceRecord>(&mut self, stream: impl Iterator<Item = RecordItem<T>>) -> usize {
        let mut records = 0;
        for item in stream {
            match item {
                Ok(located) => {
                    records += 1;
                    let rows = located.value.rows();
                    tracing::trace!(kind = %T::KIND, tag = %located.tag, offset = located.offset, rows = rows.len(), "record assembled");
                    self.push_rows(T::KIND, &located.tag, rows);
                }
                Err(issue) => self.note(issue),
            }
        }
        records
    }

    /// Shape and append rows produced outside a record stream.
    pub fn push_rows(&mut self, origin: SourceKind, tag: &str, rows: Vec<Row>) {
        for loose in rows {
            match self.table.schema.shape_row(loose) {
                Ok(row) => self.table.rows.push(CandidateRow { origin, tag: tag.to_string(), row }),
                Err(err) => {
                    let issue = Issue::invalid(origin, tag, &err);
                    tracing::warn!(%issue, table = self.table.schema.name, "row does not fit schema");
                    self.note(issue);
                }
            }
        }
    }

    fn note(&mut self, issue: Issue) {
        match issue {
            Issue::MalformedBlock { .. } => self.table.malformed += 1,
            _ => self.table.rejected += 1,
        }
        self.table.issues.push(issue);
    }

    pub fn rows(&self) -> &[CandidateRow] {
        &self.table.rows
    }

    pub fn finish(self) -> CandidateTable {
        self.table
    }
}
