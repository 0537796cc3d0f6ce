//! Per-table reports and stage timings.
//!
//! A [`ValidationReport`] is produced for every table the pipeline hands to
//! the sink. It is the only place recoverable problems surface to callers:
//! nothing in the core raises them.
//!
//! Counting rules:
//!
//! - `rows_total = rows_accepted + rows_rejected`
//! - a rejected record or child entry counts as one rejected row
//! - malformed blocks are counted separately; they never became rows
//! - orphaned rows stay in the table and are counted in `rows_orphaned`

use crate::error::Issue;
use serde::Serialize;
use std::time::Duration;

// --- Reports ----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub table: String,
    pub rows_total: usize,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    /// Accepted rows with at least one dangling foreign key.
    pub rows_orphaned: usize,
    pub duplicate_keys: usize,
    pub malformed_blocks: usize,
    /// Distinct `(column, value)` pairs with no match in the referenced table.
    pub orphaned_foreign_keys: Vec<(String, String)>,
    /// Foreign-key columns not checked because the referenced table was never
    /// built.
    pub unchecked_foreign_keys: Vec<String>,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.rows_rejected == 0 && self.rows_orphaned == 0 && self.malformed_blocks == 0
    }
}

/// Timing for one table's trip through the pipeline.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StageMetrics {
    pub table: String,
    /// Segment + extract + typed conversion + row shaping.
    pub assemble: Duration,
    pub validate: Duration,
    pub sink: Duration,
}

impl StageMetrics {
    pub fn total(&self) -> Duration {
        self.assemble + self.validate + self.sink
    }
}
