//! Collaborator seams and the table catalog.
//!
//! The core never touches the network or the filesystem. Raw text comes in
//! through a [`SourceFetcher`], finished tables go out through a
//! [`TableSink`], and the [`Catalog`] records where each table ended up.

use crate::error::{BuildError, FetchError, SinkError};
use crate::schema::NormalizedTable;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Supplies raw text blobs keyed by logical source name.
///
/// `Ok(None)` means the source does not exist; the pipeline skips that source
/// kind rather than failing the run.
pub trait SourceFetcher {
    fn fetch(&self, name: &str) -> Result<Option<String>, FetchError>;

    /// Names of the sources in the collection `name` (a directory), in the
    /// order they should be read. Each one is then passed to [`fetch`].
    ///
    /// The default has no collections at all.
    ///
    /// [`fetch`]: SourceFetcher::fetch
    fn list(&self, name: &str) -> Result<Option<Vec<String>>, FetchError> {
        let _ = name;
        Ok(None)
    }
}

/// Accepts completed tables. Ownership of the table passes to the sink.
pub trait TableSink {
    fn accept(&mut self, table: NormalizedTable) -> Result<TableHandle, SinkError>;
}

/// Where a sink put a table (a path, a URI, a database name, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TableHandle(pub String);

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub table: String,
    pub handle: TableHandle,
    pub primary_key: Vec<String>,
    pub rows: usize,
    pub registered_at: DateTime<Utc>,
}

/// Directory of tables produced by one run, in registration order.
///
/// Entries are only ever added. Registering the same table twice in one run
/// is a fatal [`BuildError::CatalogConflict`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        table: &str,
        handle: TableHandle,
        primary_key: Vec<String>,
        rows: usize,
    ) -> Result<&CatalogEntry, BuildError> {
        if self.entries.contains_key(table) {
            return Err(BuildError::CatalogConflict(table.to_string()));
        }
        let entry = CatalogEntry { table: table.to_string(), handle, primary_key, rows, registered_at: Utc::now() };
        tracing::info!(table, handle = %entry.handle, rows, "table registered");
        Ok(self.entries.entry(table.to_string()).or_insert(entry))
    }

    pub fn get(&self, table: &str) -> Option<&CatalogEntry> {
        self.entries.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.entries.contains_key(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- In-memory collaborators -------------------------------------------------

/// Fetcher over a fixed map of source name to text.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    sources: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(name.into(), text.into());
    }
}

impl SourceFetcher for MemoryFetcher {
    fn fetch(&self, name: &str) -> Result<Option<String>, FetchError> {
        Ok(self.sources.get(name).cloned())
    }

    /// Sources named `<name>/<file>`, sorted by name.
    fn list(&self, name: &str) -> Result<Option<Vec<String>>, FetchError> {
        let prefix = format!("{}/", name.trim_end_matches('/'));
        let mut names: Vec<String> = self.sources.keys().filter(|k| k.starts_with(&prefix)).cloned().collect();
        if names.is_empty() {
            return Ok(None);
        }
        names.sort();
        Ok(Some(names))
    }
}

/// Sink that keeps every accepted table in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: IndexMap<String, NormalizedTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&NormalizedTable> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &NormalizedTable> {
        self.tables.values()
    }

    pub fn into_tables(self) -> IndexMap<String, NormalizedTable> {
        self.tables
    }
}

impl TableSink for MemorySink {
    fn accept(&mut self, table: NormalizedTable) -> Result<TableHandle, SinkError> {
        if self.tables.contains_key(&table.name) {
            return Err(SinkError::Rejected(table.name));
        }
        let handle = TableHandle(format!("memory://{}", table.name));
        self.tables.insert(table.name.clone(), table);
        Ok(handle)
    }
}
