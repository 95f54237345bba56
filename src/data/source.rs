use std::collections::BTreeMap;

use crate::error::{Result, SelectError};

use super::model::ColumnData;

// ---------------------------------------------------------------------------
// DataSource – read-only access to named survey columns
// ---------------------------------------------------------------------------

/// A read-only store of named columns, one entry per star.
///
/// Implementations are never written through; a source that supports
/// concurrent reads can be shared across threads.
pub trait DataSource {
    /// Names of every column the source holds.
    fn column_names(&self) -> Vec<String>;

    /// Read a full column. Fails with [`SelectError::MissingColumn`] when absent.
    fn read(&self, name: &str) -> Result<ColumnData>;
}

impl<S: DataSource + ?Sized> DataSource for &S {
    fn column_names(&self) -> Vec<String> {
        (**self).column_names()
    }

    fn read(&self, name: &str) -> Result<ColumnData> {
        (**self).read(name)
    }
}

// ---------------------------------------------------------------------------
// MemorySource – columns held in memory
// ---------------------------------------------------------------------------

/// Columns held in memory, as produced by the file loaders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySource {
    columns: BTreeMap<String, ColumnData>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a column.
    pub fn insert(&mut self, name: impl Into<String>, data: ColumnData) {
        self.columns.insert(name.into(), data);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, data: ColumnData) -> Self {
        self.insert(name, data);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ColumnData> {
        self.columns.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl DataSource for MemorySource {
    fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    fn read(&self, name: &str) -> Result<ColumnData> {
        self.columns
            .get(name)
            .cloned()
            .ok_or_else(|| SelectError::MissingColumn(name.to_string()))
    }
}

impl FromIterator<(String, ColumnData)> for MemorySource {
    fn from_iter<I: IntoIterator<Item = (String, ColumnData)>>(iter: I) -> Self {
        MemorySource {
            columns: iter.into_iter().collect(),
        }
    }
}
