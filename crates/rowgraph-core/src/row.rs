//! Rows as they come out of a result set.

use crate::value::Value;
use indexmap::IndexSet;
use std::sync::Arc;

/// Column names of one result set, in select order.
///
/// Every row pulled from the same statement holds the same `Arc<ColumnInfo>`;
/// lookups by name go through the set's hash index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    names: IndexSet<String>,
}

impl ColumnInfo {
    /// Duplicate names collapse onto their first position.
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Select position of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// One record of a result set: values in select order plus the shared column
/// list.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<ColumnInfo>,
    values: Vec<Value>,
}

impl Row {
    /// A row that owns its column list. Rows of one result set should share
    /// theirs through [`Row::with_columns`].
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        Self::with_columns(Arc::new(ColumnInfo::new(column_names)), values)
    }

    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Convenience constructor, mostly for tests and ad-hoc sources.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (names, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .unzip();
        Self::new(names, values)
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.get(self.columns.index_of(name)?)
    }

    /// `(column, value)` pairs in select order. A value without a column name
    /// is skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.names().zip(&self.values)
    }
}
