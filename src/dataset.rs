//! Immutable tabular data and the index-based views derived from it.
//!
//! A [`Dataset`] is loaded once and shared behind an [`Arc`]. Every engine
//! operation produces a [`DatasetView`], which only records the parent row
//! indices it keeps, so filtering never copies or mutates the rows.

use std::sync::Arc;

use crate::data::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Builds a dataset, padding short rows with [`Value::Missing`] and
    /// truncating long ones to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Convenience constructor from raw text cells.
    pub fn from_raw_rows<S: AsRef<str>>(headers: &[S], rows: &[Vec<S>]) -> Self {
        let headers = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::from_raw(cell.as_ref())).collect())
            .collect();
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&Value::Missing)
    }
}

/// Read-only subset of a dataset, in parent row order.
#[derive(Debug, Clone)]
pub struct DatasetView {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
}

impl DatasetView {
    pub fn full(dataset: Arc<Dataset>) -> Self {
        let indices = (0..dataset.len()).collect();
        Self { dataset, indices }
    }

    pub(crate) fn with_indices(dataset: Arc<Dataset>, indices: Vec<usize>) -> Self {
        Self { dataset, indices }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn headers(&self) -> &[String] {
        self.dataset.headers()
    }

    /// Parent row indices kept by this view.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.indices
            .iter()
            .filter_map(|&index| self.dataset.row(index))
    }

    /// Keeps the rows of this view that satisfy `predicate`, which receives
    /// the parent row index.
    pub fn narrow<F>(&self, mut predicate: F) -> DatasetView
    where
        F: FnMut(usize) -> bool,
    {
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&index| predicate(index))
            .collect();
        DatasetView::with_indices(Arc::clone(&self.dataset), indices)
    }

    /// Materialises the view as display strings, for presentation adapters.
    pub fn to_display_rows(&self) -> Vec<Vec<String>> {
        self.rows()
            .map(|row| row.iter().map(Value::as_display).collect())
            .collect()
    }
}
