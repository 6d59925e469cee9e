//! Shared table view state for the Elimu QA admin console
//!
//! Every list screen in the console renders through the same pipeline:
//! rows come in from a backend fetch, then search, per-column filters,
//! sorting, pagination and row selection are applied client-side. This
//! crate owns that pipeline so the screens stop re-implementing it.
//!
//! Filters compose by AND: tightening one filter narrows the visible set
//! and leaves the other active filters untouched. `snapshot()` captures
//! the currently filtered (or, when rows are selected, the selected) rows
//! across all pages, which is exactly what the export writers consume.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Result type
pub type Result<T> = std::result::Result<T, TableError>;

/// Error type
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

impl TableError {
    /// Operator-facing message, suitable for a notification toast.
    pub fn user_message(&self) -> String {
        match self {
            TableError::UnknownColumn(_) => "That column is not available.".to_string(),
            TableError::InvalidParameters(message) => message.clone(),
        }
    }
}

/// Sort direction for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A displayable column: stable key, header label, and an accessor that
/// renders a row's cell as text.
pub struct Column<T> {
    pub key: &'static str,
    pub header: &'static str,
    pub accessor: fn(&T) -> String,
}

impl<T> Column<T> {
    pub fn new(key: &'static str, header: &'static str, accessor: fn(&T) -> String) -> Self {
        Self {
            key,
            header,
            accessor,
        }
    }
}

type FilterFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Captured headers and cell text of the rows a screen is currently
/// showing. This is the input handed to the export writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSnapshot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// View state over a fetched collection of rows.
///
/// The row set itself is a discardable cache: screens refetch and rebuild
/// the view after every mutating action, so nothing here survives beyond
/// the screen that created it.
pub struct TableView<T> {
    columns: Vec<Column<T>>,
    rows: Vec<T>,
    search: Option<String>,
    filters: BTreeMap<&'static str, FilterFn<T>>,
    sort: Option<(usize, SortOrder)>,
    page: usize,
    per_page: usize,
    selected: BTreeSet<usize>,
}

impl<T> TableView<T> {
    /// Create a view over `rows` rendered through `columns`.
    pub fn new(columns: Vec<Column<T>>, rows: Vec<T>) -> Self {
        Self {
            columns,
            rows,
            search: None,
            filters: BTreeMap::new(),
            sort: None,
            page: 0,
            per_page: 10,
            selected: BTreeSet::new(),
        }
    }

    /// Replace the backing rows after a refetch. Selection is cleared;
    /// search, filters, sort and page size carry over.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.selected.clear();
        self.page = 0;
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Case-insensitive substring search across every column's cell text.
    /// An empty term clears the search.
    pub fn set_search(&mut self, term: &str) {
        let term = term.trim();
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.to_lowercase())
        };
        self.page = 0;
    }

    /// Install or replace the named filter. Filters AND together, so other
    /// active filters keep applying.
    pub fn set_filter<F>(&mut self, key: &'static str, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filters.insert(key, Box::new(predicate));
        self.page = 0;
    }

    /// Remove the named filter; unknown keys are a no-op.
    pub fn clear_filter(&mut self, key: &str) {
        self.filters.remove(key);
        self.page = 0;
    }

    /// Sort by a column key.
    pub fn sort_by(&mut self, key: &str, order: SortOrder) -> Result<()> {
        let index = self
            .columns
            .iter()
            .position(|c| c.key == key)
            .ok_or_else(|| TableError::UnknownColumn(key.to_string()))?;
        self.sort = Some((index, order));
        Ok(())
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Set the page size. Zero is rejected.
    pub fn set_per_page(&mut self, per_page: usize) -> Result<()> {
        if per_page == 0 {
            return Err(TableError::InvalidParameters(
                "per_page must be at least 1".to_string(),
            ));
        }
        self.per_page = per_page;
        self.page = 0;
        Ok(())
    }

    /// Jump to a zero-based page, clamped to the last populated page.
    pub fn set_page(&mut self, page: usize) {
        let last = self.page_count().saturating_sub(1);
        self.page = page.min(last);
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of pages over the filtered set; at least 1 even when empty.
    pub fn page_count(&self) -> usize {
        let filtered = self.filtered_indices().len();
        if filtered == 0 {
            1
        } else {
            filtered.div_ceil(self.per_page)
        }
    }

    /// Select a row by its index in the backing collection.
    pub fn select(&mut self, row_index: usize) -> Result<()> {
        if row_index >= self.rows.len() {
            return Err(TableError::InvalidParameters(format!(
                "row index {} out of range",
                row_index
            )));
        }
        self.selected.insert(row_index);
        Ok(())
    }

    pub fn deselect(&mut self, row_index: usize) {
        self.selected.remove(&row_index);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, row_index: usize) -> bool {
        self.selected.contains(&row_index)
    }

    /// Rows on the current page, after search, filters and sort.
    pub fn visible_rows(&self) -> Vec<&T> {
        let ordered = self.ordered_indices();
        ordered
            .iter()
            .skip(self.page * self.per_page)
            .take(self.per_page)
            .map(|&i| &self.rows[i])
            .collect()
    }

    /// All rows passing search and filters, sorted, across every page.
    pub fn filtered_rows(&self) -> Vec<&T> {
        self.ordered_indices().iter().map(|&i| &self.rows[i]).collect()
    }

    /// Selected rows that are also currently visible under the active
    /// search and filters.
    pub fn selected_rows(&self) -> Vec<&T> {
        self.ordered_indices()
            .iter()
            .filter(|i| self.selected.contains(i))
            .map(|&i| &self.rows[i])
            .collect()
    }

    /// Capture what the screen is showing for export: the selected rows if
    /// any are selected, otherwise every filtered row, across all pages.
    pub fn snapshot(&self) -> TableSnapshot {
        let headers = self.columns.iter().map(|c| c.header.to_string()).collect();
        let source = if self.selected.is_empty() {
            self.filtered_rows()
        } else {
            self.selected_rows()
        };
        let rows = source
            .into_iter()
            .map(|row| self.columns.iter().map(|c| (c.accessor)(row)).collect())
            .collect();
        TableSnapshot { headers, rows }
    }

    fn matches_search(&self, row: &T) -> bool {
        match &self.search {
            None => true,
            Some(term) => self
                .columns
                .iter()
                .any(|c| (c.accessor)(row).to_lowercase().contains(term)),
        }
    }

    fn filtered_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| self.matches_search(row))
            .filter(|(_, row)| self.filters.values().all(|f| f(row)))
            .map(|(i, _)| i)
            .collect()
    }

    fn ordered_indices(&self) -> Vec<usize> {
        let mut indices = self.filtered_indices();
        if let Some((column, order)) = self.sort {
            let accessor = self.columns[column].accessor;
            indices.sort_by(|&a, &b| {
                let ordering = accessor(&self.rows[a]).cmp(&accessor(&self.rows[b]));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        indices
    }
}
