//! The owned table store.

use crate::error::{Result, TableError};
use crate::table::{default_header, ChangeKind, RowId, TableSnapshot, ViewColumn};

/// Canonical table contents.
///
/// Invariants held after every public call:
/// - every row has exactly `headers.len()` cells
/// - `row_ids.len() == rows.len()`
///
/// Mutations either complete or leave the store untouched.
#[derive(Debug, Clone)]
pub struct TableStore {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    row_ids: Vec<RowId>,
    next_id: RowId,
    loaded: bool,
    generation: u64,
    last_change: ChangeKind,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore {
    /// Create a store with no table loaded
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
            row_ids: Vec::new(),
            next_id: 1,
            loaded: false,
            generation: 0,
            last_change: ChangeKind::Reset,
        }
    }

    /// Build a loaded store from rows and optional headers
    pub fn from_rows(rows: Vec<Vec<String>>, headers: Option<Vec<String>>) -> Self {
        let mut store = Self::new();
        store.replace(rows, headers);
        store
    }

    /// Replace the whole table.
    ///
    /// Rows are padded to the widest of the rows and the supplied headers; missing
    /// headers become `"Column N"`. Identifiers restart at 1.
    pub fn replace(&mut self, mut rows: Vec<Vec<String>>, headers: Option<Vec<String>>) {
        let mut headers = headers.unwrap_or_default();
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());

        for row in rows.iter_mut() {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        for index in headers.len()..width {
            headers.push(default_header(index));
        }

        self.row_ids = (1..=rows.len() as RowId).collect();
        self.next_id = rows.len() as RowId + 1;
        self.rows = rows;
        self.headers = headers;
        self.loaded = true;
        log::debug!(
            "table replaced: {} rows x {} columns",
            self.rows.len(),
            self.headers.len()
        );
        self.touch(ChangeKind::Reset);
    }

    /// Drop the table entirely, back to "nothing loaded"
    pub fn clear(&mut self) {
        self.headers.clear();
        self.rows.clear();
        self.row_ids.clear();
        self.next_id = 1;
        self.loaded = false;
        self.touch(ChangeKind::Reset);
    }

    /// Whether a table (possibly empty) has been loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&[String]> {
        self.rows.get(position).map(Vec::as_slice)
    }

    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn row_id(&self, position: usize) -> Option<RowId> {
        self.row_ids.get(position).copied()
    }

    /// Current position of a row identifier, if the row still exists
    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.row_ids.iter().position(|&candidate| candidate == id)
    }

    /// Monotonic counter bumped by every mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_change(&self) -> ChangeKind {
        self.last_change
    }

    /// Deep copy of headers and rows
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            headers: self.headers.clone(),
            rows: self.rows.clone(),
        }
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    /// Value of a presentation column, identifier included
    pub fn display_value(&self, row: usize, column: ViewColumn) -> Option<String> {
        match column {
            ViewColumn::RowId => self.row_id(row).map(|id| id.to_string()),
            ViewColumn::Data(index) => self.get(row, index).map(str::to_string),
        }
    }

    /// Overwrite one cell. Out-of-range coordinates are rejected without change.
    pub fn set(&mut self, row: usize, column: usize, value: impl Into<String>) -> Result<()> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or(TableError::OutOfBounds { row, column })?;
        *cell = value.into();
        self.touch(ChangeKind::Cells);
        Ok(())
    }

    /// Apply several cell writes as one change. All coordinates are checked first.
    pub fn set_many(&mut self, updates: Vec<(usize, usize, String)>) -> Result<()> {
        if let Some(&(row, column, _)) = updates
            .iter()
            .find(|(row, column, _)| self.get(*row, *column).is_none())
        {
            return Err(TableError::OutOfBounds { row, column });
        }
        if updates.is_empty() {
            return Ok(());
        }
        for (row, column, value) in updates {
            self.rows[row][column] = value;
        }
        self.touch(ChangeKind::Cells);
        Ok(())
    }

    /// Remove rows by position, in any order. Duplicates and out-of-range
    /// positions are ignored. Returns the number of rows removed.
    pub fn remove_rows(&mut self, positions: &[usize]) -> usize {
        let targets = descending_unique(positions, self.rows.len());
        for &position in &targets {
            self.rows.remove(position);
            self.row_ids.remove(position);
        }
        if !targets.is_empty() {
            self.touch(ChangeKind::Rows);
        }
        targets.len()
    }

    /// Remove columns by index, in any order. Returns the number removed.
    pub fn remove_columns(&mut self, indices: &[usize]) -> usize {
        let targets = descending_unique(indices, self.headers.len());
        for &index in &targets {
            self.headers.remove(index);
            for row in self.rows.iter_mut() {
                row.remove(index);
            }
        }
        if !targets.is_empty() {
            self.touch(ChangeKind::Columns);
        }
        targets.len()
    }

    /// Reorder columns. `permutation[i]` is the current index of the column that
    /// ends up at position `i`; it must cover every column exactly once.
    pub fn reorder_columns(&mut self, permutation: &[usize]) -> Result<()> {
        if !is_permutation(permutation, self.headers.len()) {
            return Err(TableError::invalid(format!(
                "column order {:?} is not a permutation of {} columns",
                permutation,
                self.headers.len()
            )));
        }
        self.headers = permutation.iter().map(|&i| self.headers[i].clone()).collect();
        for row in self.rows.iter_mut() {
            *row = permutation.iter().map(|&i| std::mem::take(&mut row[i])).collect();
        }
        self.touch(ChangeKind::Columns);
        Ok(())
    }

    /// Insert new columns contiguously at `at` (clamped to the column count).
    ///
    /// `column_values` is column-major: one vector per new column, each exactly
    /// `row_count()` long.
    pub fn insert_columns(
        &mut self,
        at: usize,
        headers: Vec<String>,
        column_values: Vec<Vec<String>>,
    ) -> Result<()> {
        if headers.len() != column_values.len() {
            return Err(TableError::invalid(format!(
                "{} headers supplied for {} columns",
                headers.len(),
                column_values.len()
            )));
        }
        if let Some(bad) = column_values
            .iter()
            .find(|values| values.len() != self.rows.len())
        {
            return Err(TableError::invalid(format!(
                "new column has {} values, table has {} rows",
                bad.len(),
                self.rows.len()
            )));
        }
        if headers.is_empty() {
            return Ok(());
        }

        let at = at.min(self.headers.len());
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            let inserted = column_values.iter().map(|column| column[row_index].clone());
            row.splice(at..at, inserted);
        }
        self.headers.splice(at..at, headers);
        self.touch(ChangeKind::Columns);
        Ok(())
    }

    pub fn rename_column(&mut self, column: usize, name: impl Into<String>) -> Result<()> {
        let header = self.headers.get_mut(column).ok_or_else(|| {
            TableError::invalid(format!("no column {column} to rename"))
        })?;
        *header = name.into();
        self.touch(ChangeKind::Headers);
        Ok(())
    }

    /// Replace all header names. The count must match the column count.
    pub fn set_headers(&mut self, headers: Vec<String>) -> Result<()> {
        if headers.len() != self.headers.len() {
            return Err(TableError::invalid(format!(
                "{} header names for {} columns",
                headers.len(),
                self.headers.len()
            )));
        }
        self.headers = headers;
        self.touch(ChangeKind::Headers);
        Ok(())
    }

    /// Stable sort of the stored rows.
    ///
    /// The identifier column sorts numerically, data columns by plain text
    /// comparison. Equal keys keep their previous relative order in both
    /// directions.
    pub fn sort(&mut self, column: ViewColumn, ascending: bool) -> Result<()> {
        if let ViewColumn::Data(index) = column {
            if index >= self.headers.len() {
                return Err(TableError::invalid(format!("no column {index} to sort by")));
            }
        }
        if self.rows.is_empty() {
            return Ok(());
        }

        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| {
            let ordering = match column {
                ViewColumn::RowId => self.row_ids[a].cmp(&self.row_ids[b]),
                ViewColumn::Data(index) => self.rows[a][index].cmp(&self.rows[b][index]),
            };
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        self.row_ids = order.iter().map(|&i| self.row_ids[i]).collect();
        let mut rows = std::mem::take(&mut self.rows);
        self.rows = order.iter().map(|&i| std::mem::take(&mut rows[i])).collect();
        self.touch(ChangeKind::Layout);
        Ok(())
    }

    /// Swap in restructured contents while keeping identifiers in place.
    ///
    /// Callers build the full replacement first so a failed restructure never
    /// leaves a half-edited table behind.
    pub(crate) fn commit_columns(&mut self, headers: Vec<String>, rows: Vec<Vec<String>>) {
        debug_assert_eq!(rows.len(), self.row_ids.len());
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        self.headers = headers;
        self.rows = rows;
        self.touch(ChangeKind::Columns);
    }

    fn touch(&mut self, kind: ChangeKind) {
        self.generation += 1;
        self.last_change = kind;
    }
}

fn descending_unique(indices: &[usize], len: usize) -> Vec<usize> {
    let mut targets: Vec<usize> = indices.iter().copied().filter(|&i| i < len).collect();
    targets.sort_unstable_by(|a, b| b.cmp(a));
    targets.dedup();
    targets
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn sample() -> TableStore {
        TableStore::from_rows(rows(&[&["b", "2"], &["a", "10"], &["c", "1"]]), None)
    }

    #[test]
    fn test_replace_rectangularizes_and_names_headers() {
        let store = TableStore::from_rows(rows(&[&["a"], &["b", "c", "d"]]), None);
        assert_eq!(store.headers(), &["Column 1", "Column 2", "Column 3"]);
        assert_eq!(store.rows()[0], vec!["a", "", ""]);
        assert_eq!(store.row_ids(), &[1, 2]);
    }

    #[test]
    fn test_replace_pads_short_header_list() {
        let store = TableStore::from_rows(rows(&[&["1", "2", "3"]]), Some(vec!["id".into()]));
        assert_eq!(store.headers(), &["id", "Column 2", "Column 3"]);
    }

    #[test]
    fn test_replace_resets_identifiers() {
        let mut store = sample();
        store.remove_rows(&[0]);
        assert_eq!(store.row_ids(), &[2, 3]);
        store.replace(rows(&[&["x"], &["y"]]), None);
        assert_eq!(store.row_ids(), &[1, 2]);
    }

    #[test]
    fn test_empty_table_is_loaded_but_empty() {
        let mut store = TableStore::new();
        assert!(!store.is_loaded());
        store.replace(Vec::new(), None);
        assert!(store.is_loaded());
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.column_count(), 0);
    }

    #[test]
    fn test_set_out_of_range_is_rejected() {
        let mut store = sample();
        let before = store.generation();
        let err = store.set(9, 0, "x").unwrap_err();
        assert!(matches!(err, TableError::OutOfBounds { row: 9, column: 0 }));
        assert_eq!(store.generation(), before);

        store.set(0, 1, "20").unwrap();
        assert_eq!(store.get(0, 1), Some("20"));
    }

    #[test]
    fn test_set_many_is_all_or_nothing() {
        let mut store = sample();
        let result = store.set_many(vec![(0, 0, "z".into()), (5, 0, "nope".into())]);
        assert!(result.is_err());
        assert_eq!(store.get(0, 0), Some("b"));
    }

    #[test]
    fn test_remove_rows_any_order() {
        for order in [[0usize, 2], [2, 0]] {
            let mut store = sample();
            assert_eq!(store.remove_rows(&order), 2);
            assert_eq!(store.rows(), &rows(&[&["a", "10"]])[..]);
            assert_eq!(store.row_ids(), &[2]);
        }
    }

    #[test]
    fn test_remove_rows_ignores_duplicates_and_out_of_range() {
        let mut store = sample();
        assert_eq!(store.remove_rows(&[1, 1, 7]), 1);
        assert_eq!(store.row_count(), 2);
    }

    #[test]
    fn test_remove_columns_any_order() {
        let mut store = TableStore::from_rows(rows(&[&["a", "b", "c"]]), None);
        store.remove_columns(&[0, 2]);
        assert_eq!(store.headers(), &["Column 2"]);
        assert_eq!(store.rows()[0], vec!["b"]);
    }

    #[test]
    fn test_reorder_columns_requires_permutation() {
        let mut store = TableStore::from_rows(rows(&[&["a", "b", "c"]]), None);
        assert!(store.reorder_columns(&[0, 1]).is_err());
        assert!(store.reorder_columns(&[0, 0, 1]).is_err());
        assert!(store.reorder_columns(&[0, 1, 3]).is_err());
        assert_eq!(store.rows()[0], vec!["a", "b", "c"]);

        store.reorder_columns(&[2, 0, 1]).unwrap();
        assert_eq!(store.rows()[0], vec!["c", "a", "b"]);
        assert_eq!(store.headers(), &["Column 3", "Column 1", "Column 2"]);
    }

    #[test]
    fn test_insert_columns_clamps_index() {
        let mut store = sample();
        store
            .insert_columns(99, vec!["new".into()], vec![vec!["x".into(); 3]])
            .unwrap();
        assert_eq!(store.headers().last().map(String::as_str), Some("new"));

        store
            .insert_columns(0, vec!["first".into()], vec![vec!["f".into(); 3]])
            .unwrap();
        assert_eq!(store.rows()[1], vec!["f", "a", "10", "x"]);
    }

    #[test]
    fn test_insert_columns_rejects_wrong_length() {
        let mut store = sample();
        let result = store.insert_columns(0, vec!["new".into()], vec![vec!["x".into()]]);
        assert!(result.is_err());
        assert_eq!(store.column_count(), 2);
    }

    #[test]
    fn test_sort_data_column_is_lexicographic_and_keeps_ids() {
        let mut store = sample();
        store.sort(ViewColumn::Data(1), true).unwrap();
        let values: Vec<&str> = store.rows().iter().map(|r| r[1].as_str()).collect();
        assert_eq!(values, vec!["1", "10", "2"]);
        assert_eq!(store.row_ids(), &[3, 2, 1]);

        store.sort(ViewColumn::RowId, true).unwrap();
        assert_eq!(store.row_ids(), &[1, 2, 3]);
        assert_eq!(store.get(0, 0), Some("b"));
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let mut store = TableStore::from_rows(
            rows(&[&["k", "first"], &["a", "x"], &["k", "second"]]),
            None,
        );
        store.sort(ViewColumn::Data(0), false).unwrap();
        let order: Vec<&str> = store.rows().iter().map(|r| r[1].as_str()).collect();
        assert_eq!(order, vec!["first", "second", "x"]);
    }

    #[test]
    fn test_header_edits() {
        let mut store = sample();
        store.rename_column(1, "score").unwrap();
        assert_eq!(store.headers()[1], "score");
        assert_eq!(store.last_change(), ChangeKind::Headers);
        assert!(store.rename_column(5, "x").is_err());
        assert!(store.set_headers(vec!["only one".into()]).is_err());
        store
            .set_headers(vec!["name".into(), "value".into()])
            .unwrap();
        assert_eq!(store.headers(), &["name", "value"]);
    }

    #[test]
    fn test_display_value_includes_identifier_column() {
        let store = sample();
        assert_eq!(store.display_value(2, ViewColumn::RowId), Some("3".into()));
        assert_eq!(
            store.display_value(2, ViewColumn::from_display_index(1)),
            Some("c".into())
        );
    }
}
