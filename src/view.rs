pub mod filter;
pub mod sort;

pub use filter::{FilterRule, FilterTemplate, MatchMode, RowFilter};
pub use sort::compare_cells;

use crate::table::{RowId, TableStore, ViewColumn};
use std::cmp::Ordering;

/// Sort column and direction for a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: ViewColumn,
    pub ascending: bool,
}

/// Filtered and sorted projection over a [`TableStore`].
///
/// The view never copies cell data. It keeps the visible rows as
/// `(identifier, position)` pairs and rebuilds them on [`TableView::refresh`]
/// whenever its own inputs changed or the store generation moved. Readers call
/// `refresh` first; the plain accessors return whatever the last refresh
/// produced.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    global_filter: String,
    rules: Vec<FilterRule>,
    sort: Option<SortSpec>,
    dirty: bool,
    synced_generation: Option<u64>,
    ids: Vec<RowId>,
    positions: Vec<usize>,
}

impl TableView {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    /// Set the global filter text. Surrounding whitespace is dropped.
    pub fn set_global_filter(&mut self, text: &str) {
        let text = text.trim();
        if text != self.global_filter {
            self.global_filter = text.to_string();
            self.dirty = true;
        }
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: Vec<FilterRule>) {
        self.rules = rules;
        self.dirty = true;
    }

    pub fn add_rule(&mut self, rule: FilterRule) {
        self.rules.push(rule);
        self.dirty = true;
    }

    /// Drop the global filter text and all rules
    pub fn clear_filters(&mut self) {
        self.global_filter.clear();
        self.rules.clear();
        self.dirty = true;
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn set_sort(&mut self, column: ViewColumn, ascending: bool) {
        self.sort = Some(SortSpec { column, ascending });
        self.dirty = true;
    }

    /// Back to source order
    pub fn clear_sort(&mut self) {
        self.sort = None;
        self.dirty = true;
    }

    /// Whether the next [`refresh`](Self::refresh) will rebuild
    pub fn is_stale(&self, store: &TableStore) -> bool {
        self.dirty || self.synced_generation != Some(store.generation())
    }

    /// Bring the visible rows up to date with `store`. Returns true when they
    /// were rebuilt.
    pub fn refresh(&mut self, store: &TableStore) -> bool {
        if !self.is_stale(store) {
            return false;
        }

        // A header rename alone cannot change which rows pass or their order.
        let header_only = !self.dirty
            && self.synced_generation.map(|g| g + 1) == Some(store.generation())
            && !store.last_change().affects_rows();
        if !header_only {
            self.rebuild(store);
        }
        self.synced_generation = Some(store.generation());
        self.dirty = false;
        !header_only
    }

    fn rebuild(&mut self, store: &TableStore) {
        let filter = RowFilter::new(&self.global_filter, &self.rules);
        let mut visible: Vec<usize> = if store.column_count() == 0 {
            Vec::new()
        } else if filter.is_pass_through() {
            (0..store.row_count()).collect()
        } else {
            store
                .rows()
                .iter()
                .enumerate()
                .filter(|(_, row)| filter.accepts(row))
                .map(|(position, _)| position)
                .collect()
        };

        if let Some(spec) = self.sort {
            self.sort_positions(store, &mut visible, spec);
        }

        self.ids = visible
            .iter()
            .filter_map(|&position| store.row_id(position))
            .collect();
        self.positions = visible;
        log::debug!(
            "view rebuilt: {} of {} rows visible",
            self.positions.len(),
            store.row_count()
        );
    }

    fn sort_positions(&self, store: &TableStore, positions: &mut [usize], spec: SortSpec) {
        let compare = |a: &usize, b: &usize| -> Ordering {
            match spec.column {
                ViewColumn::RowId => store.row_id(*a).cmp(&store.row_id(*b)),
                ViewColumn::Data(column) => compare_cells(
                    store.get(*a, column).unwrap_or_default(),
                    store.get(*b, column).unwrap_or_default(),
                ),
            }
        };

        if let ViewColumn::Data(column) = spec.column {
            if column >= store.column_count() {
                log::debug!("sort column {column} no longer exists, keeping source order");
                return;
            }
        }

        positions.sort_by(|a, b| {
            let ordering = compare(a, b);
            if spec.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }

    /// Refresh, then return the visible identifiers in view order
    pub fn visible_ids(&mut self, store: &TableStore) -> &[RowId] {
        self.refresh(store);
        &self.ids
    }

    /// Refresh, then return the visible store positions in view order
    pub fn visible_positions(&mut self, store: &TableStore) -> &[usize] {
        self.refresh(store);
        &self.positions
    }

    /// Identifiers as of the last refresh
    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Store positions as of the last refresh
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Store position behind a view row
    pub fn source_position(&self, view_row: usize) -> Option<usize> {
        self.positions.get(view_row).copied()
    }

    /// Refresh, then materialize the visible rows restricted to `columns`, in
    /// the order given. Out-of-range columns yield empty text.
    pub fn visible_rows(&mut self, store: &TableStore, columns: &[usize]) -> Vec<Vec<String>> {
        self.refresh(store);
        self.positions
            .iter()
            .filter_map(|&position| store.row(position))
            .map(|row| {
                columns
                    .iter()
                    .map(|&column| row.get(column).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(data: &[&[&str]]) -> TableStore {
        let rows = data
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        TableStore::from_rows(rows, None)
    }

    #[test]
    fn test_unfiltered_view_shows_source_order() {
        let table = store(&[&["a"], &["b"], &["c"]]);
        let mut view = TableView::new();
        assert_eq!(view.visible_ids(&table), &[1, 2, 3]);
        assert_eq!(view.source_position(2), Some(2));
        assert_eq!(view.source_position(3), None);
    }

    #[test]
    fn test_sort_uses_numeric_prefix_order() {
        let table = store(&[&["10"], &["2"], &["abc"], &["1a"]]);
        let mut view = TableView::new();
        view.set_sort(ViewColumn::Data(0), true);
        let rows = view.visible_rows(&table, &[0]);
        let values: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(values, vec!["2", "10", "1a", "abc"]);

        view.set_sort(ViewColumn::Data(0), false);
        assert_eq!(view.visible_ids(&table), &[3, 4, 1, 2]);
    }

    #[test]
    fn test_descending_sort_keeps_ties_stable() {
        let table = store(&[&["1", "first"], &["2", "x"], &["1", "second"]]);
        let mut view = TableView::new();
        view.set_sort(ViewColumn::Data(0), false);
        assert_eq!(view.visible_ids(&table), &[2, 1, 3]);
    }

    #[test]
    fn test_identifier_sort_is_numeric() {
        let mut table = store(&[&["a"], &["b"], &["c"]]);
        table.sort(ViewColumn::Data(0), false).unwrap();
        let mut view = TableView::new();
        view.set_sort(ViewColumn::RowId, true);
        assert_eq!(view.visible_ids(&table), &[1, 2, 3]);
        assert_eq!(view.visible_positions(&table), &[2, 1, 0]);
    }

    #[test]
    fn test_filter_then_sort() {
        let table = store(&[&["apple", "3"], &["banana", "1"], &["avocado", "2"]]);
        let mut view = TableView::new();
        view.add_rule(FilterRule::column(0, MatchMode::StartsWith, "A"));
        view.set_sort(ViewColumn::Data(1), true);
        assert_eq!(view.visible_ids(&table), &[3, 1]);

        view.clear_filters();
        view.clear_sort();
        assert_eq!(view.visible_ids(&table), &[1, 2, 3]);
    }

    #[test]
    fn test_refresh_follows_store_generation() {
        let mut table = store(&[&["keep"], &["drop"]]);
        let mut view = TableView::new();
        view.set_global_filter("keep");
        assert_eq!(view.visible_ids(&table), &[1]);
        assert!(!view.refresh(&table));

        table.set(1, 0, "keep too").unwrap();
        assert!(view.is_stale(&table));
        assert_eq!(view.visible_ids(&table), &[1, 2]);
    }

    #[test]
    fn test_header_rename_skips_rebuild() {
        let mut table = store(&[&["a"]]);
        let mut view = TableView::new();
        view.refresh(&table);
        table.rename_column(0, "name").unwrap();
        assert!(view.is_stale(&table));
        assert!(!view.refresh(&table));
        assert!(!view.is_stale(&table));
    }

    #[test]
    fn test_zero_column_table_shows_nothing() {
        let table = TableStore::from_rows(vec![Vec::new(), Vec::new()], None);
        let mut view = TableView::new();
        assert!(view.visible_ids(&table).is_empty());
    }

    #[test]
    fn test_stale_sort_column_keeps_source_order() {
        let mut table = store(&[&["b", "x"], &["a", "y"]]);
        let mut view = TableView::new();
        view.set_sort(ViewColumn::Data(1), false);
        assert_eq!(view.visible_ids(&table), &[2, 1]);
        table.remove_columns(&[1]);
        assert_eq!(view.visible_ids(&table), &[1, 2]);
    }

    #[test]
    fn test_visible_rows_projects_columns_in_order() {
        let table = store(&[&["1", "a", "x"], &["2", "b", "y"]]);
        let mut view = TableView::new();
        assert_eq!(
            view.visible_rows(&table, &[2, 0]),
            vec![vec!["x", "1"], vec!["y", "2"]]
        );
    }
}
