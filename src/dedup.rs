//! Deduplication and grouping by key columns.

use crate::error::{Result, TableError};
use crate::table::{TableSnapshot, TableStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Header of the occurrence-count column in a group summary
pub const COUNT_HEADER: &str = "Count";

/// Which duplicate survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeepPolicy {
    #[default]
    First,
    Last,
}

fn check_columns(store: &TableStore, key_columns: &[usize]) -> Result<()> {
    match key_columns.iter().find(|&&c| c >= store.column_count()) {
        Some(column) => Err(TableError::invalid(format!(
            "key column {column} is out of range"
        ))),
        None => Ok(()),
    }
}

/// Positions of the rows a dedup would remove, ascending.
///
/// Two rows are duplicates when they agree on every key column. An empty key
/// set finds nothing.
pub fn duplicate_positions(
    store: &TableStore,
    key_columns: &[usize],
    policy: KeepPolicy,
) -> Result<Vec<usize>> {
    check_columns(store, key_columns)?;
    if key_columns.is_empty() {
        return Ok(Vec::new());
    }

    let key_of = |position: usize| -> Vec<&str> {
        key_columns
            .iter()
            .map(|&column| store.get(position, column).unwrap_or_default())
            .collect()
    };

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut visit = |position: usize| {
        if !seen.insert(key_of(position)) {
            duplicates.push(position);
        }
    };
    match policy {
        KeepPolicy::First => (0..store.row_count()).for_each(&mut visit),
        KeepPolicy::Last => (0..store.row_count()).rev().for_each(&mut visit),
    }

    duplicates.sort_unstable();
    Ok(duplicates)
}

/// Number of rows [`remove_duplicates`] would remove, without touching the table
pub fn preview_duplicates(
    store: &TableStore,
    key_columns: &[usize],
    policy: KeepPolicy,
) -> Result<usize> {
    duplicate_positions(store, key_columns, policy).map(|positions| positions.len())
}

/// Remove duplicate rows, keeping the first or last of each key.
///
/// Surviving rows keep their identifiers and relative order. Returns the
/// number of rows removed.
pub fn remove_duplicates(
    store: &mut TableStore,
    key_columns: &[usize],
    policy: KeepPolicy,
) -> Result<usize> {
    if key_columns.is_empty() {
        return Err(TableError::invalid("dedup needs at least one key column"));
    }
    let positions = duplicate_positions(store, key_columns, policy)?;
    let removed = store.remove_rows(&positions);
    log::debug!("dedup removed {removed} rows");
    Ok(removed)
}

/// Count rows per distinct key over the given store positions.
///
/// The summary has one row per key in first-seen order: the key values
/// followed by the count. Headers are the key headers followed by `"Count"`.
pub fn group_positions(
    store: &TableStore,
    positions: &[usize],
    key_columns: &[usize],
) -> Result<TableSnapshot> {
    check_columns(store, key_columns)?;
    if key_columns.is_empty() {
        return Err(TableError::invalid("grouping needs at least one key column"));
    }

    let mut index: HashMap<Vec<&str>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<&str>, usize)> = Vec::new();
    for &position in positions {
        let key: Vec<&str> = key_columns
            .iter()
            .map(|&column| store.get(position, column).unwrap_or_default())
            .collect();
        match index.get(&key) {
            Some(&slot) => groups[slot].1 += 1,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, 1));
            }
        }
    }

    let mut headers: Vec<String> = key_columns
        .iter()
        .map(|&column| store.headers()[column].clone())
        .collect();
    headers.push(COUNT_HEADER.to_string());

    let rows = groups
        .into_iter()
        .map(|(key, count)| {
            let mut row: Vec<String> = key.into_iter().map(str::to_string).collect();
            row.push(count.to_string());
            row
        })
        .collect();

    Ok(TableSnapshot { headers, rows })
}

/// Group every row of the table
pub fn group_rows(store: &TableStore, key_columns: &[usize]) -> Result<TableSnapshot> {
    let positions: Vec<usize> = (0..store.row_count()).collect();
    group_positions(store, &positions, key_columns)
}
