//! Batch operations over a scope of rows and a set of chosen columns.
//!
//! Every operation validates its arguments (columns, patterns, delimiters)
//! before the first write, so a rejected batch leaves the table unchanged.

use crate::error::{Result, TableError};
use crate::table::{RowId, TableStore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Which rows an operation applies to. Positions are store positions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    EntireTable,
    SelectedRows(Vec<usize>),
    SelectedCells(Vec<(usize, usize)>),
}

impl Scope {
    /// Sorted, de-duplicated in-range row positions covered by the scope
    pub fn rows(&self, store: &TableStore) -> Vec<usize> {
        let len = store.row_count();
        match self {
            Self::EntireTable => (0..len).collect(),
            Self::SelectedRows(rows) => rows
                .iter()
                .copied()
                .filter(|&r| r < len)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Self::SelectedCells(cells) => cells
                .iter()
                .map(|&(r, _)| r)
                .filter(|&r| r < len)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }

    /// Cells the scope covers within `columns`, row-major
    pub fn targets(&self, store: &TableStore, columns: &[usize]) -> Vec<(usize, usize)> {
        match self {
            Self::SelectedCells(cells) => {
                let wanted: HashSet<usize> = columns.iter().copied().collect();
                cells
                    .iter()
                    .copied()
                    .filter(|&(r, c)| wanted.contains(&c) && store.get(r, c).is_some())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            }
            _ => self
                .rows(store)
                .into_iter()
                .flat_map(|r| columns.iter().map(move |&c| (r, c)))
                .collect(),
        }
    }

    /// Identifiers of the rows in scope, `None` for the whole table
    pub fn row_ids(&self, store: &TableStore) -> Option<HashSet<RowId>> {
        match self {
            Self::EntireTable => None,
            _ => Some(
                self.rows(store)
                    .into_iter()
                    .filter_map(|position| store.row_id(position))
                    .collect(),
            ),
        }
    }
}

/// Cleaning and conversion actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanAction {
    Trim,
    StripAll,
    Upper,
    Lower,
    ToHalfWidth,
    ToFullWidth,
    /// Drop rows in scope whose chosen columns are all blank
    RemoveEmptyRows,
    /// Drop chosen columns that are blank in every row
    RemoveEmptyColumns,
}

/// A batch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOp {
    /// Literal or regex replacement; regex replacements may use `$1` style groups
    Replace {
        find: String,
        replace: String,
        regex: bool,
    },
    Affix {
        prefix: String,
        suffix: String,
    },
    Split {
        delimiter: String,
        keep_original: bool,
    },
    /// Always applies to the whole table
    Merge {
        delimiter: String,
        keep_originals: bool,
    },
    Clean(CleanAction),
}

/// What a batch operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEffect {
    CellsChanged(usize),
    RowsRemoved(usize),
    ColumnsAdded(usize),
    ColumnsRemoved(usize),
    Merged,
}

enum Replacer {
    Literal { find: String, replace: String },
    Pattern { regex: Regex, replace: String },
}

impl Replacer {
    fn new(find: &str, replace: &str, regex: bool) -> Result<Self> {
        if !regex {
            return Ok(Self::Literal {
                find: find.to_string(),
                replace: replace.to_string(),
            });
        }
        let compiled = Regex::new(find).map_err(|err| TableError::pattern(find, err))?;
        Ok(Self::Pattern {
            regex: compiled,
            replace: replace.to_string(),
        })
    }

    fn apply(&self, value: &str) -> String {
        match self {
            // An empty needle would insert between every character.
            Self::Literal { find, .. } if find.is_empty() => value.to_string(),
            Self::Literal { find, replace } => value.replace(find.as_str(), replace),
            Self::Pattern { regex, replace } => {
                regex.replace_all(value, replace.as_str()).into_owned()
            }
        }
    }
}

/// Apply `op` to the chosen columns of the rows in `scope`.
pub fn apply(
    store: &mut TableStore,
    op: &BatchOp,
    scope: &Scope,
    columns: &[usize],
) -> Result<BatchEffect> {
    if columns.is_empty() {
        return Err(TableError::invalid("select at least one column"));
    }
    if let Some(column) = columns.iter().find(|&&c| c >= store.column_count()) {
        return Err(TableError::invalid(format!("no column {column}")));
    }

    match op {
        BatchOp::Replace {
            find,
            replace,
            regex,
        } => {
            let replacer = Replacer::new(find, replace, *regex)?;
            map_cells(store, scope, columns, |value| replacer.apply(value))
        }
        BatchOp::Affix { prefix, suffix } => {
            map_cells(store, scope, columns, |value| format!("{prefix}{value}{suffix}"))
        }
        BatchOp::Split {
            delimiter,
            keep_original,
        } => split_columns(store, columns, delimiter, *keep_original, scope),
        BatchOp::Merge {
            delimiter,
            keep_originals,
        } => {
            store.merge_columns(columns, delimiter, *keep_originals)?;
            Ok(BatchEffect::Merged)
        }
        BatchOp::Clean(action) => clean(store, *action, scope, columns),
    }
}

fn map_cells(
    store: &mut TableStore,
    scope: &Scope,
    columns: &[usize],
    transform: impl Fn(&str) -> String,
) -> Result<BatchEffect> {
    let updates: Vec<(usize, usize, String)> = scope
        .targets(store, columns)
        .into_iter()
        .filter_map(|(row, column)| {
            let current = store.get(row, column)?;
            let next = transform(current);
            (next != current).then_some((row, column, next))
        })
        .collect();
    let changed = updates.len();
    store.set_many(updates)?;
    log::debug!("batch changed {changed} cells");
    Ok(BatchEffect::CellsChanged(changed))
}

fn clean(
    store: &mut TableStore,
    action: CleanAction,
    scope: &Scope,
    columns: &[usize],
) -> Result<BatchEffect> {
    let convert: fn(&str) -> String = match action {
        CleanAction::RemoveEmptyRows => {
            let empty: Vec<usize> = scope
                .rows(store)
                .into_iter()
                .filter(|&row| {
                    columns
                        .iter()
                        .all(|&c| store.get(row, c).map_or(true, |v| v.trim().is_empty()))
                })
                .collect();
            return Ok(BatchEffect::RowsRemoved(store.remove_rows(&empty)));
        }
        CleanAction::RemoveEmptyColumns => {
            let empty: Vec<usize> = columns
                .iter()
                .copied()
                .filter(|&c| {
                    (0..store.row_count())
                        .all(|row| store.get(row, c).map_or(true, |v| v.trim().is_empty()))
                })
                .collect();
            return Ok(BatchEffect::ColumnsRemoved(store.remove_columns(&empty)));
        }
        CleanAction::Trim => |v| v.trim().to_string(),
        CleanAction::StripAll => |v| v.chars().filter(|c| !c.is_whitespace()).collect(),
        CleanAction::Upper => str::to_uppercase,
        CleanAction::Lower => str::to_lowercase,
        CleanAction::ToHalfWidth => to_half_width,
        CleanAction::ToFullWidth => to_full_width,
    };
    map_cells(store, scope, columns, convert)
}

/// Split each chosen column in ascending order. Only rows in scope are split.
fn split_columns(
    store: &mut TableStore,
    columns: &[usize],
    delimiter: &str,
    keep_original: bool,
    scope: &Scope,
) -> Result<BatchEffect> {
    if delimiter.is_empty() {
        return Err(TableError::invalid("split delimiter is empty"));
    }
    let scope_ids = scope.row_ids(store);
    let ordered: BTreeSet<usize> = columns.iter().copied().collect();

    let mut offset = 0;
    for column in ordered {
        offset += store.split_column(
            column + offset,
            delimiter,
            keep_original,
            scope_ids.as_ref(),
        )?;
    }
    Ok(BatchEffect::ColumnsAdded(offset))
}

/// Full-width forms to ASCII; the ideographic space becomes a plain space.
pub fn to_half_width(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0x3000 => ' ',
            code @ 0xFF01..=0xFF5E => char::from_u32(code - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Printable ASCII to full-width forms; space becomes the ideographic space.
pub fn to_full_width(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0x20 => '\u{3000}',
            code @ 0x21..=0x7E => char::from_u32(code + 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Keep, reorder and rename columns in one step.
///
/// `order` lists the current indices of the surviving columns in their new
/// order; columns not listed are deleted. `names` gives the final header for
/// each surviving column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPlan {
    pub order: Vec<usize>,
    pub names: Vec<String>,
}

impl ColumnPlan {
    /// Plan that keeps the current layout
    pub fn identity(store: &TableStore) -> Self {
        Self {
            order: (0..store.column_count()).collect(),
            names: store.headers().to_vec(),
        }
    }

    pub fn apply(&self, store: &mut TableStore) -> Result<()> {
        if self.order.len() != self.names.len() {
            return Err(TableError::invalid(format!(
                "{} names for {} columns",
                self.names.len(),
                self.order.len()
            )));
        }
        let mut seen = HashSet::new();
        for &index in &self.order {
            if index >= store.column_count() || !seen.insert(index) {
                return Err(TableError::invalid(format!(
                    "column plan entry {index} is out of range or repeated"
                )));
            }
        }

        let rows = store
            .rows()
            .iter()
            .map(|row| self.order.iter().map(|&i| row[i].clone()).collect())
            .collect();
        store.commit_columns(self.names.clone(), rows);
        log::debug!("column plan applied: {:?}", self.order);
        Ok(())
    }
}
