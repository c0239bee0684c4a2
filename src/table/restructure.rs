//! Column split and merge.
//!
//! Both operations build the complete replacement grid before touching the
//! store, so a rejected call leaves the table exactly as it was.

use crate::error::{Result, TableError};
use crate::table::{RowId, TableStore, MERGED_HEADER};
use std::collections::HashSet;

impl TableStore {
    /// Split one column on a literal delimiter.
    ///
    /// Only rows in `scope` (all rows when `None`) are split; the widest in-scope
    /// split decides how many columns are produced. Rows outside the scope keep
    /// their original value and get empty text in the new slots.
    ///
    /// With `keep_original` the parts are inserted right after the untouched
    /// source column. Otherwise part 1 replaces the source column in place and
    /// the remaining parts follow it. New headers read `"<original> part N"`.
    ///
    /// Returns the number of columns added; `0` means nothing needed splitting.
    pub fn split_column(
        &mut self,
        column: usize,
        delimiter: &str,
        keep_original: bool,
        scope: Option<&HashSet<RowId>>,
    ) -> Result<usize> {
        if column >= self.column_count() {
            return Err(TableError::invalid(format!("no column {column} to split")));
        }
        if delimiter.is_empty() {
            return Err(TableError::invalid("split delimiter is empty"));
        }

        let parts_per_row: Vec<Option<Vec<&str>>> = self
            .rows()
            .iter()
            .zip(self.row_ids())
            .map(|(row, id)| {
                let in_scope = scope.map_or(true, |ids| ids.contains(id));
                in_scope.then(|| row[column].split(delimiter).collect())
            })
            .collect();
        let max_parts = parts_per_row
            .iter()
            .flatten()
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        if max_parts <= 1 {
            return Ok(0);
        }

        let source_header = &self.headers()[column];
        let part_headers: Vec<String> = (1..=max_parts)
            .map(|n| format!("{source_header} part {n}"))
            .collect();

        let mut headers = self.headers().to_vec();
        let mut rows = Vec::with_capacity(self.row_count());
        let added = if keep_original {
            headers.splice(column + 1..column + 1, part_headers);
            for (row, parts) in self.rows().iter().zip(&parts_per_row) {
                let mut new_row = row.clone();
                new_row.splice(column + 1..column + 1, padded(parts.as_deref(), max_parts));
                rows.push(new_row);
            }
            max_parts
        } else {
            headers.splice(column..column + 1, part_headers);
            for (row, parts) in self.rows().iter().zip(&parts_per_row) {
                let mut new_row = row.clone();
                let mut values = padded(parts.as_deref(), max_parts);
                if parts.is_some() {
                    new_row[column] = std::mem::take(&mut values[0]);
                }
                new_row.splice(column + 1..column + 1, values.into_iter().skip(1));
                rows.push(new_row);
            }
            max_parts - 1
        };

        log::debug!("split column {column} into {max_parts} parts");
        self.commit_columns(headers, rows);
        Ok(added)
    }

    /// Merge two or more columns into one, joined by `delimiter`.
    ///
    /// Columns are taken in ascending index order regardless of how they were
    /// given. With `keep_originals` the merged column is inserted after the last
    /// merged column; otherwise it replaces the first one and the others are
    /// removed. Every row is merged.
    pub fn merge_columns(
        &mut self,
        columns: &[usize],
        delimiter: &str,
        keep_originals: bool,
    ) -> Result<()> {
        let mut columns = columns.to_vec();
        columns.sort_unstable();
        columns.dedup();
        if columns.len() < 2 {
            return Err(TableError::invalid("merge needs at least two columns"));
        }
        if let Some(&last) = columns.last() {
            if last >= self.column_count() {
                return Err(TableError::invalid(format!("no column {last} to merge")));
            }
        }

        let merged: Vec<String> = self
            .rows()
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|&i| row[i].as_str())
                    .collect::<Vec<_>>()
                    .join(delimiter)
            })
            .collect();

        let first = columns[0];
        let insert_at = columns[columns.len() - 1] + 1;
        let mut headers = self.headers().to_vec();
        let mut rows: Vec<Vec<String>> = self.rows().to_vec();

        if keep_originals {
            headers.insert(insert_at, MERGED_HEADER.to_string());
            for (row, value) in rows.iter_mut().zip(merged) {
                row.insert(insert_at, value);
            }
        } else {
            headers[first] = MERGED_HEADER.to_string();
            for &index in columns[1..].iter().rev() {
                headers.remove(index);
            }
            for (row, value) in rows.iter_mut().zip(merged) {
                row[first] = value;
                for &index in columns[1..].iter().rev() {
                    row.remove(index);
                }
            }
        }

        log::debug!("merged columns {columns:?}");
        self.commit_columns(headers, rows);
        Ok(())
    }
}

fn padded(parts: Option<&[&str]>, width: usize) -> Vec<String> {
    let mut values: Vec<String> = parts
        .unwrap_or_default()
        .iter()
        .map(|part| part.to_string())
        .collect();
    values.resize(width, String::new());
    values
}
