//! Delimited text parsing.
//!
//! Turns pasted or loaded text into a rectangular grid of strings. Blank lines are
//! dropped, fields are trimmed, and short rows are right-padded with empty text so
//! every row has the width of the widest line.

use std::sync::atomic::{AtomicBool, Ordering};

/// Delimiter used when nothing else is configured
pub const DEFAULT_DELIMITER: &str = "----";

/// Progress report emitted by [`parse_with_progress`] after each chunk of lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProgress {
    pub processed_lines: usize,
    pub total_lines: usize,
}

/// Result of a cancellable parse.
///
/// `Cancelled` is not an error and never carries partial rows; it is distinct from
/// `Completed` with zero rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Completed(Vec<Vec<String>>),
    Cancelled,
}

impl ParseOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn into_rows(self) -> Option<Vec<Vec<String>>> {
        match self {
            Self::Completed(rows) => Some(rows),
            Self::Cancelled => None,
        }
    }
}

/// Parse delimited text into a rectangular grid.
///
/// All-blank input yields zero rows rather than a single empty row.
pub fn parse(text: &str, delimiter: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut max_cols = 0;
    for line in split_lines(text) {
        if let Some(fields) = split_line(line, delimiter) {
            max_cols = max_cols.max(fields.len());
            rows.push(fields);
        }
    }
    pad_rows(&mut rows, max_cols);
    rows
}

/// Parse with progress reporting and cooperative cancellation.
///
/// The cancel flag is checked before every chunk of `chunk_lines` lines. When it is
/// set, everything parsed so far is dropped and [`ParseOutcome::Cancelled`] is
/// returned.
pub fn parse_with_progress(
    text: &str,
    delimiter: &str,
    chunk_lines: usize,
    cancel: &AtomicBool,
    mut on_progress: impl FnMut(ParseProgress),
) -> ParseOutcome {
    let chunk_lines = chunk_lines.max(1);
    let lines: Vec<&str> = split_lines(text).collect();
    let total_lines = lines.len();

    let mut rows = Vec::new();
    let mut max_cols = 0;
    for (chunk_index, chunk) in lines.chunks(chunk_lines).enumerate() {
        if cancel.load(Ordering::Relaxed) {
            log::info!(
                "parse cancelled after {} of {} lines",
                chunk_index * chunk_lines,
                total_lines
            );
            return ParseOutcome::Cancelled;
        }

        for line in chunk {
            if let Some(fields) = split_line(line, delimiter) {
                max_cols = max_cols.max(fields.len());
                rows.push(fields);
            }
        }

        on_progress(ParseProgress {
            processed_lines: (chunk_index * chunk_lines + chunk.len()).min(total_lines),
            total_lines,
        });
    }

    if cancel.load(Ordering::Relaxed) {
        return ParseOutcome::Cancelled;
    }

    pad_rows(&mut rows, max_cols);
    ParseOutcome::Completed(rows)
}

/// Join rows back into delimited text, one row per line, no trailing newline.
pub fn rows_to_text(rows: &[Vec<String>], delimiter: &str) -> String {
    rows.iter()
        .map(|row| row.join(delimiter))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of lines the parser will look at, used to pick the progress path
pub fn line_count(text: &str) -> usize {
    split_lines(text).count()
}

// CRLF counts as one line break; a lone '\r' still ends a line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
}

fn split_line(line: &str, delimiter: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if delimiter.is_empty() {
        return Some(vec![line.to_string()]);
    }
    Some(
        line.split(delimiter)
            .map(|field| field.trim().to_string())
            .collect(),
    )
}

fn pad_rows(rows: &mut [Vec<String>], width: usize) {
    for row in rows.iter_mut() {
        if row.len() < width {
            row.resize(width, String::new());
        }
    }
}
