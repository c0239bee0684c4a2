//! Table store: canonical rows, headers and stable row identity.
//!
//! Rows live in a position-ordered vector with a parallel vector of identifiers.
//! Identifiers are assigned on [`TableStore::replace`] and then follow their row
//! through sorts, deletions and column edits. They are never used as storage
//! indices.

pub mod restructure;
pub mod store;

use serde::{Deserialize, Serialize};

pub use store::TableStore;

/// Stable row identifier, 1-based, distinct from row position
pub type RowId = u64;

/// Header label used by merged columns
pub const MERGED_HEADER: &str = "Merged";

/// A column as seen by viewers: the identifier pseudo-column or a data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewColumn {
    /// Synthetic, non-editable identifier column
    RowId,
    /// Data column, 0-based over the header list
    Data(usize),
}

impl ViewColumn {
    /// Map a presentation column index (0 = identifier column) to a `ViewColumn`
    pub fn from_display_index(index: usize) -> Self {
        match index {
            0 => Self::RowId,
            n => Self::Data(n - 1),
        }
    }

    /// Presentation column index for this column
    pub fn display_index(self) -> usize {
        match self {
            Self::RowId => 0,
            Self::Data(n) => n + 1,
        }
    }
}

/// Kind of the most recent store mutation.
///
/// `Reset` means the whole table was replaced and observers should rebuild;
/// the other kinds allow cheaper refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Reset,
    Cells,
    Rows,
    Columns,
    Layout,
    Headers,
}

impl ChangeKind {
    /// Whether the change can alter which rows a filter accepts or their order
    pub fn affects_rows(self) -> bool {
        !matches!(self, Self::Headers)
    }
}

/// Deep copy of the table contents, without identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Synthesized header name for a 0-based column index
pub fn default_header(index: usize) -> String {
    format!("Column {}", index + 1)
}
