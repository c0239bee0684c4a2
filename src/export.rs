//! Export selection and the encoder seam.
//!
//! The engine decides which rows and columns go out and in what order; turning
//! them into bytes is the job of an [`ExportEncoder`].

use crate::error::{Result, TableError};
use crate::parser::DEFAULT_DELIMITER;
use crate::table::TableStore;
use crate::view::TableView;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "XLSX")]
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

/// Named export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTemplate {
    pub name: String,
    #[serde(rename = "type", default)]
    pub format: ExportFormat,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Data columns in output order
    #[serde(default)]
    pub columns: Vec<usize>,
    #[serde(default)]
    pub only_selected_rows: bool,
    #[serde(default)]
    pub only_selected_columns: bool,
}

/// Ordered headers and rows ready for an encoder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Writes [`ExportData`] in one file format
pub trait ExportEncoder {
    fn format(&self) -> ExportFormat;
    fn encode(&self, data: &ExportData, out: &mut dyn Write) -> Result<()>;
}

/// Delimited text: one row per line, no header line
#[derive(Debug, Clone)]
pub struct TextEncoder {
    pub delimiter: String,
}

impl TextEncoder {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }
}

impl ExportEncoder for TextEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Txt
    }

    fn encode(&self, data: &ExportData, out: &mut dyn Write) -> Result<()> {
        for row in &data.rows {
            writeln!(out, "{}", row.join(&self.delimiter))?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Collect visible rows for export.
///
/// `columns` are data column indices in output order and must not be empty.
/// `view_rows`, when given, restricts output to those view rows in the order
/// given; otherwise every visible row is exported in view order.
pub fn collect(
    store: &TableStore,
    view: &mut TableView,
    columns: &[usize],
    view_rows: Option<&[usize]>,
) -> Result<ExportData> {
    if columns.is_empty() {
        return Err(TableError::invalid("select at least one column to export"));
    }
    if let Some(column) = columns.iter().find(|&&c| c >= store.column_count()) {
        return Err(TableError::invalid(format!("no column {column} to export")));
    }
    view.refresh(store);

    let positions: Vec<usize> = match view_rows {
        Some(rows) => {
            if rows.is_empty() {
                return Err(TableError::invalid("no rows selected for export"));
            }
            rows.iter()
                .map(|&row| {
                    view.source_position(row).ok_or_else(|| {
                        TableError::invalid(format!("view row {row} is not visible"))
                    })
                })
                .collect::<Result<_>>()?
        }
        None => view.positions().to_vec(),
    };

    let headers = columns
        .iter()
        .map(|&c| store.headers()[c].clone())
        .collect();
    let rows = positions
        .iter()
        .filter_map(|&position| store.row(position))
        .map(|row| columns.iter().map(|&c| row[c].clone()).collect())
        .collect();
    Ok(ExportData { headers, rows })
}
