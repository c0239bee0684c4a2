//! Path checks run before a file is read.

use crate::error::{Result, TableError};
use std::path::Path;

/// Validate that a path names a readable regular file.
///
/// # Error Cases
/// - Path does not exist: [`TableError::FileNotFound`]
/// - Path is a directory or other non-file: [`TableError::NotAFile`]
/// - Metadata or open fails (permissions): [`TableError::FileError`]
///
/// Empty files pass; they simply contribute no rows.
pub async fn validate_file_path(path: &Path) -> Result<()> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TableError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(TableError::file_error("Failed to read file metadata", e)),
    };

    if !metadata.is_file() {
        return Err(TableError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    tokio::fs::File::open(path)
        .await
        .map_err(|e| TableError::file_error("Cannot open file for reading", e))?;
    Ok(())
}
