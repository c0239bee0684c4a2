pub mod decode;
pub mod protocol;
pub mod validation;
pub mod worker;

pub use decode::{decode_bytes, Decoded};
pub use protocol::{ParseCommand, ParseResponse, RequestId};
pub use validation::validate_file_path;
pub use worker::{parse_worker_loop, ParseCoordinator, ParseEvent};

use crate::error::{Result, TableError};
use std::path::{Path, PathBuf};

/// Non-fatal problems found while loading input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The text contains U+FFFD, usually a sign of a wrong encoding guess
    ReplacementCharacters,
    /// A file could not be read and was left out
    SkippedFile { path: PathBuf, reason: String },
}

/// Text assembled from one or more files
#[derive(Debug, Clone, Default)]
pub struct LoadedText {
    /// Non-empty file texts joined with `\n`, in the order given
    pub text: String,
    /// Files that were read successfully
    pub files: Vec<PathBuf>,
    pub warnings: Vec<LoadWarning>,
}

/// Read and decode one file
pub async fn read_file(path: &Path) -> Result<Decoded> {
    validate_file_path(path).await?;
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| TableError::file_error(format!("Failed to read {}", path.display()), e))?;
    Ok(decode_bytes(&raw))
}

/// Read several files into one text.
///
/// Unreadable files are skipped with a warning; the call only fails when no
/// file at all could be read.
pub async fn read_files(paths: &[PathBuf]) -> Result<LoadedText> {
    let mut loaded = LoadedText::default();
    let mut parts = Vec::new();
    let mut last_error = None;

    for path in paths {
        match read_file(path).await {
            Ok(decoded) => {
                if decoded.has_replacement_characters()
                    && !loaded.warnings.contains(&LoadWarning::ReplacementCharacters)
                {
                    loaded.warnings.push(LoadWarning::ReplacementCharacters);
                }
                if !decoded.text.is_empty() {
                    parts.push(decoded.text);
                }
                loaded.files.push(path.clone());
            }
            Err(err) => {
                log::warn!("skipping {}: {}", path.display(), err);
                loaded.warnings.push(LoadWarning::SkippedFile {
                    path: path.clone(),
                    reason: err.to_string(),
                });
                last_error = Some(err);
            }
        }
    }

    if loaded.files.is_empty() {
        if let Some(err) = last_error {
            return Err(err);
        }
    }

    loaded.text = parts.join("\n");
    log::info!(
        "loaded {} of {} files ({} bytes of text)",
        loaded.files.len(),
        paths.len(),
        loaded.text.len()
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_files_joins_and_skips() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.txt");
        let empty = dir.path().join("empty.txt");
        let second = dir.path().join("b.txt");
        std::fs::write(&first, "1----a").unwrap();
        std::fs::write(&empty, "").unwrap();
        std::fs::write(&second, [0xD6u8, 0xD0]).unwrap();
        let missing = dir.path().join("missing.txt");

        let loaded = read_files(&[first.clone(), missing.clone(), empty, second])
            .await
            .unwrap();

        assert_eq!(loaded.text, "1----a\n中");
        assert_eq!(loaded.files.len(), 3);
        assert!(matches!(
            &loaded.warnings[..],
            [LoadWarning::SkippedFile { path, .. }] if *path == missing
        ));
    }

    #[tokio::test]
    async fn test_read_files_reports_replacement_characters_once() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, [b'x', 0x81]).unwrap();
        std::fs::write(&b, [b'y', 0x81]).unwrap();

        let loaded = read_files(&[a, b]).await.unwrap();
        assert_eq!(loaded.warnings, vec![LoadWarning::ReplacementCharacters]);
    }

    #[tokio::test]
    async fn test_read_files_fails_when_nothing_readable() {
        let dir = TempDir::new().unwrap();
        let result = read_files(&[dir.path().join("nope.txt")]).await;
        assert!(matches!(result, Err(TableError::FileNotFound { .. })));
    }
}
