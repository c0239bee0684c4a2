//! Engine tunables.
//!
//! With the `config` feature the values are read from
//! `<config dir>/textgrid/config.toml`; a missing or malformed file falls back
//! to the defaults.

use crate::history::DEFAULT_UNDO_LIMIT;
use crate::parser::DEFAULT_DELIMITER;
use serde::{Deserialize, Serialize};

/// Line count from which loads take the chunked, cancellable parse path
pub const DEFAULT_LARGE_INPUT_LINES: usize = 200_000;

/// Lines parsed between two progress reports
pub const DEFAULT_PROGRESS_CHUNK_LINES: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshots kept by the undo history
    pub undo_limit: usize,
    /// Inputs with at least this many lines report progress and can be cancelled
    pub large_input_lines: usize,
    pub progress_chunk_lines: usize,
    /// Delimiter used when settings do not name one
    pub default_delimiter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            large_input_lines: DEFAULT_LARGE_INPUT_LINES,
            progress_chunk_lines: DEFAULT_PROGRESS_CHUNK_LINES,
            default_delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load the configuration file, or defaults when it is unavailable
    #[cfg(feature = "config")]
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            log::debug!("no config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            log::debug!("config file not found at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("{err}; using defaults");
                Self::default()
            }
        }
    }

    /// Without the `config` feature there is no file to read
    #[cfg(not(feature = "config"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(feature = "config")]
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("textgrid").join("config.toml"))
    }

    /// Read and parse one TOML file
    #[cfg(feature = "config")]
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::TableError::file_error(format!("reading {}", path.display()), e))?;
        Self::from_toml_str(&content).map_err(|err| {
            crate::TableError::config(format!("failed to parse {}: {}", path.display(), err))
        })
    }

    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|err| crate::TableError::config(err.to_string()))?;
        config.validated()
    }

    /// Reject values the engine cannot work with
    pub fn validated(self) -> crate::Result<Self> {
        if self.undo_limit == 0 {
            return Err(crate::TableError::config("undo_limit must be at least 1"));
        }
        if self.progress_chunk_lines == 0 {
            return Err(crate::TableError::config(
                "progress_chunk_lines must be at least 1",
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.undo_limit, 30);
        assert_eq!(config.large_input_lines, 200_000);
        assert_eq!(config.progress_chunk_lines, 5_000);
        assert_eq!(config.default_delimiter, "----");
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let config = EngineConfig {
            undo_limit: 0,
            ..EngineConfig::default()
        };
        assert!(config.validated().is_err());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str("undo_limit = 5\n").unwrap();
        assert_eq!(config.undo_limit, 5);
        assert_eq!(config.default_delimiter, "----");
        assert!(EngineConfig::from_toml_str("undo_limit = \"many\"").is_err());
    }
}
