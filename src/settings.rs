//! Persisted settings.
//!
//! Values are stored as strings under slash-separated keys. Structured values
//! (templates, file lists, plugin settings) are JSON encoded; a value that no
//! longer parses reads back as the default and logs a warning.

use crate::error::{Result, TableError};
use crate::export::ExportTemplate;
use crate::parser::DEFAULT_DELIMITER;
use crate::view::{FilterRule, FilterTemplate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Setting keys
pub mod keys {
    pub const DELIMITER: &str = "parser/delimiter";
    pub const ACTIVE_FILTERS: &str = "filters/active";
    pub const GLOBAL_FILTER: &str = "filters/global";
    pub const FILTER_TEMPLATES: &str = "filters/templates";
    pub const EXPORT_TEMPLATES: &str = "export/templates";
    pub const LAST_EXPORT_DIR: &str = "export/last_dir";
    pub const RECENT_FILES: &str = "session/recent_files";
    pub const LAST_FILES: &str = "session/last_files";
    pub const LAST_TEXT: &str = "session/last_text";
    pub const RESTORE_ENABLED: &str = "session/restore_enabled";
    pub const PLUGIN_SETTINGS: &str = "plugins/settings";
}

/// String key/value storage behind [`Settings`]
pub trait SettingsBackend: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Settings kept only for the life of the process
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Settings stored as one JSON object in a file, rewritten on every change
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileBackend {
    /// Open the settings file. A missing file starts empty; an unreadable or
    /// malformed one starts empty with a warning and is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                log::warn!("ignoring malformed settings file {}: {}", path.display(), err);
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                log::warn!("cannot read settings file {}: {}", path.display(), err);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    /// Default location under the platform config directory
    #[cfg(feature = "config")]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("textgrid").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TableError::file_error(
                        format!("Failed to create settings directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content).map_err(|e| {
            TableError::file_error(format!("Failed to write {}", self.path.display()), e)
        })
    }
}

impl SettingsBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// Typed access to persisted settings
#[derive(Debug, Clone, Default)]
pub struct Settings<B = MemoryBackend> {
    backend: B,
}

impl<B: SettingsBackend> Settings<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn get_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.backend.get(key) else {
            return T::default();
        };
        if raw.is_empty() {
            return T::default();
        }
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::warn!("setting '{key}' is malformed ({err}), using default");
            T::default()
        })
    }

    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, raw)
    }

    /// Parse delimiter, `"----"` unless configured
    pub fn delimiter(&self) -> String {
        self.backend
            .get(keys::DELIMITER)
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string())
    }

    pub fn set_delimiter(&mut self, delimiter: &str) -> Result<()> {
        self.backend.set(keys::DELIMITER, delimiter.to_string())
    }

    pub fn global_filter(&self) -> String {
        self.backend.get(keys::GLOBAL_FILTER).unwrap_or_default()
    }

    pub fn set_global_filter(&mut self, text: &str) -> Result<()> {
        self.backend.set(keys::GLOBAL_FILTER, text.to_string())
    }

    pub fn active_filters(&self) -> Vec<FilterRule> {
        self.get_json(keys::ACTIVE_FILTERS)
    }

    pub fn set_active_filters(&mut self, rules: &[FilterRule]) -> Result<()> {
        self.set_json(keys::ACTIVE_FILTERS, rules)
    }

    pub fn filter_templates(&self) -> Vec<FilterTemplate> {
        self.get_json(keys::FILTER_TEMPLATES)
    }

    pub fn set_filter_templates(&mut self, templates: &[FilterTemplate]) -> Result<()> {
        self.set_json(keys::FILTER_TEMPLATES, templates)
    }

    /// Save a filter template, replacing any template with the same name
    pub fn save_filter_template(&mut self, template: FilterTemplate) -> Result<()> {
        let mut templates = self.filter_templates();
        templates.retain(|t| t.name != template.name);
        templates.push(template);
        self.set_filter_templates(&templates)
    }

    /// Remove a filter template by name. Returns whether it existed.
    pub fn delete_filter_template(&mut self, name: &str) -> Result<bool> {
        let mut templates = self.filter_templates();
        let before = templates.len();
        templates.retain(|t| t.name != name);
        if templates.len() == before {
            return Ok(false);
        }
        self.set_filter_templates(&templates)?;
        Ok(true)
    }

    pub fn filter_template(&self, name: &str) -> Option<FilterTemplate> {
        self.filter_templates().into_iter().find(|t| t.name == name)
    }

    pub fn export_templates(&self) -> Vec<ExportTemplate> {
        self.get_json(keys::EXPORT_TEMPLATES)
    }

    pub fn set_export_templates(&mut self, templates: &[ExportTemplate]) -> Result<()> {
        self.set_json(keys::EXPORT_TEMPLATES, templates)
    }

    /// Save an export template, replacing any template with the same name
    pub fn save_export_template(&mut self, template: ExportTemplate) -> Result<()> {
        let mut templates = self.export_templates();
        templates.retain(|t| t.name != template.name);
        templates.push(template);
        self.set_export_templates(&templates)
    }

    pub fn last_export_dir(&self) -> Option<PathBuf> {
        self.backend
            .get(keys::LAST_EXPORT_DIR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
    }

    pub fn set_last_export_dir(&mut self, dir: &Path) -> Result<()> {
        self.backend
            .set(keys::LAST_EXPORT_DIR, dir.to_string_lossy().into_owned())
    }

    /// Stored recent files, without existence checks
    pub fn recent_files(&self) -> Vec<PathBuf> {
        self.get_json(keys::RECENT_FILES)
    }

    pub fn set_recent_files(&mut self, files: &[PathBuf]) -> Result<()> {
        self.set_json(keys::RECENT_FILES, files)
    }

    pub fn last_files(&self) -> Vec<PathBuf> {
        self.get_json(keys::LAST_FILES)
    }

    pub fn set_last_files(&mut self, files: &[PathBuf]) -> Result<()> {
        self.set_json(keys::LAST_FILES, files)
    }

    pub fn last_text(&self) -> String {
        self.backend.get(keys::LAST_TEXT).unwrap_or_default()
    }

    pub fn set_last_text(&mut self, text: &str) -> Result<()> {
        self.backend.set(keys::LAST_TEXT, text.to_string())
    }

    /// Whether the previous session is restored on start, on by default
    pub fn restore_enabled(&self) -> bool {
        match self.backend.get(keys::RESTORE_ENABLED).as_deref() {
            Some("false") | Some("0") => false,
            _ => true,
        }
    }

    pub fn set_restore_enabled(&mut self, enabled: bool) -> Result<()> {
        self.backend
            .set(keys::RESTORE_ENABLED, enabled.to_string())
    }

    /// Free-form plugin settings; always a JSON object
    pub fn plugin_settings(&self) -> serde_json::Map<String, serde_json::Value> {
        self.get_json(keys::PLUGIN_SETTINGS)
    }

    pub fn set_plugin_settings(
        &mut self,
        settings: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        self.set_json(keys::PLUGIN_SETTINGS, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::MatchMode;

    #[test]
    fn test_defaults() {
        let settings = Settings::new(MemoryBackend::new());
        assert_eq!(settings.delimiter(), "----");
        assert!(settings.filter_templates().is_empty());
        assert!(settings.recent_files().is_empty());
        assert!(settings.restore_enabled());
        assert!(settings.plugin_settings().is_empty());
        assert_eq!(settings.last_export_dir(), None);
    }

    #[test]
    fn test_malformed_json_reads_as_default() {
        let mut backend = MemoryBackend::new();
        backend
            .set(keys::FILTER_TEMPLATES, "{not json".to_string())
            .unwrap();
        backend
            .set(keys::PLUGIN_SETTINGS, "[1, 2]".to_string())
            .unwrap();
        let settings = Settings::new(backend);
        assert!(settings.filter_templates().is_empty());
        assert!(settings.plugin_settings().is_empty());
    }

    #[test]
    fn test_filter_templates_replace_by_name() {
        let mut settings = Settings::new(MemoryBackend::new());
        let rules = vec![FilterRule::column(0, MatchMode::Contains, "a")];
        settings
            .save_filter_template(FilterTemplate {
                name: "t".into(),
                global: String::new(),
                rules: rules.clone(),
            })
            .unwrap();
        settings
            .save_filter_template(FilterTemplate {
                name: "t".into(),
                global: "x".into(),
                rules,
            })
            .unwrap();

        let templates = settings.filter_templates();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].global, "x");
        assert!(settings.delete_filter_template("t").unwrap());
        assert!(!settings.delete_filter_template("t").unwrap());
    }

    #[test]
    fn test_restore_flag_round_trip() {
        let mut settings = Settings::new(MemoryBackend::new());
        settings.set_restore_enabled(false).unwrap();
        assert!(!settings.restore_enabled());
        settings.set_restore_enabled(true).unwrap();
        assert!(settings.restore_enabled());
    }

    #[test]
    fn test_json_file_backend_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::new(JsonFileBackend::open(&path));
        settings.set_delimiter("|").unwrap();
        settings.set_last_text("a|b").unwrap();

        let reopened = Settings::new(JsonFileBackend::open(&path));
        assert_eq!(reopened.delimiter(), "|");
        assert_eq!(reopened.last_text(), "a|b");
    }

    #[test]
    fn test_json_file_backend_tolerates_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "garbage").unwrap();

        let mut settings = Settings::new(JsonFileBackend::open(&path));
        assert_eq!(settings.delimiter(), "----");
        settings.set_delimiter(",").unwrap();
        assert_eq!(Settings::new(JsonFileBackend::open(&path)).delimiter(), ",");
    }
}
