//! Recent files and last-session restore.

use crate::error::Result;
use crate::settings::{Settings, SettingsBackend};
use std::path::{Path, PathBuf};

/// Maximum number of recent files kept
pub const MAX_RECENT_FILES: usize = 10;

/// What to restore on start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreSource {
    Files(Vec<PathBuf>),
    Text(String),
}

/// Session bookkeeping on top of [`Settings`]
#[derive(Debug, Clone)]
pub struct SessionManager<B> {
    settings: Settings<B>,
}

impl<B: SettingsBackend> SessionManager<B> {
    pub fn new(settings: Settings<B>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings<B> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings<B> {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings<B> {
        self.settings
    }

    /// Move `path` to the front of the recent list, dropping older duplicates
    /// and anything past [`MAX_RECENT_FILES`].
    pub fn add_recent_file(&mut self, path: &Path) -> Result<()> {
        let mut files = self.settings.recent_files();
        files.retain(|existing| existing != path);
        files.insert(0, path.to_path_buf());
        files.truncate(MAX_RECENT_FILES);
        self.settings.set_recent_files(&files)
    }

    /// Recent files that still exist, most recent first
    pub fn recent_files(&self) -> Vec<PathBuf> {
        self.settings
            .recent_files()
            .into_iter()
            .filter(|path| path.exists())
            .collect()
    }

    /// Remember what is loaded: the source files and the raw text as a fallback
    pub fn set_last_session(&mut self, files: &[PathBuf], text_backup: &str) -> Result<()> {
        self.settings.set_last_files(files)?;
        self.settings.set_last_text(text_backup)
    }

    /// Last-session files that still exist
    pub fn last_files(&self) -> Vec<PathBuf> {
        self.settings
            .last_files()
            .into_iter()
            .filter(|path| path.exists())
            .collect()
    }

    pub fn last_text(&self) -> String {
        self.settings.last_text()
    }

    /// Files when any survive, else the saved text, else nothing.
    /// Returns `None` when restore is disabled.
    pub fn restore_source(&self) -> Option<RestoreSource> {
        if !self.settings.restore_enabled() {
            return None;
        }
        let files = self.last_files();
        if !files.is_empty() {
            return Some(RestoreSource::Files(files));
        }
        let text = self.last_text();
        (!text.is_empty()).then_some(RestoreSource::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryBackend;
    use tempfile::TempDir;

    fn manager() -> SessionManager<MemoryBackend> {
        SessionManager::new(Settings::new(MemoryBackend::new()))
    }

    #[test]
    fn test_recent_files_are_mru_deduplicated_and_capped() {
        let dir = TempDir::new().unwrap();
        let mut session = manager();
        let paths: Vec<PathBuf> = (0..12)
            .map(|i| {
                let path = dir.path().join(format!("{i}.txt"));
                std::fs::write(&path, "x").unwrap();
                path
            })
            .collect();

        for path in &paths {
            session.add_recent_file(path).unwrap();
        }
        session.add_recent_file(&paths[5]).unwrap();

        let recent = session.recent_files();
        assert_eq!(recent.len(), MAX_RECENT_FILES);
        assert_eq!(recent[0], paths[5]);
        assert_eq!(recent[1], paths[11]);
        assert_eq!(recent.iter().filter(|p| **p == paths[5]).count(), 1);
    }

    #[test]
    fn test_missing_files_are_hidden() {
        let dir = TempDir::new().unwrap();
        let kept = dir.path().join("kept.txt");
        std::fs::write(&kept, "x").unwrap();
        let gone = dir.path().join("gone.txt");

        let mut session = manager();
        session.add_recent_file(&gone).unwrap();
        session.add_recent_file(&kept).unwrap();
        assert_eq!(session.recent_files(), vec![kept.clone()]);
        assert_eq!(session.settings().recent_files().len(), 2);
    }

    #[test]
    fn test_restore_prefers_files_then_text() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.txt");
        std::fs::write(&file, "a----b").unwrap();

        let mut session = manager();
        assert_eq!(session.restore_source(), None);

        session
            .set_last_session(&[dir.path().join("missing.txt")], "a----b")
            .unwrap();
        assert_eq!(
            session.restore_source(),
            Some(RestoreSource::Text("a----b".into()))
        );

        session.set_last_session(&[file.clone()], "a----b").unwrap();
        assert_eq!(session.restore_source(), Some(RestoreSource::Files(vec![file])));

        session.settings_mut().set_restore_enabled(false).unwrap();
        assert_eq!(session.restore_source(), None);
    }
}
