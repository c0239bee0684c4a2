use std::fs;
use std::ops::ControlFlow;
use tempfile::TempDir;
use tokio_test::assert_ok;

use textgrid::session::SessionManager;
use textgrid::settings::{JsonFileBackend, Settings};
use textgrid::view::{FilterRule, FilterTemplate, MatchMode};
use textgrid::Editor;

fn open_session(dir: &TempDir) -> SessionManager<JsonFileBackend> {
    let backend = JsonFileBackend::open(dir.path().join("state").join("settings.json"));
    SessionManager::new(Settings::new(backend))
}

#[tokio::test]
async fn files_are_restored_in_a_new_process() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.txt");
    let second = dir.path().join("b.txt");
    fs::write(&first, "1----alice\n2----bob").unwrap();
    fs::write(&second, "3----carol").unwrap();

    let mut editor = Editor::default();
    let report = editor
        .load_files(&[first.clone(), second.clone()], |_| ControlFlow::Continue(()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.rows, 3);

    let mut session = open_session(&dir);
    editor.remember_session(&mut session).unwrap();
    assert_eq!(session.recent_files(), vec![first.clone(), second.clone()]);

    // Fresh settings object reading the same file
    let session = open_session(&dir);
    let mut restored = Editor::default();
    restored
        .restore_session(&session, |_| ControlFlow::Continue(()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.store().rows(), editor.store().rows());
    assert_eq!(restored.source_files(), &[first, second]);
}

#[tokio::test]
async fn text_backup_is_used_when_files_are_gone() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("data.txt");
    fs::write(&file, "x----1").unwrap();

    let mut editor = Editor::default();
    editor.load_files(&[file.clone()], |_| ControlFlow::Continue(())).await.unwrap();
    let mut session = open_session(&dir);
    editor.remember_session(&mut session).unwrap();

    fs::remove_file(&file).unwrap();
    assert!(session.recent_files().is_empty());

    let mut restored = Editor::default();
    restored
        .restore_session(&session, |_| ControlFlow::Continue(()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.store().get(0, 0), Some("x"));
    assert!(restored.source_files().is_empty());
}

#[tokio::test]
async fn disabled_restore_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let mut session = open_session(&dir);
    session.set_last_session(&[], "a----b").unwrap();
    session.settings_mut().set_restore_enabled(false).unwrap();

    let mut editor = Editor::default();
    let restored = assert_ok!(editor.restore_session(&session, |_| ControlFlow::Continue(())).await);
    assert!(restored.is_none());
    assert!(!editor.store().is_loaded());
}

#[test]
fn filter_templates_persist_and_apply() {
    let dir = TempDir::new().unwrap();
    let mut session = open_session(&dir);
    let template = FilterTemplate {
        name: "bobs".into(),
        global: "b".into(),
        rules: vec![FilterRule::column(1, MatchMode::Equals, "BOB")],
    };
    session
        .settings_mut()
        .save_filter_template(template.clone())
        .unwrap();

    let session = open_session(&dir);
    let loaded = session.settings().filter_template("bobs").unwrap();
    assert_eq!(loaded, template);

    let mut editor = Editor::default();
    editor.load_text("1----alice\n2----bob\n3----bobby").unwrap();
    editor.apply_filter_template(&loaded);
    assert_eq!(editor.visible_rows(&[0]), vec![vec!["2".to_string()]]);
}

#[test]
fn malformed_settings_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();

    let settings = Settings::new(JsonFileBackend::open(&path));
    assert_eq!(settings.delimiter(), "----");
    assert!(settings.filter_templates().is_empty());
    assert!(settings.restore_enabled());
}
