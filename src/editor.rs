//! Editing session orchestration.
//!
//! [`Editor`] owns one table, one view over it and one undo history, and is the
//! only place that wires them together. Every data mutation goes through
//! [`Editor::mutate`], which rejects work while a background parse is running
//! and records an undo snapshot when the table actually changed.

use crate::batch::{self, BatchEffect, BatchOp, ColumnPlan, Scope};
use crate::config::EngineConfig;
use crate::dedup::{self, KeepPolicy};
use crate::error::{Result, TableError};
use crate::export::{self, ExportData, ExportTemplate};
use crate::history::UndoHistory;
use crate::loader::{self, LoadWarning, ParseCoordinator, RequestId};
use crate::parser::{self, ParseOutcome, ParseProgress};
use crate::plugin::{PluginOutput, PluginScope, TransformPlugin};
use crate::session::{RestoreSource, SessionManager};
use crate::settings::SettingsBackend;
use crate::table::{TableSnapshot, TableStore, ViewColumn};
use crate::view::{FilterRule, FilterTemplate, TableView};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

/// Summary of a finished load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<LoadWarning>,
}

pub struct Editor {
    config: EngineConfig,
    delimiter: String,
    store: TableStore,
    view: TableView,
    history: UndoHistory,
    parser: Option<ParseCoordinator>,
    /// Text handed to the in-flight parse
    pending_text: Option<Arc<str>>,
    source_text: String,
    source_files: Vec<PathBuf>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Editor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            delimiter: config.default_delimiter.clone(),
            history: UndoHistory::with_limit(config.undo_limit),
            config,
            store: TableStore::new(),
            view: TableView::new(),
            parser: None,
            pending_text: None,
            source_text: String::new(),
            source_files: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Delimiter used by the next load
    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) {
        self.delimiter = delimiter.into();
    }

    /// Raw text of the last successful load
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Files behind the last successful load; empty for pasted text
    pub fn source_files(&self) -> &[PathBuf] {
        &self.source_files
    }

    /// Whether a background parse is in flight
    pub fn is_busy(&self) -> bool {
        self.parser.as_ref().is_some_and(ParseCoordinator::is_busy)
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            return Err(TableError::Busy);
        }
        Ok(())
    }

    /// Run one store mutation under the busy check, with an undo snapshot
    /// recorded only if the store changed.
    fn mutate<T>(&mut self, op: impl FnOnce(&mut TableStore) -> Result<T>) -> Result<T> {
        self.ensure_idle()?;
        let before = self.undo_point();
        let generation = self.store.generation();
        let output = op(&mut self.store)?;
        if self.store.generation() != generation {
            if let Some(snapshot) = before {
                self.history.push(snapshot);
            }
        }
        Ok(output)
    }

    /// Nothing worth restoring before the first load.
    fn undo_point(&self) -> Option<TableSnapshot> {
        let empty = self.store.row_count() == 0 && self.store.column_count() == 0;
        (!empty).then(|| self.store.snapshot())
    }

    fn restore(&mut self, snapshot: TableSnapshot) {
        let TableSnapshot { headers, rows } = snapshot;
        self.store.replace(rows, Some(headers));
    }

    // Loading

    /// Parse `text` on the calling thread and make it the current table
    pub fn load_text(&mut self, text: &str) -> Result<LoadReport> {
        self.ensure_idle()?;
        let rows = parser::parse(text, &self.delimiter);
        Ok(self.install(rows, text.to_string(), Vec::new()))
    }

    fn install(
        &mut self,
        rows: Vec<Vec<String>>,
        text: String,
        mut warnings: Vec<LoadWarning>,
    ) -> LoadReport {
        if let Some(snapshot) = self.undo_point() {
            self.history.push(snapshot);
        }
        self.store.replace(rows, None);
        if text.contains('\u{FFFD}') && !warnings.contains(&LoadWarning::ReplacementCharacters) {
            warnings.push(LoadWarning::ReplacementCharacters);
        }
        self.source_text = text;
        self.source_files.clear();
        log::info!(
            "loaded {} rows x {} columns",
            self.store.row_count(),
            self.store.column_count()
        );
        LoadReport {
            rows: self.store.row_count(),
            columns: self.store.column_count(),
            warnings,
        }
    }

    /// Hand `text` to the background parse worker.
    ///
    /// The worker is spawned on first use, so this must run inside a tokio
    /// runtime. Fails with [`TableError::Busy`] while another parse runs.
    pub async fn start_parse(&mut self, text: impl Into<Arc<str>>) -> Result<RequestId> {
        self.ensure_idle()?;
        let text = text.into();
        let coordinator = self
            .parser
            .get_or_insert_with(|| ParseCoordinator::spawn(self.config.clone()));
        let request_id = coordinator.submit(Arc::clone(&text), &self.delimiter).await?;
        self.pending_text = Some(text);
        Ok(request_id)
    }

    /// Ask the in-flight parse to stop. Returns false when nothing is running.
    ///
    /// A pending [`finish_parse`](Self::finish_parse) then resolves to `None`.
    /// From inside a load's progress callback, return `ControlFlow::Break`
    /// instead.
    pub fn cancel_parse(&self) -> bool {
        self.parser.as_ref().is_some_and(ParseCoordinator::cancel)
    }

    /// Wait for the in-flight parse and install its rows.
    ///
    /// Returns `None` when the parse was cancelled, either through
    /// [`cancel_parse`](Self::cancel_parse) or by `on_progress` returning
    /// `ControlFlow::Break`; the current table and undo history are then left
    /// as they were.
    pub async fn finish_parse(
        &mut self,
        on_progress: impl FnMut(ParseProgress) -> ControlFlow<()>,
    ) -> Result<Option<LoadReport>> {
        let coordinator = self
            .parser
            .as_mut()
            .ok_or_else(|| TableError::invalid("no parse in flight"))?;
        let outcome = coordinator.finish(on_progress).await;
        let text = self.pending_text.take();
        match outcome? {
            ParseOutcome::Completed(rows) => {
                let text = text.map(|t| t.to_string()).unwrap_or_default();
                Ok(Some(self.install(rows, text, Vec::new())))
            }
            ParseOutcome::Cancelled => {
                log::info!("parse cancelled, table unchanged");
                Ok(None)
            }
        }
    }

    /// Load text, taking the background path for large inputs
    pub async fn load(
        &mut self,
        text: String,
        on_progress: impl FnMut(ParseProgress) -> ControlFlow<()>,
    ) -> Result<Option<LoadReport>> {
        if parser::line_count(&text) < self.config.large_input_lines {
            return self.load_text(&text).map(Some);
        }
        self.start_parse(text).await?;
        self.finish_parse(on_progress).await
    }

    /// Read, decode and load one or more files as a single table
    pub async fn load_files(
        &mut self,
        paths: &[PathBuf],
        on_progress: impl FnMut(ParseProgress) -> ControlFlow<()>,
    ) -> Result<Option<LoadReport>> {
        self.ensure_idle()?;
        let loaded = loader::read_files(paths).await?;
        let Some(mut report) = self.load(loaded.text, on_progress).await? else {
            return Ok(None);
        };
        for warning in loaded.warnings {
            if !report.warnings.contains(&warning) {
                report.warnings.push(warning);
            }
        }
        self.source_files = loaded.files;
        Ok(Some(report))
    }

    /// Record what is loaded so it can be restored next time
    pub fn remember_session<B: SettingsBackend>(
        &self,
        session: &mut SessionManager<B>,
    ) -> Result<()> {
        for file in self.source_files.iter().rev() {
            session.add_recent_file(file)?;
        }
        session.set_last_session(&self.source_files, &self.source_text)
    }

    /// Reload the previous session's files, or its text when the files are gone
    pub async fn restore_session<B: SettingsBackend>(
        &mut self,
        session: &SessionManager<B>,
        on_progress: impl FnMut(ParseProgress) -> ControlFlow<()>,
    ) -> Result<Option<LoadReport>> {
        match session.restore_source() {
            Some(RestoreSource::Files(files)) => self.load_files(&files, on_progress).await,
            Some(RestoreSource::Text(text)) => self.load(text, on_progress).await,
            None => Ok(None),
        }
    }

    /// Stop the background worker, if one was started
    pub async fn shutdown(mut self) {
        if let Some(coordinator) = self.parser.take() {
            coordinator.shutdown().await;
        }
    }

    // Undo

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restore the previous snapshot. Returns false when there is none.
    pub fn undo(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        match self.history.undo(self.store.snapshot()) {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.ensure_idle()?;
        match self.history.redo(self.store.snapshot()) {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Cell and row edits

    /// Positions in the store of the given view rows, in the order given
    pub fn view_positions(&mut self, view_rows: &[usize]) -> Result<Vec<usize>> {
        self.view.refresh(&self.store);
        view_rows
            .iter()
            .map(|&row| {
                self.view
                    .source_position(row)
                    .ok_or_else(|| TableError::invalid(format!("view row {row} is not visible")))
            })
            .collect()
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.mutate(|store| store.set(row, column, value))
    }

    /// Delete rows by store position
    pub fn delete_rows(&mut self, positions: &[usize]) -> Result<usize> {
        self.mutate(|store| Ok(store.remove_rows(positions)))
    }

    /// Delete rows by view row
    pub fn delete_view_rows(&mut self, view_rows: &[usize]) -> Result<usize> {
        self.ensure_idle()?;
        let positions = self.view_positions(view_rows)?;
        self.delete_rows(&positions)
    }

    /// Permanently reorder the stored rows
    pub fn sort_rows(&mut self, column: ViewColumn, ascending: bool) -> Result<()> {
        self.mutate(|store| store.sort(column, ascending))
    }

    // Columns

    pub fn remove_columns(&mut self, columns: &[usize]) -> Result<usize> {
        self.mutate(|store| Ok(store.remove_columns(columns)))
    }

    pub fn reorder_columns(&mut self, permutation: &[usize]) -> Result<()> {
        self.mutate(|store| store.reorder_columns(permutation))
    }

    pub fn rename_column(&mut self, column: usize, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.mutate(|store| store.rename_column(column, name))
    }

    pub fn set_headers(&mut self, headers: Vec<String>) -> Result<()> {
        self.mutate(|store| store.set_headers(headers))
    }

    pub fn insert_columns(
        &mut self,
        at: usize,
        headers: Vec<String>,
        column_values: Vec<Vec<String>>,
    ) -> Result<()> {
        self.mutate(|store| store.insert_columns(at, headers, column_values))
    }

    /// Split one column for the rows in `scope`. Returns the columns added.
    pub fn split_column(
        &mut self,
        column: usize,
        delimiter: &str,
        keep_original: bool,
        scope: &Scope,
    ) -> Result<usize> {
        let ids = scope.row_ids(&self.store);
        self.mutate(|store| store.split_column(column, delimiter, keep_original, ids.as_ref()))
    }

    /// Merge columns across the whole table
    pub fn merge_columns(
        &mut self,
        columns: &[usize],
        delimiter: &str,
        keep_originals: bool,
    ) -> Result<()> {
        self.mutate(|store| store.merge_columns(columns, delimiter, keep_originals))
    }

    /// Keep, reorder and rename columns in one step
    pub fn apply_column_plan(&mut self, plan: &ColumnPlan) -> Result<()> {
        self.mutate(|store| plan.apply(store))
    }

    /// Run a batch text operation over `columns` of the rows in `scope`
    pub fn apply_batch(
        &mut self,
        op: &BatchOp,
        scope: &Scope,
        columns: &[usize],
    ) -> Result<BatchEffect> {
        self.mutate(|store| batch::apply(store, op, scope, columns))
    }

    // Duplicates and grouping

    pub fn preview_duplicates(&self, key_columns: &[usize], policy: KeepPolicy) -> Result<usize> {
        dedup::preview_duplicates(&self.store, key_columns, policy)
    }

    /// Remove duplicate rows. Returns the number removed.
    pub fn remove_duplicates(&mut self, key_columns: &[usize], policy: KeepPolicy) -> Result<usize> {
        self.mutate(|store| dedup::remove_duplicates(store, key_columns, policy))
    }

    /// Group every row of the table
    pub fn group(&self, key_columns: &[usize]) -> Result<TableSnapshot> {
        dedup::group_rows(&self.store, key_columns)
    }

    /// Group only the rows visible in the view, in view order
    pub fn group_view(&mut self, key_columns: &[usize]) -> Result<TableSnapshot> {
        self.view.refresh(&self.store);
        dedup::group_positions(&self.store, self.view.positions(), key_columns)
    }

    // View

    pub fn set_global_filter(&mut self, text: &str) {
        self.view.set_global_filter(text);
    }

    pub fn set_rules(&mut self, rules: Vec<FilterRule>) {
        self.view.set_rules(rules);
    }

    pub fn add_rule(&mut self, rule: FilterRule) {
        self.view.add_rule(rule);
    }

    pub fn clear_filters(&mut self) {
        self.view.clear_filters();
    }

    pub fn set_sort(&mut self, column: ViewColumn, ascending: bool) {
        self.view.set_sort(column, ascending);
    }

    pub fn clear_sort(&mut self) {
        self.view.clear_sort();
    }

    pub fn apply_filter_template(&mut self, template: &FilterTemplate) {
        self.view.set_global_filter(&template.global);
        self.view.set_rules(template.rules.clone());
    }

    /// Capture the current filters under `name`
    pub fn filter_template(&self, name: impl Into<String>) -> FilterTemplate {
        FilterTemplate {
            name: name.into(),
            global: self.view.global_filter().to_string(),
            rules: self.view.rules().to_vec(),
        }
    }

    pub fn visible_len(&mut self) -> usize {
        self.view.refresh(&self.store);
        self.view.len()
    }

    pub fn visible_positions(&mut self) -> &[usize] {
        self.view.visible_positions(&self.store)
    }

    /// Visible rows restricted to `columns`, in view order
    pub fn visible_rows(&mut self, columns: &[usize]) -> Vec<Vec<String>> {
        self.view.visible_rows(&self.store, columns)
    }

    // Export

    pub fn export(&mut self, columns: &[usize], view_rows: Option<&[usize]>) -> Result<ExportData> {
        export::collect(&self.store, &mut self.view, columns, view_rows)
    }

    /// Export following a template.
    ///
    /// An empty column list in the template means every column. Selected rows
    /// and columns only apply when the template asks for them.
    pub fn export_template(
        &mut self,
        template: &ExportTemplate,
        selected_rows: &[usize],
        selected_columns: &[usize],
    ) -> Result<ExportData> {
        let columns: Vec<usize> = if template.only_selected_columns {
            selected_columns.to_vec()
        } else if template.columns.is_empty() {
            (0..self.store.column_count()).collect()
        } else {
            template.columns.clone()
        };
        let rows = template.only_selected_rows.then_some(selected_rows);
        self.export(&columns, rows)
    }

    // Plugins

    /// Run a transform plugin over the table or the current view.
    ///
    /// With `dry_run` the output is returned and the table is left alone.
    /// Otherwise the output replaces the whole table as one undoable step.
    pub async fn run_plugin(
        &mut self,
        plugin: &dyn TransformPlugin,
        scope: PluginScope,
        dry_run: bool,
    ) -> Result<PluginOutput> {
        self.ensure_idle()?;
        let input = match scope {
            PluginScope::FullTable => self.store.snapshot(),
            PluginScope::CurrentView => {
                let columns: Vec<usize> = (0..self.store.column_count()).collect();
                TableSnapshot {
                    headers: self.store.headers().to_vec(),
                    rows: self.view.visible_rows(&self.store, &columns),
                }
            }
        };
        log::debug!(
            "running plugin {} on {} rows (dry run: {dry_run})",
            plugin.name(),
            input.rows.len()
        );
        let output = plugin.transform(input).await?;
        if !dry_run {
            let TableSnapshot { headers, rows } = output.table.clone();
            self.mutate(|store| {
                store.replace(rows, Some(headers));
                Ok(())
            })?;
        }
        Ok(output)
    }
}
