//! # textgrid - Tabular Editing Engine for Delimited Text
//!
//! An in-memory table engine for delimited text: load pasted or file text into
//! an editable grid, filter and sort it through a view, restructure columns,
//! run batch text transforms and undo any of it.
//!
//! ## Features
//!
//! - **Stable Row Identity**: Rows keep their identifier across sorts, filters and column edits
//! - **Composable View**: Global text filter plus ordered per-column rules and a numeric-aware sort
//! - **Column Restructuring**: Split, merge, reorder, rename and delete with ragged input normalized
//! - **Undo/Redo**: Bounded full-table snapshots around every mutation
//! - **Background Parsing**: Large inputs parse off-thread with progress and cancellation
//!
//! ## Architecture
//!
//! - [`parser`] - Delimited text to rectangular rows
//! - [`table`] - The owned table store and its restructure algorithms
//! - [`view`] - Filter and sort projection over the store
//! - [`batch`], [`dedup`] - Batch text operations, deduplication and grouping
//! - [`history`] - Undo/redo snapshots
//! - [`loader`] - File decoding and the background parse worker
//! - [`editor`] - Coordination of store, view, history and loader
//! - [`settings`], [`session`] - Persisted preferences and session restore
//! - [`export`], [`plugin`] - Collaborator seams for encoders and transform scripts

// Core modules
pub mod config;
pub mod error;
pub mod parser;

// Table engine
pub mod history;
pub mod table;
pub mod view;

// Operations
pub mod batch;
pub mod dedup;

// Integration
pub mod editor;
pub mod export;
pub mod loader;
pub mod plugin;
pub mod session;
pub mod settings;

// Re-export commonly used types for convenience
pub use error::{Result, TableError};

// Public API surface for external usage
pub use batch::{BatchOp, Scope};
pub use config::EngineConfig;
pub use editor::{Editor, LoadReport};
pub use table::{RowId, TableSnapshot, TableStore, ViewColumn};
pub use view::{FilterRule, MatchMode, TableView};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
