//! Snapshot undo/redo.
//!
//! Every structural mutation first pushes a full copy of the table. Undo swaps
//! the current table for the newest snapshot and keeps the current one for redo.

use crate::table::TableSnapshot;
use std::collections::VecDeque;

/// Number of snapshots kept when nothing else is configured
pub const DEFAULT_UNDO_LIMIT: usize = 30;

/// Bounded linear undo/redo history of table snapshots.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo_stack: VecDeque<TableSnapshot>,
    redo_stack: Vec<TableSnapshot>,
    limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_UNDO_LIMIT)
    }

    /// History keeping at most `limit` snapshots (at least one)
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record the state before a mutation. Clears redo; drops the oldest
    /// snapshot once the limit is exceeded.
    pub fn push(&mut self, snapshot: TableSnapshot) {
        self.redo_stack.clear();
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }

    /// Step back. `current` becomes the redo target; the returned snapshot is
    /// the state to restore.
    pub fn undo(&mut self, current: TableSnapshot) -> Option<TableSnapshot> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: TableSnapshot) -> Option<TableSnapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tag: &str) -> TableSnapshot {
        TableSnapshot {
            headers: vec!["Column 1".into()],
            rows: vec![vec![tag.into()]],
        }
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = UndoHistory::new();
        history.push(snap("v0"));

        let restored = history.undo(snap("v1")).unwrap();
        assert_eq!(restored, snap("v0"));
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let again = history.redo(snap("v0")).unwrap();
        assert_eq!(again, snap("v1"));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = UndoHistory::new();
        history.push(snap("v0"));
        history.undo(snap("v1"));
        history.push(snap("v0b"));
        assert!(!history.can_redo());
        assert!(history.redo(snap("x")).is_none());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = UndoHistory::with_limit(3);
        for i in 0..5 {
            history.push(snap(&i.to_string()));
        }
        assert_eq!(history.undo_count(), 3);

        let mut current = snap("5");
        let mut seen = Vec::new();
        while let Some(previous) = history.undo(current.clone()) {
            seen.push(previous.rows[0][0].clone());
            current = previous;
        }
        assert_eq!(seen, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_empty_history() {
        let mut history = UndoHistory::default();
        assert_eq!(history.limit(), DEFAULT_UNDO_LIMIT);
        assert!(history.undo(snap("x")).is_none());
        assert_eq!(history.redo_count(), 0);
    }
}
