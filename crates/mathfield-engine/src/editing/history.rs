//! Snapshot-based undo/redo.
//!
//! Every settled edit offers the full [`SerializedState`] to
//! [`History::record`]. Snapshots whose tree equals the current one (cursor
//! moves, rejected actions) only refresh the stored selection, so undo
//! always steps over a real content change.

use std::collections::VecDeque;

use super::state::SerializedState;

pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Clone, Debug)]
pub struct History {
    undo: VecDeque<SerializedState>,
    redo: Vec<SerializedState>,
    current: Option<SerializedState>,
    /// Set while an undo/redo is being applied so its own settle step does
    /// not push a new entry.
    replaying: bool,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            current: None,
            replaying: false,
            limit: limit.max(1),
        }
    }

    /// Forget everything and start over from `seed`.
    pub fn reset(&mut self, seed: SerializedState) {
        self.undo.clear();
        self.redo.clear();
        self.current = Some(seed);
        self.replaying = false;
    }

    /// Returns true when `snapshot` was pushed as a new entry.
    pub fn record(&mut self, snapshot: SerializedState) -> bool {
        let Some(current) = self.current.take() else {
            self.current = Some(snapshot);
            return false;
        };
        if self.replaying || current.root == snapshot.root {
            self.current = Some(snapshot);
            return false;
        }

        self.undo.push_back(current);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
        self.current = Some(snapshot);
        log::trace!("history push, {} undo entries", self.undo.len());
        true
    }

    /// The state [`History::undo`] would hand out, without moving anything.
    pub fn undo_target(&self) -> Option<&SerializedState> {
        self.undo.back()
    }

    pub fn redo_target(&self) -> Option<&SerializedState> {
        self.redo.last()
    }

    pub fn undo(&mut self) -> Option<SerializedState> {
        let previous = self.undo.pop_back()?;
        if let Some(current) = self.current.replace(previous.clone()) {
            self.redo.push(current);
        }
        self.replaying = true;
        Some(previous)
    }

    pub fn redo(&mut self) -> Option<SerializedState> {
        let next = self.redo.pop()?;
        if let Some(current) = self.current.replace(next.clone()) {
            self.undo.push_back(current);
        }
        self.replaying = true;
        Some(next)
    }

    pub fn finish_replay(&mut self) {
        self.replaying = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn current(&self) -> Option<&SerializedState> {
        self.current.as_ref()
    }
}
