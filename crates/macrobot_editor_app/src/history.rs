// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of full document snapshots.
//!
//! Each document keeps a linear list of snapshots and a cursor. Recording a
//! new snapshot after undoing discards everything ahead of the cursor.

use macrobot_editor_graph::{CodecError, DocumentRecord};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] CodecError),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized document state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Serialized document record
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            data,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            size,
        }
    }

    /// Snapshot a document record
    pub fn from_record(record: &DocumentRecord) -> Result<Self> {
        Ok(Self::new(record.to_bytes()?))
    }

    /// Decode the document record
    pub fn to_record(&self) -> Result<DocumentRecord> {
        Ok(DocumentRecord::from_bytes(&self.data)?)
    }
}

/// History statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Snapshots held
    pub entries: usize,
    /// Steps that can be undone
    pub undo_count: usize,
    /// Steps that can be redone
    pub redo_count: usize,
    /// Total memory used by history (bytes)
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
    /// When the current snapshot was taken (Unix seconds)
    pub current_timestamp: Option<u64>,
}

/// Undo/redo history manager
#[derive(Debug, Clone)]
pub struct History {
    /// Snapshots, oldest first
    entries: VecDeque<StateSnapshot>,
    /// Position of the current snapshot
    index: usize,
    /// Maximum history depth
    max_depth: usize,
    /// Total memory used
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            max_depth: max_depth.max(1),
            memory_used: 0,
        }
    }

    /// Record a new current state.
    ///
    /// Redo entries are dropped. A snapshot identical to the current one is
    /// not recorded twice. Returns whether an entry was added.
    pub fn save_state(&mut self, snapshot: StateSnapshot) -> bool {
        if self.current().is_some_and(|c| c.data == snapshot.data) {
            return false;
        }

        if !self.entries.is_empty() && self.index + 1 < self.entries.len() {
            let discarded = self.entries.split_off(self.index + 1);
            tracing::debug!("Discarding {} redo entries", discarded.len());
            let freed: usize = discarded.iter().map(|s| s.size).sum();
            self.memory_used = self.memory_used.saturating_sub(freed);
        }

        self.memory_used += snapshot.size;
        self.entries.push_back(snapshot);

        // Enforce history limit
        while self.entries.len() > self.max_depth {
            if let Some(old) = self.entries.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.size);
            }
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Step back, returning the snapshot to restore
    pub fn undo(&mut self) -> Result<&StateSnapshot> {
        if !self.can_undo() {
            return Err(HistoryError::NothingToUndo);
        }
        self.index -= 1;
        let snapshot = self.entries.get(self.index).ok_or(HistoryError::NothingToUndo)?;
        tracing::debug!("Undo to snapshot from {}", snapshot.timestamp);
        Ok(snapshot)
    }

    /// Step forward, returning the snapshot to restore
    pub fn redo(&mut self) -> Result<&StateSnapshot> {
        if !self.can_redo() {
            return Err(HistoryError::NothingToRedo);
        }
        self.index += 1;
        let snapshot = self.entries.get(self.index).ok_or(HistoryError::NothingToRedo)?;
        tracing::debug!("Redo to snapshot from {}", snapshot.timestamp);
        Ok(snapshot)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.index > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Snapshot at the cursor
    pub fn current(&self) -> Option<&StateSnapshot> {
        self.entries.get(self.index)
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        let entries = self.entries.len();
        HistoryStats {
            entries,
            undo_count: if entries == 0 { 0 } else { self.index },
            redo_count: entries.saturating_sub(self.index + 1),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
            current_timestamp: self.current().map(|s| s.timestamp),
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
