// SPDX-License-Identifier: MIT OR Apache-2.0
//! Documents (one per tab) and the live canvas.

use crate::history::{History, Result as HistoryResult, StateSnapshot};
use macrobot_editor_graph::{DocumentRecord, Graph, LoadReport, NodeRegistry, Viewport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Name of a tab created without one
pub const UNTITLED: &str = "Untitled";

/// Unique identifier for documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Create a new random document ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The graph and view being edited
#[derive(Debug, Clone)]
pub struct Canvas {
    /// Macro graph
    pub graph: Graph,
    /// Pan and zoom
    pub viewport: Viewport,
}

impl Canvas {
    /// Empty canvas
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            graph: Graph::new(registry),
            viewport: Viewport::new(),
        }
    }

    /// Serialize the canvas
    pub fn capture(&self) -> DocumentRecord {
        DocumentRecord::capture(&self.graph, &self.viewport)
    }

    /// Rebuild a canvas from a record
    pub fn restore(record: &DocumentRecord, registry: Arc<NodeRegistry>) -> (Self, LoadReport) {
        let (graph, viewport, report) = record.restore(registry);
        if !report.is_clean() {
            tracing::warn!(
                "Restored canvas with {} skipped node(s) and {} dropped connection(s)",
                report.skipped_nodes.len(),
                report.dropped_connections
            );
        }
        (Self { graph, viewport }, report)
    }
}

/// One open tab
#[derive(Debug, Clone)]
pub struct Document {
    /// Unique ID
    pub id: DocumentId,
    /// Tab title
    pub name: String,
    /// Undo/redo snapshots
    pub history: History,
    /// Canvas state while the tab is in the background
    pub stored: Option<DocumentRecord>,
    /// File the document was loaded from or saved to
    pub path: Option<PathBuf>,
}

impl Document {
    /// Create an empty document
    pub fn new(name: Option<&str>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNTITLED);
        Self {
            id: DocumentId::new(),
            name: name.to_string(),
            history: History::new(),
            stored: None,
            path: None,
        }
    }

    /// Create a document whose first state is `record`
    pub fn from_record(name: &str, record: DocumentRecord) -> Self {
        let mut document = Self::new(Some(name));
        document.stored = Some(record);
        document
    }

    /// Push the canvas onto this document's history
    pub fn commit(&mut self, canvas: &Canvas) -> HistoryResult<bool> {
        let snapshot = StateSnapshot::from_record(&canvas.capture())?;
        Ok(self.history.save_state(snapshot))
    }
}
