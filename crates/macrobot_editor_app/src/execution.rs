// SPDX-License-Identifier: MIT OR Apache-2.0
//! Handoff to the macro executor.

use macrobot_editor_graph::{MacroRecord, NodeId};
use thiserror::Error;

/// Executor errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Executor refused or failed to start the macro
    #[error("Could not start macro: {0}")]
    Rejected(String),
}

/// Runs serialized macros outside the editor
pub trait ExecutionBackend {
    /// Start running a macro. Progress comes back through the session's
    /// highlight callbacks.
    fn run_macro(&mut self, record: &MacroRecord) -> Result<(), ExecutionError>;

    /// Stop whatever is running
    fn stop(&mut self);
}

/// Backend that logs the handoff and runs nothing
#[derive(Debug, Default)]
pub struct DryRunBackend;

impl ExecutionBackend for DryRunBackend {
    fn run_macro(&mut self, record: &MacroRecord) -> Result<(), ExecutionError> {
        tracing::info!(
            "Dry run of macro at {} ({} nodes, {} connections)",
            record.entry_node_id,
            record.nodes.len(),
            record.connections.len()
        );
        Ok(())
    }

    fn stop(&mut self) {
        tracing::info!("Dry run stopped");
    }
}

/// Node currently being executed, for highlighting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionHighlight {
    current: Option<NodeId>,
}

impl ExecutionHighlight {
    /// Highlight one node, replacing any previous highlight
    pub fn set(&mut self, node: NodeId) {
        self.current = Some(node);
    }

    /// Remove the highlight
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Highlighted node
    pub fn current(&self) -> Option<&NodeId> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrobot_editor_graph::{catalog, create_macro_registry, Graph};
    use std::sync::Arc;

    #[test]
    fn test_dry_run_accepts_any_macro() {
        let mut graph = Graph::new(Arc::new(create_macro_registry()));
        let start = graph.add_node(catalog::START, [0.0, 0.0]).unwrap();
        let record = MacroRecord::capture(&graph, &start).unwrap();

        let mut backend = DryRunBackend;
        assert!(backend.run_macro(&record).is_ok());
        backend.stop();
    }

    #[test]
    fn test_highlight_lifecycle() {
        let mut highlight = ExecutionHighlight::default();
        assert_eq!(highlight.current(), None);

        highlight.set(NodeId::from("node-1"));
        highlight.set(NodeId::from("node-4"));
        assert_eq!(highlight.current(), Some(&NodeId::from("node-4")));

        highlight.clear();
        assert_eq!(highlight.current(), None);
    }

    #[test]
    fn test_rejection_message() {
        let err = ExecutionError::Rejected("runner offline".into());
        assert_eq!(err.to_string(), "Could not start macro: runner offline");
    }
}
