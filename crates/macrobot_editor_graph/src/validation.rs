// SPDX-License-Identifier: MIT OR Apache-2.0
//! Static checks over a macro graph.

use crate::catalog;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::PinFlow;
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};

/// Findings of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Human readable warnings, deduplicated, in discovery order
    pub warnings: IndexSet<String>,
    /// Nodes to highlight
    pub flagged: IndexSet<NodeId>,
}

impl ValidationReport {
    /// True when nothing was found
    pub fn is_valid(&self) -> bool {
        self.warnings.is_empty()
    }

    /// One message suitable for a notice
    pub fn summary(&self) -> String {
        if self.is_valid() {
            return "Validation successful! No issues found.".to_string();
        }
        let lines: Vec<&str> = self.warnings.iter().map(String::as_str).collect();
        format!("Validation finished with warnings:\n\n- {}", lines.join("\n- "))
    }

    fn flag(&mut self, node: &NodeId, warning: String) {
        self.warnings.insert(warning);
        self.flagged.insert(node.clone());
    }
}

/// Check execution wiring. The graph is not modified.
///
/// Every non-entry node with an execution input must have that input wired,
/// and every such node must be reachable from an entry node over execution
/// wires.
pub fn validate(graph: &Graph) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut executable = Vec::new();

    for node in graph.nodes() {
        let Some(descriptor) = graph.descriptor(&node.id) else {
            continue;
        };
        if !descriptor.has_exec_pins() {
            continue;
        }
        executable.push((node.id.clone(), descriptor));

        if descriptor.id == catalog::START {
            continue;
        }
        for pin in &descriptor.exec_inputs {
            let wired = graph
                .connections()
                .any(|c| c.flow == PinFlow::Exec && c.to_node == node.id && c.to_pin == pin.name);
            if !wired {
                report.flag(
                    &node.id,
                    format!("Node \"{}\" has an unconnected execution input.", descriptor.name),
                );
            }
        }
    }

    let entries: Vec<&NodeId> = graph.entry_nodes().map(|n| &n.id).collect();
    if entries.is_empty() {
        if !executable.is_empty() {
            report
                .warnings
                .insert("No 'Start' node found. The macro has no entry point.".to_string());
            report.flagged.extend(executable.into_iter().map(|(id, _)| id));
        }
        return report;
    }

    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut queue: VecDeque<&NodeId> = VecDeque::new();
    for entry in entries {
        if visited.insert(entry) {
            queue.push_back(entry);
        }
    }
    while let Some(current) = queue.pop_front() {
        for c in graph.connections() {
            if c.flow == PinFlow::Exec && &c.from_node == current && visited.insert(&c.to_node) {
                queue.push_back(&c.to_node);
            }
        }
    }

    for (id, descriptor) in executable {
        if !descriptor.exec_inputs.is_empty() && !visited.contains(&id) {
            report.flag(
                &id,
                format!(
                    "Node \"{}\" is part of an unreachable execution chain.",
                    descriptor.name
                ),
            );
        }
    }

    tracing::debug!("Validation found {} warning(s)", report.warnings.len());
    report
}
