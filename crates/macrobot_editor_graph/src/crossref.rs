// SPDX-License-Identifier: MIT OR Apache-2.0
//! Function and variable selectors.
//!
//! `call_function` and `get_variable` nodes choose from names declared
//! elsewhere in the same document. The option lists are rebuilt from scratch
//! after every structural change.

use crate::catalog::{self, FUNCTION_NAME, VARIABLE_NAME};
use crate::graph::Graph;
use crate::node::NodeId;
use crate::param::ParamValue;
use indexmap::IndexSet;

/// Shown in an empty function selector
pub const NO_FUNCTIONS: &str = "No functions defined";
/// Shown in an empty variable selector
pub const NO_VARIABLES: &str = "No variables set";

/// Names declared in a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferences {
    /// Function names, in declaration order
    pub functions: IndexSet<String>,
    /// Variable names, in declaration order
    pub variables: IndexSet<String>,
}

impl Graph {
    /// Collect declared names without touching the selectors
    pub fn cross_references(&self) -> CrossReferences {
        let declared = |type_id: &str, field: &str| -> IndexSet<String> {
            self.nodes_of_type(type_id)
                .filter_map(|n| n.text_value(field))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        };
        CrossReferences {
            functions: declared(catalog::DEFINE_FUNCTION, FUNCTION_NAME),
            variables: declared(catalog::SET_VARIABLE, VARIABLE_NAME),
        }
    }

    /// Rebuild every function and variable selector.
    ///
    /// A selection survives if its name is still declared; otherwise it is
    /// cleared.
    pub fn refresh_cross_references(&mut self) -> CrossReferences {
        let refs = self.cross_references();
        self.fill_selectors(catalog::CALL_FUNCTION, FUNCTION_NAME, &refs.functions);
        self.fill_selectors(catalog::GET_VARIABLE, VARIABLE_NAME, &refs.variables);
        refs
    }

    fn fill_selectors(&mut self, type_id: &str, field: &str, names: &IndexSet<String>) {
        let ids: Vec<NodeId> = self.nodes_of_type(type_id).map(|n| n.id.clone()).collect();
        for id in ids {
            let Some(node) = self.node_mut(&id) else {
                continue;
            };
            let options: Vec<String> = names.iter().cloned().collect();
            let keep = node
                .text_value(field)
                .is_some_and(|current| names.contains(current));
            if !keep {
                node.values.insert(field.to_string(), ParamValue::from(""));
            }
            node.options.insert(field.to_string(), options);
        }
    }
}
