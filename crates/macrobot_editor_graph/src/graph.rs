// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::catalog::{self, NUMBER_OPERATORS, STRING_OPERATORS};
use crate::connection::{Connection, ConnectionId};
use crate::node::{Node, NodeId, NodeRegistry, NodeTypeDescriptor, MIN_NODE_SIZE};
use crate::param::{format_number, option_value, ParamKind, ParamSchema, ParamValue};
use crate::port::{DataType, PinDirection, PinFlow, PinRef, PinSpec};
use indexmap::IndexMap;
use std::sync::Arc;

const COMPARE_TYPE: &str = "Type";
const COMPARE_OPERATOR: &str = "Operator";
const COMPARE_INPUTS: [&str; 2] = ["A", "B"];

/// Offset applied to duplicated nodes
pub const DUPLICATE_OFFSET: [f32; 2] = [40.0, 40.0];

/// Outcome of a committed field edit
#[derive(Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    /// Value actually stored after normalization
    pub value: ParamValue,
    /// Connections severed because the new value broke them
    pub broken: Vec<ConnectionError>,
}

/// A macro graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Node types available to this graph
    registry: Arc<NodeRegistry>,
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Next value for `node-N` ids
    next_id: u64,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            next_id: 0,
        }
    }

    /// Node types available to this graph
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Type descriptor of a node instance
    pub fn descriptor(&self, node_id: &NodeId) -> Option<&NodeTypeDescriptor> {
        self.nodes
            .get(node_id)
            .and_then(|n| self.registry.get(&n.node_type))
    }

    /// Counter used for the next allocated id
    pub fn node_id_counter(&self) -> u64 {
        self.next_id
    }

    /// Raise the id counter; it never moves backwards
    pub fn bump_node_id_counter(&mut self, at_least: u64) {
        self.next_id = self.next_id.max(at_least);
    }

    /// Create a node of the given type at a world position
    pub fn add_node(&mut self, type_id: &str, position: [f32; 2]) -> Result<NodeId, GraphError> {
        let descriptor = self
            .registry
            .get(type_id)
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;
        if type_id == catalog::START && self.entry_nodes().next().is_some() {
            return Err(GraphError::DuplicateStart);
        }

        let id = NodeId::from_counter(self.next_id);
        self.next_id += 1;
        let node = Node::new(descriptor, id.clone()).with_position(position[0], position[1]);
        self.nodes.insert(id.clone(), node);
        tracing::debug!("Added {} node {}", type_id, id);

        self.refresh_cross_references();
        Ok(id)
    }

    /// Insert a fully built node, keeping its id
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.registry.get(&node.node_type).is_none() {
            return Err(GraphError::UnknownNodeType(node.node_type));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNodeId(node.id));
        }
        if let Some(n) = node.id.counter() {
            self.bump_node_id_counter(n + 1);
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(node_id)?;
        self.connections.retain(|_, c| !c.involves_node(node_id));
        tracing::debug!("Removed node {}", node_id);
        self.refresh_cross_references();
        Some(node)
    }

    /// Copy a node next to the original.
    ///
    /// Entry points and function definitions are unique by name and cannot
    /// be copied.
    pub fn duplicate_node(&mut self, node_id: &NodeId) -> Result<NodeId, GraphError> {
        let source = self
            .nodes
            .get(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        let descriptor = self
            .registry
            .get(&source.node_type)
            .ok_or_else(|| GraphError::UnknownNodeType(source.node_type.clone()))?;
        if descriptor.id == catalog::START || descriptor.id == catalog::DEFINE_FUNCTION {
            return Err(GraphError::NotDuplicable(descriptor.name.clone()));
        }

        let id = NodeId::from_counter(self.next_id);
        let mut copy = Node::new(descriptor, id.clone()).with_position(
            source.position[0] + DUPLICATE_OFFSET[0],
            source.position[1] + DUPLICATE_OFFSET[1],
        );
        copy.values = source.values.clone();
        copy.pin_types = source.pin_types.clone();
        copy.options = source.options.clone();
        copy.image_path = source.image_path.clone();
        copy.text = source.text.clone();

        self.next_id += 1;
        self.nodes.insert(id.clone(), copy);
        self.refresh_cross_references();
        Ok(id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes of a given type
    pub fn nodes_of_type<'a>(&'a self, type_id: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.values().filter(move |n| n.node_type == type_id)
    }

    /// Entry (`start`) nodes
    pub fn entry_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_of_type(catalog::START)
    }

    /// Move a node to a world position
    pub fn move_node(&mut self, node_id: &NodeId, position: [f32; 2]) -> Result<(), GraphError> {
        self.existing_mut(node_id)?.position = position;
        Ok(())
    }

    /// Resize a node, clamping to the minimum size
    pub fn resize_node(&mut self, node_id: &NodeId, size: [f32; 2]) -> Result<[f32; 2], GraphError> {
        let size = [size[0].max(MIN_NODE_SIZE[0]), size[1].max(MIN_NODE_SIZE[1])];
        self.existing_mut(node_id)?.size = Some(size);
        Ok(size)
    }

    /// Set or clear a node's color tag. `default` clears it.
    pub fn set_color(&mut self, node_id: &NodeId, color: Option<&str>) -> Result<(), GraphError> {
        self.existing_mut(node_id)?.color = color
            .filter(|c| !c.is_empty() && *c != "default")
            .map(str::to_string);
        Ok(())
    }

    /// Set a comment's text
    pub fn set_text(&mut self, node_id: &NodeId, text: &str) -> Result<(), GraphError> {
        self.existing_mut(node_id)?.text = Some(text.to_string());
        Ok(())
    }

    /// Set or clear the image reference of a node
    pub fn set_image_path(&mut self, node_id: &NodeId, path: Option<String>) -> Result<(), GraphError> {
        self.existing_mut(node_id)?.image_path = path.filter(|p| !p.is_empty());
        Ok(())
    }

    /// Flip the pinned flag, returning the new state
    pub fn toggle_pinned(&mut self, node_id: &NodeId) -> Result<bool, GraphError> {
        let node = self.existing_mut(node_id)?;
        node.pinned = !node.pinned;
        Ok(node.pinned)
    }

    fn existing_mut(&mut self, node_id: &NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))
    }

    /// Resolve a pin reference against the node's declared pins
    pub fn pin_spec(&self, pin: &PinRef) -> Option<&PinSpec> {
        self.descriptor(&pin.node)?
            .pin(pin.flow, pin.direction, &pin.name)
            .filter(|p| p.has_pin)
    }

    /// Check whether two pins may be wired together.
    ///
    /// The pins may be given in either order. On success the pair is
    /// returned as (output, input).
    pub fn check_connection(&self, a: &PinRef, b: &PinRef) -> Result<(PinRef, PinRef), ConnectionError> {
        if a.node == b.node {
            return Err(ConnectionError::SelfLoop);
        }
        if a.direction == b.direction {
            return Err(ConnectionError::SameDirection);
        }
        if a.flow != b.flow {
            return Err(ConnectionError::FlowMismatch);
        }

        let (output, input) = match a.direction {
            PinDirection::Output => (a, b),
            PinDirection::Input => (b, a),
        };
        let from = self
            .nodes
            .get(&output.node)
            .ok_or_else(|| ConnectionError::NodeNotFound(output.node.clone()))?;
        let to = self
            .nodes
            .get(&input.node)
            .ok_or_else(|| ConnectionError::NodeNotFound(input.node.clone()))?;
        let out_spec = self
            .pin_spec(output)
            .ok_or_else(|| ConnectionError::PinNotFound(output.name.clone()))?;
        let in_spec = self
            .pin_spec(input)
            .ok_or_else(|| ConnectionError::PinNotFound(input.name.clone()))?;

        if output.flow == PinFlow::Data {
            let out_type = from.data_type_of(out_spec).unwrap_or(DataType::Any);
            let in_type = to.data_type_of(in_spec).unwrap_or(DataType::Any);
            if out_type == DataType::Any || in_type == DataType::Any {
                return Ok((output.clone(), input.clone()));
            }
            if out_type != in_type {
                return Err(ConnectionError::TypeMismatch {
                    output: out_type,
                    input: in_type,
                });
            }
            if from.node_type == catalog::NUMBER_LITERAL {
                if let Some((min, max)) = literal_out_of_range(from, in_spec) {
                    return Err(ConnectionError::OutOfRange {
                        pin: in_spec.name.clone(),
                        min,
                        max,
                    });
                }
            }
        }

        Ok((output.clone(), input.clone()))
    }

    /// Whether two pins may be wired together
    pub fn is_valid_connection(&self, a: &PinRef, b: &PinRef) -> bool {
        self.check_connection(a, b).is_ok()
    }

    /// Wire two pins together.
    ///
    /// A data input has a single writer: any connection already feeding it
    /// is replaced.
    pub fn create_connection(&mut self, a: &PinRef, b: &PinRef) -> Result<ConnectionId, ConnectionError> {
        let (output, input) = self.check_connection(a, b)?;
        if let Some(existing) = self
            .connections
            .values()
            .find(|c| c.touches(&output) && c.touches(&input))
        {
            return Ok(existing.id);
        }
        if input.flow == PinFlow::Data {
            self.remove_connections_for_pin(&input);
        }

        let connection = Connection::new(output.node, output.name, input.node, input.name, input.flow);
        let id = connection.id;
        tracing::debug!(
            "Connected {}.{} -> {}.{}",
            connection.from_node,
            connection.from_pin,
            connection.to_node,
            connection.to_pin
        );
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Remove every connection touching a pin
    pub fn remove_connections_for_pin(&mut self, pin: &PinRef) -> Vec<Connection> {
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .connections
            .drain(..)
            .partition(|(_, c)| c.touches(pin));
        self.connections = kept.into_iter().collect();
        removed.into_iter().map(|(_, c)| c).collect()
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&connection_id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections touching a pin
    pub fn connections_at<'a>(&'a self, pin: &'a PinRef) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.touches(pin))
    }

    /// Get connections involving a node
    pub fn connections_for_node<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether a data input currently has a writer
    pub fn is_input_connected(&self, node_id: &NodeId, pin_name: &str) -> bool {
        self.connections
            .values()
            .any(|c| c.flow == PinFlow::Data && &c.to_node == node_id && c.to_pin == pin_name)
    }

    /// Options offered by a drop-down field on a node
    pub fn field_options(&self, node_id: &NodeId, field: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(node_id) else {
            return Vec::new();
        };
        if let Some(options) = node.options.get(field) {
            return options.clone();
        }
        self.descriptor(node_id)
            .and_then(|d| d.field(field))
            .map(ParamSchema::option_values)
            .unwrap_or_default()
    }

    /// Whether a field is shown given the node's current values.
    ///
    /// A field whose controlling sibling is missing stays hidden.
    pub fn is_field_visible(&self, node_id: &NodeId, field: &str) -> bool {
        let (Some(node), Some(descriptor)) = (self.nodes.get(node_id), self.descriptor(node_id)) else {
            return false;
        };
        let Some(schema) = descriptor.field(field) else {
            return false;
        };
        match &schema.condition {
            None => true,
            Some(condition) => node.text_value(&condition.field) == Some(condition.value.as_str()),
        }
    }

    /// Commit a field edit.
    ///
    /// The raw value is normalized by the field's kind. Editing a number
    /// literal re-checks its outgoing wires and severs any it now violates.
    /// Changing a comparison's type retypes its inputs and drops their wires.
    pub fn set_param(&mut self, node_id: &NodeId, field: &str, raw: ParamValue) -> Result<ParamUpdate, GraphError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        let node_type = node.node_type.clone();
        let schema = self
            .descriptor(node_id)
            .and_then(|d| d.field(field))
            .filter(|f| f.stores_value())
            .ok_or_else(|| GraphError::UnknownField {
                node: node_id.clone(),
                field: field.to_string(),
            })?;

        let value = schema.normalize(&raw);
        if let (ParamKind::Enum { options }, Some(text)) = (&schema.kind, value.as_text()) {
            let dynamic = options.is_empty();
            let allowed = self.field_options(node_id, field);
            if !(dynamic && text.is_empty()) && !allowed.iter().any(|o| o == text) {
                return Err(GraphError::InvalidOption {
                    field: field.to_string(),
                    value: text.to_string(),
                });
            }
        }

        self.existing_mut(node_id)?
            .values
            .insert(field.to_string(), value.clone());

        let mut broken = Vec::new();
        match (node_type.as_str(), field) {
            (catalog::NUMBER_LITERAL, catalog::LITERAL_VALUE) => {
                broken = self.revalidate_literal(node_id);
            }
            (catalog::COMPARE, COMPARE_TYPE) => {
                for pin in COMPARE_INPUTS {
                    self.remove_connections_for_pin(&PinRef::data_in(node_id.clone(), pin));
                }
                self.apply_compare_type(node_id, true);
            }
            (catalog::DEFINE_FUNCTION, catalog::FUNCTION_NAME)
            | (catalog::SET_VARIABLE, catalog::VARIABLE_NAME) => {
                self.refresh_cross_references();
            }
            _ => {}
        }

        Ok(ParamUpdate { value, broken })
    }

    /// Recompute per-instance pin types and option lists from stored values
    pub fn recompute_derived(&mut self) {
        let compares: Vec<NodeId> = self
            .nodes_of_type(catalog::COMPARE)
            .filter(|n| n.text_value(COMPARE_TYPE) == Some("string"))
            .map(|n| n.id.clone())
            .collect();
        for id in compares {
            self.apply_compare_type(&id, false);
        }
        self.refresh_cross_references();
    }

    fn apply_compare_type(&mut self, node_id: &NodeId, reset_operator: bool) {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return;
        };
        let (data_type, operators): (DataType, &[&str]) = match node.text_value(COMPARE_TYPE) {
            Some("string") => (DataType::String, &STRING_OPERATORS[..]),
            _ => (DataType::Number, &NUMBER_OPERATORS[..]),
        };
        for pin in COMPARE_INPUTS {
            node.pin_types.insert(pin.to_string(), data_type);
        }

        let values: Vec<String> = operators.iter().map(|o| option_value(o)).collect();
        let current_valid = node
            .text_value(COMPARE_OPERATOR)
            .is_some_and(|op| values.iter().any(|v| v == op));
        if reset_operator || !current_valid {
            node.values
                .insert(COMPARE_OPERATOR.to_string(), ParamValue::from(values[0].clone()));
        }
        node.options.insert(COMPARE_OPERATOR.to_string(), values);
    }

    fn revalidate_literal(&mut self, literal_id: &NodeId) -> Vec<ConnectionError> {
        let Some(literal) = self.nodes.get(literal_id) else {
            return Vec::new();
        };
        let mut violations = Vec::new();
        for connection in self.connections.values().filter(|c| &c.from_node == literal_id) {
            let Some(target) = self.pin_spec(&connection.target()) else {
                continue;
            };
            if let Some((min, max)) = literal_out_of_range(literal, target) {
                violations.push((
                    connection.id,
                    ConnectionError::Broken {
                        pin: target.name.clone(),
                        min,
                        max,
                    },
                ));
            }
        }

        violations
            .into_iter()
            .map(|(id, error)| {
                self.connections.shift_remove(&id);
                tracing::info!("{}", error);
                error
            })
            .collect()
    }
}

/// Formatted bounds of `target` when the literal's value lies outside them
fn literal_out_of_range(literal: &Node, target: &PinSpec) -> Option<(String, String)> {
    let (min, max) = target.bounds()?;
    let min = min.unwrap_or(f64::NEG_INFINITY);
    let max = max.unwrap_or(f64::INFINITY);
    let value = literal.number(catalog::LITERAL_VALUE)?;
    (value < min || value > max).then(|| (format_number(min), format_number(max)))
}

/// Error when wiring two pins
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found
    #[error("Pin not found: {0}")]
    PinNotFound(String),

    /// Both pins are on the same node
    #[error("Cannot connect a node to itself")]
    SelfLoop,

    /// Two inputs or two outputs
    #[error("A connection needs one input and one output")]
    SameDirection,

    /// Execution pin paired with a data pin
    #[error("Execution pins cannot connect to data pins")]
    FlowMismatch,

    /// Data types differ
    #[error("Connection failed! Cannot connect a '{output}' output to a '{input}' input.")]
    TypeMismatch {
        /// Output side type
        output: DataType,
        /// Input side type
        input: DataType,
    },

    /// Literal value outside the target's bounds
    #[error("Connection failed! The input for \"{pin}\" must be between {min} and {max}.")]
    OutOfRange {
        /// Target pin
        pin: String,
        /// Formatted lower bound
        min: String,
        /// Formatted upper bound
        max: String,
    },

    /// An existing wire was severed after its literal changed
    #[error("Connection broken! Input for \"{pin}\" must be between {min} and {max}.")]
    Broken {
        /// Target pin
        pin: String,
        /// Formatted lower bound
        min: String,
        /// Formatted upper bound
        max: String,
    },
}

impl ConnectionError {
    /// Whether the user should be told about this failure.
    ///
    /// Structural mismatches (same node, same direction, mixed flow) just
    /// cancel the wire.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. } | Self::OutOfRange { .. } | Self::Broken { .. }
        )
    }
}

/// Error when editing the graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Type id not in the registry
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Id already taken
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    /// Second entry node
    #[error("A 'Start' node already exists on the canvas. Only one is allowed.")]
    DuplicateStart,

    /// Node type that must stay unique
    #[error("A '{0}' node cannot be duplicated.")]
    NotDuplicable(String),

    /// Field not declared by the node type
    #[error("Node {node} has no field \"{field}\"")]
    UnknownField {
        /// Node
        node: NodeId,
        /// Field name
        field: String,
    },

    /// Value not among the drop-down's options
    #[error("\"{value}\" is not an option of \"{field}\"")]
    InvalidOption {
        /// Field name
        field: String,
        /// Rejected value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::*;

    fn graph() -> Graph {
        Graph::new(Arc::new(create_macro_registry()))
    }

    #[test]
    fn test_single_start_node() {
        let mut g = graph();
        g.add_node(START, [0.0, 0.0]).unwrap();
        assert_eq!(g.add_node(START, [10.0, 0.0]), Err(GraphError::DuplicateStart));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut g = graph();
        let a = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        g.remove_node(&a);
        let b = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        assert_eq!(a.as_str(), "node-0");
        assert_eq!(b.as_str(), "node-1");
    }

    #[test]
    fn test_structural_rules() {
        let mut g = graph();
        let a = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let b = g.add_node(DELAY, [0.0, 0.0]).unwrap();

        let self_loop = g.check_connection(&PinRef::exec_out(a.clone(), "exec"), &PinRef::exec_in(a.clone(), "exec"));
        assert_eq!(self_loop, Err(ConnectionError::SelfLoop));

        let same = g.check_connection(&PinRef::exec_in(a.clone(), "exec"), &PinRef::exec_in(b.clone(), "exec"));
        assert_eq!(same, Err(ConnectionError::SameDirection));

        let mixed = g.check_connection(&PinRef::exec_out(a.clone(), "exec"), &PinRef::data_in(b.clone(), "Duration"));
        assert_eq!(mixed, Err(ConnectionError::FlowMismatch));
        assert!(!mixed.unwrap_err().is_reported());
    }

    #[test]
    fn test_compatibility_ignores_argument_order() {
        let mut g = graph();
        let lit = g.add_node(STRING_LITERAL, [0.0, 0.0]).unwrap();
        let num = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let set = g.add_node(SET_VARIABLE, [0.0, 0.0]).unwrap();
        let delay = g.add_node(DELAY, [0.0, 0.0]).unwrap();

        let pairs = [
            (PinRef::data_out(lit.clone(), "out"), PinRef::data_in(delay.clone(), "Duration")),
            (PinRef::data_out(num.clone(), "out"), PinRef::data_in(delay.clone(), "Duration")),
            (PinRef::data_out(lit.clone(), "out"), PinRef::data_in(set.clone(), "Value")),
            (PinRef::data_out(num.clone(), "out"), PinRef::data_in(set.clone(), "Name")),
        ];
        for (a, b) in &pairs {
            assert_eq!(g.is_valid_connection(a, b), g.is_valid_connection(b, a));
        }
    }

    #[test]
    fn test_type_mismatch_message() {
        let mut g = graph();
        let lit = g.add_node(STRING_LITERAL, [0.0, 0.0]).unwrap();
        let delay = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let err = g
            .create_connection(&PinRef::data_in(delay, "Duration"), &PinRef::data_out(lit, "out"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection failed! Cannot connect a 'String' output to a 'Number' input."
        );
        assert_eq!(g.connection_count(), 0);
    }

    #[test]
    fn test_any_accepts_every_type() {
        let mut g = graph();
        let num = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let set = g.add_node(SET_VARIABLE, [0.0, 0.0]).unwrap();
        assert!(g
            .create_connection(&PinRef::data_out(num, "out"), &PinRef::data_in(set, "Value"))
            .is_ok());
    }

    #[test]
    fn test_any_input_takes_every_concrete_output() {
        let mut g = graph();
        let outputs = [
            PinRef::data_out(g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap(), "out"),
            PinRef::data_out(g.add_node(STRING_LITERAL, [0.0, 0.0]).unwrap(), "out"),
            PinRef::data_out(g.add_node(COMPARE, [0.0, 0.0]).unwrap(), "Result"),
            PinRef::data_out(g.add_node(FIND_IMAGE, [0.0, 0.0]).unwrap(), "X"),
        ];
        for out in &outputs {
            let set = g.add_node(SET_VARIABLE, [0.0, 0.0]).unwrap();
            assert!(g.check_connection(out, &PinRef::data_in(set, "Value")).is_ok());
        }
    }

    #[test]
    fn test_key_input_rejects_string_output() {
        let mut g = graph();
        let lit = g.add_node(STRING_LITERAL, [0.0, 0.0]).unwrap();
        let key = g.add_node(KEY_PRESS, [0.0, 0.0]).unwrap();
        let err = g
            .create_connection(&PinRef::data_out(lit, "out"), &PinRef::data_in(key.clone(), "Key"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection failed! Cannot connect a 'String' output to a 'Key' input."
        );
        assert!(!g.is_input_connected(&key, "Key"));
    }

    #[test]
    fn test_literal_range_rule() {
        let mut g = graph();
        let lit = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let find = g.add_node(FIND_IMAGE, [0.0, 0.0]).unwrap();
        let out = PinRef::data_out(lit.clone(), "out");
        let confidence = PinRef::data_in(find, "Confidence");

        g.set_param(&lit, LITERAL_VALUE, ParamValue::from(150.0)).unwrap();
        let err = g.create_connection(&out, &confidence).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection failed! The input for \"Confidence\" must be between 1 and 100."
        );

        g.set_param(&lit, LITERAL_VALUE, ParamValue::from(50.0)).unwrap();
        assert!(g.create_connection(&out, &confidence).is_ok());
    }

    #[test]
    fn test_literal_edit_severs_connection() {
        let mut g = graph();
        let lit = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let find = g.add_node(FIND_IMAGE, [0.0, 0.0]).unwrap();
        g.set_param(&lit, LITERAL_VALUE, ParamValue::from(50.0)).unwrap();
        g.create_connection(&PinRef::data_out(lit.clone(), "out"), &PinRef::data_in(find.clone(), "Confidence"))
            .unwrap();

        let update = g.set_param(&lit, LITERAL_VALUE, ParamValue::from(0.0)).unwrap();
        assert_eq!(update.broken.len(), 1);
        assert_eq!(
            update.broken[0].to_string(),
            "Connection broken! Input for \"Confidence\" must be between 1 and 100."
        );
        assert!(!g.is_input_connected(&find, "Confidence"));
    }

    #[test]
    fn test_data_input_has_single_writer() {
        let mut g = graph();
        let a = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let b = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let delay = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let input = PinRef::data_in(delay.clone(), "Duration");

        g.create_connection(&PinRef::data_out(a, "out"), &input).unwrap();
        g.create_connection(&PinRef::data_out(b.clone(), "out"), &input).unwrap();
        let writers: Vec<_> = g.connections_at(&input).collect();
        assert_eq!(writers.len(), 1);
        assert_eq!(writers[0].from_node, b);
    }

    #[test]
    fn test_exec_fan_in_allowed() {
        let mut g = graph();
        let a = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let b = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let c = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let target = PinRef::exec_in(c, "exec");
        g.create_connection(&PinRef::exec_out(a, "exec"), &target).unwrap();
        g.create_connection(&PinRef::exec_out(b, "exec"), &target).unwrap();
        assert_eq!(g.connections_at(&target).count(), 2);
    }

    #[test]
    fn test_literal_pins_have_no_input() {
        let mut g = graph();
        let a = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let b = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let err = g.check_connection(&PinRef::data_out(a, "out"), &PinRef::data_in(b, LITERAL_VALUE));
        assert_eq!(err, Err(ConnectionError::PinNotFound(LITERAL_VALUE.to_string())));
    }

    #[test]
    fn test_compare_retyping() {
        let mut g = graph();
        let cmp = g.add_node(COMPARE, [0.0, 0.0]).unwrap();
        let num = g.add_node(NUMBER_LITERAL, [0.0, 0.0]).unwrap();
        let text = g.add_node(STRING_LITERAL, [0.0, 0.0]).unwrap();
        g.create_connection(&PinRef::data_out(num.clone(), "out"), &PinRef::data_in(cmp.clone(), "A"))
            .unwrap();
        g.set_param(&cmp, "Operator", ParamValue::from(">=")).unwrap();

        g.set_param(&cmp, "Type", ParamValue::from("string")).unwrap();
        assert!(!g.is_input_connected(&cmp, "A"));
        assert_eq!(g.node(&cmp).unwrap().text_value("Operator"), Some("=="));
        assert_eq!(
            g.field_options(&cmp, "Operator"),
            vec!["==", "!=", "contains", "starts_with", "ends_with"]
        );
        assert!(g
            .check_connection(&PinRef::data_out(num, "out"), &PinRef::data_in(cmp.clone(), "B"))
            .is_err());
        assert!(g
            .create_connection(&PinRef::data_out(text, "out"), &PinRef::data_in(cmp.clone(), "B"))
            .is_ok());
        assert!(g.set_param(&cmp, "Operator", ParamValue::from(">")).is_err());
    }

    #[test]
    fn test_conditional_visibility() {
        let mut g = graph();
        let key = g.add_node(KEY_PRESS, [0.0, 0.0]).unwrap();
        assert!(!g.is_field_visible(&key, "Duration"));
        g.set_param(&key, "Action", ParamValue::from("hold")).unwrap();
        assert!(g.is_field_visible(&key, "Duration"));
        assert!(g.is_field_visible(&key, "Key"));
    }

    #[test]
    fn test_duplicate_rules() {
        let mut g = graph();
        let start = g.add_node(START, [0.0, 0.0]).unwrap();
        assert_eq!(
            g.duplicate_node(&start).unwrap_err().to_string(),
            "A 'Start' node cannot be duplicated."
        );

        let mv = g.add_node(MOUSE_MOVE, [10.0, 20.0]).unwrap();
        g.set_param(&mv, "X", ParamValue::from(300.0)).unwrap();
        let copy = g.duplicate_node(&mv).unwrap();
        let copy = g.node(&copy).unwrap();
        assert_eq!(copy.position, [50.0, 60.0]);
        assert_eq!(copy.number("X"), Some(300.0));
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut g = graph();
        let c = g.add_node(COMMENT, [0.0, 0.0]).unwrap();
        assert_eq!(g.resize_node(&c, [20.0, 300.0]).unwrap(), [150.0, 300.0]);
    }

    #[test]
    fn test_remove_node_drops_connections() {
        let mut g = graph();
        let a = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        let b = g.add_node(DELAY, [0.0, 0.0]).unwrap();
        g.create_connection(&PinRef::exec_out(a.clone(), "exec"), &PinRef::exec_in(b, "exec"))
            .unwrap();
        g.remove_node(&a);
        assert_eq!(g.connection_count(), 0);
    }
}
