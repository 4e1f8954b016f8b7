// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the macro graph.

use crate::param::{ParamSchema, ParamValue};
use crate::port::{DataType, PinDirection, PinFlow, PinSpec};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node visual dimensions
const NODE_WIDTH: f32 = 180.0;
pub(crate) const NODE_HEADER_HEIGHT: f32 = 24.0;
pub(crate) const ROW_HEIGHT: f32 = 22.0;

/// Default size of a freshly placed comment
pub const COMMENT_SIZE: [f32; 2] = [200.0, 100.0];

/// Smallest size a node can be resized to
pub const MIN_NODE_SIZE: [f32; 2] = [150.0, 80.0];

/// Unique identifier for a node within its document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Id for the `n`th node allocated by a document
    pub fn from_counter(n: u64) -> Self {
        Self(format!("node-{n}"))
    }

    /// Counter value encoded in the id, if it follows the `node-N` form
    pub fn counter(&self) -> Option<u64> {
        self.0.strip_prefix("node-")?.parse().ok()
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Nodes taking part in execution order
    Execution,
    /// Pure data and logic nodes
    Data,
    /// Canvas annotations
    Annotation,
}

/// Licensing tier of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Only available in the paid edition
    Pro,
}

/// Node type definition
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTypeDescriptor {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Optional tier flag
    pub tier: Option<Tier>,
    /// Execution inputs
    pub exec_inputs: Vec<PinSpec>,
    /// Execution outputs
    pub exec_outputs: Vec<PinSpec>,
    /// Data inputs
    pub data_inputs: Vec<PinSpec>,
    /// Data outputs
    pub data_outputs: Vec<PinSpec>,
    /// Parameters that are not pins
    pub params: Vec<ParamSchema>,
}

impl NodeTypeDescriptor {
    /// Create an empty descriptor
    pub fn new(id: &str, name: &str, category: NodeCategory, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            description: description.to_string(),
            tier: None,
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            data_inputs: Vec::new(),
            data_outputs: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Pins of one (flow, direction) group
    pub fn pins(&self, flow: PinFlow, direction: PinDirection) -> &[PinSpec] {
        match (flow, direction) {
            (PinFlow::Exec, PinDirection::Input) => &self.exec_inputs,
            (PinFlow::Exec, PinDirection::Output) => &self.exec_outputs,
            (PinFlow::Data, PinDirection::Input) => &self.data_inputs,
            (PinFlow::Data, PinDirection::Output) => &self.data_outputs,
        }
    }

    /// Find a pin by flow, direction and name
    pub fn pin(&self, flow: PinFlow, direction: PinDirection, name: &str) -> Option<&PinSpec> {
        self.pins(flow, direction).iter().find(|p| p.name == name)
    }

    /// Whether the node takes part in execution order
    pub fn has_exec_pins(&self) -> bool {
        !self.exec_inputs.is_empty() || !self.exec_outputs.is_empty()
    }

    /// Every editable field: inline editors of data inputs, then parameters
    pub fn fields(&self) -> impl Iterator<Item = &ParamSchema> {
        self.data_inputs
            .iter()
            .filter_map(|p| p.editor.as_ref())
            .chain(self.params.iter())
    }

    /// Find an editable field by name
    pub fn field(&self, name: &str) -> Option<&ParamSchema> {
        self.fields().find(|f| f.name == name)
    }

    /// Size used for layout when the node was never resized
    pub fn default_size(&self) -> [f32; 2] {
        if self.id == crate::catalog::COMMENT {
            return COMMENT_SIZE;
        }
        let left = self.exec_inputs.len() + self.data_inputs.iter().filter(|p| p.has_pin).count();
        let right = self.exec_outputs.len() + self.data_outputs.len();
        let body = self.params.len() + self.data_inputs.iter().filter(|p| !p.has_pin).count();
        let rows = left.max(right) + body;
        [NODE_WIDTH, NODE_HEADER_HEIGHT + rows.max(1) as f32 * ROW_HEIGHT]
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Position in the graph (world space, top-left corner)
    pub position: [f32; 2],
    /// Explicit size, set once the node was resized
    pub size: Option<[f32; 2]>,
    /// Current field values by field name
    pub values: IndexMap<String, ParamValue>,
    /// Free-form text (comment nodes)
    pub text: Option<String>,
    /// Color tag (optional)
    pub color: Option<String>,
    /// Image reference (image-match nodes)
    pub image_path: Option<String>,
    /// Pinned nodes ignore drag gestures
    pub pinned: bool,
    /// Data types overriding the declared ones, by data pin name
    pub pin_types: IndexMap<String, DataType>,
    /// Option values overriding the declared ones, by field name
    pub options: IndexMap<String, Vec<String>>,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeTypeDescriptor, id: NodeId) -> Self {
        let values = node_type
            .fields()
            .filter(|f| f.stores_value())
            .map(|f| (f.name.clone(), f.default.clone()))
            .collect();
        let is_comment = node_type.id == crate::catalog::COMMENT;
        Self {
            id,
            node_type: node_type.id.clone(),
            position: [0.0, 0.0],
            size: is_comment.then_some(COMMENT_SIZE),
            values,
            text: is_comment.then(String::new),
            color: None,
            image_path: None,
            pinned: false,
            pin_types: IndexMap::new(),
            options: IndexMap::new(),
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Get a field value
    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Get a field value as a number
    pub fn number(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(ParamValue::as_number)
    }

    /// Get a field value as text
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(ParamValue::as_text)
    }

    /// Effective data type of a data pin, honoring per-instance overrides
    pub fn data_type_of(&self, pin: &PinSpec) -> Option<DataType> {
        self.pin_types.get(&pin.name).copied().or(pin.data_type)
    }

    /// World-space rectangle of the node
    pub fn rect(&self, descriptor: &NodeTypeDescriptor) -> Rect {
        let [w, h] = self.size.unwrap_or_else(|| descriptor.default_size());
        Rect::from_min_size(Pos2::new(self.position[0], self.position[1]), Vec2::new(w, h))
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeTypeDescriptor>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeTypeDescriptor) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeTypeDescriptor> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeTypeDescriptor> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeTypeDescriptor> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str, id: NodeId) -> Option<Node> {
        self.get(type_id).map(|t| Node::new(t, id))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}
