// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (wire) definitions for the graph.

use crate::node::NodeId;
use crate::port::{PinDirection, PinFlow, PinRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A wire from an output pin to an input pin of the same flow class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Node owning the output pin
    pub from_node: NodeId,
    /// Output pin name
    pub from_pin: String,
    /// Node owning the input pin
    pub to_node: NodeId,
    /// Input pin name
    pub to_pin: String,
    /// Flow class shared by both endpoints
    pub flow: PinFlow,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        from_node: NodeId,
        from_pin: impl Into<String>,
        to_node: NodeId,
        to_pin: impl Into<String>,
        flow: PinFlow,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node,
            from_pin: from_pin.into(),
            to_node,
            to_pin: to_pin.into(),
            flow,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        &self.from_node == node_id || &self.to_node == node_id
    }

    /// Check if this connection ends at the given pin
    pub fn touches(&self, pin: &PinRef) -> bool {
        if pin.flow != self.flow {
            return false;
        }
        match pin.direction {
            PinDirection::Output => self.from_node == pin.node && self.from_pin == pin.name,
            PinDirection::Input => self.to_node == pin.node && self.to_pin == pin.name,
        }
    }

    /// The output endpoint
    pub fn source(&self) -> PinRef {
        PinRef::new(
            self.from_node.clone(),
            self.flow,
            PinDirection::Output,
            self.from_pin.clone(),
        )
    }

    /// The input endpoint
    pub fn target(&self) -> PinRef {
        PinRef::new(
            self.to_node.clone(),
            self.flow,
            PinDirection::Input,
            self.to_pin.clone(),
        )
    }
}
