// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use crate::node::NodeId;
use crate::param::ParamSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flow class of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinFlow {
    /// Execution order
    Exec,
    /// Value flow
    Data,
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Value type carried by a data pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Numeric value
    Number,
    /// Text value
    String,
    /// True/false value
    Boolean,
    /// Wildcard, connects to every data type
    Any,
    /// Image reference
    Image,
    /// Recorded key combination
    #[serde(rename = "key_recorder")]
    KeyCombo,
}

impl DataType {
    /// Human readable name used in notices
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Any => "Any",
            Self::Image => "Image",
            Self::KeyCombo => "Key",
        }
    }

    /// Check if this type can connect to another type
    pub fn can_connect_to(self, other: DataType) -> bool {
        // Any type can connect to anything
        if self == Self::Any || other == Self::Any {
            return true;
        }
        self == other
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A pin declared by a node type
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    /// Pin name, unique within its (flow, direction) group
    pub name: String,
    /// Flow class
    pub flow: PinFlow,
    /// Pin direction
    pub direction: PinDirection,
    /// Value type (data pins only)
    pub data_type: Option<DataType>,
    /// Inline default editor shown while the pin is unconnected
    pub editor: Option<ParamSchema>,
    /// Whether the pin has a connection point. Literal value fields do not.
    pub has_pin: bool,
}

impl PinSpec {
    /// Create an execution input
    pub fn exec_input(name: impl Into<String>) -> Self {
        Self::exec(name, PinDirection::Input)
    }

    /// Create an execution output
    pub fn exec_output(name: impl Into<String>) -> Self {
        Self::exec(name, PinDirection::Output)
    }

    fn exec(name: impl Into<String>, direction: PinDirection) -> Self {
        Self {
            name: name.into(),
            flow: PinFlow::Exec,
            direction,
            data_type: None,
            editor: None,
            has_pin: true,
        }
    }

    /// Create a data input without an inline editor
    pub fn data_input(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            flow: PinFlow::Data,
            direction: PinDirection::Input,
            data_type: Some(data_type),
            editor: None,
            has_pin: true,
        }
    }

    /// Create a data output
    pub fn data_output(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            flow: PinFlow::Data,
            direction: PinDirection::Output,
            data_type: Some(data_type),
            editor: None,
            has_pin: true,
        }
    }

    /// Create a data input backed by an inline editor.
    ///
    /// The editor schema carries the pin name, default and bounds.
    pub fn field(data_type: DataType, editor: ParamSchema) -> Self {
        Self {
            name: editor.name.clone(),
            flow: PinFlow::Data,
            direction: PinDirection::Input,
            data_type: Some(data_type),
            editor: Some(editor),
            has_pin: true,
        }
    }

    /// Remove the connection point, leaving only the editor
    pub fn without_pin(mut self) -> Self {
        self.has_pin = false;
        self
    }

    /// Numeric bounds declared by the inline editor, if any
    pub fn bounds(&self) -> Option<(Option<f64>, Option<f64>)> {
        self.editor.as_ref().and_then(ParamSchema::bounds)
    }
}

/// Reference to a concrete pin on a node instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    /// Owning node
    pub node: NodeId,
    /// Flow class
    pub flow: PinFlow,
    /// Pin direction
    pub direction: PinDirection,
    /// Pin name
    pub name: String,
}

impl PinRef {
    /// Create a pin reference
    pub fn new(node: NodeId, flow: PinFlow, direction: PinDirection, name: impl Into<String>) -> Self {
        Self {
            node,
            flow,
            direction,
            name: name.into(),
        }
    }

    /// Execution input on a node
    pub fn exec_in(node: NodeId, name: impl Into<String>) -> Self {
        Self::new(node, PinFlow::Exec, PinDirection::Input, name)
    }

    /// Execution output on a node
    pub fn exec_out(node: NodeId, name: impl Into<String>) -> Self {
        Self::new(node, PinFlow::Exec, PinDirection::Output, name)
    }

    /// Data input on a node
    pub fn data_in(node: NodeId, name: impl Into<String>) -> Self {
        Self::new(node, PinFlow::Data, PinDirection::Input, name)
    }

    /// Data output on a node
    pub fn data_out(node: NodeId, name: impl Into<String>) -> Self {
        Self::new(node, PinFlow::Data, PinDirection::Output, name)
    }
}
