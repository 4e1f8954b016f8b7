// SPDX-License-Identifier: MIT OR Apache-2.0
//! Macro node graph model for `MacroBot` Editor.
//!
//! This crate holds everything about a macro graph that does not depend on
//! a window or an input device:
//! - The node catalog (type descriptors, pin shapes, parameter schemas)
//! - Typed pins and the connection validity gate
//! - Viewport transform and minimap projection
//! - The persisted document record and the execution handoff record
//! - Static validation (entry point and reachability)
//! - Function/variable cross-references
//!
//! ## Architecture
//!
//! A [`Graph`] owns node instances and connections and is always paired with
//! the shared [`NodeRegistry`] it was built from. All structural edits go
//! through the graph so that the single-writer rule for data inputs and the
//! numeric range rule for literals hold at all times.

pub mod catalog;
pub mod codec;
pub mod connection;
pub mod crossref;
pub mod graph;
pub mod keys;
pub mod node;
pub mod param;
pub mod port;
pub mod validation;
pub mod viewport;

pub use catalog::create_macro_registry;
pub use codec::{CodecError, DocumentRecord, LoadReport, MacroRecord};
pub use connection::{Connection, ConnectionId};
pub use crossref::CrossReferences;
pub use graph::{ConnectionError, Graph, GraphError, ParamUpdate};
pub use keys::KeyCombo;
pub use node::{Node, NodeId, NodeRegistry, NodeTypeDescriptor};
pub use param::{ParamKind, ParamSchema, ParamValue};
pub use port::{DataType, PinDirection, PinFlow, PinRef, PinSpec};
pub use validation::{validate, ValidationReport};
pub use viewport::{MinimapProjection, Viewport, WirePath, WireStyle};
