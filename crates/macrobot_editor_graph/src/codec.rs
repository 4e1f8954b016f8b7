// SPDX-License-Identifier: MIT OR Apache-2.0
//! Portable document records.
//!
//! A [`DocumentRecord`] is what gets written to `.macro` files, stored in
//! history snapshots and, scoped to one entry node, handed to the executor
//! as a [`MacroRecord`].

use crate::catalog;
use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId, NodeRegistry};
use crate::param::{ParamKind, ParamValue};
use crate::port::{PinDirection, PinFlow, PinRef};
use crate::viewport::Viewport;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error converting records to or from text
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Malformed JSON or unexpected shape
    #[error("Invalid document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialized node position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// World x
    pub x: f32,
    /// World y
    pub y: f32,
}

/// Serialized node size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRecord {
    /// Width in world units
    pub width: f32,
    /// Height in world units
    pub height: f32,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Node id
    pub id: NodeId,
    /// Node type id
    #[serde(rename = "type")]
    pub node_type: String,
    /// Top-left corner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionRecord>,
    /// Explicit size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeRecord>,
    /// Color tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Field values by name
    #[serde(default)]
    pub values: IndexMap<String, ParamValue>,
    /// Comment text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    /// Pinned flag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
    // Older files stored CSS lengths such as "120px"
    #[serde(default, skip_serializing)]
    left: Option<String>,
    #[serde(default, skip_serializing)]
    top: Option<String>,
    #[serde(default, skip_serializing)]
    width: Option<String>,
    #[serde(default, skip_serializing)]
    height: Option<String>,
}

impl NodeRecord {
    fn from_node(graph: &Graph, node: &Node) -> Self {
        let descriptor = graph.descriptor(&node.id);
        let values = node
            .values
            .iter()
            .filter(|(name, _)| {
                let is_pin = descriptor
                    .and_then(|d| d.pin(PinFlow::Data, PinDirection::Input, name))
                    .is_some_and(|p| p.has_pin);
                !(is_pin && graph.is_input_connected(&node.id, name))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            position: Some(PositionRecord {
                x: node.position[0],
                y: node.position[1],
            }),
            size: node.size.map(|[width, height]| SizeRecord { width, height }),
            color: node.color.clone(),
            values,
            text: node.text.clone(),
            image_path: node.image_path.clone(),
            pinned: node.pinned,
            left: None,
            top: None,
            width: None,
            height: None,
        }
    }

    fn position(&self) -> [f32; 2] {
        match self.position {
            Some(p) => [p.x, p.y],
            None => [
                css_length(self.left.as_deref()).unwrap_or(0.0),
                css_length(self.top.as_deref()).unwrap_or(0.0),
            ],
        }
    }

    fn size(&self) -> Option<[f32; 2]> {
        match self.size {
            Some(s) => Some([s.width, s.height]),
            None => Some([
                css_length(self.width.as_deref())?,
                css_length(self.height.as_deref())?,
            ]),
        }
    }
}

fn css_length(value: Option<&str>) -> Option<f32> {
    let value = value?.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse().ok().filter(|v: &f32| v.is_finite())
}

/// Serialized connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Node owning the output pin
    pub start_node_id: NodeId,
    /// Output pin name
    pub start_pin_name: String,
    /// Node owning the input pin
    pub end_node_id: NodeId,
    /// Input pin name
    pub end_pin_name: String,
    /// Flow class; inferred from the pins when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<PinFlow>,
}

impl ConnectionRecord {
    fn pins(&self, graph: &Graph) -> Option<(PinRef, PinRef)> {
        let flows = match self.flow {
            Some(flow) => vec![flow],
            None => vec![PinFlow::Exec, PinFlow::Data],
        };
        flows.into_iter().find_map(|flow| {
            let output = PinRef::new(self.start_node_id.clone(), flow, PinDirection::Output, &self.start_pin_name);
            let input = PinRef::new(self.end_node_id.clone(), flow, PinDirection::Input, &self.end_pin_name);
            (graph.pin_spec(&output).is_some() && graph.pin_spec(&input).is_some()).then_some((output, input))
        })
    }
}

/// What a load had to leave out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// One line per skipped node
    pub skipped_nodes: Vec<String>,
    /// Stored connections that failed validation
    pub dropped_connections: usize,
}

impl LoadReport {
    /// True when everything in the record was restored
    pub fn is_clean(&self) -> bool {
        self.skipped_nodes.is_empty() && self.dropped_connections == 0
    }
}

fn default_scale() -> f32 {
    1.0
}

/// A serialized document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Nodes in canvas order
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Connections
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    /// Horizontal pan
    #[serde(default)]
    pub pan_x: f32,
    /// Vertical pan
    #[serde(default)]
    pub pan_y: f32,
    /// Zoom level
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Next node id counter
    #[serde(default)]
    pub node_id_counter: u64,
}

impl DocumentRecord {
    /// Record the current state of a canvas.
    ///
    /// Values of data inputs that are fed by a connection are left out.
    pub fn capture(graph: &Graph, viewport: &Viewport) -> Self {
        Self {
            nodes: graph.nodes().map(|n| NodeRecord::from_node(graph, n)).collect(),
            connections: graph
                .connections()
                .map(|c| ConnectionRecord {
                    start_node_id: c.from_node.clone(),
                    start_pin_name: c.from_pin.clone(),
                    end_node_id: c.to_node.clone(),
                    end_pin_name: c.to_pin.clone(),
                    flow: Some(c.flow),
                })
                .collect(),
            pan_x: viewport.pan.x,
            pan_y: viewport.pan.y,
            scale: viewport.scale,
            node_id_counter: graph.node_id_counter(),
        }
    }

    /// Rebuild a canvas.
    ///
    /// Nodes of unknown type and repeated ids are skipped. Stored connections
    /// go through the same checks as interactive wiring; those that fail are
    /// dropped.
    pub fn restore(&self, registry: Arc<NodeRegistry>) -> (Graph, Viewport, LoadReport) {
        let mut graph = Graph::new(registry.clone());
        let mut report = LoadReport::default();

        for record in &self.nodes {
            let Some(descriptor) = registry.get(&record.node_type) else {
                tracing::warn!("Skipping node {} of unknown type {}", record.id, record.node_type);
                report
                    .skipped_nodes
                    .push(format!("{}: unknown node type \"{}\"", record.id, record.node_type));
                continue;
            };

            let [x, y] = record.position();
            let mut node = Node::new(descriptor, record.id.clone()).with_position(x, y);
            if let Some(size) = record.size() {
                node.size = Some(size);
            }
            node.color = record.color.clone().filter(|c| !c.is_empty() && c != "default");
            node.image_path = record.image_path.clone().filter(|p| !p.is_empty());
            node.pinned = record.pinned;
            if descriptor.id == catalog::COMMENT {
                node.text = Some(record.text.clone().unwrap_or_default());
            }
            for (name, raw) in &record.values {
                if let Some(schema) = descriptor.field(name).filter(|f| f.stores_value()) {
                    node.values.insert(name.clone(), schema.normalize(raw));
                }
            }

            if let Err(e) = graph.insert_node(node) {
                tracing::warn!("Skipping node {}: {}", record.id, e);
                report.skipped_nodes.push(format!("{}: {}", record.id, e));
            }
        }
        graph.bump_node_id_counter(self.node_id_counter);
        graph.recompute_derived();
        reset_unknown_options(&mut graph);

        for record in &self.connections {
            let result = match record.pins(&graph) {
                Some((output, input)) => graph
                    .create_connection(&output, &input)
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                None => Err("no such pin".to_string()),
            };
            if let Err(reason) = result {
                tracing::debug!(
                    "Dropping connection {}.{} -> {}.{}: {}",
                    record.start_node_id,
                    record.start_pin_name,
                    record.end_node_id,
                    record.end_pin_name,
                    reason
                );
                report.dropped_connections += 1;
            }
        }
        graph.refresh_cross_references();

        let viewport = Viewport::from_parts(self.pan_x, self.pan_y, self.scale);
        (graph, viewport, report)
    }

    /// Parse a record from JSON
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the record as indented JSON
    pub fn to_json_pretty(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compact binary form used for history snapshots
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Read the compact form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reset drop-down values that are not among the field's options
fn reset_unknown_options(graph: &mut Graph) {
    let mut resets = Vec::new();
    for node in graph.nodes() {
        let Some(descriptor) = graph.descriptor(&node.id) else {
            continue;
        };
        for field in descriptor.fields() {
            let ParamKind::Enum { options } = &field.kind else {
                continue;
            };
            if options.is_empty() {
                continue;
            }
            let allowed = graph.field_options(&node.id, &field.name);
            let valid = node
                .text_value(&field.name)
                .is_some_and(|v| allowed.iter().any(|o| o == v));
            if !valid {
                resets.push((node.id.clone(), field.name.clone(), field.default.clone()));
            }
        }
    }
    for (id, field, default) in resets {
        if let Some(node) = graph.node_mut(&id) {
            node.values.insert(field, default);
        }
    }
}

/// Graph handed to the executor, scoped to one entry node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    /// Entry node to start from
    #[serde(rename = "start_node_id", alias = "entryNodeId")]
    pub entry_node_id: NodeId,
    /// All nodes of the document
    pub nodes: Vec<NodeRecord>,
    /// All connections of the document
    pub connections: Vec<ConnectionRecord>,
}

impl MacroRecord {
    /// Package a graph for execution starting at `entry`
    pub fn capture(graph: &Graph, entry: &NodeId) -> Result<Self, GraphError> {
        let is_entry = graph
            .node(entry)
            .is_some_and(|n| n.node_type == catalog::START);
        if !is_entry {
            return Err(GraphError::NodeNotFound(entry.clone()));
        }
        let document = DocumentRecord::capture(graph, &Viewport::default());
        Ok(Self {
            entry_node_id: entry.clone(),
            nodes: document.nodes,
            connections: document.connections,
        })
    }

    /// Write as JSON
    pub fn to_json_pretty(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::*;
    use crate::keys::KeyCombo;

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(create_macro_registry())
    }

    fn sample() -> (Graph, Viewport) {
        let mut g = Graph::new(registry());
        let start = g.add_node(START, [0.0, 0.0]).unwrap();
        let find = g.add_node(FIND_IMAGE, [200.0, 40.0]).unwrap();
        let lit = g.add_node(NUMBER_LITERAL, [0.0, 200.0]).unwrap();
        let note = g.add_node(COMMENT, [500.0, 500.0]).unwrap();
        g.set_param(
            &start,
            HOTKEY,
            ParamValue::from(KeyCombo::from_keys(["ctrl", "f1"]).unwrap()),
        )
        .unwrap();
        g.set_param(&lit, LITERAL_VALUE, ParamValue::from(75.0)).unwrap();
        g.set_image_path(&find, Some("button.png".to_string())).unwrap();
        g.set_text(&note, "click the button").unwrap();
        g.set_color(&note, Some("blue")).unwrap();
        g.toggle_pinned(&note).unwrap();
        g.create_connection(&PinRef::exec_out(start, "exec"), &PinRef::exec_in(find.clone(), "exec"))
            .unwrap();
        g.create_connection(&PinRef::data_out(lit, "out"), &PinRef::data_in(find, "Confidence"))
            .unwrap();
        let viewport = Viewport::from_parts(-120.0, 30.0, 1.25);
        (g, viewport)
    }

    #[test]
    fn test_connected_inputs_are_omitted() {
        let (g, viewport) = sample();
        let record = DocumentRecord::capture(&g, &viewport);
        let find = record.nodes.iter().find(|n| n.node_type == FIND_IMAGE).unwrap();
        assert!(!find.values.contains_key("Confidence"));
        assert_eq!(find.image_path.as_deref(), Some("button.png"));
    }

    #[test]
    fn test_round_trip() {
        let (g, viewport) = sample();
        let record = DocumentRecord::capture(&g, &viewport);
        let json = record.to_json_pretty().unwrap();

        let parsed = DocumentRecord::from_json(&json).unwrap();
        let (restored, restored_viewport, report) = parsed.restore(registry());
        assert!(report.is_clean());
        assert_eq!(restored_viewport, viewport);
        assert_eq!(restored.node_count(), g.node_count());
        assert_eq!(restored.connection_count(), g.connection_count());
        assert_eq!(DocumentRecord::capture(&restored, &restored_viewport), record);
    }

    #[test]
    fn test_key_combo_wire_format() {
        let (g, viewport) = sample();
        let json = DocumentRecord::capture(&g, &viewport).to_json_pretty().unwrap();
        assert!(json.contains("\"encodedValue\": \"<ctrl>+<f1>\""));
        assert!(json.contains("\"display\": \"Ctrl + F1\""));
    }

    #[test]
    fn test_unknown_types_and_bad_connections_are_skipped() {
        let json = r#"{
            "nodes": [
                {"id": "node-0", "type": "start", "position": {"x": 0, "y": 0}, "values": {}},
                {"id": "node-1", "type": "teleport", "position": {"x": 0, "y": 0}, "values": {}},
                {"id": "node-2", "type": "string_literal", "position": {"x": 0, "y": 0}, "values": {"value": "hi"}},
                {"id": "node-3", "type": "delay", "position": {"x": 0, "y": 0}, "values": {"Duration": "2.5"}}
            ],
            "connections": [
                {"startNodeId": "node-0", "startPinName": "exec", "endNodeId": "node-1", "endPinName": "exec", "flow": "exec"},
                {"startNodeId": "node-2", "startPinName": "out", "endNodeId": "node-3", "endPinName": "Duration", "flow": "data"},
                {"startNodeId": "node-0", "startPinName": "exec", "endNodeId": "node-3", "endPinName": "exec", "flow": "exec"}
            ],
            "panX": 0, "panY": 0, "scale": 0, "nodeIdCounter": 4
        }"#;
        let (g, viewport, report) = DocumentRecord::from_json(json).unwrap().restore(registry());
        assert_eq!(g.node_count(), 3);
        assert_eq!(report.skipped_nodes.len(), 1);
        assert_eq!(report.dropped_connections, 2);
        assert_eq!(g.connection_count(), 1);
        assert_eq!(viewport.scale, 1.0);
        assert_eq!(g.node(&NodeId::from("node-3")).unwrap().number("Duration"), Some(2.0));
        assert_eq!(g.node_id_counter(), 4);
    }

    #[test]
    fn test_legacy_layout_and_key_format() {
        let json = r#"{
            "nodes": [
                {"id": "node-7", "type": "start", "left": "120px", "top": "80px", "width": "", "height": "",
                 "color": "default", "values": {"Hotkey": {"display": "F2", "pynput": "<f2>"}, "Loop Continuously": false}},
                {"id": "node-8", "type": "comment", "left": "0px", "top": "0px", "width": "300px", "height": "120px",
                 "color": "green", "values": {}, "text": "hello"}
            ],
            "connections": [],
            "panX": 10, "panY": 20, "scale": 1, "nodeIdCounter": 0
        }"#;
        let (g, _, _) = DocumentRecord::from_json(json).unwrap().restore(registry());
        let start = g.node(&NodeId::from("node-7")).unwrap();
        assert_eq!(start.position, [120.0, 80.0]);
        assert_eq!(start.size, None);
        assert_eq!(start.color, None);
        assert_eq!(start.value(HOTKEY).and_then(|v| v.as_key_combo()).map(|k| k.encoded.as_str()), Some("<f2>"));
        let note = g.node(&NodeId::from("node-8")).unwrap();
        assert_eq!(note.size, Some([300.0, 120.0]));
        assert_eq!(note.text.as_deref(), Some("hello"));
        assert_eq!(g.node_id_counter(), 9);
    }

    #[test]
    fn test_connection_flow_inferred_when_missing() {
        let json = r#"{
            "nodes": [
                {"id": "node-0", "type": "start", "position": {"x": 0, "y": 0}, "values": {}},
                {"id": "node-1", "type": "delay", "position": {"x": 300, "y": 0}, "values": {}},
                {"id": "node-2", "type": "number_literal", "position": {"x": 0, "y": 200}, "values": {"value": 4}}
            ],
            "connections": [
                {"startNodeId": "node-0", "startPinName": "exec", "endNodeId": "node-1", "endPinName": "exec"},
                {"startNodeId": "node-2", "startPinName": "out", "endNodeId": "node-1", "endPinName": "Duration"}
            ]
        }"#;
        let (g, _, report) = DocumentRecord::from_json(json).unwrap().restore(registry());
        assert!(report.is_clean());
        let flows: Vec<PinFlow> = g.connections().map(|c| c.flow).collect();
        assert_eq!(flows, vec![PinFlow::Exec, PinFlow::Data]);

        let saved = DocumentRecord::capture(&g, &Viewport::default());
        assert!(saved.connections.iter().all(|c| c.flow.is_some()));
    }

    #[test]
    fn test_out_of_range_literal_connection_dropped() {
        let json = r#"{
            "nodes": [
                {"id": "node-0", "type": "number_literal", "position": {"x": 0, "y": 0}, "values": {"value": 500}},
                {"id": "node-1", "type": "find_image", "position": {"x": 0, "y": 0}, "values": {}}
            ],
            "connections": [
                {"startNodeId": "node-0", "startPinName": "out", "endNodeId": "node-1", "endPinName": "Confidence", "flow": "data"}
            ]
        }"#;
        let (g, _, report) = DocumentRecord::from_json(json).unwrap().restore(registry());
        assert_eq!(g.connection_count(), 0);
        assert_eq!(report.dropped_connections, 1);
    }

    #[test]
    fn test_string_compare_survives_reload() {
        let mut g = Graph::new(registry());
        let cmp = g.add_node(COMPARE, [0.0, 0.0]).unwrap();
        g.set_param(&cmp, "Type", ParamValue::from("string")).unwrap();
        g.set_param(&cmp, "Operator", ParamValue::from("contains")).unwrap();
        let record = DocumentRecord::capture(&g, &Viewport::default());
        let (restored, _, _) = record.restore(registry());
        assert_eq!(restored.node(&cmp).unwrap().text_value("Operator"), Some("contains"));
    }

    #[test]
    fn test_invalid_option_falls_back_to_default() {
        let json = r#"{"nodes": [{"id": "node-0", "type": "delay", "values": {"Unit": "fortnights"}}]}"#;
        let (g, _, _) = DocumentRecord::from_json(json).unwrap().restore(registry());
        assert_eq!(g.node(&NodeId::from("node-0")).unwrap().text_value("Unit"), Some("seconds"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(DocumentRecord::from_json("{ nodes: ").is_err());
    }

    #[test]
    fn test_macro_record_uses_start_node_id() {
        let (g, _) = sample();
        let start = g.entry_nodes().next().unwrap().id.clone();
        let record = MacroRecord::capture(&g, &start).unwrap();
        let json = record.to_json_pretty().unwrap();
        assert!(json.contains("\"start_node_id\": \"node-0\""));
        assert!(MacroRecord::capture(&g, &NodeId::from("node-1")).is_err());
    }
}
