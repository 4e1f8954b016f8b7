// SPDX-License-Identifier: MIT OR Apache-2.0
//! Global hotkey registration.
//!
//! The editor does not listen to the keyboard outside its window itself.
//! It hands a map from encoded key combination to action to a
//! [`HotkeyRegistrar`], which calls back into the session when one fires.

use crate::settings::HotkeySettings;
use indexmap::IndexMap;
use macrobot_editor_graph::{catalog, Graph, NodeId, ParamValue};
use std::fmt;

/// Action id of the emergency stop hotkey
pub const EMERGENCY_STOP_ACTION: &str = "emergency_stop";
/// Action id of the undo hotkey
pub const UNDO_ACTION: &str = "undo";
/// Action id of the redo hotkey
pub const REDO_ACTION: &str = "redo";

/// What a hotkey does
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Run the macro starting at this entry node
    RunMacro(NodeId),
    /// Stop whatever is running
    EmergencyStop,
    /// Undo in the active document
    Undo,
    /// Redo in the active document
    Redo,
}

impl HotkeyAction {
    /// Parse an action id as reported by the hotkey listener
    pub fn from_id(id: &str) -> Self {
        match id {
            EMERGENCY_STOP_ACTION => Self::EmergencyStop,
            UNDO_ACTION => Self::Undo,
            REDO_ACTION => Self::Redo,
            other => Self::RunMacro(NodeId::from(other)),
        }
    }

    /// Action id sent to the hotkey listener
    pub fn id(&self) -> &str {
        match self {
            Self::RunMacro(node) => node.as_str(),
            Self::EmergencyStop => EMERGENCY_STOP_ACTION,
            Self::Undo => UNDO_ACTION,
            Self::Redo => REDO_ACTION,
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Encoded key combination to action
pub type HotkeyMap = IndexMap<String, HotkeyAction>;

/// Collect every hotkey of the active document and the global settings.
///
/// Later entries win when two share a combination, so a global hotkey
/// overrides an entry node bound to the same keys.
pub fn gather_hotkeys(graph: &Graph, settings: &HotkeySettings) -> HotkeyMap {
    let mut map = HotkeyMap::new();
    for node in graph.entry_nodes() {
        let combo = node.value(catalog::HOTKEY).and_then(ParamValue::as_key_combo);
        if let Some(combo) = combo.filter(|c| c.is_set()) {
            map.insert(combo.encoded.clone(), HotkeyAction::RunMacro(node.id.clone()));
        }
    }
    if let Some(stop) = settings.emergency_stop.as_ref().filter(|s| !s.is_empty()) {
        map.insert(stop.clone(), HotkeyAction::EmergencyStop);
    }
    if !settings.undo.is_empty() {
        map.insert(settings.undo.clone(), HotkeyAction::Undo);
    }
    if !settings.redo.is_empty() {
        map.insert(settings.redo.clone(), HotkeyAction::Redo);
    }
    map
}

/// Listener for system-wide hotkeys
pub trait HotkeyRegistrar {
    /// Replace all registered hotkeys
    fn register(&mut self, hotkeys: &HotkeyMap);
}

/// Registrar that only logs, for hosts without a global listener
#[derive(Debug, Default)]
pub struct LogRegistrar;

impl HotkeyRegistrar for LogRegistrar {
    fn register(&mut self, hotkeys: &HotkeyMap) {
        for (keys, action) in hotkeys {
            tracing::debug!("Hotkey {} -> {}", keys, action);
        }
    }
}

/// Remembers the last registered map so the listener is only told about changes
#[derive(Debug, Default)]
pub struct HotkeyRegistration {
    last: Option<HotkeyMap>,
}

impl HotkeyRegistration {
    /// Create an empty registration
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `hotkeys` to the registrar if they differ from the last map sent.
    ///
    /// Returns whether the registrar was called.
    pub fn update(&mut self, registrar: &mut dyn HotkeyRegistrar, hotkeys: HotkeyMap) -> bool {
        if self.last.as_ref() == Some(&hotkeys) {
            return false;
        }
        tracing::info!("Registering {} hotkey(s)", hotkeys.len());
        registrar.register(&hotkeys);
        self.last = Some(hotkeys);
        true
    }

    /// Last map handed to the registrar
    pub fn current(&self) -> Option<&HotkeyMap> {
        self.last.as_ref()
    }
}
