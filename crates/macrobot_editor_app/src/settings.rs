// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistent editor preferences.
//!
//! Stored as RON next to the user's other editor data. A missing file means
//! defaults; a malformed one is reported instead of silently replaced.

use macrobot_editor_graph::WireStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "settings.ron";

/// Smallest grid spacing
pub const MIN_GRID_SNAP: u32 = 5;
/// Largest grid spacing
pub const MAX_GRID_SNAP: u32 = 100;

/// Encoding of the default undo hotkey
pub const DEFAULT_UNDO_HOTKEY: &str = "<ctrl>+z";
/// Encoding of the default redo hotkey
pub const DEFAULT_REDO_HOTKEY: &str = "<ctrl>+y";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not valid settings
    #[error("Malformed settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be written as RON
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Color theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    /// Dark theme
    #[default]
    Dark,
    /// Light theme
    Light,
}

/// General preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Color theme
    pub theme: Theme,
    /// Show error notices
    pub show_errors: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            show_errors: true,
        }
    }
}

/// Canvas preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Snap dropped and dragged nodes to the grid
    pub snap_to_grid: bool,
    /// Grid spacing in world units
    pub grid_snap_size: u32,
    /// Wire drawing style
    pub wire_style: WireStyle,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            snap_to_grid: false,
            grid_snap_size: 20,
            wire_style: WireStyle::Curved,
        }
    }
}

/// Global hotkeys, stored in their encoded form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeySettings {
    /// Stops the running macro
    pub emergency_stop: Option<String>,
    /// Undo in the active document
    pub undo: String,
    /// Redo in the active document
    pub redo: String,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            emergency_stop: None,
            undo: DEFAULT_UNDO_HOTKEY.to_string(),
            redo: DEFAULT_REDO_HOTKEY.to_string(),
        }
    }
}

/// One of the global hotkeys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalHotkey {
    /// Emergency stop
    EmergencyStop,
    /// Undo
    Undo,
    /// Redo
    Redo,
}

impl HotkeySettings {
    /// Current encoding of a global hotkey, if any
    pub fn get(&self, key: GlobalHotkey) -> Option<&str> {
        match key {
            GlobalHotkey::EmergencyStop => self.emergency_stop.as_deref(),
            GlobalHotkey::Undo => Some(self.undo.as_str()).filter(|s| !s.is_empty()),
            GlobalHotkey::Redo => Some(self.redo.as_str()).filter(|s| !s.is_empty()),
        }
    }

    /// Assign a recorded encoding
    pub fn set(&mut self, key: GlobalHotkey, encoded: String) {
        match key {
            GlobalHotkey::EmergencyStop => self.emergency_stop = Some(encoded),
            GlobalHotkey::Undo => self.undo = encoded,
            GlobalHotkey::Redo => self.redo = encoded,
        }
    }

    /// Put one hotkey back to its default
    pub fn reset(&mut self, key: GlobalHotkey) {
        let defaults = Self::default();
        match key {
            GlobalHotkey::EmergencyStop => self.emergency_stop = defaults.emergency_stop,
            GlobalHotkey::Undo => self.undo = defaults.undo,
            GlobalHotkey::Redo => self.redo = defaults.redo,
        }
    }
}

/// All editor preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// General preferences
    pub general: GeneralSettings,
    /// Canvas preferences
    pub canvas: CanvasSettings,
    /// Global hotkeys
    pub hotkeys: HotkeySettings,
    /// Last version whose welcome notes were shown
    pub last_seen_version: Option<String>,
}

impl AppSettings {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut settings: AppSettings = ron::from_str(&content)?;
        settings.sanitize();
        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(self, config)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Restore every preference to its default
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Grid spacing, or `None` when snapping is off
    pub fn grid_snap(&self) -> Option<f32> {
        self.canvas
            .snap_to_grid
            .then(|| self.canvas.grid_snap_size as f32)
    }

    fn sanitize(&mut self) {
        self.canvas.grid_snap_size = self.canvas.grid_snap_size.clamp(MIN_GRID_SNAP, MAX_GRID_SNAP);
        if self.hotkeys.emergency_stop.as_deref() == Some("") {
            self.hotkeys.emergency_stop = None;
        }
    }
}
