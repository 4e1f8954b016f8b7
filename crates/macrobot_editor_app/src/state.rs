// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session state.
//!
//! The session owns the open documents, the live canvas of the active one,
//! the current modal interaction and the collaborators the editor talks to
//! (hotkey listener, macro executor, image resolver). Every user-visible
//! edit commits exactly one history snapshot.

use crate::document::{Canvas, Document, DocumentId};
use crate::error::{EditError, FileError, Notice, NoticeLevel};
use crate::execution::{DryRunBackend, ExecutionBackend, ExecutionHighlight};
use crate::files;
use crate::hotkeys::{gather_hotkeys, HotkeyAction, HotkeyMap, HotkeyRegistrar, HotkeyRegistration, LogRegistrar};
use crate::images::{FsImageResolver, ImageResolver, PreviewState};
use crate::settings::{AppSettings, GlobalHotkey};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexSet;
use macrobot_editor_graph::keys::map_key;
use macrobot_editor_graph::viewport::snap_to_grid;
use macrobot_editor_graph::{
    catalog, validate, ConnectionId, DocumentRecord, GraphError, KeyCombo, MacroRecord, MinimapProjection, NodeId,
    NodeRegistry, ParamValue, PinRef, ValidationReport, WirePath,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Idle time after the last key press that ends a key recording
pub const KEY_RECORDING_TIMEOUT: Duration = Duration::from_millis(800);

/// Label shown while waiting for the first key
pub const RECORDING_PROMPT: &str = "Recording...";

/// Notice shown for any document that cannot be imported
pub const LOAD_FAILED: &str = "Failed to load file. It may be corrupted.";

/// Canvas size assumed until the host reports one
const DEFAULT_CANVAS_SIZE: Vec2 = Vec2::new(1280.0, 720.0);

/// What a key recording writes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingTarget {
    /// Key-combination field of a node
    NodeField {
        /// Node
        node: NodeId,
        /// Field name
        field: String,
    },
    /// One of the global hotkeys
    Global(GlobalHotkey),
}

/// A key recording in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecording {
    /// Destination of the result
    pub target: RecordingTarget,
    /// Normalized names of the keys pressed so far
    pub held: IndexSet<String>,
    /// When the recording ends on its own; unset until the first key
    pub deadline: Option<Instant>,
}

impl KeyRecording {
    fn new(target: RecordingTarget) -> Self {
        Self {
            target,
            held: IndexSet::new(),
            deadline: None,
        }
    }

    /// Combination formed by the keys pressed so far
    pub fn preview(&self) -> Option<KeyCombo> {
        KeyCombo::from_keys(&self.held)
    }
}

/// How a key recording ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingOutcome {
    /// Keys were pressed and the recording timed out normally
    Captured(KeyCombo),
    /// Cancelled by a click elsewhere, a new recording, or no key at all
    Interrupted,
}

/// The modal interaction owning pointer input
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionMode {
    /// Nothing in progress
    #[default]
    Idle,
    /// Drawing a wire from a pin
    Wiring {
        /// Pin the wire starts at
        from: PinRef,
        /// Loose end, in screen space
        cursor: Pos2,
    },
    /// Moving a node
    Dragging {
        /// Node being moved
        node: NodeId,
        /// Pointer offset from the node's top-left corner, in world units
        grab: Vec2,
    },
    /// Resizing a node
    Resizing {
        /// Node being resized
        node: NodeId,
        /// Size when the gesture started
        start_size: [f32; 2],
        /// Pointer when the gesture started, in screen space
        start_pointer: Pos2,
    },
    /// Panning the canvas
    Panning {
        /// Previous pointer position, in screen space
        last: Pos2,
    },
    /// Recording a key combination
    RecordingKey(KeyRecording),
    /// Dragging the minimap viewport
    DraggingMinimap {
        /// Minimap layout when the gesture started
        projection: MinimapProjection,
        /// Screen position of the minimap's top-left corner
        origin: Pos2,
    },
}

impl InteractionMode {
    /// True when nothing is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Main editor session
pub struct EditorSession {
    /// Node types shared by all documents
    registry: Arc<NodeRegistry>,
    /// Open documents in tab order
    documents: Vec<Document>,
    /// Active document
    active: DocumentId,
    /// Live state of the active document
    canvas: Canvas,
    /// Current modal interaction
    mode: InteractionMode,
    /// Preferences
    settings: AppSettings,
    /// Pending user-facing messages
    notices: Vec<Notice>,
    /// Nodes flagged by the last validation
    flagged: IndexSet<NodeId>,
    /// Node being executed
    highlight: ExecutionHighlight,
    /// Screen rectangle of the canvas
    canvas_rect: Rect,
    /// Hotkey listener
    registrar: Box<dyn HotkeyRegistrar>,
    /// Last map sent to the listener
    registration: HotkeyRegistration,
    /// Macro executor
    backend: Box<dyn ExecutionBackend>,
    /// Image reference resolver
    resolver: Box<dyn ImageResolver>,
}

impl EditorSession {
    /// Create a session with one empty tab
    pub fn new(registry: Arc<NodeRegistry>, settings: AppSettings) -> Self {
        let first = Document::new(None);
        let active = first.id;
        let mut session = Self {
            canvas: Canvas::new(registry.clone()),
            registry,
            documents: vec![first],
            active,
            mode: InteractionMode::Idle,
            settings,
            notices: Vec::new(),
            flagged: IndexSet::new(),
            highlight: ExecutionHighlight::default(),
            canvas_rect: Rect::from_min_size(Pos2::ZERO, DEFAULT_CANVAS_SIZE),
            registrar: Box::new(LogRegistrar),
            registration: HotkeyRegistration::new(),
            backend: Box::new(DryRunBackend),
            resolver: Box::new(FsImageResolver),
        };
        if let Err(e) = session.commit() {
            tracing::error!("Failed to record initial state: {}", e);
        }
        session
    }

    /// Use a different hotkey listener and register the current hotkeys with it
    pub fn with_hotkey_registrar(mut self, registrar: Box<dyn HotkeyRegistrar>) -> Self {
        self.registrar = registrar;
        self.registration = HotkeyRegistration::new();
        self.refresh_hotkeys();
        self
    }

    /// Use a different macro executor
    pub fn with_execution_backend(mut self, backend: Box<dyn ExecutionBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Use a different image resolver
    pub fn with_image_resolver(mut self, resolver: Box<dyn ImageResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Live canvas of the active document
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Current modal interaction
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// Preferences
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Open documents in tab order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Active document id
    pub fn active_id(&self) -> DocumentId {
        self.active
    }

    /// Active document
    pub fn active_document(&self) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == self.active)
    }

    fn active_document_mut(&mut self) -> Result<&mut Document, EditError> {
        let active = self.active;
        self.documents
            .iter_mut()
            .find(|d| d.id == active)
            .ok_or(EditError::DocumentNotFound(active))
    }

    /// Pending notices
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Take the pending notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Nodes flagged by the last validation
    pub fn flagged_nodes(&self) -> &IndexSet<NodeId> {
        &self.flagged
    }

    /// Node currently being executed
    pub fn executing_node(&self) -> Option<&NodeId> {
        self.highlight.current()
    }

    /// Hotkeys last sent to the listener
    pub fn registered_hotkeys(&self) -> Option<&HotkeyMap> {
        self.registration.current()
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.active_document().is_some_and(|d| d.history.can_undo())
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.active_document().is_some_and(|d| d.history.can_redo())
    }

    /// Serialized form of the active canvas
    pub fn active_record(&self) -> DocumentRecord {
        self.canvas.capture()
    }

    /// Report the canvas area in screen space
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    fn to_world(&self, screen: Pos2) -> Pos2 {
        self.canvas.viewport.screen_to_world(screen, self.canvas_rect.min)
    }

    fn snapped(&self, position: [f32; 2]) -> [f32; 2] {
        match self.settings.grid_snap() {
            Some(size) => snap_to_grid(position, size),
            None => position,
        }
    }

    // ---------------------------------------------------------------------
    // Notices and derived state
    // ---------------------------------------------------------------------

    fn notify(&mut self, notice: Notice) {
        if notice.level == NoticeLevel::Error && !self.settings.general.show_errors {
            tracing::debug!("Suppressed notice: {}", notice.message);
            return;
        }
        self.notices.push(notice);
    }

    /// Push the live canvas onto the active document's history
    fn commit(&mut self) -> Result<(), EditError> {
        let active = self.active;
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == active)
            .ok_or(EditError::DocumentNotFound(active))?;
        document.commit(&self.canvas)?;
        self.refresh_hotkeys();
        Ok(())
    }

    fn refresh_hotkeys(&mut self) {
        let hotkeys = gather_hotkeys(&self.canvas.graph, &self.settings.hotkeys);
        self.registration.update(self.registrar.as_mut(), hotkeys);
    }

    fn refresh_derived(&mut self) {
        self.canvas.graph.refresh_cross_references();
        self.refresh_hotkeys();
    }

    fn load_canvas(&mut self, record: Option<&DocumentRecord>) {
        self.canvas = match record {
            Some(record) => {
                let (canvas, report) = Canvas::restore(record, self.registry.clone());
                if !report.skipped_nodes.is_empty() {
                    let lines = report.skipped_nodes.join("\n");
                    self.notify(Notice::error(format!("Some nodes could not be loaded:\n{lines}")));
                }
                canvas
            }
            None => Canvas::new(self.registry.clone()),
        };
        self.mode = InteractionMode::Idle;
        self.flagged.clear();
        self.highlight.clear();
    }

    // ---------------------------------------------------------------------
    // Tabs
    // ---------------------------------------------------------------------

    /// Open a new empty tab and make it active
    pub fn create_tab(&mut self, name: Option<&str>) -> DocumentId {
        let document = Document::new(name);
        let id = document.id;
        tracing::info!("Created tab {:?}", document.name);
        self.documents.push(document);
        self.activate(id, true);
        id
    }

    /// Open a tab holding `record` and make it active
    pub fn open_record(&mut self, name: &str, record: DocumentRecord) -> DocumentId {
        let document = Document::from_record(name, record);
        let id = document.id;
        tracing::info!("Opened tab {:?}", document.name);
        self.documents.push(document);
        self.activate(id, true);
        id
    }

    /// Make another tab active
    pub fn switch_tab(&mut self, id: DocumentId) -> Result<(), EditError> {
        if id == self.active {
            return Ok(());
        }
        if !self.documents.iter().any(|d| d.id == id) {
            return Err(EditError::DocumentNotFound(id));
        }
        self.activate(id, true);
        Ok(())
    }

    fn activate(&mut self, id: DocumentId, store_outgoing: bool) {
        if store_outgoing && id != self.active {
            let record = self.canvas.capture();
            if let Ok(outgoing) = self.active_document_mut() {
                outgoing.stored = Some(record);
            }
        }
        self.active = id;
        let stored = self.active_document().and_then(|d| d.stored.clone());
        self.load_canvas(stored.as_ref());
        if let Err(e) = self.commit() {
            tracing::error!("Failed to record tab state: {}", e);
        }
        self.refresh_derived();
        tracing::info!("Switched to tab {}", id);
    }

    /// Close a tab. Closing the last tab replaces it with an empty one.
    pub fn close_tab(&mut self, id: DocumentId) -> Result<(), EditError> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or(EditError::DocumentNotFound(id))?;
        let closed = self.documents.remove(index);
        tracing::info!("Closed tab {:?}", closed.name);

        if id != self.active {
            return Ok(());
        }
        if self.documents.is_empty() {
            let document = Document::new(None);
            let fresh = document.id;
            self.documents.push(document);
            self.activate(fresh, false);
        } else {
            let next = self.documents[index.saturating_sub(1)].id;
            self.activate(next, false);
        }
        Ok(())
    }

    /// Rename a tab
    pub fn rename_tab(&mut self, id: DocumentId, name: &str) -> Result<(), EditError> {
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(EditError::DocumentNotFound(id))?;
        let name = name.trim();
        if !name.is_empty() {
            document.name = name.to_string();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------------

    /// Load a file into a new tab.
    ///
    /// A file that cannot be read or parsed leaves every open document as it
    /// was.
    pub fn import_file(&mut self, path: &Path) -> Result<DocumentId, FileError> {
        let record = match files::load_document(path) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Import of {:?} failed: {}", path, e);
                self.notify(Notice::error(LOAD_FAILED));
                return Err(e);
            }
        };
        let id = self.open_record(&files::tab_name_from_path(path), record);
        if let Some(document) = self.documents.iter_mut().find(|d| d.id == id) {
            document.path = Some(path.to_path_buf());
        }
        Ok(id)
    }

    /// Save the active document
    pub fn save_active(&mut self, path: &Path) -> Result<(), FileError> {
        let record = self.canvas.capture();
        if let Err(e) = files::save_document(path, &record) {
            tracing::error!("Save to {:?} failed: {}", path, e);
            self.notify(Notice::error(e.to_string()));
            return Err(e);
        }
        let active = self.active;
        if let Some(document) = self.documents.iter_mut().find(|d| d.id == active) {
            document.path = Some(path.to_path_buf());
            document.name = files::tab_name_from_path(path);
        }
        Ok(())
    }

    /// Empty the active canvas
    pub fn clear_canvas(&mut self) -> Result<(), EditError> {
        self.load_canvas(None);
        self.commit()?;
        self.refresh_derived();
        tracing::info!("Cleared canvas");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Step back in the active document. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        let document = self.active_document_mut()?;
        if !document.history.can_undo() {
            return Ok(false);
        }
        let record = document.history.undo()?.to_record()?;
        self.load_canvas(Some(&record));
        self.refresh_derived();
        Ok(true)
    }

    /// Step forward in the active document. Returns false if there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditError> {
        let document = self.active_document_mut()?;
        if !document.history.can_redo() {
            return Ok(false);
        }
        let record = document.history.redo()?.to_record()?;
        self.load_canvas(Some(&record));
        self.refresh_derived();
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Node edits
    // ---------------------------------------------------------------------

    fn graph_result<T>(&mut self, result: Result<T, GraphError>) -> Result<T, EditError> {
        result.map_err(|e| {
            if matches!(e, GraphError::DuplicateStart | GraphError::NotDuplicable(_)) {
                self.notify(Notice::error(e.to_string()));
            }
            EditError::Graph(e)
        })
    }

    /// Add a node at a world position, snapped to the grid when enabled
    pub fn add_node(&mut self, type_id: &str, world: Pos2) -> Result<NodeId, EditError> {
        let position = self.snapped([world.x, world.y]);
        let result = self.canvas.graph.add_node(type_id, position);
        let id = self.graph_result(result)?;
        self.commit()?;
        Ok(id)
    }

    /// Add a node dropped at a screen position
    pub fn drop_node(&mut self, type_id: &str, screen: Pos2) -> Result<NodeId, EditError> {
        let world = self.to_world(screen);
        self.add_node(type_id, world)
    }

    /// Add a comment at a screen position
    pub fn add_comment(&mut self, screen: Pos2) -> Result<NodeId, EditError> {
        self.drop_node(catalog::COMMENT, screen)
    }

    /// Delete a node and its wires
    pub fn delete_node(&mut self, node: &NodeId) -> Result<(), EditError> {
        if self.canvas.graph.remove_node(node).is_none() {
            return Err(GraphError::NodeNotFound(node.clone()).into());
        }
        self.commit()
    }

    /// Copy a node next to itself
    pub fn duplicate_node(&mut self, node: &NodeId) -> Result<NodeId, EditError> {
        let result = self.canvas.graph.duplicate_node(node);
        let id = self.graph_result(result)?;
        self.commit()?;
        Ok(id)
    }

    /// Commit a field value, reporting any wires it broke
    pub fn set_param(&mut self, node: &NodeId, field: &str, value: ParamValue) -> Result<ParamValue, EditError> {
        let result = self.canvas.graph.set_param(node, field, value);
        let update = self.graph_result(result)?;
        for broken in &update.broken {
            tracing::info!("{}", broken);
            self.notify(Notice::error(broken.to_string()));
        }
        self.commit()?;
        Ok(update.value)
    }

    /// Set or clear a color tag
    pub fn set_color(&mut self, node: &NodeId, color: Option<&str>) -> Result<(), EditError> {
        let result = self.canvas.graph.set_color(node, color);
        self.graph_result(result)?;
        self.commit()
    }

    /// Replace a comment's text
    pub fn set_comment_text(&mut self, node: &NodeId, text: &str) -> Result<(), EditError> {
        let result = self.canvas.graph.set_text(node, text);
        self.graph_result(result)?;
        self.commit()
    }

    /// Set or clear a node's image reference
    pub fn set_image_path(&mut self, node: &NodeId, path: Option<String>) -> Result<(), EditError> {
        let result = self.canvas.graph.set_image_path(node, path);
        self.graph_result(result)?;
        self.commit()
    }

    /// Preview of a node's image reference
    pub fn image_preview(&self, node: &NodeId) -> PreviewState {
        let path = self.canvas.graph.node(node).and_then(|n| n.image_path.as_deref());
        PreviewState::resolve(self.resolver.as_ref(), path)
    }

    /// Pin or unpin a node, returning the new state
    pub fn toggle_pinned(&mut self, node: &NodeId) -> Result<bool, EditError> {
        let result = self.canvas.graph.toggle_pinned(node);
        let pinned = self.graph_result(result)?;
        self.commit()?;
        Ok(pinned)
    }

    // ---------------------------------------------------------------------
    // Wires
    // ---------------------------------------------------------------------

    /// Connect two pins through the validity gate
    pub fn connect(&mut self, a: &PinRef, b: &PinRef) -> Result<ConnectionId, EditError> {
        match self.canvas.graph.create_connection(a, b) {
            Ok(id) => {
                self.commit()?;
                Ok(id)
            }
            Err(e) => {
                if e.is_reported() {
                    self.notify(Notice::error(e.to_string()));
                } else {
                    tracing::debug!("Wire cancelled: {}", e);
                }
                Err(e.into())
            }
        }
    }

    /// Remove one connection
    pub fn disconnect(&mut self, connection: ConnectionId) -> Result<bool, EditError> {
        if self.canvas.graph.disconnect(connection).is_none() {
            return Ok(false);
        }
        self.commit()?;
        Ok(true)
    }

    /// Remove every connection at a pin
    pub fn disconnect_pin(&mut self, pin: &PinRef) -> Result<usize, EditError> {
        let removed = self.canvas.graph.remove_connections_for_pin(pin).len();
        if removed > 0 {
            self.commit()?;
        }
        Ok(removed)
    }

    /// Geometry of every wire in the current style
    pub fn wire_paths(&self) -> Vec<(ConnectionId, WirePath)> {
        self.canvas.graph.wire_paths(self.settings.canvas.wire_style)
    }

    // ---------------------------------------------------------------------
    // Pointer interactions
    // ---------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), EditError> {
        if self.mode.is_idle() {
            Ok(())
        } else {
            Err(EditError::Busy)
        }
    }

    /// Start drawing a wire from a pin
    pub fn begin_wire(&mut self, from: PinRef, pointer: Pos2) -> Result<(), EditError> {
        self.ensure_idle()?;
        if self.canvas.graph.pin_spec(&from).is_none() {
            return Err(GraphError::NodeNotFound(from.node).into());
        }
        self.mode = InteractionMode::Wiring { from, cursor: pointer };
        Ok(())
    }

    /// Start dragging a node. Pinned nodes stay put and return false.
    pub fn begin_drag(&mut self, node: &NodeId, pointer: Pos2) -> Result<bool, EditError> {
        self.ensure_idle()?;
        let Some(instance) = self.canvas.graph.node(node) else {
            return Err(GraphError::NodeNotFound(node.clone()).into());
        };
        if instance.pinned {
            return Ok(false);
        }
        let origin = Pos2::new(instance.position[0], instance.position[1]);
        let grab = self.to_world(pointer) - origin;
        self.mode = InteractionMode::Dragging {
            node: node.clone(),
            grab,
        };
        Ok(true)
    }

    /// Start resizing a node from its corner handle
    pub fn begin_resize(&mut self, node: &NodeId, pointer: Pos2) -> Result<(), EditError> {
        self.ensure_idle()?;
        let graph = &self.canvas.graph;
        let (Some(instance), Some(descriptor)) = (graph.node(node), graph.descriptor(node)) else {
            return Err(GraphError::NodeNotFound(node.clone()).into());
        };
        let size = instance.rect(descriptor).size();
        self.mode = InteractionMode::Resizing {
            node: node.clone(),
            start_size: [size.x, size.y],
            start_pointer: pointer,
        };
        Ok(())
    }

    /// Start panning the canvas
    pub fn begin_pan(&mut self, pointer: Pos2) -> Result<(), EditError> {
        self.ensure_idle()?;
        self.mode = InteractionMode::Panning { last: pointer };
        Ok(())
    }

    /// Start dragging inside the minimap. The view jumps to the clicked point.
    pub fn begin_minimap_drag(&mut self, minimap_rect: Rect, pointer: Pos2) -> Result<bool, EditError> {
        self.ensure_idle()?;
        let Some(projection) = self.minimap(minimap_rect.size()) else {
            return Ok(false);
        };
        self.mode = InteractionMode::DraggingMinimap {
            projection,
            origin: minimap_rect.min,
        };
        self.pointer_moved(pointer);
        Ok(true)
    }

    /// Pointer moved while a gesture may be active
    pub fn pointer_moved(&mut self, pointer: Pos2) {
        let canvas_size = self.canvas_rect.size();
        match &mut self.mode {
            InteractionMode::Wiring { cursor, .. } => *cursor = pointer,
            InteractionMode::Dragging { node, grab } => {
                let (node, grab) = (node.clone(), *grab);
                let target = self.to_world(pointer) - grab;
                let position = self.snapped([target.x, target.y]);
                if let Err(e) = self.canvas.graph.move_node(&node, position) {
                    tracing::warn!("Drag target vanished: {}", e);
                    self.mode = InteractionMode::Idle;
                }
            }
            InteractionMode::Resizing {
                node,
                start_size,
                start_pointer,
            } => {
                let delta = (pointer - *start_pointer) / self.canvas.viewport.scale;
                let size = [start_size[0] + delta.x, start_size[1] + delta.y];
                let node = node.clone();
                if let Err(e) = self.canvas.graph.resize_node(&node, size) {
                    tracing::warn!("Resize target vanished: {}", e);
                    self.mode = InteractionMode::Idle;
                }
            }
            InteractionMode::Panning { last } => {
                let delta = pointer - *last;
                *last = pointer;
                self.canvas.viewport.pan_by(delta);
            }
            InteractionMode::DraggingMinimap { projection, origin } => {
                let world = projection.to_world((pointer - *origin).to_pos2());
                self.canvas.viewport.center_on(world, canvas_size);
            }
            InteractionMode::Idle | InteractionMode::RecordingKey(_) => {}
        }
    }

    /// Pointer released: finish the current gesture.
    ///
    /// `over_pin` is the pin under the pointer, if any. A wire dropped
    /// anywhere else is discarded.
    pub fn pointer_released(&mut self, over_pin: Option<&PinRef>) -> Result<(), EditError> {
        if matches!(self.mode, InteractionMode::RecordingKey(_)) {
            return Ok(());
        }
        match std::mem::take(&mut self.mode) {
            InteractionMode::Wiring { from, .. } => match over_pin {
                Some(target) => self.connect(&from, target).map(|_| ()),
                None => {
                    tracing::debug!("Wire from {}.{} dropped on empty canvas", from.node, from.name);
                    Ok(())
                }
            },
            InteractionMode::Dragging { .. } | InteractionMode::Resizing { .. } => self.commit(),
            _ => Ok(()),
        }
    }

    /// Abandon the current gesture without committing
    pub fn cancel_interaction(&mut self) -> Result<(), EditError> {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Dragging { .. } | InteractionMode::Resizing { .. } => {
                // Put the node back where the last snapshot had it.
                let record = match self.active_document().and_then(|d| d.history.current()) {
                    Some(snapshot) => snapshot.to_record()?,
                    None => return Ok(()),
                };
                let viewport = self.canvas.viewport;
                self.load_canvas(Some(&record));
                self.canvas.viewport = viewport;
                Ok(())
            }
            InteractionMode::RecordingKey(recording) => {
                self.mode = InteractionMode::RecordingKey(recording);
                self.finish_recording(true).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    /// Mouse wheel over the canvas: zoom around the pointer
    pub fn wheel(&mut self, pointer: Pos2, delta_y: f32) -> bool {
        let local = (pointer - self.canvas_rect.min).to_pos2();
        self.canvas.viewport.zoom_at(local, delta_y)
    }

    /// Minimap layout for a minimap of the given size
    pub fn minimap(&self, minimap_size: Vec2) -> Option<MinimapProjection> {
        MinimapProjection::compute(
            &self.canvas.graph.node_rects(),
            minimap_size,
            &self.canvas.viewport,
            self.canvas_rect.size(),
        )
    }

    // ---------------------------------------------------------------------
    // Key recording
    // ---------------------------------------------------------------------

    /// Start recording a key combination.
    ///
    /// A recording already in progress ends as interrupted.
    pub fn begin_key_recording(&mut self, target: RecordingTarget) -> Result<(), EditError> {
        if matches!(self.mode, InteractionMode::RecordingKey(_)) {
            self.finish_recording(true)?;
        }
        self.ensure_idle()?;
        if let RecordingTarget::NodeField { node, field } = &target {
            let known = self
                .canvas
                .graph
                .descriptor(node)
                .is_some_and(|d| d.field(field).is_some());
            if !known {
                return Err(GraphError::UnknownField {
                    node: node.clone(),
                    field: field.clone(),
                }
                .into());
            }
        }
        tracing::debug!("Recording key combination for {:?}", target);
        self.mode = InteractionMode::RecordingKey(KeyRecording::new(target));
        Ok(())
    }

    /// Key pressed. Returns false when no recording is active.
    pub fn key_down(&mut self, key: &str, now: Instant) -> bool {
        let InteractionMode::RecordingKey(recording) = &mut self.mode else {
            return false;
        };
        recording.held.insert(map_key(key));
        recording.deadline = Some(now + KEY_RECORDING_TIMEOUT);
        true
    }

    /// Text for the recorder while recording
    pub fn recording_label(&self) -> Option<String> {
        let InteractionMode::RecordingKey(recording) = &self.mode else {
            return None;
        };
        Some(
            recording
                .preview()
                .map_or_else(|| RECORDING_PROMPT.to_string(), |c| c.display),
        )
    }

    /// End the recording if its idle timeout has passed
    pub fn poll(&mut self, now: Instant) -> Result<Option<RecordingOutcome>, EditError> {
        let expired = matches!(
            &self.mode,
            InteractionMode::RecordingKey(KeyRecording { deadline: Some(d), .. }) if now >= *d
        );
        if expired {
            self.finish_recording(false)
        } else {
            Ok(None)
        }
    }

    /// A click landed outside the recorder
    pub fn click_outside(&mut self) -> Result<Option<RecordingOutcome>, EditError> {
        self.finish_recording(true)
    }

    fn finish_recording(&mut self, interrupted: bool) -> Result<Option<RecordingOutcome>, EditError> {
        let InteractionMode::RecordingKey(recording) = std::mem::take(&mut self.mode) else {
            return Ok(None);
        };
        let combo = if interrupted { None } else { recording.preview() };

        match &recording.target {
            RecordingTarget::NodeField { node, field } => {
                let value = match &combo {
                    Some(combo) => ParamValue::KeyCombo(combo.clone()),
                    None => self
                        .canvas
                        .graph
                        .descriptor(node)
                        .and_then(|d| d.field(field))
                        .map(|f| f.default.clone())
                        .ok_or_else(|| GraphError::UnknownField {
                            node: node.clone(),
                            field: field.clone(),
                        })?,
                };
                self.set_param(node, field, value)?;
            }
            RecordingTarget::Global(hotkey) => {
                match &combo {
                    Some(combo) => self.settings.hotkeys.set(*hotkey, combo.encoded.clone()),
                    None => self.settings.hotkeys.reset(*hotkey),
                }
                self.refresh_hotkeys();
            }
        }

        let outcome = match combo {
            Some(combo) => {
                tracing::info!("Recorded {} for {:?}", combo.encoded, recording.target);
                RecordingOutcome::Captured(combo)
            }
            None => {
                tracing::info!("Key recording for {:?} interrupted", recording.target);
                RecordingOutcome::Interrupted
            }
        };
        Ok(Some(outcome))
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    /// Change preferences, then re-register hotkeys
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut AppSettings)) {
        edit(&mut self.settings);
        self.refresh_hotkeys();
    }

    /// Restore default preferences, then re-register hotkeys
    pub fn reset_settings(&mut self) {
        self.settings.reset();
        self.refresh_hotkeys();
        tracing::info!("Settings reset to defaults");
    }

    // ---------------------------------------------------------------------
    // Validation and execution
    // ---------------------------------------------------------------------

    /// Check the active graph and flag offending nodes
    pub fn validate(&mut self) -> ValidationReport {
        let report = validate(&self.canvas.graph);
        self.flagged = report.flagged.clone();
        self.notify(Notice::info(report.summary()));
        report
    }

    /// A registered hotkey fired
    pub fn trigger_hotkey(&mut self, action_id: &str) -> Result<(), EditError> {
        match HotkeyAction::from_id(action_id) {
            HotkeyAction::Undo => self.undo().map(|_| ()),
            HotkeyAction::Redo => self.redo().map(|_| ()),
            HotkeyAction::EmergencyStop => {
                tracing::info!("Emergency stop");
                self.backend.stop();
                self.highlight.clear();
                Ok(())
            }
            HotkeyAction::RunMacro(entry) => self.run_macro(&entry),
        }
    }

    /// Hand the macro starting at `entry` to the executor
    pub fn run_macro(&mut self, entry: &NodeId) -> Result<(), EditError> {
        let record = match MacroRecord::capture(&self.canvas.graph, entry) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Start node with ID {} not found for hotkey", entry);
                return Err(e.into());
            }
        };
        tracing::info!("Running macro from {}", entry);
        if let Err(e) = self.backend.run_macro(&record) {
            tracing::error!("{}", e);
            self.notify(Notice::error(e.to_string()));
        }
        Ok(())
    }

    /// Executor reached a node
    pub fn highlight_executing_node(&mut self, node: NodeId) {
        if self.canvas.graph.node(&node).is_some() {
            self.highlight.set(node);
        } else {
            self.highlight.clear();
        }
    }

    /// Executor finished
    pub fn clear_execution_highlights(&mut self) {
        self.highlight.clear();
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(
            Arc::new(macrobot_editor_graph::create_macro_registry()),
            AppSettings::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakeRegistrar(Rc<RefCell<Vec<HotkeyMap>>>);

    impl HotkeyRegistrar for FakeRegistrar {
        fn register(&mut self, hotkeys: &HotkeyMap) {
            self.0.borrow_mut().push(hotkeys.clone());
        }
    }

    #[derive(Clone, Default)]
    struct FakeBackend {
        runs: Rc<RefCell<Vec<MacroRecord>>>,
        stops: Rc<RefCell<usize>>,
    }

    impl ExecutionBackend for FakeBackend {
        fn run_macro(&mut self, record: &MacroRecord) -> Result<(), ExecutionError> {
            self.runs.borrow_mut().push(record.clone());
            Ok(())
        }

        fn stop(&mut self) {
            *self.stops.borrow_mut() += 1;
        }
    }

    fn session() -> EditorSession {
        EditorSession::default()
    }

    fn world(x: f32, y: f32) -> Pos2 {
        Pos2::new(x, y)
    }

    #[test]
    fn test_starts_with_one_tab() {
        let s = session();
        assert_eq!(s.documents().len(), 1);
        assert_eq!(s.active_document().unwrap().name, "Untitled");
        assert!(!s.can_undo());
    }

    #[test]
    fn test_each_edit_is_one_undo_step() {
        let mut s = session();
        let delay = s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();
        s.set_param(&delay, "Duration", ParamValue::from(3.0)).unwrap();

        assert!(s.undo().unwrap());
        let restored = s.canvas().graph.node(&delay).unwrap();
        assert_eq!(restored.number("Duration"), Some(1.0));
        assert!(s.undo().unwrap());
        assert_eq!(s.canvas().graph.node_count(), 0);
        assert!(!s.undo().unwrap());

        assert!(s.redo().unwrap());
        assert!(s.redo().unwrap());
        assert_eq!(s.canvas().graph.node(&delay).unwrap().number("Duration"), Some(3.0));
        assert!(!s.redo().unwrap());
    }

    #[test]
    fn test_undo_connection() {
        let mut s = session();
        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 0.0)).unwrap();
        s.connect(&PinRef::exec_out(start.clone(), "exec"), &PinRef::exec_in(delay.clone(), "exec"))
            .unwrap();
        assert_eq!(s.canvas().graph.connection_count(), 1);

        s.undo().unwrap();
        assert_eq!(s.canvas().graph.connection_count(), 0);
        assert_eq!(s.canvas().graph.node_count(), 2);
        s.redo().unwrap();
        assert_eq!(s.canvas().graph.connection_count(), 1);
    }

    #[test]
    fn test_undo_connection_restores_overridden_field() {
        let mut s = session();
        let lit = s.add_node(catalog::NUMBER_LITERAL, world(0.0, 0.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 0.0)).unwrap();
        s.set_param(&delay, "Duration", ParamValue::from(7.0)).unwrap();
        s.connect(&PinRef::data_out(lit, "out"), &PinRef::data_in(delay.clone(), "Duration"))
            .unwrap();
        assert!(s.canvas().graph.is_input_connected(&delay, "Duration"));

        assert!(s.undo().unwrap());
        assert!(!s.canvas().graph.is_input_connected(&delay, "Duration"));
        assert_eq!(s.canvas().graph.node(&delay).unwrap().number("Duration"), Some(7.0));
    }

    #[test]
    fn test_undo_restores_literal_and_severed_wire() {
        let mut s = session();
        let lit = s.add_node(catalog::NUMBER_LITERAL, world(0.0, 0.0)).unwrap();
        let find = s.add_node(catalog::FIND_IMAGE, world(300.0, 0.0)).unwrap();
        s.set_param(&lit, catalog::LITERAL_VALUE, ParamValue::from(50.0)).unwrap();
        s.connect(&PinRef::data_out(lit.clone(), "out"), &PinRef::data_in(find.clone(), "Confidence"))
            .unwrap();

        s.set_param(&lit, catalog::LITERAL_VALUE, ParamValue::from(0.0)).unwrap();
        assert!(!s.canvas().graph.is_input_connected(&find, "Confidence"));

        assert!(s.undo().unwrap());
        assert!(s.canvas().graph.is_input_connected(&find, "Confidence"));
        assert_eq!(s.canvas().graph.node(&lit).unwrap().number(catalog::LITERAL_VALUE), Some(50.0));
    }

    #[test]
    fn test_failed_connection_reports_and_leaves_graph() {
        let mut s = session();
        let lit = s.add_node(catalog::STRING_LITERAL, world(0.0, 0.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 0.0)).unwrap();
        let err = s
            .connect(&PinRef::data_out(lit, "out"), &PinRef::data_in(delay, "Duration"))
            .unwrap_err();
        assert!(matches!(err, EditError::Connection(_)));
        assert_eq!(s.canvas().graph.connection_count(), 0);
        assert_eq!(
            s.notices()[0].message,
            "Connection failed! Cannot connect a 'String' output to a 'Number' input."
        );
    }

    #[test]
    fn test_show_errors_off_suppresses_notices() {
        let mut s = session();
        s.update_settings(|settings| settings.general.show_errors = false);
        s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        assert!(s.add_node(catalog::START, world(10.0, 0.0)).is_err());
        assert!(s.notices().is_empty());
    }

    #[test]
    fn test_broken_connection_notice() {
        let mut s = session();
        let lit = s.add_node(catalog::NUMBER_LITERAL, world(0.0, 0.0)).unwrap();
        let find = s.add_node(catalog::FIND_IMAGE, world(300.0, 0.0)).unwrap();
        s.set_param(&lit, catalog::LITERAL_VALUE, ParamValue::from(50.0)).unwrap();
        s.connect(&PinRef::data_out(lit.clone(), "out"), &PinRef::data_in(find, "Confidence"))
            .unwrap();

        s.set_param(&lit, catalog::LITERAL_VALUE, ParamValue::from(150.0)).unwrap();
        assert_eq!(s.canvas().graph.connection_count(), 0);
        assert!(s.notices().iter().any(|n| n.message.starts_with("Connection broken!")));
    }

    #[test]
    fn test_switch_tab_keeps_each_canvas() {
        let mut s = session();
        let first = s.active_id();
        s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();

        let second = s.create_tab(Some("Second"));
        assert_eq!(s.canvas().graph.node_count(), 0);
        s.add_node(catalog::COMMENT, world(0.0, 0.0)).unwrap();
        s.add_node(catalog::COMMENT, world(50.0, 0.0)).unwrap();

        s.switch_tab(first).unwrap();
        assert_eq!(s.canvas().graph.node_count(), 1);
        s.switch_tab(second).unwrap();
        assert_eq!(s.canvas().graph.node_count(), 2);
        assert!(s.can_undo());
    }

    #[test]
    fn test_switching_back_adds_no_history() {
        let mut s = session();
        let first = s.active_id();
        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 0.0)).unwrap();
        s.connect(&PinRef::exec_out(start, "exec"), &PinRef::exec_in(delay, "exec"))
            .unwrap();
        let before = s.active_document().unwrap().history.stats();

        let second = s.create_tab(None);
        s.switch_tab(first).unwrap();
        s.switch_tab(second).unwrap();
        s.switch_tab(first).unwrap();

        let after = s.active_document().unwrap().history.stats();
        assert_eq!(after.entries, before.entries);
        assert_eq!(after.undo_count, before.undo_count);
    }

    #[test]
    fn test_close_tab_selects_left_neighbour() {
        let mut s = session();
        let first = s.active_id();
        let second = s.create_tab(None);
        let third = s.create_tab(None);

        s.close_tab(third).unwrap();
        assert_eq!(s.active_id(), second);
        s.close_tab(first).unwrap();
        assert_eq!(s.active_id(), second);
        s.close_tab(second).unwrap();
        assert_eq!(s.documents().len(), 1);
        assert_ne!(s.active_id(), second);
        assert!(matches!(s.close_tab(second), Err(EditError::DocumentNotFound(_))));
    }

    #[test]
    fn test_rename_tab() {
        let mut s = session();
        let id = s.active_id();
        s.rename_tab(id, "Farming").unwrap();
        s.rename_tab(id, "  ").unwrap();
        assert_eq!(s.active_document().unwrap().name, "Farming");
    }

    #[test]
    fn test_import_failure_leaves_documents() {
        let mut s = session();
        s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();
        let path = std::env::temp_dir().join(format!("macrobot-{}.macro", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ nodes: oops").unwrap();

        assert!(s.import_file(&path).is_err());
        assert_eq!(s.documents().len(), 1);
        assert_eq!(s.canvas().graph.node_count(), 1);
        assert_eq!(s.notices()[0].message, "Failed to load file. It may be corrupted.");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_reports_load_failure() {
        let mut s = session();
        let path = std::env::temp_dir().join(format!("macrobot-missing-{}.macro", uuid::Uuid::new_v4()));

        assert!(matches!(s.import_file(&path), Err(FileError::Io { .. })));
        assert_eq!(s.documents().len(), 1);
        assert_eq!(s.notices()[0].message, LOAD_FAILED);
    }

    #[test]
    fn test_save_then_import_round_trip() {
        let mut s = session();
        let start = s.add_node(catalog::START, world(10.0, 20.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 20.0)).unwrap();
        s.connect(&PinRef::exec_out(start, "exec"), &PinRef::exec_in(delay, "exec"))
            .unwrap();
        let path = std::env::temp_dir().join(format!("macrobot-{}.macro", uuid::Uuid::new_v4()));
        s.save_active(&path).unwrap();
        let saved = s.active_record();

        let id = s.import_file(&path).unwrap();
        assert_eq!(s.active_id(), id);
        assert_eq!(s.documents().len(), 2);
        assert_eq!(s.active_record(), saved);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_clear_canvas_is_undoable() {
        let mut s = session();
        s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();
        s.clear_canvas().unwrap();
        assert_eq!(s.canvas().graph.node_count(), 0);
        s.undo().unwrap();
        assert_eq!(s.canvas().graph.node_count(), 1);
    }

    #[test]
    fn test_drag_commits_once_and_snaps() {
        let mut s = session();
        s.update_settings(|settings| settings.canvas.snap_to_grid = true);
        let delay = s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();

        assert!(s.begin_drag(&delay, Pos2::new(10.0, 10.0)).unwrap());
        s.pointer_moved(Pos2::new(50.0, 30.0));
        s.pointer_moved(Pos2::new(73.0, 48.0));
        s.pointer_released(None).unwrap();

        assert_eq!(s.canvas().graph.node(&delay).unwrap().position, [60.0, 40.0]);
        assert!(s.mode().is_idle());
        s.undo().unwrap();
        assert_eq!(s.canvas().graph.node(&delay).unwrap().position, [0.0, 0.0]);
    }

    #[test]
    fn test_pinned_node_does_not_drag() {
        let mut s = session();
        let delay = s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();
        assert!(s.toggle_pinned(&delay).unwrap());
        assert!(!s.begin_drag(&delay, Pos2::new(5.0, 5.0)).unwrap());
        assert!(s.mode().is_idle());
    }

    #[test]
    fn test_only_one_gesture_at_a_time() {
        let mut s = session();
        s.begin_pan(Pos2::ZERO).unwrap();
        assert!(matches!(s.begin_pan(Pos2::ZERO), Err(EditError::Busy)));
        s.pointer_moved(Pos2::new(30.0, -10.0));
        s.pointer_released(None).unwrap();
        assert_eq!(s.canvas().viewport.pan, Vec2::new(30.0, -10.0));
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut s = session();
        let note = s.add_node(catalog::COMMENT, world(0.0, 0.0)).unwrap();
        s.begin_resize(&note, Pos2::new(200.0, 100.0)).unwrap();
        s.pointer_moved(Pos2::new(20.0, 20.0));
        s.pointer_released(None).unwrap();
        assert_eq!(s.canvas().graph.node(&note).unwrap().size, Some([150.0, 80.0]));
    }

    #[test]
    fn test_wire_dropped_on_canvas_is_discarded() {
        let mut s = session();
        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 0.0)).unwrap();

        s.begin_wire(PinRef::exec_out(start.clone(), "exec"), Pos2::ZERO).unwrap();
        s.pointer_moved(Pos2::new(100.0, 0.0));
        s.pointer_released(None).unwrap();
        assert_eq!(s.canvas().graph.connection_count(), 0);

        s.begin_wire(PinRef::exec_out(start, "exec"), Pos2::ZERO).unwrap();
        s.pointer_released(Some(&PinRef::exec_in(delay, "exec"))).unwrap();
        assert_eq!(s.canvas().graph.connection_count(), 1);
    }

    #[test]
    fn test_wheel_zoom_keeps_point_under_cursor() {
        let mut s = session();
        s.set_canvas_rect(Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(800.0, 600.0)));
        let cursor = Pos2::new(400.0, 300.0);
        let before = s.canvas().viewport.screen_to_world(cursor, Pos2::new(100.0, 50.0));
        assert!(s.wheel(cursor, -1.0));
        let after = s.canvas().viewport.screen_to_world(cursor, Pos2::new(100.0, 50.0));
        assert!((before - after).length() < 1e-3);
    }

    #[test]
    fn test_minimap_drag_recenters_view() {
        let mut s = session();
        s.set_canvas_rect(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));
        s.add_node(catalog::COMMENT, world(0.0, 0.0)).unwrap();
        let minimap = Rect::from_min_size(Pos2::new(600.0, 450.0), Vec2::new(150.0, 100.0));
        let projection = s.minimap(minimap.size()).unwrap();
        let clicked = Pos2::new(675.0, 500.0);

        assert!(s.begin_minimap_drag(minimap, clicked).unwrap());
        s.pointer_released(None).unwrap();

        let target = projection.to_world(Pos2::new(75.0, 50.0));
        let center = s.canvas().viewport.screen_to_world(Pos2::new(400.0, 300.0), Pos2::ZERO);
        assert!((center - target).length() < 1e-3);
    }

    #[test]
    fn test_key_recording_captures_after_timeout() {
        let mut s = session();
        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        let t0 = Instant::now();
        s.begin_key_recording(RecordingTarget::NodeField {
            node: start.clone(),
            field: catalog::HOTKEY.to_string(),
        })
        .unwrap();
        assert_eq!(s.recording_label().as_deref(), Some(RECORDING_PROMPT));

        assert!(s.key_down("Control", t0));
        assert!(s.key_down("F5", t0 + Duration::from_millis(100)));
        assert_eq!(s.recording_label().as_deref(), Some("Ctrl + F5"));
        assert_eq!(s.poll(t0 + Duration::from_millis(500)).unwrap(), None);

        let outcome = s.poll(t0 + Duration::from_millis(900)).unwrap();
        let Some(RecordingOutcome::Captured(combo)) = outcome else {
            panic!("expected a captured combination");
        };
        assert_eq!(combo.encoded, "<ctrl>+<f5>");
        assert!(s.mode().is_idle());
        let stored = s.canvas().graph.node(&start).unwrap().value(catalog::HOTKEY).cloned();
        assert_eq!(stored, Some(ParamValue::KeyCombo(combo)));
    }

    #[test]
    fn test_click_outside_interrupts_and_resets() {
        let mut s = session();
        let t0 = Instant::now();
        s.begin_key_recording(RecordingTarget::Global(GlobalHotkey::Undo)).unwrap();
        s.key_down("a", t0);
        assert_eq!(s.click_outside().unwrap(), Some(RecordingOutcome::Interrupted));
        assert_eq!(s.settings().hotkeys.undo, "<ctrl>+z");

        s.begin_key_recording(RecordingTarget::Global(GlobalHotkey::EmergencyStop)).unwrap();
        s.key_down("Escape", t0);
        s.poll(t0 + KEY_RECORDING_TIMEOUT).unwrap();
        assert_eq!(s.settings().hotkeys.emergency_stop.as_deref(), Some("<esc>"));

        s.begin_key_recording(RecordingTarget::Global(GlobalHotkey::EmergencyStop)).unwrap();
        s.begin_key_recording(RecordingTarget::Global(GlobalHotkey::Redo)).unwrap();
        assert_eq!(s.settings().hotkeys.emergency_stop, None);
        assert!(matches!(s.mode(), InteractionMode::RecordingKey(_)));
    }

    #[test]
    fn test_no_timeout_before_first_key() {
        let mut s = session();
        s.begin_key_recording(RecordingTarget::Global(GlobalHotkey::Redo)).unwrap();
        assert_eq!(s.poll(Instant::now() + Duration::from_secs(60)).unwrap(), None);
        assert!(matches!(s.mode(), InteractionMode::RecordingKey(_)));
    }

    #[test]
    fn test_hotkeys_registered_on_change() {
        let registrar = FakeRegistrar::default();
        let calls = registrar.0.clone();
        let mut s = session().with_hotkey_registrar(Box::new(registrar));
        assert_eq!(calls.borrow().len(), 1);

        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        assert_eq!(calls.borrow().len(), 1);

        let combo = KeyCombo::from_keys(["alt", "r"]).unwrap();
        s.set_param(&start, catalog::HOTKEY, combo.into()).unwrap();
        let last = calls.borrow().last().cloned().unwrap();
        assert_eq!(last.get("<alt>+r"), Some(&HotkeyAction::RunMacro(start)));
    }

    #[test]
    fn test_trigger_hotkey_runs_and_stops() {
        let backend = FakeBackend::default();
        let runs = backend.runs.clone();
        let stops = backend.stops.clone();
        let mut s = session().with_execution_backend(Box::new(backend));
        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();

        s.trigger_hotkey(start.as_str()).unwrap();
        assert_eq!(runs.borrow().len(), 1);
        assert_eq!(runs.borrow()[0].entry_node_id, start);

        s.highlight_executing_node(start.clone());
        assert_eq!(s.executing_node(), Some(&start));
        s.trigger_hotkey("emergency_stop").unwrap();
        assert_eq!(*stops.borrow(), 1);
        assert_eq!(s.executing_node(), None);

        assert!(s.trigger_hotkey("node-999").is_err());
        assert_eq!(runs.borrow().len(), 1);
    }

    #[test]
    fn test_trigger_undo_hotkey() {
        let mut s = session();
        s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();
        s.trigger_hotkey("undo").unwrap();
        assert_eq!(s.canvas().graph.node_count(), 0);
        s.trigger_hotkey("redo").unwrap();
        assert_eq!(s.canvas().graph.node_count(), 1);
    }

    #[test]
    fn test_highlight_keeps_one_node() {
        let mut s = session();
        let a = s.add_node(catalog::DELAY, world(0.0, 0.0)).unwrap();
        let b = s.add_node(catalog::DELAY, world(0.0, 200.0)).unwrap();
        s.highlight_executing_node(a);
        s.highlight_executing_node(b.clone());
        assert_eq!(s.executing_node(), Some(&b));
        s.clear_execution_highlights();
        assert_eq!(s.executing_node(), None);
    }

    #[test]
    fn test_validate_flags_nodes() {
        let mut s = session();
        s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        let delay = s.add_node(catalog::DELAY, world(300.0, 0.0)).unwrap();
        let report = s.validate();
        assert!(!report.is_valid());
        assert!(s.flagged_nodes().contains(&delay));
        assert_eq!(s.notices().last().unwrap().level, NoticeLevel::Info);
    }

    #[test]
    fn test_deleting_function_clears_call_selection() {
        let mut s = session();
        let define = s.add_node(catalog::DEFINE_FUNCTION, world(0.0, 0.0)).unwrap();
        let call = s.add_node(catalog::CALL_FUNCTION, world(0.0, 200.0)).unwrap();
        s.set_param(&call, catalog::FUNCTION_NAME, ParamValue::from("myFunction")).unwrap();

        s.delete_node(&define).unwrap();
        let graph = &s.canvas().graph;
        assert_eq!(graph.node(&call).unwrap().text_value(catalog::FUNCTION_NAME), Some(""));
        assert!(graph.field_options(&call, catalog::FUNCTION_NAME).is_empty());
    }

    #[test]
    fn test_duplicate_start_is_refused() {
        let mut s = session();
        let start = s.add_node(catalog::START, world(0.0, 0.0)).unwrap();
        assert!(s.duplicate_node(&start).is_err());
        assert_eq!(s.notices()[0].message, "A 'Start' node cannot be duplicated.");
    }
}
