// SPDX-License-Identifier: MIT OR Apache-2.0
//! `MacroBot` Editor application layer.
//!
//! Everything around the macro graph that a host window needs:
//! - Tabbed documents with per-document undo/redo
//! - Modal pointer interactions (wiring, dragging, resizing, panning, minimap)
//! - Key-combination recording for node fields and global hotkeys
//! - Hotkey registration and execution handoff to an external runner
//! - Persistent settings and `.macro` file I/O
//!
//! ## Architecture
//!
//! [`EditorSession`] is the single entry point. The host reports input
//! events and the session mutates the active document through the graph
//! crate's validity gate. External collaborators sit behind traits
//! ([`HotkeyRegistrar`], [`ExecutionBackend`], [`ImageResolver`]).

pub mod document;
pub mod error;
pub mod execution;
pub mod files;
pub mod history;
pub mod hotkeys;
pub mod images;
pub mod settings;
pub mod state;

pub use document::{Canvas, Document, DocumentId};
pub use error::{EditError, FileError, Notice, NoticeLevel};
pub use execution::{ExecutionBackend, ExecutionError};
pub use hotkeys::{HotkeyAction, HotkeyMap, HotkeyRegistrar};
pub use images::{ImageResolver, PreviewState};
pub use settings::{AppSettings, GlobalHotkey, SettingsError};
pub use state::{EditorSession, InteractionMode, RecordingOutcome, RecordingTarget};
