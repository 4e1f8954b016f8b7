// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor error types and user-facing notices.

use crate::document::DocumentId;
use crate::history::HistoryError;
use macrobot_editor_graph::{CodecError, ConnectionError, GraphError};
use std::path::PathBuf;
use thiserror::Error;

/// Error from an editing command
#[derive(Debug, Error)]
pub enum EditError {
    /// Graph rejected the edit
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Wire rejected
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// History could not be read or written
    #[error(transparent)]
    History(#[from] HistoryError),

    /// No such tab
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Another interaction is already running
    #[error("Another interaction is in progress")]
    Busy,
}

/// Error reading or writing a document file
#[derive(Debug, Error)]
pub enum FileError {
    /// File could not be read or written
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File contents are not a document
    #[error("Failed to load file. It may be corrupted.")]
    Corrupted(#[from] CodecError),
}

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational
    Info,
    /// Something went wrong but editing continues
    Error,
}

/// A dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message text
    pub message: String,
}

impl Notice {
    /// Informational notice
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
