// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reading and writing `.macro` documents.

use crate::error::FileError;
use macrobot_editor_graph::DocumentRecord;
use std::path::Path;

/// Extension used for saved documents
pub const MACRO_EXTENSION: &str = "macro";

/// Extensions stripped when naming a tab after its file
const KNOWN_EXTENSIONS: [&str; 2] = [".macro", ".json"];

/// Read a document record from disk
pub fn load_document(path: &Path) -> Result<DocumentRecord, FileError> {
    let content = std::fs::read_to_string(path).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let record = DocumentRecord::from_json(&content)?;
    tracing::info!("Loaded document from {:?}", path);
    Ok(record)
}

/// Write a document record to disk as indented JSON
pub fn save_document(path: &Path, record: &DocumentRecord) -> Result<(), FileError> {
    let content = record.to_json_pretty()?;
    std::fs::write(path, content).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved document to {:?}", path);
    Ok(())
}

/// Tab title for a file name: the name without a known extension
pub fn tab_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for ext in KNOWN_EXTENSIONS {
        let Some(split) = file_name.len().checked_sub(ext.len()).filter(|s| *s > 0) else {
            continue;
        };
        if let (Some(stem), Some(tail)) = (file_name.get(..split), file_name.get(split..)) {
            if tail.eq_ignore_ascii_case(ext) {
                return stem.to_string();
            }
        }
    }
    file_name
}
