// SPDX-License-Identifier: MIT OR Apache-2.0
//! Image references of image-match nodes.
//!
//! Documents only store a path. Whether the path still points at a readable
//! image is checked when a preview is needed; a bad path degrades that one
//! node's preview and nothing else.

use std::path::Path;
use thiserror::Error;

/// Image resolution errors
#[derive(Debug, Error)]
pub enum ImageError {
    /// File does not exist
    #[error("Image not found: {0}")]
    NotFound(String),

    /// File exists but is not a readable image
    #[error("Invalid image {path}: {reason}")]
    Invalid {
        /// Path that failed
        path: String,
        /// Decoder message
        reason: String,
    },
}

/// Facts about a resolved image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Looks up image references
pub trait ImageResolver {
    /// Resolve a stored path
    fn resolve(&self, path: &str) -> Result<ImageInfo, ImageError>;
}

/// Resolver reading image headers from the local file system
#[derive(Debug, Default)]
pub struct FsImageResolver;

impl ImageResolver for FsImageResolver {
    fn resolve(&self, path: &str) -> Result<ImageInfo, ImageError> {
        if !Path::new(path).is_file() {
            return Err(ImageError::NotFound(path.to_string()));
        }
        let (width, height) = image::image_dimensions(path).map_err(|e| ImageError::Invalid {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ImageInfo { width, height })
    }
}

/// What to show for a node's image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    /// No image chosen
    Empty,
    /// Image can be shown
    Ready {
        /// Stored path
        path: String,
        /// Image size
        info: ImageInfo,
    },
    /// Stored path could not be resolved
    Missing {
        /// Stored path
        path: String,
        /// Why it failed
        reason: String,
    },
}

impl PreviewState {
    /// Resolve an optional path into a preview state
    pub fn resolve(resolver: &dyn ImageResolver, path: Option<&str>) -> Self {
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            return Self::Empty;
        };
        match resolver.resolve(path) {
            Ok(info) => Self::Ready {
                path: path.to_string(),
                info,
            },
            Err(e) => {
                tracing::warn!("Image preview unavailable: {}", e);
                Self::Missing {
                    path: path.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}
