//! Asset loading
//!
//! Decoders for images, HDR panoramas and glTF models, plus an
//! [`AssetLoader`] that runs them off the main thread and hands results back
//! to completion callbacks during [`AssetLoader::poll`].

pub mod gltf_loader;
pub mod image_loader;
pub mod loader;

pub use gltf_loader::{Model, ModelMaterial, ModelNode, ModelPrimitive};
pub use image_loader::{HdrImage, ImageData};
pub use loader::{AssetLoader, LoadId, LoadedAsset, TextureSink};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Asset loading errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// The file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file was read but could not be decoded as an image
    #[error("Failed to decode image {}: {source}", .path.display())]
    Image {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: image::ImageError,
    },

    /// The glTF document or its buffers could not be imported
    #[error("Failed to load glTF {}: {source}", .path.display())]
    Gltf {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: gltf::Error,
    },

    /// A model decoded but its contents are unusable
    #[error("Invalid asset data in {}: {reason}", .path.display())]
    InvalidData {
        /// File that failed
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// A load finished with a different asset kind than requested
    #[error("Expected {expected} from {}, got {found}", .path.display())]
    UnexpectedAsset {
        /// File that was loaded
        path: PathBuf,
        /// Requested kind
        expected: &'static str,
        /// Delivered kind
        found: &'static str,
    },

    /// The background worker ended without delivering a result
    #[error("Loader worker for {} exited without a result", .0.display())]
    WorkerDisconnected(PathBuf),
}

impl AssetError {
    /// Replace the placeholder path of an in-memory decode with the real file
    #[must_use]
    pub fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            Self::Io { source, .. } => Self::Io { path, source },
            Self::Image { source, .. } => Self::Image { path, source },
            Self::Gltf { source, .. } => Self::Gltf { path, source },
            Self::InvalidData { reason, .. } => Self::InvalidData { path, reason },
            Self::UnexpectedAsset { expected, found, .. } => Self::UnexpectedAsset { path, expected, found },
            Self::WorkerDisconnected(_) => Self::WorkerDisconnected(path),
        }
    }

    /// File the error refers to
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Image { path, .. }
            | Self::Gltf { path, .. }
            | Self::InvalidData { path, .. }
            | Self::UnexpectedAsset { path, .. }
            | Self::WorkerDisconnected(path) => path,
        }
    }
}
