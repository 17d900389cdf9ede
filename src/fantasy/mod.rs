//! Fantasy maps
//!
//! Provides:
//! - `FantasyMapDefinition`, the persisted description of an imported map
//! - `FantasyMapStorage`, the directory holding imported map images

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// PNG file signature
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A user-imported fantasy map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FantasyMapDefinition {
    pub id: String,
    pub name: String,
    /// Absolute path of the stored image
    pub image_path: PathBuf,
    /// Free text describing the world, fed into the prompt
    #[serde(default)]
    pub world_context: String,
    /// Unix milliseconds
    pub created_at: i64,
}

/// Map image storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Map image is empty")]
    EmptyImage,

    #[error("Map image is not a PNG")]
    NotPng,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory of imported map images, one `<uuid>.png` per map
#[derive(Debug, Clone)]
pub struct FantasyMapStorage {
    dir: PathBuf,
}

impl FantasyMapStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store a PNG image under a fresh name and return its path
    pub async fn save_image(&self, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyImage);
        }
        if !bytes.starts_with(PNG_SIGNATURE) {
            return Err(StorageError::NotPng);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?;

        let path = self.dir.join(format!("{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        debug!("Stored map image {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Read a stored image
    pub async fn load_image(&self, path: &Path) -> Result<Arc<[u8]>, StorageError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        Ok(bytes.into())
    }

    /// Delete a stored image; a missing file is not an error
    pub async fn delete_image(&self, path: &Path) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Deleted map image {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Map image {} already gone", path.display());
                Ok(false)
            }
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}
