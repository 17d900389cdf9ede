//! User settings
//!
//! Provides:
//! - `Database` and `SettingsStore`, the SQLite key/value layer
//! - `Preferences`, typed access to persisted choices
//! - `SettingsService`, validated edits of settings, custom styles and fantasy maps

mod preferences;
mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use preferences::Preferences;
pub use store::{Database, SettingsStore};

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::fantasy::{FantasyMapDefinition, FantasyMapStorage, StorageError};
use crate::generation::{AspectRatio, ImageSize};
use crate::style::{CustomStyle, StyleChoice};

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Please enter an API key")]
    BlankApiKey,

    #[error("Name must not be blank")]
    BlankName,

    #[error("Style prompt must not be blank")]
    BlankPrompt,

    #[error("A map image is required")]
    MissingImage,

    #[error("Unknown custom style: {0}")]
    UnknownStyle(String),

    #[error("Unknown fantasy map: {0}")]
    UnknownFantasyMap(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Values written together by the settings screen
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub api_key: String,
    pub style: StyleChoice,
    /// Selected custom style, meaningful with `StyleChoice::Custom`
    pub custom_style_id: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
}

/// A fantasy map to create or edit
#[derive(Debug, Clone, Default)]
pub struct FantasyMapDraft {
    /// Set when editing an existing map
    pub existing_id: Option<String>,
    pub name: String,
    pub world_context: String,
    /// New PNG image; required for a new map, optional when editing
    pub image: Option<Vec<u8>>,
}

/// Validated settings operations
#[derive(Clone)]
pub struct SettingsService {
    prefs: Preferences,
    storage: FantasyMapStorage,
}

impl SettingsService {
    pub fn new(prefs: Preferences, storage: FantasyMapStorage) -> Self {
        Self { prefs, storage }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Save the settings screen
    ///
    /// A blank API key rejects the whole update.
    pub async fn save_settings(&self, update: &SettingsUpdate) -> Result<(), SettingsError> {
        if update.api_key.trim().is_empty() {
            return Err(SettingsError::BlankApiKey);
        }

        if update.style == StyleChoice::Custom {
            match update.custom_style_id.as_deref() {
                Some(id) if self.prefs.custom_style(id).await?.is_some() => {}
                Some(id) => return Err(SettingsError::UnknownStyle(id.to_string())),
                None => return Err(SettingsError::UnknownStyle(String::new())),
            }
        }

        let custom_style_id = match update.style {
            StyleChoice::Custom => update.custom_style_id.as_deref(),
            _ => None,
        };

        self.prefs.set_api_key(&update.api_key).await?;
        self.prefs.set_style(update.style).await?;
        self.prefs
            .set_selected_custom_style_id(custom_style_id)
            .await?;
        self.prefs.set_aspect_ratio(update.aspect_ratio).await?;
        self.prefs.set_image_size(update.image_size).await?;

        info!(
            "Settings saved (style {}, {}, {})",
            update.style.name(),
            update.aspect_ratio.wire_value(),
            update.image_size.wire_value()
        );
        Ok(())
    }

    /// Create or edit a custom style
    pub async fn save_custom_style(
        &self,
        name: &str,
        prompt: &str,
        existing_id: Option<&str>,
    ) -> Result<CustomStyle, SettingsError> {
        if name.trim().is_empty() {
            return Err(SettingsError::BlankName);
        }
        if prompt.trim().is_empty() {
            return Err(SettingsError::BlankPrompt);
        }

        let mut style = CustomStyle::new(name, prompt);
        if let Some(id) = existing_id {
            style.id = id.to_string();
        }

        self.prefs.put_custom_style(&style).await?;
        info!("Saved custom style {} ({})", style.name, style.id);
        Ok(style)
    }

    /// Delete a custom style
    ///
    /// When the style is the selected one, the selection reverts to Realistic.
    pub async fn delete_custom_style(&self, id: &str) -> Result<bool, SettingsError> {
        let removed = self.prefs.remove_custom_style(id).await?;

        if self.prefs.selected_custom_style_id().await?.as_deref() == Some(id) {
            self.prefs.set_selected_custom_style_id(None).await?;
            if self.prefs.style().await? == StyleChoice::Custom {
                self.prefs.set_style(StyleChoice::Realistic).await?;
            }
            info!("Selected custom style {} deleted, reverting to Realistic", id);
        }

        Ok(removed)
    }

    /// Create or edit a fantasy map
    ///
    /// A new image replaces the stored one and the old file is deleted.
    pub async fn save_fantasy_map(
        &self,
        draft: FantasyMapDraft,
    ) -> Result<FantasyMapDefinition, SettingsError> {
        if draft.name.trim().is_empty() {
            return Err(SettingsError::BlankName);
        }

        let existing = match draft.existing_id.as_deref() {
            Some(id) => Some(
                self.prefs
                    .fantasy_map(id)
                    .await?
                    .ok_or_else(|| SettingsError::UnknownFantasyMap(id.to_string()))?,
            ),
            None => None,
        };

        let image_path: PathBuf = match (&draft.image, &existing) {
            (Some(bytes), _) => self.storage.save_image(bytes).await?,
            (None, Some(map)) => map.image_path.clone(),
            (None, None) => return Err(SettingsError::MissingImage),
        };

        if let (Some(_), Some(old)) = (&draft.image, &existing) {
            if old.image_path != image_path {
                if let Err(e) = self.storage.delete_image(&old.image_path).await {
                    warn!("Failed to delete replaced map image: {}", e);
                }
            }
        }

        let map = FantasyMapDefinition {
            id: existing
                .as_ref()
                .map(|m| m.id.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: draft.name.trim().to_string(),
            image_path,
            world_context: draft.world_context.trim().to_string(),
            created_at: existing
                .as_ref()
                .map(|m| m.created_at)
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        };

        self.prefs.put_fantasy_map(&map).await?;
        info!("Saved fantasy map {} ({})", map.name, map.id);
        Ok(map)
    }

    /// Delete a fantasy map and its image
    ///
    /// Clears the active pointer when it referenced this map.
    pub async fn delete_fantasy_map(&self, id: &str) -> Result<bool, SettingsError> {
        let Some(map) = self.prefs.fantasy_map(id).await? else {
            return Ok(false);
        };

        if let Err(e) = self.storage.delete_image(&map.image_path).await {
            warn!("Failed to delete map image for {}: {}", id, e);
        }
        self.prefs.remove_fantasy_map(id).await?;

        if self.prefs.active_fantasy_map_id().await?.as_deref() == Some(id) {
            self.prefs.set_active_fantasy_map_id(None).await?;
        }

        info!("Deleted fantasy map {} ({})", map.name, id);
        Ok(true)
    }
}
