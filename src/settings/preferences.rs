//! Typed preferences over the settings store
//!
//! Enum values are stored by their persisted names (`RATIO_16_9`, `SIZE_2K`,
//! ...). Unknown or unreadable values fall back to defaults.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::store::SettingsStore;
use super::SettingsError;
use crate::fantasy::FantasyMapDefinition;
use crate::generation::{AspectRatio, ImageSize};
use crate::selection::MapMode;
use crate::style::{CustomStyle, StyleCatalog, StyleChoice};

const KEY_API_KEY: &str = "api_key";
const KEY_STYLE: &str = "generation_style";
const KEY_SELECTED_CUSTOM_STYLE: &str = "selected_custom_style_id";
const KEY_ASPECT_RATIO: &str = "aspect_ratio";
const KEY_IMAGE_SIZE: &str = "image_size";
const KEY_MAP_MODE: &str = "map_mode";
const KEY_CUSTOM_STYLES: &str = "custom_styles";
const KEY_FANTASY_MAPS: &str = "fantasy_maps";
const KEY_ACTIVE_FANTASY_MAP: &str = "active_fantasy_map_id";

/// Typed access to persisted user preferences
#[derive(Clone)]
pub struct Preferences {
    store: SettingsStore,
}

impl Preferences {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    // Credential

    /// Stored API key, trimmed; blank counts as absent
    pub async fn api_key(&self) -> Result<Option<String>, SettingsError> {
        Ok(self
            .store
            .get(KEY_API_KEY)
            .await?
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty()))
    }

    pub async fn set_api_key(&self, key: &str) -> Result<(), SettingsError> {
        self.store.set(KEY_API_KEY, key.trim()).await?;
        Ok(())
    }

    pub async fn has_api_key(&self) -> Result<bool, SettingsError> {
        Ok(self.api_key().await?.is_some())
    }

    // Enumerated choices

    pub async fn style(&self) -> Result<StyleChoice, SettingsError> {
        self.get_enum(KEY_STYLE).await
    }

    pub async fn set_style(&self, style: StyleChoice) -> Result<(), SettingsError> {
        self.set_enum(KEY_STYLE, &style).await
    }

    pub async fn aspect_ratio(&self) -> Result<AspectRatio, SettingsError> {
        self.get_enum(KEY_ASPECT_RATIO).await
    }

    pub async fn set_aspect_ratio(&self, ratio: AspectRatio) -> Result<(), SettingsError> {
        self.set_enum(KEY_ASPECT_RATIO, &ratio).await
    }

    pub async fn image_size(&self) -> Result<ImageSize, SettingsError> {
        self.get_enum(KEY_IMAGE_SIZE).await
    }

    pub async fn set_image_size(&self, size: ImageSize) -> Result<(), SettingsError> {
        self.set_enum(KEY_IMAGE_SIZE, &size).await
    }

    pub async fn map_mode(&self) -> Result<MapMode, SettingsError> {
        self.get_enum(KEY_MAP_MODE).await
    }

    pub async fn set_map_mode(&self, mode: MapMode) -> Result<(), SettingsError> {
        self.set_enum(KEY_MAP_MODE, &mode).await
    }

    // Custom styles

    pub async fn selected_custom_style_id(&self) -> Result<Option<String>, SettingsError> {
        self.get_optional_id(KEY_SELECTED_CUSTOM_STYLE).await
    }

    pub async fn set_selected_custom_style_id(&self, id: Option<&str>) -> Result<(), SettingsError> {
        self.set_optional_id(KEY_SELECTED_CUSTOM_STYLE, id).await
    }

    pub async fn custom_styles(&self) -> Result<Vec<CustomStyle>, SettingsError> {
        self.get_list(KEY_CUSTOM_STYLES).await
    }

    pub async fn custom_style(&self, id: &str) -> Result<Option<CustomStyle>, SettingsError> {
        Ok(self.custom_styles().await?.into_iter().find(|s| s.id == id))
    }

    /// Insert a custom style, replacing one with the same id
    pub async fn put_custom_style(&self, style: &CustomStyle) -> Result<(), SettingsError> {
        let mut styles = self.custom_styles().await?;
        match styles.iter_mut().find(|s| s.id == style.id) {
            Some(existing) => *existing = style.clone(),
            None => styles.push(style.clone()),
        }
        self.set_list(KEY_CUSTOM_STYLES, &styles).await
    }

    pub async fn remove_custom_style(&self, id: &str) -> Result<bool, SettingsError> {
        let mut styles = self.custom_styles().await?;
        let before = styles.len();
        styles.retain(|s| s.id != id);
        if styles.len() == before {
            return Ok(false);
        }
        self.set_list(KEY_CUSTOM_STYLES, &styles).await?;
        Ok(true)
    }

    /// Catalog of all custom styles
    pub async fn style_catalog(&self) -> Result<StyleCatalog, SettingsError> {
        Ok(StyleCatalog::new(self.custom_styles().await?))
    }

    // Fantasy maps

    pub async fn fantasy_maps(&self) -> Result<Vec<FantasyMapDefinition>, SettingsError> {
        self.get_list(KEY_FANTASY_MAPS).await
    }

    pub async fn fantasy_map(&self, id: &str) -> Result<Option<FantasyMapDefinition>, SettingsError> {
        Ok(self.fantasy_maps().await?.into_iter().find(|m| m.id == id))
    }

    /// Insert a fantasy map, replacing one with the same id
    pub async fn put_fantasy_map(&self, map: &FantasyMapDefinition) -> Result<(), SettingsError> {
        let mut maps = self.fantasy_maps().await?;
        match maps.iter_mut().find(|m| m.id == map.id) {
            Some(existing) => *existing = map.clone(),
            None => maps.push(map.clone()),
        }
        self.set_list(KEY_FANTASY_MAPS, &maps).await
    }

    pub async fn remove_fantasy_map(&self, id: &str) -> Result<bool, SettingsError> {
        let mut maps = self.fantasy_maps().await?;
        let before = maps.len();
        maps.retain(|m| m.id != id);
        if maps.len() == before {
            return Ok(false);
        }
        self.set_list(KEY_FANTASY_MAPS, &maps).await?;
        Ok(true)
    }

    pub async fn active_fantasy_map_id(&self) -> Result<Option<String>, SettingsError> {
        self.get_optional_id(KEY_ACTIVE_FANTASY_MAP).await
    }

    pub async fn set_active_fantasy_map_id(&self, id: Option<&str>) -> Result<(), SettingsError> {
        self.set_optional_id(KEY_ACTIVE_FANTASY_MAP, id).await
    }

    // Encoding helpers

    async fn get_enum<T>(&self, key: &str) -> Result<T, SettingsError>
    where
        T: DeserializeOwned + Default,
    {
        let Some(name) = self.store.get(key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_value(serde_json::Value::String(name.clone())) {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!("Unknown value {:?} for setting {}, using default", name, key);
                Ok(T::default())
            }
        }
    }

    async fn set_enum<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        let name = match serde_json::to_value(value)? {
            serde_json::Value::String(name) => name,
            other => other.to_string(),
        };
        self.store.set(key, &name).await?;
        Ok(())
    }

    async fn get_optional_id(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.store.get(key).await?.filter(|id| !id.is_empty()))
    }

    async fn set_optional_id(&self, key: &str, id: Option<&str>) -> Result<(), SettingsError> {
        match id {
            Some(id) => self.store.set(key, id).await?,
            None => {
                self.store.remove(key).await?;
            }
        }
        Ok(())
    }

    async fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, SettingsError> {
        let Some(json) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&json) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("Unreadable list in setting {}: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    async fn set_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), SettingsError> {
        let json = serde_json::to_string(items)?;
        self.store.set(key, &json).await?;
        Ok(())
    }
}
