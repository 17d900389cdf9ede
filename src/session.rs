//! Map session
//!
//! One `MapSession` per running app session. It owns the selection and the
//! generation lifecycle; collaborators are injected at construction.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::fantasy::{FantasyMapDefinition, FantasyMapStorage, StorageError};
use crate::gallery::{Gallery, SaveResult};
use crate::generation::{
    GeneratedImage, GenerationError, GenerationOrchestrator, GenerationRequest, GenerationState,
    GenerationTarget, ImageGenerator, JobId,
};
use crate::geo::{Direction, FantasyPoint, GeoPoint, ImageTransform, WebMercatorView};
use crate::observable::Observable;
use crate::prompt::MapSurface;
use crate::selection::{
    apply_gesture, Gesture, GestureOutcome, MapMode, RequirementHint, SelectionState,
};
use crate::settings::{Preferences, SettingsError};

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// The selected fantasy map with its image loaded
#[derive(Debug, Clone)]
struct ActiveFantasyMap {
    definition: FantasyMapDefinition,
    image: Arc<[u8]>,
}

/// Composition root for one app session
pub struct MapSession {
    prefs: Preferences,
    storage: FantasyMapStorage,
    gallery: Gallery,
    orchestrator: GenerationOrchestrator,
    selection: Observable<SelectionState>,
    surface: Mutex<MapSurface>,
    active_map: Mutex<Option<ActiveFantasyMap>>,
}

impl MapSession {
    /// Open a session, restoring mode, credential presence and the active map
    ///
    /// An active map whose image can no longer be read is dropped with a warning.
    pub async fn open(
        prefs: Preferences,
        storage: FantasyMapStorage,
        gallery: Gallery,
        generator: Arc<dyn ImageGenerator>,
    ) -> Result<Self, SessionError> {
        let mut selection = SelectionState::new(prefs.map_mode().await?);
        selection.set_credential_configured(prefs.has_api_key().await?);

        let session = Self {
            prefs,
            storage,
            gallery,
            orchestrator: GenerationOrchestrator::new(generator),
            selection: Observable::new(selection),
            surface: Mutex::new(MapSurface::default()),
            active_map: Mutex::new(None),
        };

        if let Some(id) = session.prefs.active_fantasy_map_id().await? {
            if let Err(e) = session.load_active_map(&id).await {
                warn!("Active fantasy map {} unavailable: {}", id, e);
            }
        }

        info!(
            "Session opened in {} mode",
            session.selection.with(|s| s.mode().name())
        );
        Ok(session)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    // Snapshots

    pub fn selection(&self) -> SelectionState {
        self.selection.get()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<SelectionState> {
        self.selection.subscribe()
    }

    pub fn generation_state(&self) -> GenerationState {
        self.orchestrator.state()
    }

    pub fn subscribe_generation(&self) -> watch::Receiver<GenerationState> {
        self.orchestrator.subscribe()
    }

    pub fn requirement_hint(&self) -> RequirementHint {
        self.selection.with(SelectionState::requirement_hint)
    }

    pub fn can_generate(&self) -> bool {
        self.selection.with(SelectionState::can_generate)
    }

    pub fn map_surface(&self) -> MapSurface {
        *self.surface.lock()
    }

    pub fn active_fantasy_map(&self) -> Option<FantasyMapDefinition> {
        self.active_map.lock().as_ref().map(|m| m.definition.clone())
    }

    // Mode and map

    /// Switch modes; both modes keep their selections
    pub async fn set_mode(&self, mode: MapMode) -> Result<(), SessionError> {
        self.selection.update(|s| s.set_mode(mode));
        self.prefs.set_map_mode(mode).await?;
        debug!("Mode set to {}", mode.name());
        Ok(())
    }

    /// Street map or satellite for the real-world surface
    pub fn set_map_surface(&self, surface: MapSurface) {
        *self.surface.lock() = surface;
    }

    /// Choose the fantasy map to work on, or none
    ///
    /// Changing maps clears the fantasy selection.
    pub async fn set_active_fantasy_map(
        &self,
        id: Option<&str>,
    ) -> Result<Option<FantasyMapDefinition>, SessionError> {
        let previous = self.active_fantasy_map().map(|m| m.id);

        let definition = match id {
            Some(id) => Some(self.load_active_map(id).await?),
            None => {
                *self.active_map.lock() = None;
                self.selection.update(|s| s.set_fantasy_map_ready(false));
                None
            }
        };
        self.prefs.set_active_fantasy_map_id(id).await?;

        if previous.as_deref() != id {
            self.selection.update(|s| s.fantasy_mut().clear());
            info!("Active fantasy map changed to {:?}", id);
        }
        Ok(definition)
    }

    async fn load_active_map(&self, id: &str) -> Result<FantasyMapDefinition, SessionError> {
        let definition = self
            .prefs
            .fantasy_map(id)
            .await?
            .ok_or_else(|| SettingsError::UnknownFantasyMap(id.to_string()))?;
        let image = self.storage.load_image(&definition.image_path).await?;

        debug!("Loaded fantasy map {} ({} bytes)", definition.name, image.len());
        *self.active_map.lock() = Some(ActiveFantasyMap {
            definition: definition.clone(),
            image,
        });
        self.selection.update(|s| s.set_fantasy_map_ready(true));
        Ok(definition)
    }

    /// Re-read whether an API key is stored
    pub async fn refresh_credential(&self) -> Result<bool, SessionError> {
        let configured = self.prefs.has_api_key().await?;
        self.selection
            .update(|s| s.set_credential_configured(configured));
        Ok(configured)
    }

    // Gestures

    /// Pointer gesture on the real-world map; ignored in fantasy mode
    pub fn handle_real_world_gesture(
        &self,
        view: &WebMercatorView,
        gesture: Gesture,
    ) -> GestureOutcome {
        let mut outcome = GestureOutcome::Ignored;
        self.selection.update(|s| {
            if s.mode() == MapMode::RealWorld {
                outcome = apply_gesture(s.real_world_mut(), view, gesture);
            }
        });
        self.after_gesture(outcome)
    }

    /// Pointer gesture on the fantasy map; ignored without a loaded map
    pub fn handle_fantasy_gesture(
        &self,
        transform: &ImageTransform,
        gesture: Gesture,
    ) -> GestureOutcome {
        let mut outcome = GestureOutcome::Ignored;
        self.selection.update(|s| {
            if s.mode() == MapMode::Fantasy && s.fantasy_map_ready() {
                outcome = apply_gesture(s.fantasy_mut(), transform, gesture);
            }
        });
        self.after_gesture(outcome)
    }

    /// A cleared selection drops any generation tied to it
    fn after_gesture(&self, outcome: GestureOutcome) -> GestureOutcome {
        if outcome == GestureOutcome::Cleared {
            self.orchestrator.reset();
        }
        outcome
    }

    /// Place the real-world point directly, optionally with a direction
    pub fn set_real_world_selection(&self, point: GeoPoint, direction: Option<Direction>) {
        self.selection
            .update(|s| s.real_world_mut().place_with_direction(point, direction));
    }

    /// Place the fantasy point directly, optionally with a direction
    pub fn set_fantasy_selection(&self, position: FantasyPoint, direction: Option<Direction>) {
        self.selection
            .update(|s| s.fantasy_mut().place_with_direction(position, direction));
    }

    /// Cancel any generation and clear the active mode's selection
    pub fn clear_selection(&self) {
        self.orchestrator.reset();
        self.selection.update(SelectionState::clear_active);
    }

    /// Cancel any generation and clear the fantasy selection
    pub fn clear_fantasy_selection(&self) {
        self.orchestrator.reset();
        self.selection.update(|s| s.fantasy_mut().clear());
    }

    // Generation

    /// Generate a view for the current selection
    ///
    /// `captured_map` is the rendered real-world map; fantasy mode uses the
    /// active map image instead. An incomplete selection is rejected with
    /// `NotReady`; a missing API key moves the generation state to Error.
    pub async fn generate(
        &self,
        captured_map: Option<Arc<[u8]>>,
        custom_prompt: Option<&str>,
    ) -> Result<JobId, SessionError> {
        let api_key = self.prefs.api_key().await?;
        self.selection
            .update(|s| s.set_credential_configured(api_key.is_some()));

        let selection = self.selection.get();
        let hint = selection.requirement_hint();
        if !matches!(hint, RequirementHint::Ready | RequirementHint::ApiKey) {
            return Err(GenerationError::NotReady(hint).into());
        }

        let Some(direction) = selection.active_direction() else {
            return Err(GenerationError::NotReady(RequirementHint::Direction).into());
        };

        let (target, source_image) = match selection.mode() {
            MapMode::RealWorld => {
                let Some(point) = selection.real_world().point() else {
                    return Err(GenerationError::NotReady(RequirementHint::Location).into());
                };
                let target = GenerationTarget::RealWorld {
                    point,
                    surface: self.map_surface(),
                };
                (target, captured_map.unwrap_or_else(|| Arc::from(Vec::new())))
            }
            MapMode::Fantasy => {
                let (Some(position), Some(active)) =
                    (selection.fantasy().point(), self.active_map.lock().clone())
                else {
                    return Err(GenerationError::NotReady(hint).into());
                };
                let target = GenerationTarget::Fantasy {
                    map_name: active.definition.name,
                    world_context: active.definition.world_context,
                    position,
                };
                (target, active.image)
            }
        };

        let style = self.prefs.style().await?;
        let selected_style = self.prefs.selected_custom_style_id().await?;
        let custom_style_text = self
            .prefs
            .style_catalog()
            .await?
            .custom_text(style, selected_style.as_deref());

        let request = GenerationRequest {
            target,
            direction,
            custom_prompt: custom_prompt
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            style,
            custom_style_text,
            aspect_ratio: self.prefs.aspect_ratio().await?,
            image_size: self.prefs.image_size().await?,
            source_image,
        };

        Ok(self.orchestrator.generate(api_key.as_deref(), request)?)
    }

    /// Wait for the current generation to settle
    pub async fn wait_for_generation(&self) -> Result<GeneratedImage, GenerationError> {
        self.orchestrator.wait().await
    }

    /// Cancel the in-flight generation, if any
    pub fn cancel_generation(&self) -> bool {
        self.orchestrator.cancel()
    }

    /// Save the current result to the gallery
    pub async fn save_current_image(&self) -> SaveResult {
        match self.orchestrator.state() {
            GenerationState::Success(image) => self.gallery.save(&image.bytes).await,
            _ => SaveResult::Failed {
                message: "No image to save".to_string(),
            },
        }
    }
}
