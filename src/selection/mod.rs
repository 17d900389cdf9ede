//! Location and direction selection
//!
//! Each map mode keeps its own selection, moving through
//! `Empty -> PointSet -> DirectionSet`. Placing a point always clears the
//! direction; the direction is then set by dragging away from the point.
//! Both selections survive mode switches.

mod gesture;

pub use gesture::{apply_gesture, Gesture, GestureOutcome};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{Direction, FantasyPoint, GeoPoint, SurfacePoint};

/// Which selection workflow is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapMode {
    /// Real-world map
    #[default]
    RealWorld,
    /// User-supplied fantasy map image
    Fantasy,
}

impl MapMode {
    /// Stable persisted name
    pub fn name(&self) -> &'static str {
        match self {
            MapMode::RealWorld => "REAL_WORLD",
            MapMode::Fantasy => "FANTASY",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<MapMode> {
        match s.trim().to_lowercase().as_str() {
            "real_world" | "real-world" | "real" | "world" => Some(MapMode::RealWorld),
            "fantasy" => Some(MapMode::Fantasy),
            _ => None,
        }
    }
}

/// Selection transition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no location selected")]
    NoPoint,

    #[error("no direction drag in progress")]
    NotDragging,
}

/// Where a mode's selection is in the interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Empty,
    PointSet,
    DirectionSet,
}

/// What the user still has to do before generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementHint {
    /// Fantasy mode without a loaded active map
    SelectFantasyMap,
    /// No location placed
    Location,
    /// Location placed, no direction
    Direction,
    /// No API key configured
    ApiKey,
    Ready,
}

impl RequirementHint {
    /// User-facing hint text
    pub fn message(&self) -> &'static str {
        match self {
            RequirementHint::SelectFantasyMap => "Select a fantasy map to explore",
            RequirementHint::Location => "Tap the map to choose a location",
            RequirementHint::Direction => "Drag from the marker to set a viewing direction",
            RequirementHint::ApiKey => "Add your API key in Settings",
            RequirementHint::Ready => "Ready to generate",
        }
    }
}

/// Selection for one map mode
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSelection<P> {
    point: Option<P>,
    direction: Option<Direction>,
    /// Some while a direction drag is active, holding the live bearing
    drag: Option<Option<Direction>>,
}

impl<P> Default for ModeSelection<P> {
    fn default() -> Self {
        Self {
            point: None,
            direction: None,
            drag: None,
        }
    }
}

impl<P: SurfacePoint> ModeSelection<P> {
    /// Selected point
    pub fn point(&self) -> Option<P> {
        self.point
    }

    /// Finalized direction
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Whether a direction drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Live bearing of the drag in progress
    pub fn drag_preview(&self) -> Option<Direction> {
        self.drag.flatten()
    }

    pub fn phase(&self) -> SelectionPhase {
        match (self.point, self.direction) {
            (None, _) => SelectionPhase::Empty,
            (Some(_), None) => SelectionPhase::PointSet,
            (Some(_), Some(_)) => SelectionPhase::DirectionSet,
        }
    }

    /// Place a new point, discarding any previous direction
    pub fn place_point(&mut self, point: P) {
        self.point = Some(point);
        self.direction = None;
        self.drag = None;
    }

    /// Place a new point already facing `direction`
    pub fn place_with_direction(&mut self, point: P, direction: Option<Direction>) {
        self.place_point(point);
        self.direction = direction;
    }

    /// Start dragging a direction out of the current point
    pub fn begin_drag(&mut self) -> Result<(), SelectionError> {
        if self.point.is_none() {
            return Err(SelectionError::NoPoint);
        }
        self.drag = Some(None);
        Ok(())
    }

    /// Update the live bearing toward `target`
    pub fn drag_to(&mut self, target: P) -> Result<Direction, SelectionError> {
        let point = self.point.ok_or(SelectionError::NoPoint)?;
        let preview = self.drag.as_mut().ok_or(SelectionError::NotDragging)?;
        let bearing = point.bearing_to(&target);
        *preview = Some(bearing);
        Ok(bearing)
    }

    /// Finish the drag at `target`, fixing the direction
    ///
    /// Releasing on the point itself ends the drag without a direction.
    pub fn release(&mut self, target: P) -> Result<Option<Direction>, SelectionError> {
        let point = self.point.ok_or(SelectionError::NoPoint)?;
        if self.drag.take().is_none() {
            return Err(SelectionError::NotDragging);
        }
        if target == point {
            return Ok(None);
        }
        let bearing = point.bearing_to(&target);
        self.direction = Some(bearing);
        Ok(Some(bearing))
    }

    /// Abandon the drag in progress, keeping any earlier direction
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Set the direction without a drag
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), SelectionError> {
        if self.point.is_none() {
            return Err(SelectionError::NoPoint);
        }
        self.direction = Some(direction);
        Ok(())
    }

    /// Set the direction to face `target` from the current point
    pub fn face_toward(&mut self, target: P) -> Result<Direction, SelectionError> {
        let point = self.point.ok_or(SelectionError::NoPoint)?;
        let bearing = point.bearing_to(&target);
        self.direction = Some(bearing);
        Ok(bearing)
    }

    /// Remove point and direction
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Selection state for a session, covering both modes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    mode: MapMode,
    real_world: ModeSelection<GeoPoint>,
    fantasy: ModeSelection<FantasyPoint>,
    credential_configured: bool,
    fantasy_map_ready: bool,
}

impl SelectionState {
    pub fn new(mode: MapMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Switch modes; the other mode's selection is kept as is
    pub fn set_mode(&mut self, mode: MapMode) {
        self.mode = mode;
    }

    pub fn real_world(&self) -> &ModeSelection<GeoPoint> {
        &self.real_world
    }

    pub fn real_world_mut(&mut self) -> &mut ModeSelection<GeoPoint> {
        &mut self.real_world
    }

    pub fn fantasy(&self) -> &ModeSelection<FantasyPoint> {
        &self.fantasy
    }

    pub fn fantasy_mut(&mut self) -> &mut ModeSelection<FantasyPoint> {
        &mut self.fantasy
    }

    pub fn credential_configured(&self) -> bool {
        self.credential_configured
    }

    pub fn set_credential_configured(&mut self, configured: bool) {
        self.credential_configured = configured;
    }

    pub fn fantasy_map_ready(&self) -> bool {
        self.fantasy_map_ready
    }

    /// Record whether an active fantasy map with loaded image bytes exists
    pub fn set_fantasy_map_ready(&mut self, ready: bool) {
        self.fantasy_map_ready = ready;
    }

    /// Point and direction presence for the active mode
    fn active_progress(&self) -> (bool, bool) {
        match self.mode {
            MapMode::RealWorld => (
                self.real_world.point.is_some(),
                self.real_world.direction.is_some(),
            ),
            MapMode::Fantasy => (
                self.fantasy.point.is_some(),
                self.fantasy.direction.is_some(),
            ),
        }
    }

    /// Phase of the active mode's selection
    pub fn active_phase(&self) -> SelectionPhase {
        match self.mode {
            MapMode::RealWorld => self.real_world.phase(),
            MapMode::Fantasy => self.fantasy.phase(),
        }
    }

    /// Direction of the active mode's selection
    pub fn active_direction(&self) -> Option<Direction> {
        match self.mode {
            MapMode::RealWorld => self.real_world.direction,
            MapMode::Fantasy => self.fantasy.direction,
        }
    }

    /// Clear the active mode's selection
    pub fn clear_active(&mut self) {
        match self.mode {
            MapMode::RealWorld => self.real_world.clear(),
            MapMode::Fantasy => self.fantasy.clear(),
        }
    }

    /// The single most important missing requirement
    pub fn requirement_hint(&self) -> RequirementHint {
        let (has_point, has_direction) = self.active_progress();

        if self.mode == MapMode::Fantasy && !self.fantasy_map_ready {
            RequirementHint::SelectFantasyMap
        } else if !has_point {
            RequirementHint::Location
        } else if !has_direction {
            RequirementHint::Direction
        } else if !self.credential_configured {
            RequirementHint::ApiKey
        } else {
            RequirementHint::Ready
        }
    }

    /// Whether every requirement for generating is met
    pub fn can_generate(&self) -> bool {
        let (has_point, has_direction) = self.active_progress();
        let map_ok = self.mode == MapMode::RealWorld || self.fantasy_map_ready;
        has_point && has_direction && self.credential_configured && map_ok
    }
}
