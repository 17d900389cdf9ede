//! viewpoint - street-level view generation
//!
//! Pick a spot on a real-world or fantasy map, drag out a viewing direction,
//! and have an image model render what you would see standing there.

pub mod config;
pub mod fantasy;
pub mod gallery;
pub mod generation;
pub mod geo;
pub mod geocode;
pub mod observable;
pub mod prompt;
pub mod selection;
pub mod session;
pub mod settings;
pub mod style;

pub use config::Config;
pub use generation::{
    GeminiClient, GeneratedImage, GenerationError, GenerationOrchestrator, GenerationRequest,
    GenerationState, ImageGenerator,
};
pub use geo::{Direction, FantasyPoint, GeoPoint};
pub use selection::{MapMode, RequirementHint, SelectionState};
pub use session::{MapSession, SessionError};
