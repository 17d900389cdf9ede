//! Prompt construction for street-level view generation
//!
//! A prompt is assembled from fixed sections, in order:
//! 1. Location header (coordinates, or fantasy map position and lore)
//! 2. Map analysis hints
//! 3. Style block
//! 4. Camera perspective
//! 5. The user's own request, or a plain "generate now" trailer
//!
//! Building is pure: identical inputs always give an identical string.

use serde::{Deserialize, Serialize};

use crate::geo::{Direction, FantasyPoint, GeoPoint};
use crate::style::StyleChoice;

const SATELLITE_ANALYSIS: &str = "\
Using the satellite imagery provided, analyze:
- Building footprints, rooftop colors and materials visible from above
- Vegetation patterns, trees, and landscaping
- Road surfaces, parking areas, and infrastructure
- Terrain features and shadows indicating building heights";

const STREET_ANALYSIS: &str = "\
Using the street map provided, analyze:
- Street layout and road patterns
- Building density and neighborhood character
- Green spaces and vegetation areas";

const FANTASY_ANALYSIS: &str = "\
Using the fantasy map provided, analyze:
- Terrain around the marked position (mountains, forests, rivers, coastlines)
- Settlements, roads, castles, and landmarks drawn nearby
- The art style of the map and the era and technology it suggests
- What lies ahead of the viewer in the viewing direction";

const CAMERA_PERSPECTIVE: &str = "\
CAMERA PERSPECTIVE:
- First-person street-level view at eye height (1.7 meters)
- Natural field of view as seen by human eyes
- Ground-level perspective showing the street ahead";

const MISSING_WORLD_CONTEXT: &str =
    "No additional lore provided. Infer the world from the map's features and art style.";

const USER_REQUEST_HEADER: &str = "IMPORTANT - USER'S SPECIFIC REQUEST (prioritize this):";

const USER_REQUEST_TRAILER: &str =
    "Generate the image following the user's specific instructions above while maintaining the chosen style.";

const GENERATE_NOW_TRAILER: &str = "Generate the image now.";

/// How the real-world map was rendered when it was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapSurface {
    /// Street map tiles
    #[default]
    Street,
    /// Satellite imagery tiles
    Satellite,
}

impl MapSurface {
    fn analysis_hints(&self) -> &'static str {
        match self {
            MapSurface::Street => STREET_ANALYSIS,
            MapSurface::Satellite => SATELLITE_ANALYSIS,
        }
    }
}

/// What the viewer is standing on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewTarget<'a> {
    /// A real-world location, captured from the given map surface
    RealWorld { point: GeoPoint, surface: MapSurface },
    /// A position on a user-supplied fantasy map
    Fantasy {
        map_name: &'a str,
        world_context: &'a str,
        position: FantasyPoint,
    },
}

/// Typed inputs for one prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptInput<'a> {
    pub target: ViewTarget<'a>,
    pub direction: Direction,
    pub style: StyleChoice,
    /// Prompt text of the selected custom style, used only for `StyleChoice::Custom`
    pub custom_style_text: Option<&'a str>,
    /// Free-text request from the user
    pub custom_prompt: Option<&'a str>,
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn location_header(target: &ViewTarget<'_>, direction: Direction) -> String {
    match target {
        ViewTarget::RealWorld { point, .. } => format!(
            "LOCATION: Standing at coordinates ({:.6}, {:.6}), looking {} ({} degrees from North)",
            point.latitude,
            point.longitude,
            direction.compass_name(),
            direction.degrees()
        ),
        ViewTarget::Fantasy {
            map_name,
            world_context,
            position,
        } => {
            let context = non_blank(Some(*world_context)).unwrap_or(MISSING_WORLD_CONTEXT);
            format!(
                "LOCATION: Standing in the fantasy world \"{}\", at {:.1}% from the left and {:.1}% from the top of the map, looking {} ({} degrees clockwise from the top of the map)\n\nWORLD CONTEXT:\n{}",
                map_name,
                position.x_percent * 100.0,
                position.y_percent * 100.0,
                direction.compass_name(),
                direction.degrees(),
                context
            )
        }
    }
}

fn analysis_section(target: &ViewTarget<'_>) -> &'static str {
    match target {
        ViewTarget::RealWorld { surface, .. } => surface.analysis_hints(),
        ViewTarget::Fantasy { .. } => FANTASY_ANALYSIS,
    }
}

/// Style block for a choice; Custom without usable text falls back to Realistic
pub fn style_section(style: StyleChoice, custom_style_text: Option<&str>) -> String {
    match (style, non_blank(custom_style_text)) {
        (StyleChoice::Custom, Some(text)) => format!("STYLE: Custom User Style\n{}", text),
        _ => style.canned_block().to_string(),
    }
}

/// Build the full prompt text
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let base = [
        location_header(&input.target, input.direction),
        analysis_section(&input.target).to_string(),
        style_section(input.style, input.custom_style_text),
        CAMERA_PERSPECTIVE.to_string(),
    ]
    .join("\n\n");

    match non_blank(input.custom_prompt) {
        Some(request) => format!(
            "{}\n\n{}\n{}\n\n{}",
            base, USER_REQUEST_HEADER, request, USER_REQUEST_TRAILER
        ),
        None => format!("{}\n\n{}", base, GENERATE_NOW_TRAILER),
    }
}
