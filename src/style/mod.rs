//! Visual styles for generated views
//!
//! Each generation uses one style block in its prompt. Styles are either:
//! - One of the five built-in canned styles
//! - A user-defined custom style with free-form prompt text

use serde::{Deserialize, Serialize};

const REALISTIC_BLOCK: &str = "\
STYLE: Photorealistic Street View
Create a crystal-clear, ultra-realistic photograph as if captured by a professional street-level camera.
- Perfect exposure and white balance
- Sharp details on buildings, textures, and surfaces
- Natural daylight conditions (clear sky, soft shadows)
- Accurate architectural details and materials
- Realistic depth of field
The image should be indistinguishable from a real Google Street View photograph.";

const CINEMATIC_BLOCK: &str = "\
STYLE: Cinematic Golden Hour
Create a breathtaking cinematic shot during the magical golden hour.
- Warm amber and orange sunlight washing over the scene
- Long, dramatic shadows stretching across the street
- Subtle lens flares where sunlight peeks through
- Rich, saturated colors with a slight orange/teal color grade
- Atmospheric haze adding depth and mystery
- The kind of frame that belongs in an Oscar-winning film
Make it look like a scene from a Denis Villeneuve or Roger Deakins masterpiece.";

const RAINY_BLOCK: &str = "\
STYLE: Moody Rainy Day
Create an atmospheric scene on a rainy day with that cozy, contemplative mood.
- Wet, glistening streets reflecting lights and colors
- Puddles creating mirror-like reflections of buildings
- Soft, diffused lighting from overcast skies
- Slight mist or light rain visible in the air
- Neon signs and lights bleeding beautifully into the wet surfaces
- That special ambiance of watching rain from inside a warm cafe
Channel the vibes of a Wong Kar-wai film or Blade Runner's quieter moments.";

const VINTAGE_BLOCK: &str = "\
STYLE: Retro 1970s Throwback
Transform this location into a vintage photograph from the 1970s.
- Faded, slightly desaturated colors with warm yellow/brown tint
- Visible film grain adding nostalgic texture
- Soft vignette darkening the corners
- Slightly soft focus typical of old lenses
- Colors that feel like they've aged beautifully over decades
- The aesthetic of a treasured Polaroid or Kodachrome slide
Make it feel like a photograph your parents might have taken on a road trip.";

const ANIME_BLOCK: &str = "\
STYLE: Studio Ghibli Anime World
Reimagine this location in the beautiful style of Japanese anime, specifically Studio Ghibli.
- Vibrant, saturated colors that pop with life
- Dreamy skies with fluffy, painterly cumulus clouds
- Clean linework with soft cel-shading
- That magical, whimsical atmosphere Ghibli is famous for
- Lush vegetation rendered in rich greens
- Warm, inviting lighting that makes everything feel alive
- Small details that add charm (birds, floating particles, gentle wind effects)
Channel the spirit of Spirited Away, Howl's Moving Castle, or My Neighbor Totoro.";

/// Selected generation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StyleChoice {
    /// Photorealistic street-level photograph
    #[default]
    Realistic,
    /// Golden hour film still
    Cinematic,
    /// Wet streets and overcast light
    Rainy,
    /// 1970s film photograph
    Vintage,
    /// Studio Ghibli-like anime
    Anime,
    /// User-defined style, resolved through the selected custom style id
    Custom,
}

impl StyleChoice {
    /// All choices in display order
    pub const ALL: [StyleChoice; 6] = [
        StyleChoice::Realistic,
        StyleChoice::Cinematic,
        StyleChoice::Rainy,
        StyleChoice::Vintage,
        StyleChoice::Anime,
        StyleChoice::Custom,
    ];

    /// Stable persisted name
    pub fn name(&self) -> &'static str {
        match self {
            StyleChoice::Realistic => "REALISTIC",
            StyleChoice::Cinematic => "CINEMATIC",
            StyleChoice::Rainy => "RAINY",
            StyleChoice::Vintage => "VINTAGE",
            StyleChoice::Anime => "ANIME",
            StyleChoice::Custom => "CUSTOM",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            StyleChoice::Realistic => "Realistic",
            StyleChoice::Cinematic => "Cinematic",
            StyleChoice::Rainy => "Rainy",
            StyleChoice::Vintage => "Vintage",
            StyleChoice::Anime => "Anime",
            StyleChoice::Custom => "Custom",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<StyleChoice> {
        match s.trim().to_lowercase().as_str() {
            "realistic" | "photo" => Some(StyleChoice::Realistic),
            "cinematic" | "golden-hour" => Some(StyleChoice::Cinematic),
            "rainy" | "rain" => Some(StyleChoice::Rainy),
            "vintage" | "retro" => Some(StyleChoice::Vintage),
            "anime" | "ghibli" => Some(StyleChoice::Anime),
            "custom" => Some(StyleChoice::Custom),
            _ => None,
        }
    }

    /// Canned style block; Custom falls back to the realistic block
    pub fn canned_block(&self) -> &'static str {
        match self {
            StyleChoice::Realistic | StyleChoice::Custom => REALISTIC_BLOCK,
            StyleChoice::Cinematic => CINEMATIC_BLOCK,
            StyleChoice::Rainy => RAINY_BLOCK,
            StyleChoice::Vintage => VINTAGE_BLOCK,
            StyleChoice::Anime => ANIME_BLOCK,
        }
    }
}

/// A user-managed style with its own prompt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStyle {
    pub id: String,
    pub name: String,
    pub prompt: String,
}

impl CustomStyle {
    /// Create a custom style with a fresh id
    pub fn new(name: &str, prompt: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            prompt: prompt.trim().to_string(),
        }
    }
}

/// Custom styles known to the session, for resolving the active style text
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    custom: Vec<CustomStyle>,
}

impl StyleCatalog {
    pub fn new(custom: Vec<CustomStyle>) -> Self {
        Self { custom }
    }

    /// Get a custom style by id
    pub fn get(&self, id: &str) -> Option<&CustomStyle> {
        self.custom.iter().find(|s| s.id == id)
    }

    /// List custom styles
    pub fn list(&self) -> &[CustomStyle] {
        &self.custom
    }

    /// Custom prompt text for a choice, present only for Custom with a known id
    pub fn custom_text(&self, choice: StyleChoice, selected_id: Option<&str>) -> Option<String> {
        if choice != StyleChoice::Custom {
            return None;
        }
        selected_id
            .and_then(|id| self.get(id))
            .map(|style| style.prompt.clone())
    }
}
