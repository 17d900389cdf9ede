//! Output options sent with each generation

use serde::{Deserialize, Serialize};

/// Aspect ratio of the generated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "RATIO_16_9")]
    Widescreen,
    #[serde(rename = "RATIO_4_3")]
    Standard,
    #[serde(rename = "RATIO_3_4")]
    Portrait,
    #[serde(rename = "RATIO_1_1")]
    Square,
    #[serde(rename = "RATIO_9_16")]
    Vertical,
    #[serde(rename = "RATIO_21_9")]
    Ultrawide,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 6] = [
        AspectRatio::Widescreen,
        AspectRatio::Standard,
        AspectRatio::Portrait,
        AspectRatio::Square,
        AspectRatio::Vertical,
        AspectRatio::Ultrawide,
    ];

    /// Value sent on the wire
    pub fn wire_value(&self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Standard => "4:3",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Square => "1:1",
            AspectRatio::Vertical => "9:16",
            AspectRatio::Ultrawide => "21:9",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9 - Widescreen",
            AspectRatio::Standard => "4:3 - Standard",
            AspectRatio::Portrait => "3:4 - Portrait",
            AspectRatio::Square => "1:1 - Square",
            AspectRatio::Vertical => "9:16 - Vertical",
            AspectRatio::Ultrawide => "21:9 - Ultrawide",
        }
    }

    /// Parse a wire value such as "16:9"
    pub fn from_str(s: &str) -> Option<AspectRatio> {
        let s = s.trim();
        Self::ALL.into_iter().find(|r| r.wire_value() == s)
    }
}

/// Resolution class of the generated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "SIZE_1K")]
    OneK,
    #[default]
    #[serde(rename = "SIZE_2K")]
    TwoK,
    #[serde(rename = "SIZE_4K")]
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::OneK, ImageSize::TwoK, ImageSize::FourK];

    /// Value sent on the wire
    pub fn wire_value(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K - Standard",
            ImageSize::TwoK => "2K - High Quality",
            ImageSize::FourK => "4K - Ultra High",
        }
    }

    /// Parse a wire value such as "2K"
    pub fn from_str(s: &str) -> Option<ImageSize> {
        let s = s.trim().to_uppercase();
        Self::ALL.into_iter().find(|size| size.wire_value() == s)
    }
}
