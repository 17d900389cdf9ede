//! Geographic and image-space math
//!
//! Provides:
//! - Point types for the real-world map and fantasy map images
//! - Bearing between two points, as an integer compass direction
//! - 16-point compass naming
//! - Surface projections for turning screen gestures into map points

mod surface;

pub use surface::{
    geo_touch_threshold_meters, ImageTransform, ScreenPoint, SurfaceProjection, WebMercatorView,
    MARKER_TOUCH_RADIUS_PX,
};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean earth radius used for marker proximity, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Full compass names, clockwise from North in 22.5 degree steps
const COMPASS_NAMES: [&str; 16] = [
    "North",
    "North-Northeast",
    "Northeast",
    "East-Northeast",
    "East",
    "East-Southeast",
    "Southeast",
    "South-Southeast",
    "South",
    "South-Southwest",
    "Southwest",
    "West-Southwest",
    "West",
    "West-Northwest",
    "Northwest",
    "North-Northwest",
];

/// Abbreviated compass names, same order as `COMPASS_NAMES`
const COMPASS_ABBREVS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Point validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("{axis} position {value} outside [0, 1]")]
    PercentOutOfRange { axis: char, value: f64 },

    #[error("direction {0} outside [0, 360)")]
    DirectionOutOfRange(u16),
}

/// A location on the real-world map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a validated geographic point
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to another point in meters
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        haversine_meters(*self, *other)
    }
}

/// A position on a fantasy map image, normalized so it survives rescaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FantasyPoint {
    pub x_percent: f64,
    pub y_percent: f64,
}

impl FantasyPoint {
    /// Create a validated image-space point
    pub fn new(x_percent: f64, y_percent: f64) -> Result<Self, GeoError> {
        for (axis, value) in [('x', x_percent), ('y', y_percent)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(GeoError::PercentOutOfRange { axis, value });
            }
        }
        Ok(Self {
            x_percent,
            y_percent,
        })
    }
}

/// A viewing direction in whole degrees clockwise from North, in [0, 360)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Direction(u16);

impl Direction {
    pub const NORTH: Direction = Direction(0);

    /// Create a direction, rejecting values of 360 or more
    pub fn new(degrees: u16) -> Result<Self, GeoError> {
        if degrees >= 360 {
            return Err(GeoError::DirectionOutOfRange(degrees));
        }
        Ok(Self(degrees))
    }

    /// Truncate a (non-negative) angle in degrees, folding 360 back to 0
    fn from_angle(angle: f64) -> Self {
        Self((angle as u32 % 360) as u16)
    }

    /// Degrees clockwise from North
    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Full 16-point compass name, e.g. "North-Northeast"
    pub fn compass_name(self) -> &'static str {
        compass_name16(self.0)
    }

    /// Abbreviated 16-point compass name, e.g. "NNE"
    pub fn compass_abbrev(self) -> &'static str {
        compass_abbrev16(self.0)
    }
}

impl TryFrom<u16> for Direction {
    type Error = GeoError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Direction::new(degrees)
    }
}

impl From<Direction> for u16 {
    fn from(direction: Direction) -> u16 {
        direction.0
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}° ({})", self.0, self.compass_abbrev())
    }
}

/// A point on some map surface that a bearing can be measured between
pub trait SurfacePoint: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Bearing from this point toward `other`
    fn bearing_to(&self, other: &Self) -> Direction;
}

impl SurfacePoint for GeoPoint {
    fn bearing_to(&self, other: &Self) -> Direction {
        bearing_degrees(*self, *other)
    }
}

impl SurfacePoint for FantasyPoint {
    fn bearing_to(&self, other: &Self) -> Direction {
        image_bearing_degrees(*self, *other)
    }
}

fn angle_between(dx: f64, dy: f64) -> Direction {
    let mut angle = dx.atan2(dy).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }
    Direction::from_angle(angle)
}

/// Bearing between two geographic points
///
/// Uses the flat-map angle atan2(Δlongitude, Δlatitude). Identical points
/// yield 0 (North).
pub fn bearing_degrees(start: GeoPoint, end: GeoPoint) -> Direction {
    angle_between(
        end.longitude - start.longitude,
        end.latitude - start.latitude,
    )
}

/// Bearing between two image-space points, with the top of the image as North
pub fn image_bearing_degrees(start: FantasyPoint, end: FantasyPoint) -> Direction {
    // Image y grows downward.
    angle_between(
        end.x_percent - start.x_percent,
        start.y_percent - end.y_percent,
    )
}

fn compass_index(degrees: u16) -> usize {
    ((f64::from(degrees) + 11.25) / 22.5).floor() as usize % 16
}

/// 16-point compass name for a direction in degrees
pub fn compass_name16(degrees: u16) -> &'static str {
    COMPASS_NAMES[compass_index(degrees)]
}

/// 16-point compass abbreviation for a direction in degrees
pub fn compass_abbrev16(degrees: u16) -> &'static str {
    COMPASS_ABBREVS[compass_index(degrees)]
}

/// Haversine distance between two points in meters
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}
