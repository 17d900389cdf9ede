//! Screen-space to content-space projections
//!
//! The rendering surface is not part of this crate; it only has to describe how
//! a screen pixel maps onto its content and how close a touch must land to the
//! marker to grab it.

use std::f64::consts::PI;

use super::{FantasyPoint, GeoPoint, SurfacePoint};

/// Touch radius around a fantasy map marker, in screen pixels
pub const MARKER_TOUCH_RADIUS_PX: f64 = 80.0;

/// Size of one slippy-map tile in pixels
const TILE_SIZE: f64 = 256.0;

/// Web Mercator latitude limit
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// A pixel position on the rendering surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Maps screen pixels onto the content of a map surface
pub trait SurfaceProjection {
    type Point: SurfacePoint;

    /// Content point under a screen pixel, or None when the pixel is off the content
    fn to_content(&self, screen: ScreenPoint) -> Option<Self::Point>;

    /// Whether a touch at `screen` is close enough to grab the marker at `marker`
    fn is_near_marker(&self, marker: Self::Point, screen: ScreenPoint) -> bool;

    /// Whether pressing away from the marker places a new point (instead of panning)
    fn places_point_on_press(&self) -> bool {
        false
    }
}

/// Real-world grab threshold in meters for a zoom level
pub fn geo_touch_threshold_meters(zoom: f64) -> f64 {
    50_000.0 / 2f64.powf(zoom)
}

/// Scale/translate matrix of a zoomable image view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    /// Intrinsic image width in pixels
    pub image_width: f64,
    /// Intrinsic image height in pixels
    pub image_height: f64,
}

impl ImageTransform {
    /// Identity transform for an image drawn at its natural size
    pub fn identity(image_width: f64, image_height: f64) -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            image_width,
            image_height,
        }
    }

    /// Screen pixel where a normalized image position is drawn
    pub fn to_screen(&self, point: FantasyPoint) -> ScreenPoint {
        ScreenPoint {
            x: point.x_percent * self.image_width * self.scale_x + self.translate_x,
            y: point.y_percent * self.image_height * self.scale_y + self.translate_y,
        }
    }
}

impl SurfaceProjection for ImageTransform {
    type Point = FantasyPoint;

    fn to_content(&self, screen: ScreenPoint) -> Option<FantasyPoint> {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return None;
        }
        if self.image_width <= 0.0 || self.image_height <= 0.0 {
            return None;
        }

        let image_x = (screen.x - self.translate_x) / self.scale_x;
        let image_y = (screen.y - self.translate_y) / self.scale_y;

        if !(0.0..=self.image_width).contains(&image_x)
            || !(0.0..=self.image_height).contains(&image_y)
        {
            return None;
        }

        FantasyPoint::new(image_x / self.image_width, image_y / self.image_height).ok()
    }

    fn is_near_marker(&self, marker: FantasyPoint, screen: ScreenPoint) -> bool {
        self.to_screen(marker).distance(&screen) < MARKER_TOUCH_RADIUS_PX
    }

    fn places_point_on_press(&self) -> bool {
        true
    }
}

/// A Web Mercator slippy-map viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercatorView {
    pub center: GeoPoint,
    pub zoom: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl WebMercatorView {
    pub fn new(center: GeoPoint, zoom: f64, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            center,
            zoom,
            viewport_width,
            viewport_height,
        }
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// World pixel coordinates of a geographic point at this zoom
    fn project(&self, point: GeoPoint) -> (f64, f64) {
        let world = self.world_size();
        let lat = point
            .latitude
            .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
            .to_radians();
        let x = (point.longitude + 180.0) / 360.0 * world;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
        (x, y)
    }

    /// Screen pixel where a geographic point is drawn
    pub fn to_screen(&self, point: GeoPoint) -> ScreenPoint {
        let (cx, cy) = self.project(self.center);
        let (px, py) = self.project(point);
        ScreenPoint {
            x: px - cx + self.viewport_width / 2.0,
            y: py - cy + self.viewport_height / 2.0,
        }
    }
}

impl SurfaceProjection for WebMercatorView {
    type Point = GeoPoint;

    fn to_content(&self, screen: ScreenPoint) -> Option<GeoPoint> {
        let world = self.world_size();
        let (cx, cy) = self.project(self.center);
        let x = cx + screen.x - self.viewport_width / 2.0;
        let y = cy + screen.y - self.viewport_height / 2.0;

        if !(0.0..=world).contains(&y) {
            return None;
        }

        let longitude = (x / world * 360.0).rem_euclid(360.0) - 180.0;
        let n = PI - 2.0 * PI * y / world;
        let latitude = n.sinh().atan().to_degrees();

        GeoPoint::new(latitude, longitude).ok()
    }

    fn is_near_marker(&self, marker: GeoPoint, screen: ScreenPoint) -> bool {
        match self.to_content(screen) {
            Some(point) => marker.distance_meters(&point) < geo_touch_threshold_meters(self.zoom),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_transform_maps_inside_image() {
        let transform = ImageTransform {
            scale_x: 2.0,
            scale_y: 2.0,
            translate_x: 10.0,
            translate_y: 20.0,
            image_width: 100.0,
            image_height: 50.0,
        };

        let point = transform.to_content(ScreenPoint::new(110.0, 70.0)).unwrap();
        assert!((point.x_percent - 0.5).abs() < 1e-9);
        assert!((point.y_percent - 0.5).abs() < 1e-9);

        let back = transform.to_screen(point);
        assert!((back.x - 110.0).abs() < 1e-9);
        assert!((back.y - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_image_transform_rejects_outside() {
        let transform = ImageTransform::identity(100.0, 100.0);
        assert!(transform.to_content(ScreenPoint::new(-1.0, 50.0)).is_none());
        assert!(transform.to_content(ScreenPoint::new(50.0, 101.0)).is_none());
    }

    #[test]
    fn test_image_marker_proximity() {
        let transform = ImageTransform::identity(1000.0, 1000.0);
        let marker = FantasyPoint::new(0.5, 0.5).unwrap();
        assert!(transform.is_near_marker(marker, ScreenPoint::new(540.0, 540.0)));
        assert!(!transform.is_near_marker(marker, ScreenPoint::new(600.0, 500.0)));
    }

    #[test]
    fn test_mercator_center_round_trip() {
        let center = GeoPoint::new(37.7749, -122.4194).unwrap();
        let view = WebMercatorView::new(center, 15.0, 800.0, 600.0);

        let screen = view.to_screen(center);
        assert!((screen.x - 400.0).abs() < 1e-6);
        assert!((screen.y - 300.0).abs() < 1e-6);

        let point = view.to_content(ScreenPoint::new(400.0, 300.0)).unwrap();
        assert!((point.latitude - center.latitude).abs() < 1e-9);
        assert!((point.longitude - center.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_up_is_north() {
        let center = GeoPoint::new(10.0, 10.0).unwrap();
        let view = WebMercatorView::new(center, 12.0, 400.0, 400.0);
        let above = view.to_content(ScreenPoint::new(200.0, 100.0)).unwrap();
        assert!(above.latitude > center.latitude);
        assert!((above.longitude - center.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_geo_threshold_shrinks_with_zoom() {
        assert_eq!(geo_touch_threshold_meters(0.0), 50_000.0);
        assert!(geo_touch_threshold_meters(16.0) < 1.0);
    }

    #[test]
    fn test_mercator_marker_proximity() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        // ~24m grab radius at zoom 11
        let view = WebMercatorView::new(center, 11.0, 400.0, 400.0);
        assert!(view.is_near_marker(center, ScreenPoint::new(200.0, 200.0)));
        assert!(!view.is_near_marker(center, ScreenPoint::new(390.0, 200.0)));
    }
}
