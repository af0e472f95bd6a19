// Spherical Web-Mercator projection into viewport-relative pixels.

use std::f64::consts::PI;

use crate::ir::{Camera, GeoPoint, ScreenPoint, Viewport};

pub const TILE_SIZE: f64 = 256.0;
const MAX_SIN_LAT: f64 = 0.9999;

pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Forward projection to world pixels at `zoom`.
pub fn project(point: GeoPoint, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let x = (point.lon + 180.0) / 360.0 * size;
    let sin_lat = (point.lat * PI / 180.0).sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
    let y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * size;
    (x, y)
}

/// Wrap a longitudinal delta onto the shortest path around the world.
pub fn wrap_delta(dx: f64, size: f64) -> f64 {
    if size <= 0.0 || !size.is_finite() {
        return dx;
    }
    (dx + size / 2.0).rem_euclid(size) - size / 2.0
}

/// Camera-bound projector; caches the world position of the viewport center.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    zoom: f64,
    size: f64,
    center: (f64, f64),
    viewport: Viewport,
}

impl Projector {
    pub fn new(camera: &Camera, viewport: Viewport) -> Self {
        Self {
            zoom: camera.zoom,
            size: world_size(camera.zoom),
            center: project(camera.center, camera.zoom),
            viewport,
        }
    }

    pub fn to_screen(&self, point: GeoPoint) -> Option<ScreenPoint> {
        if !point.lon.is_finite() || !point.lat.is_finite() {
            return None;
        }
        let (wx, wy) = project(point, self.zoom);
        let dx = wrap_delta(wx - self.center.0, self.size);
        let dy = wy - self.center.1;
        let screen = ScreenPoint {
            x: self.viewport.width / 2.0 + dx,
            y: self.viewport.height / 2.0 + dy,
        };
        (screen.x.is_finite() && screen.y.is_finite()).then_some(screen)
    }

    /// Explicit renderer-space positions win over re-projection.
    pub fn resolve(&self, point: GeoPoint, explicit: Option<ScreenPoint>) -> Option<ScreenPoint> {
        match explicit {
            Some(screen) if screen.x.is_finite() && screen.y.is_finite() => Some(screen),
            _ => self.to_screen(point),
        }
    }
}
