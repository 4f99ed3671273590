use ratatui::layout::Rect;

use crate::model::GeoPoint;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 16.0;
const ZOOM_STEP: f64 = 0.5;
const PAN_FRACTION: f64 = 0.25;
const MAX_LAT: f64 = 85.0;
// terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl Bounds {
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.x[0] && p.lon <= self.x[1] && p.lat >= self.y[0] && p.lat <= self.y[1]
    }

    pub fn is_finite(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(|v| v.is_finite())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    home: GeoPoint,
    home_zoom: f64,
}

impl Viewport {
    pub fn new(lat: f64, lon: f64, zoom: f64) -> Self {
        let center = GeoPoint::new(lat.clamp(-MAX_LAT, MAX_LAT), wrap_lon(lon));
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Self {
            center,
            zoom,
            home: center,
            home_zoom: zoom,
        }
    }

    // Zoom level `z` shows `360 / 2^z` degrees of longitude.
    pub fn half_span_lon(&self) -> f64 {
        180.0 / 2f64.powf(self.zoom)
    }

    pub fn bounds(&self, area: Rect) -> Bounds {
        let half_lon = self.half_span_lon();
        let cols = f64::from(area.width.max(1));
        let rows = f64::from(area.height.max(1));
        let shrink = self.center.lat.to_radians().cos().max(0.05);
        let half_lat = half_lon * shrink * (rows * CELL_ASPECT) / cols;
        Bounds {
            x: [self.center.lon - half_lon, self.center.lon + half_lon],
            y: [self.center.lat - half_lat, self.center.lat + half_lat],
        }
    }

    pub fn cell_span(&self, area: Rect) -> (f64, f64) {
        let b = self.bounds(area);
        let cols = f64::from(area.width.max(1));
        let rows = f64::from(area.height.max(1));
        ((b.y[1] - b.y[0]) / rows, (b.x[1] - b.x[0]) / cols)
    }

    pub fn screen_to_geo(&self, area: Rect, col: u16, row: u16) -> Option<GeoPoint> {
        if area.width == 0 || area.height == 0 {
            return None;
        }
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height
        {
            return None;
        }
        let b = self.bounds(area);
        let fx = (f64::from(col - area.x) + 0.5) / f64::from(area.width);
        let fy = (f64::from(row - area.y) + 0.5) / f64::from(area.height);
        Some(GeoPoint::new(
            b.y[1] - fy * (b.y[1] - b.y[0]),
            b.x[0] + fx * (b.x[1] - b.x[0]),
        ))
    }

    pub fn pan(&mut self, north: i32, east: i32) {
        let step = self.half_span_lon() * 2.0 * PAN_FRACTION;
        let lat = self.center.lat + f64::from(north) * step;
        let lon = self.center.lon + f64::from(east) * step;
        self.center = GeoPoint::new(lat.clamp(-MAX_LAT, MAX_LAT), wrap_lon(lon));
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn reset(&mut self) {
        self.center = self.home;
        self.zoom = self.home_zoom;
    }
}

fn wrap_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
