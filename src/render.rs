use crate::model::{AircraftState, AlertLevel, GeoPoint, RestrictedZone};
use crate::zones::ZoneCatalog;

pub const ZONE_LABEL_SUFFIX: &str = "NO FLY ZONE";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

pub const RED: Rgba = Rgba::rgb(255, 0, 0);
pub const ORANGE: Rgba = Rgba::rgb(255, 165, 0);
pub const GREEN: Rgba = Rgba::rgb(0, 255, 0);
pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
const ZONE_FILL_ALPHA: u8 = 50;

#[derive(Clone, Debug, PartialEq)]
pub struct ZoneShape {
    pub id: String,
    pub polygon: Vec<GeoPoint>,
    pub fill: Rgba,
    pub stroke: Rgba,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZoneLabel {
    pub id: String,
    pub position: GeoPoint,
    pub text: String,
    pub color: Rgba,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AircraftIcon {
    pub key: String,
    pub position: GeoPoint,
    pub angle: f64,
    pub color: Rgba,
}

impl AircraftIcon {
    pub fn heading(&self) -> f64 {
        (360.0 - self.angle).rem_euclid(360.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerSet {
    pub zones: Vec<ZoneShape>,
    pub labels: Vec<ZoneLabel>,
    pub aircraft: Vec<AircraftIcon>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tooltip {
    pub title: String,
    pub lines: Vec<String>,
    pub alert: Option<String>,
}

pub fn build_layers(aircraft: &[AircraftState], catalog: &ZoneCatalog) -> LayerSet {
    let zones = catalog.active().map(zone_shape).collect();
    let labels = catalog.active().map(zone_label).collect();
    let aircraft = aircraft.iter().map(aircraft_icon).collect();
    LayerSet {
        zones,
        labels,
        aircraft,
    }
}

pub fn zone_color(severity: AlertLevel) -> Rgba {
    match severity {
        AlertLevel::Critical => RED,
        _ => ORANGE,
    }
}

// WATCH shares the NONE color.
pub fn aircraft_color(level: AlertLevel) -> Rgba {
    match level {
        AlertLevel::Critical => RED,
        AlertLevel::Warning => ORANGE,
        AlertLevel::Watch | AlertLevel::None => GREEN,
    }
}

pub fn icon_angle(heading: f64) -> f64 {
    360.0 - heading
}

fn zone_shape(zone: &RestrictedZone) -> ZoneShape {
    let stroke = zone_color(zone.severity);
    ZoneShape {
        id: zone.id.clone(),
        polygon: zone.polygon.clone(),
        fill: Rgba::rgba(stroke.r, stroke.g, stroke.b, ZONE_FILL_ALPHA),
        stroke,
    }
}

fn zone_label(zone: &RestrictedZone) -> ZoneLabel {
    ZoneLabel {
        id: zone.id.clone(),
        position: label_position(&zone.polygon),
        text: format!("{}\n{}", zone.name, ZONE_LABEL_SUFFIX),
        color: WHITE,
    }
}

// Bounding-box midpoint; equals the centroid only for rectangles.
pub fn label_position(polygon: &[GeoPoint]) -> GeoPoint {
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    let mut min_lon = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    for p in polygon {
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
        min_lon = min_lon.min(p.lon);
        max_lon = max_lon.max(p.lon);
    }
    GeoPoint {
        lat: (min_lat + max_lat) / 2.0,
        lon: (min_lon + max_lon) / 2.0,
    }
}

fn aircraft_icon(ac: &AircraftState) -> AircraftIcon {
    AircraftIcon {
        key: ac.icao24.clone(),
        position: GeoPoint::new(ac.latitude, ac.longitude),
        angle: icon_angle(ac.heading.unwrap_or(0.0)),
        color: aircraft_color(ac.alert_level),
    }
}

pub fn tooltip(ac: &AircraftState) -> Tooltip {
    Tooltip {
        title: format!("FLIGHT {}", ac.display_name()),
        lines: vec![
            format!("ALT: {} ft", fmt_rounded(ac.altitude)),
            format!("SPD: {} kts", fmt_rounded(ac.velocity)),
        ],
        alert: ac
            .alert_level
            .is_alert()
            .then(|| format!("⚠ {}", ac.alert_level)),
    }
}

fn fmt_rounded(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}", v.round() as i64),
        _ => "--".to_string(),
    }
}

pub fn pick_aircraft<'a>(
    layers: &'a LayerSet,
    at: GeoPoint,
    tol_lat: f64,
    tol_lon: f64,
) -> Option<&'a AircraftIcon> {
    if tol_lat <= 0.0 || tol_lon <= 0.0 {
        return None;
    }
    layers
        .aircraft
        .iter()
        .filter_map(|icon| {
            let dlat = (icon.position.lat - at.lat) / tol_lat;
            let dlon = (icon.position.lon - at.lon) / tol_lon;
            if dlat.abs() <= 1.0 && dlon.abs() <= 1.0 {
                Some((dlat * dlat + dlon * dlon, icon))
            } else {
                None
            }
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, icon)| icon)
}
