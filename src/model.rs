use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    #[default]
    None,
    Watch,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn is_alert(self) -> bool {
        self != AlertLevel::None
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertLevel::None => "NONE",
            AlertLevel::Watch => "WATCH",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AircraftState {
    pub icao24: String,
    #[serde(default, deserialize_with = "de_opt_trimmed")]
    pub callsign: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "de_opt_f64_from_any")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64_from_any")]
    pub velocity: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64_from_any")]
    pub heading: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64_from_any")]
    pub vertical_rate: Option<f64>,
    #[serde(default)]
    pub on_ground: bool,
    #[serde(default)]
    pub last_contact: f64,
    pub alert_level: AlertLevel,
    #[serde(default, deserialize_with = "de_opt_trimmed")]
    pub violated_zone: Option<String>,
}

impl AircraftState {
    pub fn display_name(&self) -> &str {
        match self.callsign.as_deref() {
            Some(callsign) if !callsign.is_empty() => callsign,
            _ => &self.icao24,
        }
    }

    pub fn is_alert(&self) -> bool {
        self.alert_level.is_alert()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FlightData {
    pub timestamp: f64,
    pub aircraft: Vec<AircraftState>,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("duplicate icao24 {0} in frame")]
    DuplicateIcao(String),

    #[error("aircraft {icao24} has alert level {level} without a violated zone")]
    MissingZone { icao24: String, level: AlertLevel },

    #[error("aircraft {icao24} names zone {zone} but has no alert")]
    UnexpectedZone { icao24: String, zone: String },
}

impl FlightData {
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        let frame: FlightData = serde_json::from_str(text)?;
        frame.validate()?;
        Ok(frame)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotUtf8)?;
        Self::from_json(text)
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        let mut seen = HashSet::with_capacity(self.aircraft.len());
        for ac in &self.aircraft {
            if !seen.insert(ac.icao24.as_str()) {
                return Err(FrameError::DuplicateIcao(ac.icao24.clone()));
            }
            match (ac.alert_level.is_alert(), ac.violated_zone.as_deref()) {
                (true, None) => {
                    return Err(FrameError::MissingZone {
                        icao24: ac.icao24.clone(),
                        level: ac.alert_level,
                    })
                }
                (false, Some(zone)) => {
                    return Err(FrameError::UnexpectedZone {
                        icao24: ac.icao24.clone(),
                        zone: zone.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// Polygon vertices are `[lat, lon]` pairs on the wire.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RestrictedZone {
    pub id: String,
    pub name: String,
    pub severity: AlertLevel,
    #[serde(deserialize_with = "de_polygon", serialize_with = "ser_polygon")]
    pub polygon: Vec<GeoPoint>,
    pub altitude_min: f64,
    pub altitude_max: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn de_polygon<'de, D>(deserializer: D) -> Result<Vec<GeoPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let pairs: Vec<(f64, f64)> = Vec::deserialize(deserializer)?;
    Ok(pairs
        .into_iter()
        .map(|(lat, lon)| GeoPoint { lat, lon })
        .collect())
}

fn ser_polygon<S>(polygon: &[GeoPoint], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let pairs: Vec<(f64, f64)> = polygon.iter().map(|p| (p.lat, p.lon)).collect();
    pairs.serialize(serializer)
}

fn de_opt_trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn de_opt_f64_from_any<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected float-compatible number")),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(trimmed.parse::<f64>().ok())
            }
        }
        Value::Null => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "expected number or null, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{AlertLevel, FlightData, FrameError, RestrictedZone};

    const MOCK: &str = r#"{
        "timestamp": 1769903354.5,
        "aircraft": [
            {
                "icao24": "a1b2c3",
                "callsign": "UAL123  ",
                "latitude": 37.61,
                "longitude": -122.38,
                "altitude": 4500.4,
                "velocity": 180.6,
                "heading": 280.0,
                "vertical_rate": -640,
                "on_ground": false,
                "last_contact": 1769903350,
                "alert_level": "WARNING",
                "violated_zone": "sfo-class-b",
                "squawk": "1200"
            },
            {
                "icao24": "d4e5f6",
                "callsign": null,
                "latitude": 38.0,
                "longitude": -122.0,
                "altitude": null,
                "velocity": "250",
                "heading": 90,
                "on_ground": false,
                "last_contact": 1769903351,
                "alert_level": "NONE",
                "violated_zone": null
            }
        ]
    }"#;

    #[test]
    fn parse_mock_frame() {
        let frame = FlightData::from_json(MOCK).unwrap();
        assert_eq!(frame.aircraft.len(), 2);
        let first = &frame.aircraft[0];
        assert_eq!(first.callsign.as_deref(), Some("UAL123"));
        assert_eq!(first.alert_level, AlertLevel::Warning);
        assert_eq!(first.violated_zone.as_deref(), Some("sfo-class-b"));
        assert_eq!(first.vertical_rate, Some(-640.0));
        let second = &frame.aircraft[1];
        assert_eq!(second.display_name(), "d4e5f6");
        assert_eq!(second.altitude, None);
        assert_eq!(second.velocity, Some(250.0));
        assert_eq!(second.vertical_rate, None);
    }

    #[test]
    fn alert_levels_are_ordered() {
        assert!(AlertLevel::None < AlertLevel::Watch);
        assert!(AlertLevel::Watch < AlertLevel::Warning);
        assert!(AlertLevel::Warning < AlertLevel::Critical);
        assert!(!AlertLevel::None.is_alert());
        assert!(AlertLevel::Watch.is_alert());
    }

    #[test]
    fn missing_required_fields_reject_frame() {
        let no_lat = r#"{"timestamp":1,"aircraft":[{"icao24":"AA1","longitude":1.0,"alert_level":"NONE"}]}"#;
        assert!(matches!(
            FlightData::from_json(no_lat),
            Err(FrameError::Malformed(_))
        ));
        let no_level = r#"{"timestamp":1,"aircraft":[{"icao24":"AA1","latitude":1.0,"longitude":1.0}]}"#;
        assert!(FlightData::from_json(no_level).is_err());
        let bad_level = r#"{"timestamp":1,"aircraft":[{"icao24":"AA1","latitude":1.0,"longitude":1.0,"alert_level":"PANIC"}]}"#;
        assert!(FlightData::from_json(bad_level).is_err());
        assert!(FlightData::from_json("not json").is_err());
        assert!(FlightData::from_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn zone_presence_must_match_alert_level() {
        let missing = r#"{"timestamp":1,"aircraft":[{"icao24":"BB2","latitude":1.0,"longitude":1.0,"alert_level":"CRITICAL"}]}"#;
        assert!(matches!(
            FlightData::from_json(missing),
            Err(FrameError::MissingZone { .. })
        ));
        let unexpected = r#"{"timestamp":1,"aircraft":[{"icao24":"BB2","latitude":1.0,"longitude":1.0,"alert_level":"NONE","violated_zone":"travis-afb"}]}"#;
        assert!(matches!(
            FlightData::from_json(unexpected),
            Err(FrameError::UnexpectedZone { .. })
        ));
    }

    #[test]
    fn duplicate_icao_rejects_frame() {
        let dup = r#"{"timestamp":1,"aircraft":[
            {"icao24":"AA1","latitude":1.0,"longitude":1.0,"alert_level":"NONE"},
            {"icao24":"AA1","latitude":2.0,"longitude":2.0,"alert_level":"NONE"}
        ]}"#;
        assert!(matches!(
            FlightData::from_json(dup),
            Err(FrameError::DuplicateIcao(id)) if id == "AA1"
        ));
    }

    #[test]
    fn zone_polygon_pairs_are_lat_lon() {
        let json = r#"{
            "id": "sfo-class-b",
            "name": "SFO Class B",
            "severity": "WARNING",
            "polygon": [[37.65, -122.50], [37.65, -122.30], [37.55, -122.30]],
            "altitude_min": 0,
            "altitude_max": 10000
        }"#;
        let zone: RestrictedZone = serde_json::from_str(json).unwrap();
        assert!(zone.active);
        assert_eq!(zone.polygon[1].lat, 37.65);
        assert_eq!(zone.polygon[1].lon, -122.30);
    }
}
