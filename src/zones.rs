use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{AlertLevel, GeoPoint, RestrictedZone};

#[derive(Debug, Error, PartialEq)]
pub enum ZoneError {
    #[error("duplicate zone id {0}")]
    DuplicateId(String),

    #[error("zone {0} needs at least 3 polygon vertices")]
    TooFewVertices(String),

    #[error("zone {0} has a non-finite vertex")]
    BadVertex(String),

    #[error("zone {id} altitude band {min}..{max} is inverted")]
    InvertedBand { id: String, min: f64, max: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZoneCatalog {
    zones: Vec<RestrictedZone>,
}

#[derive(Debug, Default, Deserialize)]
struct ZoneFile {
    #[serde(default)]
    zone: Vec<RestrictedZone>,
}

impl ZoneCatalog {
    pub fn new(zones: Vec<RestrictedZone>) -> Result<Self, ZoneError> {
        let mut ids = HashSet::with_capacity(zones.len());
        for zone in &zones {
            if !ids.insert(zone.id.as_str()) {
                return Err(ZoneError::DuplicateId(zone.id.clone()));
            }
            if zone.polygon.len() < 3 {
                return Err(ZoneError::TooFewVertices(zone.id.clone()));
            }
            if zone
                .polygon
                .iter()
                .any(|p| !p.lat.is_finite() || !p.lon.is_finite())
            {
                return Err(ZoneError::BadVertex(zone.id.clone()));
            }
            if zone.altitude_min > zone.altitude_max {
                return Err(ZoneError::InvertedBand {
                    id: zone.id.clone(),
                    min: zone.altitude_min,
                    max: zone.altitude_max,
                });
            }
        }
        Ok(Self { zones })
    }

    pub fn builtin() -> Self {
        Self {
            zones: vec![
                RestrictedZone {
                    id: "sfo-class-b".to_string(),
                    name: "SFO Class B".to_string(),
                    severity: AlertLevel::Warning,
                    polygon: vec![
                        GeoPoint::new(37.65, -122.50),
                        GeoPoint::new(37.65, -122.30),
                        GeoPoint::new(37.55, -122.30),
                        GeoPoint::new(37.55, -122.50),
                    ],
                    altitude_min: 0.0,
                    altitude_max: 10000.0,
                    active: true,
                },
                RestrictedZone {
                    id: "travis-afb".to_string(),
                    name: "Travis AFB".to_string(),
                    severity: AlertLevel::Critical,
                    polygon: vec![
                        GeoPoint::new(38.30, -121.98),
                        GeoPoint::new(38.30, -121.88),
                        GeoPoint::new(38.22, -121.88),
                        GeoPoint::new(38.22, -121.98),
                    ],
                    altitude_min: 0.0,
                    altitude_max: 50000.0,
                    active: true,
                },
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read zones: {}", path.display()))?;
        let file: ZoneFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse zones: {}", path.display()))?;
        let catalog = Self::new(file.zone)
            .with_context(|| format!("Invalid zones in {}", path.display()))?;
        info!("loaded {} zones from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn fetch(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build zone client")?;
        let zones: Vec<RestrictedZone> = client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("Failed to fetch zones from {url}"))?
            .json()
            .with_context(|| format!("Failed to decode zones from {url}"))?;
        let catalog =
            Self::new(zones).with_context(|| format!("Invalid zones served by {url}"))?;
        info!("fetched {} zones from {url}", catalog.len());
        Ok(catalog)
    }

    pub fn resolve(url: Option<&str>, path: Option<&Path>, timeout: Duration) -> Result<Self> {
        if let Some(url) = url {
            return Self::fetch(url, timeout);
        }
        if let Some(path) = path {
            return Self::load(path);
        }
        debug!("using built-in zone catalog");
        Ok(Self::builtin())
    }

    pub fn resolve_or_builtin(url: Option<&str>, path: Option<&Path>, timeout: Duration) -> Self {
        match Self::resolve(url, path, timeout) {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!("zone source unavailable, using built-in zones: {err:#}");
                Self::builtin()
            }
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &RestrictedZone> {
        self.zones.iter().filter(|z| z.active)
    }

    pub fn get(&self, id: &str) -> Option<&RestrictedZone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn zone_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|z| z.name.as_str()).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ZoneCatalog, ZoneError};
    use crate::model::{AlertLevel, GeoPoint, RestrictedZone};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        dir.push(format!("zeus-console-zones-test-{suffix}"));
        let _ = fs::create_dir_all(&dir);
        dir.push(name);
        dir
    }

    fn triangle(id: &str) -> RestrictedZone {
        RestrictedZone {
            id: id.to_string(),
            name: id.to_uppercase(),
            severity: AlertLevel::Watch,
            polygon: vec![
                GeoPoint::new(1.0, 1.0),
                GeoPoint::new(2.0, 1.0),
                GeoPoint::new(2.0, 2.0),
            ],
            altitude_min: 0.0,
            altitude_max: 1000.0,
            active: true,
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let builtin = ZoneCatalog::builtin();
        let rebuilt = ZoneCatalog::new(builtin.active().cloned().collect()).unwrap();
        assert_eq!(rebuilt, builtin);
        assert_eq!(builtin.len(), 2);
        assert_eq!(
            builtin.get("travis-afb").map(|z| z.severity),
            Some(AlertLevel::Critical)
        );
    }

    #[test]
    fn zone_name_falls_back_to_id() {
        let catalog = ZoneCatalog::builtin();
        assert_eq!(catalog.zone_name("sfo-class-b"), "SFO Class B");
        assert_eq!(catalog.zone_name("edw-r2508"), "edw-r2508");
    }

    #[test]
    fn rejects_invalid_zones() {
        assert_eq!(
            ZoneCatalog::new(vec![triangle("a"), triangle("a")]),
            Err(ZoneError::DuplicateId("a".to_string()))
        );

        let mut two_points = triangle("b");
        two_points.polygon.pop();
        assert_eq!(
            ZoneCatalog::new(vec![two_points]),
            Err(ZoneError::TooFewVertices("b".to_string()))
        );

        let mut nan = triangle("c");
        nan.polygon[0].lat = f64::NAN;
        assert_eq!(
            ZoneCatalog::new(vec![nan]),
            Err(ZoneError::BadVertex("c".to_string()))
        );

        let mut inverted = triangle("d");
        inverted.altitude_min = 5000.0;
        assert!(matches!(
            ZoneCatalog::new(vec![inverted]),
            Err(ZoneError::InvertedBand { .. })
        ));
    }

    #[test]
    fn inactive_zones_are_kept_but_not_active() {
        let mut off = triangle("off");
        off.active = false;
        let catalog = ZoneCatalog::new(vec![triangle("on"), off]).unwrap();
        assert_eq!(catalog.len(), 2);
        let active: Vec<&str> = catalog.active().map(|z| z.id.as_str()).collect();
        assert_eq!(active, vec!["on"]);
    }

    #[test]
    fn load_zone_file() {
        let path = temp_file("zones.toml");
        let content = r#"
[[zone]]
id = "moffett"
name = "Moffett Field"
severity = "CRITICAL"
polygon = [[37.43, -122.07], [37.43, -122.03], [37.40, -122.03], [37.40, -122.07]]
altitude_min = 0
altitude_max = 3000

[[zone]]
id = "stadium"
name = "Stadium TFR"
severity = "WATCH"
polygon = [[37.40, -121.97], [37.41, -121.96], [37.39, -121.96]]
altitude_min = 0.0
altitude_max = 3000.0
active = false
"#;
        fs::write(&path, content).unwrap();
        let catalog = ZoneCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.zone_name("moffett"), "Moffett Field");
        assert_eq!(catalog.active().count(), 1);
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn sample_zone_file_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/zones.toml");
        let catalog = ZoneCatalog::resolve(None, Some(&path), Duration::from_secs(1)).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.active().count(), 2);
        assert_eq!(catalog.zone_name("travis-afb"), "Travis AFB");
    }

    #[test]
    fn resolve_prefers_builtin_without_sources() {
        let catalog = ZoneCatalog::resolve(None, None, Duration::from_secs(1)).unwrap();
        assert_eq!(catalog, ZoneCatalog::builtin());
    }

    #[test]
    fn unreadable_zone_file_falls_back_to_builtin() {
        let path = temp_file("missing-zones.toml");
        assert!(ZoneCatalog::resolve(None, Some(&path), Duration::from_secs(1)).is_err());
        let catalog =
            ZoneCatalog::resolve_or_builtin(None, Some(&path), Duration::from_secs(1));
        assert_eq!(catalog, ZoneCatalog::builtin());
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn unreachable_zone_url_falls_back_to_builtin() {
        let url = Some("http://127.0.0.1:1/zones");
        let catalog = ZoneCatalog::resolve_or_builtin(url, None, Duration::from_secs(1));
        assert_eq!(catalog, ZoneCatalog::builtin());
    }
}
