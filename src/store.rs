use std::sync::Arc;

use tracing::debug;

use crate::model::{AircraftState, AlertLevel, FlightData};
use crate::zones::ZoneCatalog;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub revision: u64,
    pub timestamp: Option<f64>,
    pub aircraft: Vec<AircraftState>,
    pub alerts: Vec<AircraftState>,
}

impl Snapshot {
    fn from_frame(revision: u64, frame: FlightData) -> Self {
        let alerts = frame
            .aircraft
            .iter()
            .filter(|ac| ac.is_alert())
            .cloned()
            .collect();
        Self {
            revision,
            timestamp: Some(frame.timestamp),
            aircraft: frame.aircraft,
            alerts,
        }
    }

    pub fn aircraft_count(&self) -> usize {
        self.aircraft.len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn find(&self, icao24: &str) -> Option<&AircraftState> {
        self.aircraft.iter().find(|ac| ac.icao24 == icao24)
    }

    pub fn alert_log<'a>(&'a self, catalog: &'a ZoneCatalog) -> Vec<AlertEntry<'a>> {
        self.alerts
            .iter()
            .map(|ac| AlertEntry {
                icao24: &ac.icao24,
                display_name: ac.display_name(),
                level: ac.alert_level,
                zone_name: ac
                    .violated_zone
                    .as_deref()
                    .map(|id| catalog.zone_name(id))
                    .unwrap_or("--"),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertEntry<'a> {
    pub icao24: &'a str,
    pub display_name: &'a str,
    pub level: AlertLevel,
    pub zone_name: &'a str,
}

#[derive(Debug, Default)]
pub struct StateStore {
    current: Arc<Snapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_frame(&mut self, frame: FlightData) -> Arc<Snapshot> {
        let revision = self.current.revision.wrapping_add(1);
        let next = Arc::new(Snapshot::from_frame(revision, frame));
        debug!(
            "apply_frame rev={} aircraft={} alerts={}",
            revision,
            next.aircraft_count(),
            next.alert_count()
        );
        self.current = Arc::clone(&next);
        next
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }
}
