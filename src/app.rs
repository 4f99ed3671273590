use std::sync::Arc;

use ratatui::layout::Rect;
use tracing::{debug, info};

use crate::guard::FaultLatch;
use crate::map::{Basemap, MapConfigError};
use crate::render::{build_layers, pick_aircraft, tooltip, LayerSet, Tooltip};
use crate::store::{AlertEntry, Snapshot, StateStore};
use crate::stream::{LinkState, StreamEvent};
use crate::viewport::Viewport;
use crate::zones::ZoneCatalog;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Default,
    Amber,
    Ocean,
}

impl ThemeMode {
    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Default => ThemeMode::Amber,
            ThemeMode::Amber => ThemeMode::Ocean,
            ThemeMode::Ocean => ThemeMode::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Default => "DEFAULT",
            ThemeMode::Amber => "AMBER",
            ThemeMode::Ocean => "OCEAN",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "amber" | "gold" => ThemeMode::Amber,
            "ocean" | "blue" => ThemeMode::Ocean,
            _ => ThemeMode::Default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hover {
    pub col: u16,
    pub row: u16,
    pub icao24: String,
}

pub struct App {
    pub url: String,
    pub input_mode: InputMode,
    pub theme_mode: ThemeMode,
    pub viewport: Viewport,
    basemap: Result<Basemap, MapConfigError>,
    map_fault: FaultLatch,
    store: StateStore,
    catalog: ZoneCatalog,
    link: LinkState,
    snapshot: Arc<Snapshot>,
    layers: LayerSet,
    map_area: Option<Rect>,
    pointer: Option<(u16, u16)>,
    hover: Option<Hover>,
    drag_anchor: Option<(u16, u16)>,
}

impl App {
    pub fn new(
        url: String,
        catalog: ZoneCatalog,
        viewport: Viewport,
        basemap: Result<Basemap, MapConfigError>,
        theme_mode: ThemeMode,
    ) -> Self {
        let store = StateStore::new();
        let snapshot = store.snapshot();
        let layers = build_layers(&snapshot.aircraft, &catalog);
        Self {
            url,
            input_mode: InputMode::Normal,
            theme_mode,
            viewport,
            basemap,
            map_fault: FaultLatch::default(),
            store,
            catalog,
            link: LinkState::Connecting,
            snapshot,
            layers,
            map_area: None,
            pointer: None,
            hover: None,
            drag_anchor: None,
        }
    }

    pub fn apply_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Link(state) => {
                if state != self.link {
                    info!("link {:?} -> {:?}", self.link, state);
                }
                self.link = state;
            }
            StreamEvent::Frame(frame) => {
                self.snapshot = self.store.apply_frame(frame);
                self.layers = build_layers(&self.snapshot.aircraft, &self.catalog);
                let hovered = self.hover.take().map(|h| h.icao24);
                self.refresh_hover();
                if let (Some(icao24), None) = (hovered, &self.hover) {
                    debug!("hovered aircraft {icao24} left the pointer");
                }
            }
        }
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn is_online(&self) -> bool {
        self.link.is_online()
    }

    pub fn aircraft_count(&self) -> usize {
        self.snapshot.aircraft_count()
    }

    pub fn alert_count(&self) -> usize {
        self.snapshot.alert_count()
    }

    pub fn alert_log(&self) -> Vec<AlertEntry<'_>> {
        self.snapshot.alert_log(&self.catalog)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn catalog(&self) -> &ZoneCatalog {
        &self.catalog
    }

    pub fn map_fault(&self) -> &FaultLatch {
        &self.map_fault
    }

    pub fn map_parts(
        &mut self,
    ) -> (
        &LayerSet,
        &Viewport,
        &Result<Basemap, MapConfigError>,
        &mut FaultLatch,
    ) {
        (
            &self.layers,
            &self.viewport,
            &self.basemap,
            &mut self.map_fault,
        )
    }

    pub fn set_map_area(&mut self, area: Rect) {
        self.map_area = Some(area);
    }

    pub fn hover_at(&mut self, col: u16, row: u16) {
        self.pointer = Some((col, row));
        self.refresh_hover();
    }

    // Re-pick under the last pointer position after the map content moved.
    fn refresh_hover(&mut self) {
        self.hover = self.pointer.zip(self.map_area).and_then(|((col, row), area)| {
            let at = self.viewport.screen_to_geo(area, col, row)?;
            let (tol_lat, tol_lon) = self.viewport.cell_span(area);
            pick_aircraft(&self.layers, at, tol_lat, tol_lon).map(|icon| Hover {
                col,
                row,
                icao24: icon.key.clone(),
            })
        });
    }

    pub fn clear_hover(&mut self) {
        self.pointer = None;
        self.hover = None;
    }

    pub fn tooltip(&self) -> Option<(&Hover, Tooltip)> {
        let hover = self.hover.as_ref()?;
        let ac = self.snapshot.find(&hover.icao24)?;
        Some((hover, tooltip(ac)))
    }

    pub fn start_drag(&mut self, col: u16, row: u16) {
        let inside = self
            .map_area
            .is_some_and(|area| self.viewport.screen_to_geo(area, col, row).is_some());
        self.drag_anchor = inside.then_some((col, row));
    }

    pub fn drag_to(&mut self, col: u16, row: u16) {
        let (Some((from_col, from_row)), Some(area)) = (self.drag_anchor, self.map_area) else {
            return;
        };
        let (cell_lat, cell_lon) = self.viewport.cell_span(area);
        let dx = f64::from(col) - f64::from(from_col);
        let dy = f64::from(row) - f64::from(from_row);
        self.viewport.center.lon -= dx * cell_lon;
        self.viewport.center.lat = (self.viewport.center.lat + dy * cell_lat).clamp(-85.0, 85.0);
        self.drag_anchor = Some((col, row));
        self.pointer = None;
        self.hover = None;
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn pan(&mut self, north: i32, east: i32) {
        self.viewport.pan(north, east);
        self.refresh_hover();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.refresh_hover();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.refresh_hover();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
        self.refresh_hover();
    }

    pub fn toggle_theme(&mut self) {
        self.theme_mode = self.theme_mode.toggle();
    }

    pub fn open_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn close_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }
}

#[cfg(test)]
mod tests {
    use super::{App, InputMode, ThemeMode};
    use crate::map::init_basemap;
    use crate::model::{AircraftState, AlertLevel, FlightData};
    use crate::stream::{LinkState, StreamEvent};
    use crate::viewport::Viewport;
    use crate::zones::ZoneCatalog;
    use ratatui::layout::Rect;

    fn aircraft(icao24: &str, level: AlertLevel, zone: Option<&str>) -> AircraftState {
        AircraftState {
            icao24: icao24.to_string(),
            callsign: None,
            latitude: 37.7,
            longitude: -122.4,
            altitude: Some(8000.0),
            velocity: Some(240.0),
            heading: Some(45.0),
            vertical_rate: None,
            on_ground: false,
            last_contact: 0.0,
            alert_level: level,
            violated_zone: zone.map(str::to_string),
        }
    }

    fn scenario_a() -> FlightData {
        let mut bb2 = aircraft("BB2", AlertLevel::Warning, Some("sfo-class-b"));
        bb2.latitude = 37.6;
        FlightData {
            timestamp: 1.0,
            aircraft: vec![aircraft("AA1", AlertLevel::None, None), bb2],
        }
    }

    fn app() -> App {
        App::new(
            "ws://localhost:8000/ws/flights".to_string(),
            ZoneCatalog::builtin(),
            Viewport::new(37.7, -122.4, 8.0),
            init_basemap("pk.test", "high"),
            ThemeMode::Default,
        )
    }

    #[test]
    fn starts_offline_and_empty() {
        let app = app();
        assert!(!app.is_online());
        assert_eq!(app.aircraft_count(), 0);
        assert_eq!(app.alert_count(), 0);
        assert!(app.alert_log().is_empty());
        assert!(app.layers().aircraft.is_empty());
        assert_eq!(app.layers().zones.len(), 2);
    }

    #[test]
    fn scenario_a_derives_counts_and_log() {
        let mut app = app();
        app.apply_event(StreamEvent::Link(LinkState::Open));
        app.apply_event(StreamEvent::Frame(scenario_a()));
        assert!(app.is_online());
        assert_eq!(app.aircraft_count(), 2);
        assert_eq!(app.alert_count(), 1);
        let log = app.alert_log();
        assert_eq!(log[0].icao24, "BB2");
        assert_eq!(log[0].zone_name, "SFO Class B");
        assert_eq!(app.layers().aircraft.len(), 2);
    }

    #[test]
    fn scenario_c_close_keeps_last_snapshot() {
        let mut app = app();
        app.apply_event(StreamEvent::Link(LinkState::Open));
        app.apply_event(StreamEvent::Frame(scenario_a()));
        app.apply_event(StreamEvent::Link(LinkState::Closed));
        assert!(!app.is_online());
        assert_eq!(app.aircraft_count(), 2);
        assert_eq!(app.layers().aircraft.len(), 2);
        app.apply_event(StreamEvent::Link(LinkState::Connecting));
        assert!(!app.is_online());
    }

    #[test]
    fn layers_track_the_latest_frame() {
        let mut app = app();
        app.apply_event(StreamEvent::Frame(scenario_a()));
        app.apply_event(StreamEvent::Frame(FlightData {
            timestamp: 2.0,
            aircraft: vec![aircraft("ZZ9", AlertLevel::None, None)],
        }));
        let keys: Vec<&str> = app.layers().aircraft.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["ZZ9"]);
        assert_eq!(app.snapshot().revision, 2);
    }

    #[test]
    fn hover_shows_tooltip_while_aircraft_is_under_pointer() {
        let mut app = app();
        app.apply_event(StreamEvent::Frame(scenario_a()));
        let area = Rect::new(0, 0, 80, 40);
        app.set_map_area(area);
        // AA1 sits on the view center
        app.hover_at(40, 20);
        let (hover, tip) = app.tooltip().expect("tooltip over AA1");
        assert_eq!(hover.icao24, "AA1");
        assert_eq!(tip.title, "FLIGHT AA1");
        assert!(tip.alert.is_none());

        app.hover_at(1, 1);
        assert!(app.tooltip().is_none());

        app.hover_at(40, 20);
        app.apply_event(StreamEvent::Frame(FlightData {
            timestamp: 2.0,
            aircraft: vec![],
        }));
        assert!(app.tooltip().is_none());
        app.apply_event(StreamEvent::Frame(scenario_a()));
        assert_eq!(
            app.tooltip().map(|(h, _)| h.icao24.as_str()),
            Some("AA1")
        );
    }

    #[test]
    fn tooltip_follows_frames_under_a_resting_pointer() {
        let mut app = app();
        app.apply_event(StreamEvent::Frame(scenario_a()));
        app.set_map_area(Rect::new(0, 0, 80, 40));
        app.hover_at(40, 20);
        assert_eq!(
            app.tooltip().map(|(h, _)| h.icao24.as_str()),
            Some("AA1")
        );

        let mut moved = scenario_a();
        moved.timestamp = 2.0;
        moved.aircraft[0].latitude = 10.0;
        app.apply_event(StreamEvent::Frame(moved));
        assert!(app.tooltip().is_none());

        let mut arrival = aircraft("ZZ9", AlertLevel::None, None);
        arrival.callsign = Some("ZEUS9".to_string());
        app.apply_event(StreamEvent::Frame(FlightData {
            timestamp: 3.0,
            aircraft: vec![arrival],
        }));
        let (hover, tip) = app.tooltip().expect("tooltip over ZZ9");
        assert_eq!((hover.col, hover.row), (40, 20));
        assert_eq!(hover.icao24, "ZZ9");
        assert_eq!(tip.title, "FLIGHT ZEUS9");
    }

    #[test]
    fn escape_forgets_the_pointer() {
        let mut app = app();
        app.apply_event(StreamEvent::Frame(scenario_a()));
        app.set_map_area(Rect::new(0, 0, 80, 40));
        app.hover_at(40, 20);
        app.clear_hover();
        app.apply_event(StreamEvent::Frame(scenario_a()));
        assert!(app.tooltip().is_none());
    }

    #[test]
    fn drag_pans_opposite_to_pointer() {
        let mut app = app();
        app.set_map_area(Rect::new(0, 0, 80, 40));
        let start = app.viewport.center;
        app.start_drag(40, 20);
        app.drag_to(30, 20);
        assert!(app.viewport.center.lon > start.lon);
        app.end_drag();
        app.drag_to(10, 10);
        assert!(app.viewport.center.lat == start.lat);
    }

    #[test]
    fn help_and_theme_modes() {
        let mut app = app();
        app.open_help();
        assert_eq!(app.input_mode, InputMode::Help);
        app.close_help();
        assert_eq!(app.input_mode, InputMode::Normal);
        app.toggle_theme();
        app.toggle_theme();
        app.toggle_theme();
        assert_eq!(app.theme_mode, ThemeMode::Default);
        assert_eq!(ThemeMode::from_str("OCEAN"), ThemeMode::Ocean);
    }
}
