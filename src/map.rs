use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Map, MapResolution, Points};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::Frame;
use thiserror::Error;

use crate::guard::{Surface, SurfaceError};
use crate::model::GeoPoint;
use crate::render::{LayerSet, Rgba};
use crate::ui::Theme;
use crate::viewport::{Bounds, Viewport};

pub const PLACEHOLDER_TOKEN: &str = "pk.eyJ1Ijoi...";
pub const CONFIG_ERROR_TITLE: &str = "Map Configuration Error";
// hatch every other cell so labels stay readable over a fill
const HATCH_STRIDE: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Basemap {
    High,
    Low,
}

impl Basemap {
    fn resolution(self) -> MapResolution {
        match self {
            Basemap::High => MapResolution::High,
            Basemap::Low => MapResolution::Low,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MapConfigError {
    #[error("Missing map token. Set ZEUS_MAP_TOKEN or pass --map-token.")]
    MissingToken,

    #[error("Map token is still the placeholder value. Set a real ZEUS_MAP_TOKEN.")]
    PlaceholderToken,

    #[error("Map initialization failed: unknown basemap style '{0}' (expected high or low).")]
    UnknownStyle(String),
}

pub fn init_basemap(token: &str, style: &str) -> Result<Basemap, MapConfigError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(MapConfigError::MissingToken);
    }
    if token == PLACEHOLDER_TOKEN {
        return Err(MapConfigError::PlaceholderToken);
    }
    match style.trim().to_ascii_lowercase().as_str() {
        "high" | "" => Ok(Basemap::High),
        "low" => Ok(Basemap::Low),
        other => Err(MapConfigError::UnknownStyle(other.to_string())),
    }
}

pub fn canvas_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

pub struct MapSurface<'a> {
    pub layers: &'a LayerSet,
    pub viewport: &'a Viewport,
    pub basemap: &'a Result<Basemap, MapConfigError>,
    pub theme: &'a Theme,
}

impl Surface for MapSurface<'_> {
    fn name(&self) -> &'static str {
        "map"
    }

    fn render(&self, f: &mut Frame, area: Rect) -> Result<(), SurfaceError> {
        match self.basemap {
            Ok(basemap) => self.render_canvas(f, area, *basemap),
            Err(err) => {
                render_config_error(f, area, err, self.theme);
                Ok(())
            }
        }
    }
}

impl MapSurface<'_> {
    fn render_canvas(
        &self,
        f: &mut Frame,
        area: Rect,
        basemap: Basemap,
    ) -> Result<(), SurfaceError> {
        let inner = canvas_area(area);
        let bounds = self.viewport.bounds(inner);
        if !bounds.is_finite() {
            return Err(SurfaceError::InvalidBounds);
        }
        let (cell_lat, cell_lon) = self.viewport.cell_span(inner);
        let theme = self.theme;
        let layers = self.layers;

        let hatches: Vec<(Vec<(f64, f64)>, Color)> = layers
            .zones
            .iter()
            .map(|zone| {
                (
                    hatch_points(&zone.polygon, bounds, cell_lat, cell_lon),
                    to_color(zone.fill),
                )
            })
            .collect();

        let title = format!(
            " MAP  z{:.1}  {:.3}, {:.3} ",
            self.viewport.zoom, self.viewport.center.lat, self.viewport.center.lon
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Plain)
            .border_style(Style::default().fg(theme.dim))
            .title(title);

        let canvas = Canvas::default()
            .block(block)
            .x_bounds(bounds.x)
            .y_bounds(bounds.y)
            .marker(Marker::Braille)
            .background_color(theme.panel_bg)
            .paint(|ctx| {
                ctx.draw(&Map {
                    color: theme.dim,
                    resolution: basemap.resolution(),
                });
                ctx.layer();

                for (coords, color) in &hatches {
                    if !coords.is_empty() {
                        ctx.draw(&Points {
                            coords,
                            color: *color,
                        });
                    }
                }
                for zone in &layers.zones {
                    let color = to_color(zone.stroke);
                    for (a, b) in edges(&zone.polygon) {
                        ctx.draw(&CanvasLine {
                            x1: a.lon,
                            y1: a.lat,
                            x2: b.lon,
                            y2: b.lat,
                            color,
                        });
                    }
                }
                ctx.layer();

                for label in &layers.labels {
                    let style = Style::default()
                        .fg(to_color(label.color))
                        .add_modifier(Modifier::BOLD);
                    for (row, text) in label.text.lines().enumerate() {
                        let half = text.chars().count() as f64 / 2.0;
                        ctx.print(
                            label.position.lon - half * cell_lon,
                            label.position.lat - row as f64 * cell_lat,
                            Line::styled(text.to_string(), style),
                        );
                    }
                }
                for icon in &layers.aircraft {
                    if !bounds.contains(icon.position) {
                        continue;
                    }
                    ctx.print(
                        icon.position.lon,
                        icon.position.lat,
                        Line::styled(
                            heading_glyph(icon.heading()),
                            Style::default()
                                .fg(to_color(icon.color))
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            });
        f.render_widget(canvas, area);
        Ok(())
    }
}

fn render_config_error(f: &mut Frame, area: Rect, err: &MapConfigError, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(theme.danger))
        .title(" MAP ");
    let lines = vec![
        Line::from(Span::styled(
            CONFIG_ERROR_TITLE,
            Style::default()
                .fg(theme.danger)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::raw(err.to_string())),
        Line::from(""),
        Line::from(Span::styled(
            "Telemetry and the violation log are still live.",
            Style::default().fg(theme.dim),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

pub fn to_color(c: Rgba) -> Color {
    if c.a == u8::MAX {
        return Color::Rgb(c.r, c.g, c.b);
    }
    let blend = |v: u8| ((u16::from(v) * u16::from(c.a)) / 255) as u8;
    Color::Rgb(blend(c.r), blend(c.g), blend(c.b))
}

pub fn heading_glyph(deg: f64) -> &'static str {
    let idx = ((deg.rem_euclid(360.0) + 22.5) / 45.0).floor() as i32 % 8;
    match idx {
        0 => "↑",
        1 => "↗",
        2 => "→",
        3 => "↘",
        4 => "↓",
        5 => "↙",
        6 => "←",
        _ => "↖",
    }
}

fn edges(polygon: &[GeoPoint]) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| (*a, *b))
}

fn hatch_points(
    polygon: &[GeoPoint],
    view: Bounds,
    cell_lat: f64,
    cell_lon: f64,
) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    if polygon.len() < 3 || cell_lat <= 0.0 || cell_lon <= 0.0 {
        return points;
    }
    let step_lat = cell_lat * HATCH_STRIDE;
    let step_lon = cell_lon * HATCH_STRIDE;
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in polygon {
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
        min_lon = min_lon.min(p.lon);
        max_lon = max_lon.max(p.lon);
    }
    let min_lat = min_lat.max(view.y[0]);
    let max_lat = max_lat.min(view.y[1]);
    let min_lon = min_lon.max(view.x[0]);
    let max_lon = max_lon.min(view.x[1]);
    if min_lat > max_lat || min_lon > max_lon {
        return points;
    }

    // snap to the cell grid so the hatch does not shimmer while panning
    let mut lat = (min_lat / step_lat).ceil() * step_lat;
    while lat <= max_lat {
        let mut lon = (min_lon / step_lon).ceil() * step_lon;
        while lon <= max_lon {
            if contains_point(polygon, GeoPoint::new(lat, lon)) {
                points.push((lon, lat));
            }
            lon += step_lon;
        }
        lat += step_lat;
    }
    points
}

// Even-odd ray cast.
fn contains_point(polygon: &[GeoPoint], p: GeoPoint) -> bool {
    let mut inside = false;
    for (a, b) in edges(polygon) {
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let t = (p.lat - a.lat) / (b.lat - a.lat);
            if p.lon < a.lon + t * (b.lon - a.lon) {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::{
        contains_point, heading_glyph, init_basemap, to_color, Basemap, MapConfigError, MapSurface,
        CONFIG_ERROR_TITLE, PLACEHOLDER_TOKEN,
    };
    use crate::app::ThemeMode;
    use crate::guard::{Surface, SurfaceError};
    use crate::model::{AircraftState, AlertLevel, GeoPoint};
    use crate::render::{build_layers, Rgba};
    use crate::ui::theme;
    use crate::viewport::Viewport;
    use crate::zones::ZoneCatalog;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::style::Color;
    use ratatui::Terminal;

    fn aircraft(level: AlertLevel, heading: f64) -> AircraftState {
        AircraftState {
            icao24: "a1b2c3".to_string(),
            callsign: Some("UAL1".to_string()),
            latitude: 37.75,
            longitude: -122.45,
            altitude: Some(5000.0),
            velocity: Some(200.0),
            heading: Some(heading),
            vertical_rate: None,
            on_ground: false,
            last_contact: 0.0,
            alert_level: level,
            violated_zone: level.is_alert().then(|| "sfo-class-b".to_string()),
        }
    }

    fn screen(buffer: &Buffer) -> String {
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn draw(surface: &MapSurface<'_>) -> (Buffer, Result<(), SurfaceError>) {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        let mut outcome = Ok(());
        terminal
            .draw(|f| {
                let area = f.area();
                outcome = surface.render(f, area);
            })
            .unwrap();
        (terminal.backend().buffer().clone(), outcome)
    }

    #[test]
    fn basemap_requires_real_token() {
        assert_eq!(init_basemap("", "high"), Err(MapConfigError::MissingToken));
        assert_eq!(init_basemap("   ", "high"), Err(MapConfigError::MissingToken));
        assert_eq!(
            init_basemap(PLACEHOLDER_TOKEN, "high"),
            Err(MapConfigError::PlaceholderToken)
        );
        assert_eq!(
            init_basemap("pk.real", "satellite"),
            Err(MapConfigError::UnknownStyle("satellite".to_string()))
        );
        assert_eq!(init_basemap("pk.real", "LOW"), Ok(Basemap::Low));
        assert_eq!(init_basemap("pk.real", "high"), Ok(Basemap::High));
    }

    #[test]
    fn heading_glyphs() {
        assert_eq!(heading_glyph(0.0), "↑");
        assert_eq!(heading_glyph(359.0), "↑");
        assert_eq!(heading_glyph(90.0), "→");
        assert_eq!(heading_glyph(180.0), "↓");
        assert_eq!(heading_glyph(225.0), "↙");
        assert_eq!(heading_glyph(-90.0), "←");
    }

    #[test]
    fn translucent_colors_blend_over_black() {
        assert_eq!(to_color(Rgba::rgb(255, 165, 0)), Color::Rgb(255, 165, 0));
        assert_eq!(to_color(Rgba::rgba(255, 0, 0, 50)), Color::Rgb(50, 0, 0));
    }

    #[test]
    fn ray_cast_containment() {
        let square = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 2.0),
            GeoPoint::new(2.0, 2.0),
            GeoPoint::new(2.0, 0.0),
        ];
        assert!(contains_point(&square, GeoPoint::new(1.0, 1.0)));
        assert!(!contains_point(&square, GeoPoint::new(3.0, 1.0)));
        assert!(!contains_point(&square, GeoPoint::new(1.0, -0.5)));
    }

    #[test]
    fn config_error_replaces_map() {
        let layers = build_layers(&[], &ZoneCatalog::builtin());
        let viewport = Viewport::new(37.7, -122.4, 8.0);
        let basemap = init_basemap(PLACEHOLDER_TOKEN, "high");
        let theme = theme(ThemeMode::Default);
        let surface = MapSurface {
            layers: &layers,
            viewport: &viewport,
            basemap: &basemap,
            theme: &theme,
        };
        let (buffer, outcome) = draw(&surface);
        assert!(outcome.is_ok());
        let text = screen(&buffer);
        assert!(text.contains(CONFIG_ERROR_TITLE));
        assert!(!text.contains("NO FLY ZONE"));
    }

    #[test]
    fn draws_zones_labels_and_aircraft() {
        let frame = vec![aircraft(AlertLevel::Warning, 90.0)];
        let layers = build_layers(&frame, &ZoneCatalog::builtin());
        let viewport = Viewport::new(37.65, -122.40, 8.5);
        let basemap = init_basemap("pk.test-token", "low");
        let theme = theme(ThemeMode::Default);
        let surface = MapSurface {
            layers: &layers,
            viewport: &viewport,
            basemap: &basemap,
            theme: &theme,
        };
        let (buffer, outcome) = draw(&surface);
        assert!(outcome.is_ok());
        let text = screen(&buffer);
        assert!(text.contains("NO FLY ZONE"));
        assert!(text.contains("SFO Class B"));
        let glyph = buffer
            .content()
            .iter()
            .find(|c| c.symbol() == "→")
            .expect("aircraft glyph drawn");
        assert_eq!(glyph.fg, Color::Rgb(255, 165, 0));
    }

    #[test]
    fn broken_viewport_is_a_surface_error() {
        let layers = build_layers(&[], &ZoneCatalog::builtin());
        let viewport = Viewport::new(f64::NAN, -122.4, 8.0);
        let basemap = init_basemap("pk.test-token", "high");
        let theme = theme(ThemeMode::Default);
        let surface = MapSurface {
            layers: &layers,
            viewport: &viewport,
            basemap: &basemap,
            theme: &theme,
        };
        let (_, outcome) = draw(&surface);
        assert!(matches!(outcome, Err(SurfaceError::InvalidBounds)));
    }
}
