use chrono::{DateTime, Local};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, InputMode, ThemeMode};
use crate::guard::Supervised;
use crate::map::{canvas_area, to_color, MapSurface};
use crate::model::AlertLevel;
use crate::render::{aircraft_color, zone_color, Tooltip};

const SIDEBAR_WIDTH: u16 = 40;
pub const EMPTY_LOG: &str = "No active airspace violations.";

pub struct Theme {
    pub accent: Color,
    pub ok: Color,
    pub danger: Color,
    pub dim: Color,
    pub text: Color,
    pub header_bg: Color,
    pub panel_bg: Color,
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let size = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(1)])
        .split(size);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[0]);

    render_sidebar(f, body[0], app);
    render_map(f, body[1], app);
    render_footer(f, chunks[1], app);

    if let Some((hover, tip)) = app.tooltip() {
        render_tooltip(f, body[1], hover.col, hover.row, &tip, app.theme_mode);
    }

    if app.input_mode == InputMode::Help {
        render_help_menu(f, size, app);
    }
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &App) {
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(3),
        ])
        .split(area);

    render_header(f, side[0], app);
    render_counters(f, side[1], app);
    render_legend(f, side[2], app);
    render_violations(f, side[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let link = app.link();
    let (dot, badge_color) = if link.is_online() {
        ("●", theme.ok)
    } else {
        ("○", theme.danger)
    };
    let badge = format!("{dot} {}", link.label());

    let frame_time = app
        .snapshot()
        .timestamp
        .and_then(format_epoch)
        .unwrap_or_else(|| "--".to_string());

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "ZEUS://SYSTEM",
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                badge,
                Style::default().fg(badge_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("SRC ", Style::default().fg(theme.dim)),
            Span::styled(short_source(&app.url), Style::default().fg(theme.text)),
        ]),
        Line::from(vec![
            Span::styled("FRAME ", Style::default().fg(theme.dim)),
            Span::styled(frame_time, Style::default().fg(theme.text)),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme.dim));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.header_bg));
    f.render_widget(paragraph, area);
}

fn render_counters(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let alerts = app.alert_count();
    let alert_style = if alerts > 0 {
        Style::default().fg(theme.danger).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.dim)
    };
    counter(
        f,
        cols[0],
        "Monitored",
        app.aircraft_count(),
        Style::default().fg(theme.ok),
        &theme,
    );
    counter(f, cols[1], "Violations", alerts, alert_style, &theme);
}

fn counter(
    f: &mut Frame,
    area: Rect,
    label: &str,
    value: usize,
    value_style: Style,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.dim))
        .title(Span::styled(label.to_uppercase(), Style::default().fg(theme.dim)));
    let paragraph = Paragraph::new(Line::from(Span::styled(
        value.to_string(),
        value_style.add_modifier(Modifier::BOLD),
    )))
    .block(block)
    .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_legend(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let lines: Vec<Line> = legend_items()
        .into_iter()
        .map(|(swatch, color, label)| {
            Line::from(vec![
                Span::styled(format!("{swatch} "), Style::default().fg(color)),
                Span::styled(label, Style::default().fg(theme.text)),
            ])
        })
        .collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(theme.dim))
        .title("MAP LEGEND");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn legend_items() -> Vec<(&'static str, Color, &'static str)> {
    vec![
        ("●", to_color(aircraft_color(AlertLevel::None)), "Authorized Aircraft (Safe)"),
        ("●", to_color(aircraft_color(AlertLevel::Warning)), "Approaching Zone (Warning)"),
        ("●", to_color(aircraft_color(AlertLevel::Critical)), "Zone Violation (Critical)"),
        ("□", to_color(zone_color(AlertLevel::Critical)), "Restricted Airspace"),
    ]
}

fn render_violations(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let log = app.alert_log();
    let mut lines = Vec::with_capacity(log.len() * 3);
    if log.is_empty() {
        lines.push(Line::from(Span::styled(
            EMPTY_LOG,
            Style::default().fg(theme.dim).add_modifier(Modifier::ITALIC),
        )));
    }
    for entry in &log {
        let level_color = to_color(aircraft_color(entry.level));
        lines.push(Line::from(vec![
            Span::styled(
                entry.display_name.to_string(),
                Style::default().fg(level_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(entry.level.label(), Style::default().fg(level_color)),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  In Zone: ", Style::default().fg(theme.dim)),
            Span::styled(entry.zone_name.to_string(), Style::default().fg(theme.text)),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(theme.dim))
        .title("VIOLATION LOG");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_map(f: &mut Frame, area: Rect, app: &mut App) {
    app.set_map_area(canvas_area(area));
    let theme = theme(app.theme_mode);
    let (layers, viewport, basemap, latch) = app.map_parts();
    let surface = MapSurface {
        layers,
        viewport,
        basemap,
        theme: &theme,
    };
    Supervised::new(surface, latch).render(f, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let help = "q quit  ←↑↓→ pan  +/- zoom  0 reset  t theme  ? help";
    let spans = vec![
        Span::styled(help, Style::default().fg(theme.dim)),
        Span::raw("  "),
        Span::styled(
            format!("THEME {}", app.theme_mode.label()),
            Style::default().fg(theme.accent),
        ),
        Span::raw("  "),
        Span::styled(
            format!("ZONES {}", app.catalog().active().count()),
            Style::default().fg(theme.dim),
        ),
    ];
    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_tooltip(f: &mut Frame, bounds: Rect, col: u16, row: u16, tip: &Tooltip, mode: ThemeMode) {
    let theme = theme(mode);
    let mut lines = vec![Line::from(Span::styled(
        tip.title.clone(),
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD),
    ))];
    for line in &tip.lines {
        lines.push(Line::from(Span::styled(
            line.clone(),
            Style::default().fg(theme.text),
        )));
    }
    if let Some(alert) = &tip.alert {
        lines.push(Line::from(Span::styled(
            alert.clone(),
            Style::default()
                .fg(theme.danger)
                .add_modifier(Modifier::BOLD),
        )));
    }

    let width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16 + 4;
    let height = lines.len() as u16 + 2;
    let popup = tooltip_rect(bounds, col, row, width, height);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.dim));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.header_bg));
    f.render_widget(paragraph, popup);
}

fn tooltip_rect(bounds: Rect, col: u16, row: u16, width: u16, height: u16) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let right = bounds.x + bounds.width;
    let bottom = bounds.y + bounds.height;
    let x = if col + 2 + width <= right {
        col + 2
    } else {
        col.saturating_sub(width + 1).max(bounds.x)
    };
    let y = if row + 1 + height <= bottom {
        row + 1
    } else {
        row.saturating_sub(height).max(bounds.y)
    };
    Rect::new(x, y, width, height)
}

fn render_help_menu(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let popup = centered_rect(70, 22, area);

    f.render_widget(Clear, popup);

    let lines = vec![
        Line::from(Span::styled(
            "About Zeus Monitor",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from("Live aircraft positions with restricted airspace alerts."),
        Line::from("Green aircraft are safe. Orange ones are approaching a zone,"),
        Line::from("red ones have violated one and appear in the violation log."),
        Line::from(""),
        Line::from(Span::styled(
            "Map",
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        )),
        Line::from("  ←↑↓→       Pan"),
        Line::from("  + / -      Zoom in / out"),
        Line::from("  0          Reset view"),
        Line::from("  Mouse      Drag to pan • Scroll to zoom • Hover for details"),
        Line::from(""),
        Line::from(Span::styled(
            "Display",
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        )),
        Line::from("  t          Toggle theme"),
        Line::from(""),
        Line::from(Span::styled(
            "Quit",
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        )),
        Line::from("  q          Quit"),
        Line::from("  ? / h      Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc to close",
            Style::default().fg(theme.dim),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("HELP");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height.saturating_sub(2)).max(3);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(height),
            Constraint::Min(1),
        ])
        .split(area);
    let vertical = popup_layout[1];
    let width = (vertical.width * percent_x / 100).max(20);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(width),
            Constraint::Min(1),
        ])
        .split(vertical);
    horizontal[1]
}

fn format_epoch(ts: f64) -> Option<String> {
    if !ts.is_finite() {
        return None;
    }
    let secs = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1e9) as u32;
    let dt = DateTime::from_timestamp(secs, nanos)?;
    Some(dt.with_timezone(&Local).format("%H:%M:%S").to_string())
}

fn short_source(url: &str) -> String {
    let trimmed = url
        .trim_start_matches("wss://")
        .trim_start_matches("ws://");
    if trimmed.chars().count() > 30 {
        let mut out: String = trimmed.chars().take(29).collect();
        out.push('…');
        out
    } else {
        trimmed.to_string()
    }
}

pub fn theme(mode: ThemeMode) -> Theme {
    match mode {
        ThemeMode::Default => Theme {
            accent: Color::Rgb(0, 200, 255),
            ok: Color::Green,
            danger: Color::Red,
            dim: Color::DarkGray,
            text: Color::Gray,
            header_bg: Color::Rgb(24, 24, 28),
            panel_bg: Color::Rgb(18, 18, 22),
        },
        ThemeMode::Amber => Theme {
            accent: Color::Rgb(255, 191, 0),
            ok: Color::Rgb(255, 220, 120),
            danger: Color::LightRed,
            dim: Color::Rgb(140, 110, 40),
            text: Color::Rgb(230, 200, 140),
            header_bg: Color::Rgb(32, 24, 14),
            panel_bg: Color::Rgb(24, 18, 10),
        },
        ThemeMode::Ocean => Theme {
            accent: Color::Rgb(0, 200, 220),
            ok: Color::LightGreen,
            danger: Color::LightRed,
            dim: Color::Rgb(80, 120, 130),
            text: Color::Rgb(180, 210, 220),
            header_bg: Color::Rgb(12, 24, 30),
            panel_bg: Color::Rgb(10, 18, 24),
        },
    }
}
