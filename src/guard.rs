use std::panic::{self, AssertUnwindSafe};

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use thiserror::Error;
use tracing::error;

pub const FALLBACK_TITLE: &str = "Something went wrong.";

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("viewport bounds are not finite")]
    InvalidBounds,

    #[error("render panicked: {0}")]
    Panicked(String),
}

pub trait Surface {
    fn name(&self) -> &'static str;

    fn render(&self, f: &mut Frame, area: Rect) -> Result<(), SurfaceError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultLatch {
    failure: Option<String>,
}

impl FaultLatch {
    pub fn is_tripped(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn trip(&mut self, message: String) {
        self.failure = Some(message);
    }
}

pub struct Supervised<'a, S> {
    surface: S,
    latch: &'a mut FaultLatch,
}

impl<'a, S: Surface> Supervised<'a, S> {
    pub fn new(surface: S, latch: &'a mut FaultLatch) -> Self {
        Self { surface, latch }
    }

    pub fn render(self, f: &mut Frame, area: Rect) {
        if let Some(message) = self.latch.failure() {
            render_fallback(f, area, self.surface.name(), message);
            return;
        }

        let surface = &self.surface;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| surface.render(f, area)))
            .unwrap_or_else(|payload| {
                Err(SurfaceError::Panicked(panic_message(payload.as_ref())))
            });

        if let Err(err) = outcome {
            error!("{} surface failed: {err}", self.surface.name());
            let message = err.to_string();
            render_fallback(f, area, self.surface.name(), &message);
            self.latch.trip(message);
        }
    }
}

pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn render_fallback(f: &mut Frame, area: Rect, name: &str, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(Color::Red))
        .title(name.to_uppercase());
    let lines = vec![
        Line::from(Span::styled(
            FALLBACK_TITLE,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(
            "Check the log for more details.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}
