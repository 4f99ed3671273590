use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::app::{App, InputMode};
use crate::logging::set_terminal_active;
use crate::stream::{StreamClient, StreamEvent};
use crate::ui;

pub fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    set_terminal_active(true);
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    set_terminal_active(false);
    terminal.show_cursor()?;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Redraw,
    Quit,
}

pub async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
    mut client: StreamClient,
    mut events: Receiver<StreamEvent>,
    ui_fps: u64,
) -> Result<()> {
    let frame_ms = 1000 / ui_fps.clamp(1, 60);
    let mut tick = interval(Duration::from_millis(frame_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    client.connect();
    info!("streaming from {}", client.url());
    terminal.draw(|f| ui::ui(f, &mut app))?;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                app.apply_event(event);
                terminal.draw(|f| ui::ui(f, &mut app))?;
            }
            _ = tick.tick() => {
                let mut redraw = false;
                while event::poll(Duration::ZERO)? {
                    match handle_event(&mut app, event::read()?) {
                        Flow::Quit => {
                            debug!("quit requested");
                            client.shutdown();
                            return Ok(());
                        }
                        Flow::Redraw => redraw = true,
                        Flow::Continue => {}
                    }
                }
                if redraw {
                    terminal.draw(|f| ui::ui(f, &mut app))?;
                }
            }
        }
    }
}

pub fn handle_event(app: &mut App, event: Event) -> Flow {
    match event {
        Event::Key(key) => handle_key(app, key),
        Event::Mouse(mouse) => handle_mouse(app, mouse),
        Event::Resize(_, _) => Flow::Redraw,
        _ => Flow::Continue,
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Flow {
    if key.kind != KeyEventKind::Press {
        return Flow::Continue;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Quit;
    }
    match app.input_mode {
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Up => app.pan(1, 0),
            KeyCode::Down => app.pan(-1, 0),
            KeyCode::Left => app.pan(0, -1),
            KeyCode::Right => app.pan(0, 1),
            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
            KeyCode::Char('0') => app.reset_view(),
            KeyCode::Char('t') => app.toggle_theme(),
            KeyCode::Char('?') | KeyCode::Char('h') => app.open_help(),
            KeyCode::Esc => app.clear_hover(),
            _ => return Flow::Continue,
        },
        InputMode::Help => match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') => app.close_help(),
            _ => return Flow::Continue,
        },
    }
    Flow::Redraw
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) -> Flow {
    if app.input_mode != InputMode::Normal {
        return Flow::Continue;
    }
    match mouse.kind {
        MouseEventKind::Moved => app.hover_at(mouse.column, mouse.row),
        MouseEventKind::ScrollUp => app.zoom_in(),
        MouseEventKind::ScrollDown => app.zoom_out(),
        MouseEventKind::Down(MouseButton::Left) => app.start_drag(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.drag_to(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => return Flow::Continue,
    }
    Flow::Redraw
}
