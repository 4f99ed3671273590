use crate::config::{Config, DEFAULT_LOG_LEVEL};
use crate::guard::panic_message;
use std::fs::{self, OpenOptions};
use std::panic;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, EnvFilter};

static TERMINAL_ACTIVE: AtomicBool = AtomicBool::new(false);

// The returned guard must outlive the session or buffered lines are lost.
pub fn init(config: &Config) -> Option<WorkerGuard> {
    if !config.log_enabled {
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    // The terminal belongs to the UI, so stderr is only a last resort.
    let (writer, guard) = if config.log_file.trim().is_empty() {
        tracing_appender::non_blocking(std::io::stderr())
    } else {
        let path = Path::new(config.log_file.trim());
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = fs::create_dir_all(parent);
            }
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(_) => tracing_appender::non_blocking(std::io::stderr()),
        }
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    Some(guard)
}

pub fn set_terminal_active(active: bool) {
    TERMINAL_ACTIVE.store(active, Ordering::SeqCst);
}

// stderr is the alternate screen while the UI owns it.
fn forward_to_default_hook() -> bool {
    !TERMINAL_ACTIVE.load(Ordering::SeqCst)
}

pub fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(%location, "panic: {}", panic_message(info.payload()));
        if forward_to_default_hook() {
            previous(info);
        }
    }));
}

fn filter_directive(level: &str) -> &str {
    let level = level.trim();
    if level.is_empty() {
        DEFAULT_LOG_LEVEL
    } else {
        level
    }
}
