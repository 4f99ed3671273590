mod app;
mod config;
mod guard;
mod logging;
mod map;
mod model;
mod render;
mod runtime;
mod store;
mod stream;
mod ui;
mod viewport;
mod zones;

use anyhow::{anyhow, Result};
use std::panic::{self, AssertUnwindSafe};

use app::{App, ThemeMode};
use config::{parse_args, ZONES_FETCH_TIMEOUT};
use guard::panic_message;
use logging::{init as init_logging, install_panic_hook};
use map::init_basemap;
use runtime::{init_terminal, restore_terminal, run_app};
use stream::{StreamClient, StreamConfig};
use tracing::{debug, info, warn};
use viewport::Viewport;
use zones::ZoneCatalog;

fn main() -> Result<()> {
    let config = parse_args()?;
    let _log_guard = init_logging(&config);
    install_panic_hook();
    info!("zeus-console starting");
    debug!("config path: {}", config.config_path.display());

    let catalog = ZoneCatalog::resolve_or_builtin(
        config.zones_url(),
        config.zones_file(),
        ZONES_FETCH_TIMEOUT,
    );
    if catalog.is_empty() {
        warn!("no restricted zones configured");
    } else {
        info!("{} restricted zones loaded", catalog.len());
    }

    let basemap = init_basemap(&config.map_token, &config.basemap);
    if let Err(err) = &basemap {
        warn!("map surface disabled: {err}");
    }

    let app = App::new(
        config.url.clone(),
        catalog,
        Viewport::new(config.view_lat, config.view_lon, config.view_zoom),
        basemap,
        ThemeMode::from_str(&config.theme),
    );
    let (client, events) = StreamClient::new(StreamConfig::new(
        config.url.clone(),
        config.reconnect_delay(),
    ));

    // Built after the zone fetch: blocking reqwest refuses to run inside a runtime.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut terminal = init_terminal()?;
    let res = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(run_app(&mut terminal, app, client, events, config.ui_fps))
    }))
    .unwrap_or_else(|payload| {
        Err(anyhow!(
            "console panicked: {}",
            panic_message(payload.as_ref())
        ))
    });
    restore_terminal(&mut terminal)?;

    if let Err(err) = res {
        warn!("runtime error: {err}");
        eprintln!("{err}");
    }

    info!("zeus-console exited");
    Ok(())
}
