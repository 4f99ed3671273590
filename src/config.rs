use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/flights";
pub const DEFAULT_RECONNECT_MS: u64 = 3000;
pub const MIN_RECONNECT_MS: u64 = 100;
pub const DEFAULT_ALLOW_PLAIN_WS: bool = true;
pub const DEFAULT_BASEMAP: &str = "high";
pub const DEFAULT_VIEW_LAT: f64 = 37.7;
pub const DEFAULT_VIEW_LON: f64 = -122.4;
pub const DEFAULT_VIEW_ZOOM: f64 = 8.0;
pub const DEFAULT_THEME: &str = "default";
pub const DEFAULT_UI_FPS: u64 = 20;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FILE: &str = "zeus-console.log";
pub const DEFAULT_CONFIG_FILE: &str = "zeus-console.toml";
pub const ZONES_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub reconnect_ms: u64,
    pub allow_plain_ws: bool,
    pub map_token: String,
    pub basemap: String,
    pub zones_file: String,
    pub zones_url: String,
    pub view_lat: f64,
    pub view_lon: f64,
    pub view_zoom: f64,
    pub theme: String,
    pub ui_fps: u64,
    pub log_enabled: bool,
    pub log_level: String,
    pub log_file: String,
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect_ms: DEFAULT_RECONNECT_MS,
            allow_plain_ws: DEFAULT_ALLOW_PLAIN_WS,
            map_token: String::new(),
            basemap: DEFAULT_BASEMAP.to_string(),
            zones_file: String::new(),
            zones_url: String::new(),
            view_lat: DEFAULT_VIEW_LAT,
            view_lon: DEFAULT_VIEW_LON,
            view_zoom: DEFAULT_VIEW_ZOOM,
            theme: DEFAULT_THEME.to_string(),
            ui_fps: DEFAULT_UI_FPS,
            log_enabled: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

impl Config {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    pub fn zones_url(&self) -> Option<&str> {
        non_empty(&self.zones_url)
    }

    pub fn zones_file(&self) -> Option<&Path> {
        non_empty(&self.zones_file).map(Path::new)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    url: Option<String>,
    reconnect_ms: Option<u64>,
    allow_plain_ws: Option<bool>,
    map_token: Option<String>,
    basemap: Option<String>,
    zones_file: Option<String>,
    zones_url: Option<String>,
    view_lat: Option<f64>,
    view_lon: Option<f64>,
    view_zoom: Option<f64>,
    theme: Option<String>,
    ui_fps: Option<u64>,
    log_enabled: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

pub fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_from(&args, &|key| env::var(key).ok())
}

fn parse_from(args: &[String], env_var: &dyn Fn(&str) -> Option<String>) -> Result<Config> {
    let mut explicit_config: Option<PathBuf> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--config needs a value"))?;
            explicit_config = Some(PathBuf::from(value));
        }
    }

    let env_config = env_var("ZEUS_CONFIG").map(PathBuf::from);
    let config_path = explicit_config
        .clone()
        .or(env_config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = Config::default();

    if config_path.exists() {
        if let Some(file_config) = load_file_config(&config_path)? {
            apply_file_config(&mut config, file_config);
        }
    } else if explicit_config.is_some() {
        return Err(anyhow!("Config file not found: {}", config_path.display()));
    }

    config.config_path = config_path;

    apply_env(&mut config, env_var);

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                iter.next();
            }
            "--url" => {
                config.url = next_value(&mut iter, "--url")?;
            }
            "--reconnect-ms" => {
                let ms: u64 = next_value(&mut iter, "--reconnect-ms")?.parse()?;
                config.reconnect_ms = ms.max(MIN_RECONNECT_MS);
            }
            "--allow-plain-ws" => {
                config.allow_plain_ws = true;
            }
            "--no-plain-ws" => {
                config.allow_plain_ws = false;
            }
            "--map-token" => {
                config.map_token = next_value(&mut iter, "--map-token")?;
            }
            "--basemap" => {
                config.basemap = next_value(&mut iter, "--basemap")?;
            }
            "--zones-file" => {
                config.zones_file = next_value(&mut iter, "--zones-file")?;
            }
            "--zones-url" => {
                config.zones_url = next_value(&mut iter, "--zones-url")?;
            }
            "--view-lat" => {
                config.view_lat = next_value(&mut iter, "--view-lat")?.parse()?;
            }
            "--view-lon" => {
                config.view_lon = next_value(&mut iter, "--view-lon")?.parse()?;
            }
            "--view-zoom" => {
                config.view_zoom = next_value(&mut iter, "--view-zoom")?.parse()?;
            }
            "--theme" => {
                config.theme = next_value(&mut iter, "--theme")?;
            }
            "--ui-fps" => {
                let fps: u64 = next_value(&mut iter, "--ui-fps")?.parse()?;
                config.ui_fps = fps.clamp(1, 60);
            }
            "--log" => {
                config.log_enabled = true;
            }
            "--no-log" => {
                config.log_enabled = false;
            }
            "--log-level" => {
                config.log_level = next_value(&mut iter, "--log-level")?;
            }
            "--log-file" => {
                config.log_file = next_value(&mut iter, "--log-file")?;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }

    validate(&config)?;
    Ok(config)
}

fn next_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String> {
    iter.next()
        .map(|v| v.to_string())
        .ok_or_else(|| anyhow!("{flag} needs a value"))
}

fn apply_env(config: &mut Config, env_var: &dyn Fn(&str) -> Option<String>) {
    if let Some(url) = env_var("ZEUS_URL") {
        config.url = url;
    }
    if let Some(value) = env_var("ZEUS_RECONNECT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.reconnect_ms = ms.max(MIN_RECONNECT_MS);
        }
    }
    if let Some(value) = env_var("ZEUS_ALLOW_PLAIN_WS") {
        config.allow_plain_ws = is_truthy(&value);
    }
    if let Some(value) = env_var("ZEUS_MAP_TOKEN") {
        config.map_token = value;
    }
    if let Some(value) = env_var("ZEUS_BASEMAP") {
        config.basemap = value;
    }
    if let Some(value) = env_var("ZEUS_ZONES_FILE") {
        config.zones_file = value;
    }
    if let Some(value) = env_var("ZEUS_ZONES_URL") {
        config.zones_url = value;
    }
    if let Some(value) = env_var("ZEUS_VIEW_LAT") {
        if let Ok(lat) = value.parse::<f64>() {
            config.view_lat = lat;
        }
    }
    if let Some(value) = env_var("ZEUS_VIEW_LON") {
        if let Ok(lon) = value.parse::<f64>() {
            config.view_lon = lon;
        }
    }
    if let Some(value) = env_var("ZEUS_VIEW_ZOOM") {
        if let Ok(zoom) = value.parse::<f64>() {
            config.view_zoom = zoom;
        }
    }
    if let Some(value) = env_var("ZEUS_THEME") {
        config.theme = value;
    }
    if let Some(value) = env_var("ZEUS_UI_FPS") {
        if let Ok(fps) = value.parse::<u64>() {
            config.ui_fps = fps.clamp(1, 60);
        }
    }
    if let Some(value) = env_var("ZEUS_LOG_ENABLED") {
        config.log_enabled = is_truthy(&value);
    }
    if let Some(value) = env_var("ZEUS_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = env_var("ZEUS_LOG_FILE") {
        config.log_file = value;
    }
}

fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(cfg))
}

fn apply_file_config(target: &mut Config, file: FileConfig) {
    if let Some(url) = file.url {
        target.url = url;
    }
    if let Some(ms) = file.reconnect_ms {
        target.reconnect_ms = ms.max(MIN_RECONNECT_MS);
    }
    if let Some(allow) = file.allow_plain_ws {
        target.allow_plain_ws = allow;
    }
    if let Some(token) = file.map_token {
        target.map_token = token;
    }
    if let Some(basemap) = file.basemap {
        target.basemap = basemap;
    }
    if let Some(zones_file) = file.zones_file {
        target.zones_file = zones_file;
    }
    if let Some(zones_url) = file.zones_url {
        target.zones_url = zones_url;
    }
    if let Some(lat) = file.view_lat {
        target.view_lat = lat;
    }
    if let Some(lon) = file.view_lon {
        target.view_lon = lon;
    }
    if let Some(zoom) = file.view_zoom {
        target.view_zoom = zoom;
    }
    if let Some(theme) = file.theme {
        target.theme = theme;
    }
    if let Some(fps) = file.ui_fps {
        target.ui_fps = fps.clamp(1, 60);
    }
    if let Some(enabled) = file.log_enabled {
        target.log_enabled = enabled;
    }
    if let Some(level) = file.log_level {
        target.log_level = level;
    }
    if let Some(file_path) = file.log_file {
        target.log_file = file_path;
    }
}

fn print_help() {
    println!("zeus-console");
    println!("Usage: zeus-console [--url WS_URL] [--reconnect-ms MS] [--config PATH]");
    println!("       [--allow-plain-ws] [--no-plain-ws]");
    println!("       [--map-token TOKEN] [--basemap high|low]");
    println!("       [--zones-file PATH] [--zones-url URL]");
    println!("       [--view-lat LAT] [--view-lon LON] [--view-zoom ZOOM]");
    println!("       [--theme default|amber|ocean] [--ui-fps FPS]");
    println!("       [--log] [--no-log] [--log-level LEVEL] [--log-file PATH]");
    println!("Environment: ZEUS_URL overrides the stream URL");
    println!("Environment: ZEUS_RECONNECT_MS sets the fixed reconnect delay");
    println!("Environment: ZEUS_ALLOW_PLAIN_WS=0 refuses unencrypted ws:// URLs");
    println!("Environment: ZEUS_MAP_TOKEN/ZEUS_BASEMAP configure the map surface");
    println!("Environment: ZEUS_ZONES_FILE/ZEUS_ZONES_URL select the restricted zone source");
    println!("Environment: ZEUS_VIEW_LAT/LON/ZOOM set the initial view");
    println!("Environment: ZEUS_THEME ZEUS_UI_FPS control the display");
    println!("Environment: ZEUS_LOG_ENABLED/LEVEL/FILE configure logging");
    println!("Environment: ZEUS_CONFIG overrides config path");
    println!("Keys: q quit | arrows pan | +/- zoom | 0 reset view | t theme | ? help");
    println!("Mouse: drag to pan | scroll to zoom | hover an aircraft for details");
}

fn validate(config: &Config) -> Result<()> {
    validate_stream_url(&config.url, config.allow_plain_ws)?;
    if let Some(url) = config.zones_url() {
        let lower = url.to_ascii_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return Err(anyhow!("Zones URL must use http:// or https://: {url}"));
        }
    }
    if !config.view_lat.is_finite() || config.view_lat.abs() > 90.0 {
        return Err(anyhow!("view_lat out of range: {}", config.view_lat));
    }
    if !config.view_lon.is_finite() || config.view_lon.abs() > 180.0 {
        return Err(anyhow!("view_lon out of range: {}", config.view_lon));
    }
    if !config.view_zoom.is_finite() {
        return Err(anyhow!("view_zoom must be a number"));
    }
    Ok(())
}

fn validate_stream_url(url: &str, allow_plain_ws: bool) -> Result<()> {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("wss://") {
        return Ok(());
    }
    if lower.starts_with("ws://") {
        if allow_plain_ws {
            return Ok(());
        }
        return Err(anyhow!(
            "Refusing plain ws:// stream URL (set allow_plain_ws=true or ZEUS_ALLOW_PLAIN_WS=1 to override)"
        ));
    }
    Err(anyhow!("Stream URL must use ws:// or wss://: {url}"))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
