//! Configuration module for FridgeWatch
//!
//! This module handles application configuration including:
//! - Dashboard configuration (server address, stream port, drain cadence)
//! - Application state persistence (recent devices, preferences)
//! - Runtime settings during execution
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.hxyulin.fridgewatch/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.fridgewatch/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.fridgewatch\`
//!
//! # Files
//!
//! - `config.toml` - Dashboard configuration (optional, defaults apply)
//! - `app_state.json` - Recent devices and UI preferences
//! - `logs/` - Daily rolling log files
//!
//! # Environment
//!
//! - `FRIDGEWATCH_CONFIG` - Path of the configuration file to load instead
//! - `FRIDGEWATCH_SERVER_URL` - Overrides `server_url`
//! - `FRIDGEWATCH_STREAM_PORT` - Overrides `stream_port`

pub mod settings;

pub use settings::*;

use crate::error::{DashboardError, Result};
use crate::query::DeviceQuery;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use url::Url;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.fridgewatch";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Dashboard configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// Maximum number of recent devices to remember
pub const MAX_RECENT_DEVICES: usize = 10;

/// Default device server address
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3301";

/// Default push-channel port
pub const DEFAULT_STREAM_PORT: u16 = 3546;

/// Default drain cadence in milliseconds
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 50;

/// Default timeout for request/response calls in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Default limit for opening the push channel in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

pub const ENV_CONFIG_PATH: &str = "FRIDGEWATCH_CONFIG";
pub const ENV_SERVER_URL: &str = "FRIDGEWATCH_SERVER_URL";
pub const ENV_STREAM_PORT: &str = "FRIDGEWATCH_STREAM_PORT";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        DashboardError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            DashboardError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Resolve the configuration file path (`FRIDGEWATCH_CONFIG` wins)
pub fn config_path() -> Option<PathBuf> {
    non_empty_env(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .or_else(|| app_data_dir().map(|p| p.join(CONFIG_FILE)))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// ==================== Dashboard Config ====================

/// Chart rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Plot line width in pixels
    pub line_width: f32,

    /// Show legend on the chart
    pub show_legend: bool,

    /// Show grid on the chart
    pub show_grid: bool,

    /// Range window selected when a device view opens
    pub default_range: RangeWindow,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            line_width: 1.5,
            show_legend: true,
            show_grid: true,
            default_range: RangeWindow::OneMinute,
        }
    }
}

/// Dashboard configuration loaded from `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base address of the device server (request/response calls)
    pub server_url: String,

    /// Port of the push channel on the server host
    pub stream_port: u16,

    /// Drain cadence in milliseconds
    pub drain_interval_ms: u64,

    /// Maximum buffered batches per session; absent means unbounded
    pub buffer_capacity: Option<usize>,

    /// Mirror stream toggle changes to the device's `streamOn` setting
    pub sync_stream_toggle: bool,

    /// Timeout for request/response calls in milliseconds
    pub request_timeout_ms: u64,

    /// Limit for the push-channel connect and handshake in milliseconds
    pub connect_timeout_ms: u64,

    /// Chart rendering options
    pub render: RenderConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            stream_port: DEFAULT_STREAM_PORT,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            buffer_capacity: None,
            sync_stream_toggle: false,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            render: RenderConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DashboardError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from the resolved config path and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load, falling back to defaults (with env overrides) on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            let mut config = Self::default();
            if let Err(e) = config.apply_env_overrides() {
                tracing::warn!("Ignoring environment overrides: {}", e);
            }
            config
        })
    }

    /// Apply `FRIDGEWATCH_SERVER_URL` and `FRIDGEWATCH_STREAM_PORT`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(port) = non_empty_env(ENV_STREAM_PORT) {
            self.stream_port = port.parse().map_err(|e| {
                DashboardError::Config(format!("{}={:?} is not a port: {}", ENV_STREAM_PORT, port, e))
            })?;
        }
        self.validate()
    }

    /// Check the values that cannot be defaulted silently
    pub fn validate(&self) -> Result<()> {
        self.server_url()?;
        if self.stream_port == 0 {
            return Err(DashboardError::Config("stream_port must not be 0".to_string()));
        }
        if self.drain_interval_ms == 0 {
            return Err(DashboardError::Config(
                "drain_interval_ms must be positive".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(DashboardError::Config(
                "connect_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed server address
    pub fn server_url(&self) -> Result<Url> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| DashboardError::Config(format!("server_url {:?}: {}", self.server_url, e)))?;
        if url.host_str().is_none() {
            return Err(DashboardError::Config(format!(
                "server_url {:?} has no host",
                self.server_url
            )));
        }
        Ok(url)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ==================== Recent Device Entry ====================

/// A device the operator opened before
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentDevice {
    pub mac: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub name: String,
    /// Last opened timestamp (Unix seconds)
    #[serde(default)]
    pub last_opened: u64,
}

impl RecentDevice {
    pub fn from_query(query: &DeviceQuery) -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            mac: query.mac.to_string(),
            device_type: query.device_type.clone(),
            name: query.name.clone(),
            last_opened: now,
        }
    }

    pub fn to_query(&self) -> DeviceQuery {
        DeviceQuery::new(self.mac.clone(), self.device_type.clone(), self.name.clone())
    }

    /// Label for menus: name if known, otherwise the MAC
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.mac
        } else {
            &self.name
        }
    }
}

// ==================== App State ====================

/// Persistent application state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Recently opened devices, newest first
    #[serde(default)]
    pub recent_devices: Vec<RecentDevice>,

    /// Device that was open when the app last closed
    #[serde(default)]
    pub last_device: Option<RecentDevice>,

    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

fn default_app_state_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            recent_devices: Vec::new(),
            last_device: None,
            dark_mode: true,
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            DashboardError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from a file; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| DashboardError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| DashboardError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DashboardError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Record a device as opened, moving it to the front of the recents
    pub fn add_recent_device(&mut self, query: &DeviceQuery) {
        let entry = RecentDevice::from_query(query);
        self.recent_devices.retain(|d| d.mac != entry.mac);
        self.recent_devices.insert(0, entry.clone());
        self.recent_devices.truncate(MAX_RECENT_DEVICES);
        self.last_device = Some(entry);
    }

    pub fn remove_recent_device(&mut self, mac: &str) {
        self.recent_devices.retain(|d| d.mac != mac);
        if self.last_device.as_ref().is_some_and(|d| d.mac == mac) {
            self.last_device = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_dashboard_config_default() {
        let config = DashboardConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:3301");
        assert_eq!(config.stream_port, 3546);
        assert_eq!(config.drain_interval(), Duration::from_millis(50));
        assert_eq!(config.buffer_capacity, None);
        assert!(!config.sync_stream_toggle);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = DashboardConfig::from_toml_str(
            r#"
            server_url = "http://fridges.local:8080"
            buffer_capacity = 500

            [render]
            default_range = "FiveMinutes"
            "#,
        )
        .unwrap();
        assert_eq!(config.server_url().unwrap().host_str(), Some("fridges.local"));
        assert_eq!(config.buffer_capacity, Some(500));
        assert_eq!(config.stream_port, DEFAULT_STREAM_PORT);
        assert_eq!(config.render.default_range, RangeWindow::FiveMinutes);
        assert!(config.render.show_legend);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(DashboardConfig::from_toml_str("server_url = \"not a url\"").is_err());
        assert!(DashboardConfig::from_toml_str("drain_interval_ms = 0").is_err());
        assert!(DashboardConfig::from_toml_str("connect_timeout_ms = 0").is_err());
        assert!(DashboardConfig::from_toml_str("stream_port = \"x\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stream_port = 4000\nsync_stream_toggle = true").unwrap();

        let config = DashboardConfig::load_from(file.path()).unwrap();
        assert_eq!(config.stream_port, 4000);
        assert!(config.sync_stream_toggle);
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.stream_port, DEFAULT_STREAM_PORT);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "server_url = \"http://from-file:3301\"\nstream_port = 4000\n").unwrap();

        std::env::set_var(ENV_CONFIG_PATH, &path);
        std::env::set_var(ENV_SERVER_URL, "http://from-env:9000");
        std::env::set_var(ENV_STREAM_PORT, "4100");
        let config = DashboardConfig::load();
        std::env::remove_var(ENV_CONFIG_PATH);
        std::env::remove_var(ENV_SERVER_URL);
        std::env::remove_var(ENV_STREAM_PORT);

        let config = config.unwrap();
        assert_eq!(config.server_url, "http://from-env:9000");
        assert_eq!(config.stream_port, 4100);
    }

    #[test]
    #[serial]
    fn test_bad_env_port_rejected() {
        std::env::set_var(ENV_STREAM_PORT, "ninety");
        let mut config = DashboardConfig::default();
        let result = config.apply_env_overrides();
        std::env::remove_var(ENV_STREAM_PORT);
        assert!(result.is_err());
    }

    #[test]
    fn test_app_state_default() {
        let state = AppState::default();
        assert!(state.recent_devices.is_empty());
        assert!(state.last_device.is_none());
        assert!(state.dark_mode);
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_add_recent_device() {
        let mut state = AppState::default();
        state.add_recent_device(&DeviceQuery::new("AA:11", "fridge", "kitchen"));
        state.add_recent_device(&DeviceQuery::new("BB:22", "fridge", ""));
        assert_eq!(state.recent_devices[0].mac, "BB:22");
        assert_eq!(state.recent_devices[0].display_name(), "BB:22");

        // Reopening moves to the front without duplicating
        state.add_recent_device(&DeviceQuery::new("AA:11", "fridge", "kitchen"));
        assert_eq!(state.recent_devices.len(), 2);
        assert_eq!(state.recent_devices[0].display_name(), "kitchen");
        assert_eq!(state.last_device.as_ref().unwrap().mac, "AA:11");

        state.remove_recent_device("AA:11");
        assert!(state.last_device.is_none());
        assert_eq!(state.recent_devices.len(), 1);
    }

    #[test]
    fn test_recent_devices_max_limit() {
        let mut state = AppState::default();
        for i in 0..15 {
            state.add_recent_device(&DeviceQuery::new(format!("AA:{:02}", i), "fridge", ""));
        }
        assert_eq!(state.recent_devices.len(), MAX_RECENT_DEVICES);
        assert_eq!(state.recent_devices[0].mac, "AA:14");
    }

    #[test]
    fn test_app_state_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_STATE_FILE);

        let mut state = AppState::default();
        state.dark_mode = false;
        state.add_recent_device(&DeviceQuery::new("AA:11", "fridge", "kitchen"));
        state.save_to(&path).unwrap();

        let loaded = AppState::load_from(&path).unwrap();
        assert!(!loaded.dark_mode);
        assert_eq!(loaded.recent_devices[0].to_query(), DeviceQuery::new("AA:11", "fridge", "kitchen"));
    }
}
