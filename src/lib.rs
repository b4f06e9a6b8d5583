//! # FridgeWatch: refrigeration telemetry dashboard
//!
//! A desktop dashboard for networked refrigeration units. It lists the
//! devices known to a telemetry server, shows a device's configuration and
//! lets the operator change it, and plots live per-compartment temperature
//! readings pushed over a WebSocket channel.
//!
//! ## Architecture
//!
//! - **Backend**: A worker thread owns the HTTP client and a small tokio
//!   runtime. It runs the push-channel ingestor and the drain scheduler of
//!   the open device session.
//! - **Stream**: Incoming batches are queued in a FIFO buffer and drained at
//!   most one per tick into the chart series, only while the stream toggle is on.
//! - **Frontend**: Renders the UI using eframe/egui with egui_plot for the chart
//! - **Communication**: Crossbeam channels between UI and backend; the chart
//!   model itself is shared behind a mutex
//!
//! ## Configuration
//!
//! Settings (`config.toml`) and application state (`app_state.json`, recent
//! devices and preferences) live in the platform data directory under
//! `dev.hxyulin.fridgewatch`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.fridgewatch/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.fridgewatch/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.fridgewatch\`
//!
//! `FRIDGEWATCH_SERVER_URL` and `FRIDGEWATCH_STREAM_PORT` override the file.
//!
//! ## Example
//!
//! ```ignore
//! use fridgewatch::{
//!     backend::{DashboardBackend, HttpDeviceApi},
//!     config::{AppState, DashboardConfig},
//!     frontend::DashboardApp,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DashboardConfig::load_or_default();
//!     let api = HttpDeviceApi::new(config.server_url()?, config.request_timeout())?;
//!     let (backend, frontend) = DashboardBackend::new(config.clone(), Box::new(api));
//!     std::thread::spawn(move || backend.run());
//!
//!     eframe::run_native(
//!         "FridgeWatch",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| {
//!             Ok(Box::new(DashboardApp::new(
//!                 cc,
//!                 frontend,
//!                 config,
//!                 AppState::load_or_default(),
//!                 None,
//!             )))
//!         }),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod query;
pub mod stream;
pub mod types;

// Re-export commonly used types
pub use app::DashboardApp;
pub use backend::{BackendMessage, DashboardBackend, DashboardCommand, DeviceApi, HttpDeviceApi};
pub use config::{AppState, DashboardConfig};
pub use error::{DashboardError, Result};
pub use query::{parse_url_params, DeviceQuery, QueryParams};
pub use stream::{SessionContext, StreamSession};
pub use types::{ChartPoint, Compartment, DeviceId, ReadingBatch};
