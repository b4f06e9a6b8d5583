//! FridgeWatch - Main Entry Point
//!
//! Usage: `fridgewatch [VIEW_ADDRESS]`
//!
//! `VIEW_ADDRESS` is a device view address such as
//! `http://host/fridge.html?type=fridge&name=Kitchen&mac=AA:11`. Without
//! one the device list is shown.

use anyhow::Context;
use fridgewatch::{
    backend::{DashboardBackend, HttpDeviceApi},
    config::{ensure_app_data_dir, AppState, DashboardConfig},
    frontend::DashboardApp,
    query::DeviceQuery,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fridgewatch=debug"));

    // File logging is best effort; the console layer always runs
    let file = ensure_app_data_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir.join("logs"), "fridgewatch.log");
        tracing_appender::non_blocking(appender)
    });

    match file {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();

    tracing::info!("Starting FridgeWatch");

    let config = DashboardConfig::load_or_default();
    let app_state = AppState::load_or_default();

    let initial = std::env::args()
        .nth(1)
        .map(|address| DeviceQuery::from_address(&address));
    if let Some(query) = initial.as_ref().filter(|q| !q.has_device()) {
        tracing::warn!("View address has no mac, showing device list ({:?})", query);
    }

    let api = HttpDeviceApi::new(config.server_url()?, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let (backend, frontend) = DashboardBackend::new(config.clone(), Box::new(api));
    let backend_handle = std::thread::Builder::new()
        .name("fridgewatch-backend".into())
        .spawn(move || backend.run())
        .context("Failed to spawn backend thread")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("FridgeWatch"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "FridgeWatch",
        native_options,
        Box::new(move |cc| {
            if app_state.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }

            Ok(Box::new(DashboardApp::new(
                cc, frontend, config, app_state, initial,
            )))
        }),
    );

    // on_exit already sent Shutdown
    tracing::info!("Shutting down...");
    if backend_handle.join().is_err() {
        tracing::error!("Backend thread panicked");
    }

    result.map_err(|e| anyhow::anyhow!("eframe error: {e}"))
}
