//! Frontend module for egui UI
//!
//! This module provides the main UI components using eframe/egui. It
//! exchanges commands and messages with the backend over crossbeam channels
//! and reads live chart data straight from the open session's shared state.
//!
//! # Pages
//!
//! - Device list ([`devices`]) - one card per device, opens a device view
//! - Device view ([`device_view`]) - config form, power and stream toggles,
//!   live chart
//!
//! # Main Types
//!
//! - [`DashboardApp`] - Main application state implementing [`eframe::App`]
//! - [`ChartView`] - Chart configuration and rendering
//! - [`DeviceViewState`] - State of the open device page

pub mod device_view;
pub mod devices;
pub mod plot;
pub mod widgets;

pub use device_view::{DeviceAction, DeviceViewState, PatchNotice};
pub use devices::{build_cards, DeviceCard};
pub use plot::{ChartFrame, ChartView};
pub use widgets::*;

use crate::backend::{BackendMessage, FrontendReceiver};
use crate::config::{AppState, DashboardConfig};
use crate::query::DeviceQuery;
use egui::{Color32, RichText};
use std::time::Duration;

/// Which page is showing
pub enum Page {
    Devices,
    Device(Box<DeviceViewState>),
}

/// Main application state for the dashboard
pub struct DashboardApp {
    frontend: FrontendReceiver,
    config: DashboardConfig,
    app_state: AppState,
    page: Page,
    cards: Vec<DeviceCard>,
    loading_devices: bool,
    last_error: Option<String>,
    backend_stopped: bool,
}

impl DashboardApp {
    /// Create the app; opens `initial` directly when given, else the device list
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: DashboardConfig,
        app_state: AppState,
        initial: Option<DeviceQuery>,
    ) -> Self {
        let mut app = Self {
            frontend,
            config,
            app_state,
            page: Page::Devices,
            cards: Vec::new(),
            loading_devices: false,
            last_error: None,
            backend_stopped: false,
        };

        app.refresh_devices();
        if let Some(query) = initial.filter(DeviceQuery::has_device) {
            app.open_device(query);
        }
        app
    }

    fn refresh_devices(&mut self) {
        self.loading_devices = true;
        self.frontend.refresh_devices();
    }

    fn open_device(&mut self, query: DeviceQuery) {
        tracing::info!("Opening device view for {}", query.mac);
        self.app_state.add_recent_device(&query);
        self.page = Page::Device(Box::new(DeviceViewState::new(
            query.clone(),
            &self.config.render,
            self.config.sync_stream_toggle,
        )));
        self.last_error = None;
        self.frontend.open_device(query);
    }

    fn close_device(&mut self) {
        self.frontend.close_device();
        self.page = Page::Devices;
        self.refresh_devices();
    }

    fn current_device(&mut self) -> Option<&mut DeviceViewState> {
        match &mut self.page {
            Page::Device(state) => Some(state.as_mut()),
            Page::Devices => None,
        }
    }

    /// Process all pending backend messages. Returns true if any arrived.
    fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            match msg {
                BackendMessage::DeviceList(devices) => {
                    self.cards = build_cards(&devices);
                    self.loading_devices = false;
                }
                BackendMessage::SessionOpened(opened) => {
                    // Stale sessions are closed by the commands already queued behind them
                    if let Some(state) = self.current_device() {
                        if state.query.mac == opened.query.mac {
                            state.attach_session(opened);
                        }
                    }
                }
                BackendMessage::SessionClosed(device) => {
                    if let Some(state) = self.current_device() {
                        if state.context().is_some_and(|c| c.device() == &device) {
                            state.detach_session();
                        }
                    }
                }
                BackendMessage::PatchResult { patch, outcome } => {
                    if let Some(state) = self.current_device() {
                        state.apply_patch_result(&patch, outcome);
                    }
                }
                BackendMessage::Error(message) => {
                    self.loading_devices = false;
                    self.last_error = Some(message);
                }
                BackendMessage::Shutdown => {
                    self.backend_stopped = true;
                }
            }
        }

        had_messages
    }

    fn handle_device_actions(&mut self, actions: Vec<DeviceAction>) {
        for action in actions {
            match action {
                DeviceAction::Patch(patch) => {
                    if let Some(state) = self.current_device() {
                        state.patch_sent();
                    }
                    self.frontend.patch_config(patch);
                }
                DeviceAction::Reconnect => self.frontend.reconnect(),
                DeviceAction::Back => self.close_device(),
            }
        }
    }

    fn render_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 8.0;
            ui.label(RichText::new(&self.config.server_url).small());

            if let Page::Device(state) = &self.page {
                if let Some(context) = state.context() {
                    let stats = context.stats();
                    ui.separator();
                    ui.label(RichText::new(format!("Frames: {}", stats.frames_received)).small());
                    ui.separator();
                    ui.label(RichText::new(format!("Drained: {}", stats.batches_drained)).small());
                }
            }

            if self.backend_stopped {
                ui.separator();
                ui.colored_label(Color32::RED, RichText::new("Backend stopped").small());
            }

            if let Some(error) = &self.last_error {
                ui.separator();
                ui.colored_label(Color32::LIGHT_RED, RichText::new(error).small());
            }
        });
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_messages = self.process_backend_messages();

        let live = matches!(&self.page, Page::Device(state) if state.is_live());
        if had_messages {
            ctx.request_repaint();
        } else if live {
            ctx.request_repaint_after(self.config.drain_interval());
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("View", |ui| {
                    if ui.button("Device list").clicked() {
                        if matches!(self.page, Page::Device(_)) {
                            self.close_device();
                        } else {
                            self.refresh_devices();
                        }
                        ui.close();
                    }
                    if ui.checkbox(&mut self.app_state.dark_mode, "Dark mode").changed() {
                        ctx.set_visuals(if self.app_state.dark_mode {
                            egui::Visuals::dark()
                        } else {
                            egui::Visuals::light()
                        });
                    }
                });

                if matches!(self.page, Page::Devices) && ui.button("⟳ Refresh").clicked() {
                    self.refresh_devices();
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.render_status_bar(ui);
        });

        let mut chosen = None;
        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| match &mut self.page {
            Page::Devices => {
                chosen = devices::render_device_list(
                    ui,
                    &self.cards,
                    &self.app_state.recent_devices,
                    self.loading_devices,
                );
            }
            Page::Device(state) => {
                actions = state.render(ui);
            }
        });

        if let Some(query) = chosen {
            self.open_device(query);
        }
        self.handle_device_actions(actions);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.shutdown();

        if !matches!(self.page, Page::Device(_)) {
            self.app_state.last_device = None;
        }
        if let Err(e) = self.app_state.save() {
            tracing::warn!("Failed to save app state: {}", e);
        }
    }
}
