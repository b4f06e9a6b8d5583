//! Device page
//!
//! Shows the device metadata, the configuration form (sampling and report
//! frequency with an Update button), the power switch, the stream toggle and
//! the live chart.
//!
//! Configuration is server owned. The local copy changes only after the
//! server confirms a patch; a rejected or failed patch leaves it untouched.

use crate::backend::OpenedSession;
use crate::config::{RenderConfig, RuntimeSettings};
use crate::frontend::plot::{ChartFrame, ChartView};
use crate::frontend::widgets::{OnOffButton, StatusIndicator, ValueDisplay};
use crate::query::DeviceQuery;
use crate::stream::{SessionContext, ToggleControl};
use crate::types::{Compartment, ConfigPatch, DeviceConfig, DeviceMeta, PatchOutcome};
use egui::{Color32, RichText, Ui};

/// Message shown after a configuration update
pub const DELIVERED_NOTICE: &str = "Data have been delivered!";

/// What the page asks the app to do
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    Patch(ConfigPatch),
    Reconnect,
    Back,
}

/// Outcome banner for the last configuration update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchNotice {
    Delivered,
    Rejected(String),
    Failed(String),
}

impl PatchNotice {
    pub fn text(&self) -> String {
        match self {
            PatchNotice::Delivered => DELIVERED_NOTICE.to_string(),
            PatchNotice::Rejected(body) => body.clone(),
            PatchNotice::Failed(reason) => format!("Update failed: {}", reason),
        }
    }

    fn color(&self) -> Color32 {
        match self {
            PatchNotice::Delivered => Color32::from_rgb(100, 200, 100),
            PatchNotice::Rejected(_) => Color32::from_rgb(230, 160, 60),
            PatchNotice::Failed(_) => Color32::LIGHT_RED,
        }
    }
}

/// Parse a frequency field; must be a positive integer
pub fn parse_frequency(field: &str, input: &str) -> Result<i64, String> {
    match input.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(format!("{} must be positive", field)),
        Err(_) => Err(format!("{} must be a whole number", field)),
    }
}

/// UI state of one open device
pub struct DeviceViewState {
    pub query: DeviceQuery,
    context: Option<SessionContext>,
    toggle: Option<ToggleControl>,
    pub meta: Option<DeviceMeta>,
    pub config: Option<DeviceConfig>,
    pub collect_freq_input: String,
    pub send_freq_input: String,
    pub form_error: Option<String>,
    pub notice: Option<PatchNotice>,
    pending_patches: usize,
    settings: RuntimeSettings,
    chart_view: ChartView,
    sync_stream_toggle: bool,
}

impl DeviceViewState {
    /// State for a device whose session is still being opened
    pub fn new(query: DeviceQuery, render: &RenderConfig, sync_stream_toggle: bool) -> Self {
        Self {
            query,
            context: None,
            toggle: None,
            meta: None,
            config: None,
            collect_freq_input: String::new(),
            send_freq_input: String::new(),
            form_error: None,
            notice: None,
            pending_patches: 0,
            settings: RuntimeSettings::with_range(render.default_range),
            chart_view: ChartView::from_config(render),
            sync_stream_toggle,
        }
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Whether the session is live and the chart needs regular repaints
    pub fn is_live(&self) -> bool {
        self.context.is_some()
    }

    /// Adopt a freshly opened session (also after Reconnect)
    pub fn attach_session(&mut self, opened: OpenedSession) {
        self.toggle = Some(ToggleControl::new(
            opened.context.toggle().clone(),
            opened.context.device().clone(),
            self.sync_stream_toggle,
        ));
        self.context = Some(opened.context);
        self.query = opened.query;
        if let Some(meta) = opened.meta {
            self.meta = Some(meta);
        }
        if let Some(config) = opened.config {
            self.set_config(config);
        }
    }

    pub fn detach_session(&mut self) {
        self.context = None;
        self.toggle = None;
    }

    fn set_config(&mut self, config: DeviceConfig) {
        self.collect_freq_input = config.collect_freq.to_string();
        self.send_freq_input = config.send_freq.to_string();
        self.config = Some(config);
    }

    /// Validate the form and build the frequency patch
    pub fn frequency_patch(&self) -> Result<ConfigPatch, String> {
        let collect = parse_frequency("Collect frequency", &self.collect_freq_input)?;
        let send = parse_frequency("Send frequency", &self.send_freq_input)?;
        Ok(ConfigPatch::frequencies(&self.query.mac, collect, send))
    }

    /// Patch that flips the device's power state, if its config is known
    pub fn power_patch(&self) -> Option<ConfigPatch> {
        self.config
            .as_ref()
            .map(|c| ConfigPatch::turned_on(&self.query.mac, !c.turned_on))
    }

    pub fn patch_sent(&mut self) {
        self.pending_patches += 1;
        self.notice = None;
    }

    /// Record a patch outcome; only a delivered patch changes the local config
    pub fn apply_patch_result(&mut self, patch: &ConfigPatch, outcome: PatchOutcome) {
        self.pending_patches = self.pending_patches.saturating_sub(1);
        if patch.mac != self.query.mac.as_str() {
            return;
        }
        self.notice = Some(match outcome {
            PatchOutcome::Delivered => {
                if let Some(config) = self.config.as_mut() {
                    patch.apply_to(config);
                }
                PatchNotice::Delivered
            }
            PatchOutcome::Rejected(body) => PatchNotice::Rejected(body),
            PatchOutcome::Failed(reason) => PatchNotice::Failed(reason),
        });
    }

    /// Render the page
    pub fn render(&mut self, ui: &mut Ui) -> Vec<DeviceAction> {
        let mut actions = Vec::new();

        ui.horizontal(|ui| {
            if ui.button("⬅ Devices").clicked() {
                actions.push(DeviceAction::Back);
            }
            ui.separator();
            let (device_type, name) = match &self.meta {
                Some(meta) => (meta.device_type.as_str(), meta.name.as_str()),
                None => (self.query.device_type.as_str(), self.query.name.as_str()),
            };
            ui.add(ValueDisplay::new("Type", device_type));
            ui.add(ValueDisplay::new("Name", name));
            ui.add(ValueDisplay::new("MAC", self.query.mac.as_str()));
        });
        ui.separator();

        self.render_config_form(ui, &mut actions);
        ui.separator();
        self.render_stream_bar(ui, &mut actions);

        if let Some(notice) = &self.notice {
            ui.colored_label(notice.color(), notice.text());
        }

        match &self.context {
            Some(context) => {
                self.chart_view.render_range_selector(ui, &mut self.settings);
                let frame = {
                    let chart = context.lock_chart();
                    ChartFrame::capture(&chart, &self.settings)
                };
                self.chart_view.render(ui, &frame, &mut self.settings);
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
            }
        }

        actions
    }

    fn render_config_form(&mut self, ui: &mut Ui, actions: &mut Vec<DeviceAction>) {
        let busy = self.pending_patches > 0;

        ui.horizontal(|ui| {
            ui.label("Power");
            match self.config.as_ref().map(|c| c.turned_on) {
                Some(on) => {
                    if ui.add(OnOffButton::new(on).enabled(!busy)).clicked() {
                        if let Some(patch) = self.power_patch() {
                            actions.push(DeviceAction::Patch(patch));
                        }
                    }
                }
                None => {
                    ui.weak("unknown");
                }
            }

            ui.separator();
            ui.label("Collect freq");
            ui.add(egui::TextEdit::singleline(&mut self.collect_freq_input).desired_width(70.0));
            ui.label("Send freq");
            ui.add(egui::TextEdit::singleline(&mut self.send_freq_input).desired_width(70.0));

            if ui.add_enabled(!busy, egui::Button::new("Update")).clicked() {
                match self.frequency_patch() {
                    Ok(patch) => {
                        self.form_error = None;
                        actions.push(DeviceAction::Patch(patch));
                    }
                    Err(e) => self.form_error = Some(e),
                }
            }
            if busy {
                ui.spinner();
            }
        });

        if let Some(error) = &self.form_error {
            ui.colored_label(Color32::LIGHT_RED, error);
        }
    }

    fn render_stream_bar(&mut self, ui: &mut Ui, actions: &mut Vec<DeviceAction>) {
        let Some(context) = self.context.as_ref() else {
            return;
        };
        let channel = context.channel_state();
        let stats = context.stats();

        ui.horizontal(|ui| {
            ui.label("Stream");
            if let Some(toggle) = &self.toggle {
                let on = toggle.toggle().is_enabled();
                if ui.add(OnOffButton::new(on)).clicked() {
                    if let Some(patch) = toggle.flip().patch {
                        actions.push(DeviceAction::Patch(patch));
                    }
                }
            }
            if let Some(config) = &self.config {
                ui.weak(format!(
                    "device streaming: {}",
                    if config.stream_on { "on" } else { "off" }
                ));
            }

            ui.separator();
            let mut indicator = StatusIndicator::for_status(channel.status);
            if let Some(error) = &channel.last_error {
                indicator = indicator.with_tooltip(error.clone());
            }
            ui.add(indicator);
            if ui.button("Reconnect").clicked() {
                actions.push(DeviceAction::Reconnect);
            }

            ui.separator();
            let chart = context.lock_chart();
            for compartment in Compartment::all() {
                if let Some(point) = chart.latest(compartment) {
                    ui.add(
                        ValueDisplay::from_f64(compartment.wire_name(), point.y, 1)
                            .with_unit("°C")
                            .with_color(crate::frontend::plot::series_color(compartment)),
                    );
                }
            }
            drop(chart);

            ui.separator();
            ui.label(RichText::new(format!("Buffered: {}", stats.buffered)).small());
            if stats.frames_malformed > 0 {
                ui.colored_label(
                    Color32::LIGHT_RED,
                    RichText::new(format!("Malformed: {}", stats.frames_malformed)).small(),
                );
            }
            if stats.batches_dropped > 0 {
                ui.colored_label(
                    Color32::YELLOW,
                    RichText::new(format!("Dropped: {}", stats.batches_dropped)).small(),
                );
            }
        });
    }
}
