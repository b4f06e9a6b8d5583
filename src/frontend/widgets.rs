//! Custom widgets for the FridgeWatch UI
//!
//! # Widgets
//!
//! - [`StatusIndicator`] - Colored status dot with label (connected, error, etc.)
//! - [`ValueDisplay`] - Formatted value with label and optional unit
//! - [`OnOffButton`] - Green "On" / red "Off" switch button

use crate::types::ConnectionStatus;
use egui::{Button, Color32, Response, RichText, Ui, Widget};

/// A widget that displays a colored status indicator
pub struct StatusIndicator {
    color: Color32,
    label: String,
    tooltip: Option<String>,
}

impl StatusIndicator {
    /// Create a new status indicator with the given color and label
    pub fn new(color: Color32, label: impl Into<String>) -> Self {
        Self {
            color,
            label: label.into(),
            tooltip: None,
        }
    }

    /// Indicator matching a push-channel status
    pub fn for_status(status: ConnectionStatus) -> Self {
        let color = match status {
            ConnectionStatus::Connected => Color32::GREEN,
            ConnectionStatus::Connecting => Color32::YELLOW,
            ConnectionStatus::Disconnected => Color32::GRAY,
            ConnectionStatus::Error => Color32::RED,
        };
        Self::new(color, status.to_string())
    }

    /// Add a tooltip to the indicator
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

impl Widget for StatusIndicator {
    fn ui(self, ui: &mut Ui) -> Response {
        let response = ui
            .horizontal(|ui| {
                ui.colored_label(self.color, "●");
                ui.label(&self.label);
            })
            .response;

        match self.tooltip {
            Some(tooltip) => response.on_hover_text(tooltip),
            None => response,
        }
    }
}

/// A widget for displaying a value with a label and optional unit
pub struct ValueDisplay {
    label: String,
    value: String,
    unit: Option<String>,
    color: Option<Color32>,
}

impl ValueDisplay {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            unit: None,
            color: None,
        }
    }

    /// Create a new value display from a numeric value
    pub fn from_f64(label: impl Into<String>, value: f64, precision: usize) -> Self {
        Self::new(label, format!("{:.precision$}", value, precision = precision))
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = Some(color);
        self
    }
}

impl Widget for ValueDisplay {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.horizontal(|ui| {
            ui.label(format!("{}:", self.label));

            let value_text = match self.unit {
                Some(unit) => format!("{} {}", self.value, unit),
                None => self.value,
            };

            match self.color {
                Some(color) => ui.colored_label(color, value_text),
                None => ui.strong(value_text),
            };
        })
        .response
    }
}

/// Switch button showing the current state: green "On" or red "Off"
pub struct OnOffButton {
    on: bool,
    enabled: bool,
}

impl OnOffButton {
    pub fn new(on: bool) -> Self {
        Self { on, enabled: true }
    }

    /// Grey out the button, e.g. while a request is in flight
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for OnOffButton {
    fn ui(self, ui: &mut Ui) -> Response {
        let (text, fill) = if self.on {
            ("On", Color32::from_rgb(40, 167, 69))
        } else {
            ("Off", Color32::from_rgb(220, 53, 69))
        };
        let button = Button::new(RichText::new(text).color(Color32::WHITE).strong())
            .fill(fill)
            .min_size(egui::vec2(56.0, 0.0));
        ui.add_enabled(self.enabled, button)
    }
}
