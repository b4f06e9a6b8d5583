//! Runtime settings that can be modified while the dashboard runs
//!
//! These control how the live chart is displayed and are not persisted.
//!
//! # Range selector
//!
//! The chart shows a trailing window anchored at the newest sample:
//! one minute (default), five minutes, or everything. While
//! `follow_latest` is set the window moves with incoming data; panning or
//! zooming the plot clears it until a range button is pressed again.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visible time span of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RangeWindow {
    #[default]
    OneMinute,
    FiveMinutes,
    All,
}

impl RangeWindow {
    pub fn all() -> [RangeWindow; 3] {
        [RangeWindow::OneMinute, RangeWindow::FiveMinutes, RangeWindow::All]
    }

    /// Window length in milliseconds, `None` for the full series
    pub fn span_ms(&self) -> Option<i64> {
        match self {
            RangeWindow::OneMinute => Some(60_000),
            RangeWindow::FiveMinutes => Some(5 * 60_000),
            RangeWindow::All => None,
        }
    }

    /// Range selector button text
    pub fn label(&self) -> &'static str {
        match self {
            RangeWindow::OneMinute => "1M",
            RangeWindow::FiveMinutes => "5M",
            RangeWindow::All => "All",
        }
    }
}

impl fmt::Display for RangeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runtime display settings for the device chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Selected range window
    pub range: RangeWindow,

    /// Whether the window follows the newest sample
    pub follow_latest: bool,

    /// Fit the Y axis to the visible data
    pub autoscale_y: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            range: RangeWindow::default(),
            follow_latest: true,
            autoscale_y: true,
        }
    }
}

impl RuntimeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(range: RangeWindow) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }

    /// Select a range window and resume following the newest data
    pub fn select_range(&mut self, range: RangeWindow) {
        self.range = range;
        self.follow_latest = true;
    }

    /// Stop following after the user pans or zooms
    pub fn pause_follow(&mut self) {
        self.follow_latest = false;
    }

    /// X bounds to show when following, given the newest timestamp
    ///
    /// Returns `None` when the plot should fit all data instead.
    pub fn x_bounds(&self, latest_ms: Option<i64>) -> Option<(i64, i64)> {
        if !self.follow_latest {
            return None;
        }
        let latest = latest_ms?;
        self.range.span_ms().map(|span| (latest - span, latest))
    }
}
