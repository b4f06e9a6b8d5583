//! Live temperature chart
//!
//! Renders the two compartment series of a session with egui_plot. X values
//! are epoch milliseconds shown as local wall-clock time. The range selector
//! (1M / 5M / All) picks a trailing window that follows the newest sample
//! until the user pans or zooms.
//!
//! Rendering never touches the series model. A [`ChartFrame`] copies the
//! visible window out under the chart lock; points outside it are skipped
//! and long series are decimated to [`MAX_RENDER_POINTS`] per line.

use crate::config::{RangeWindow, RenderConfig, RuntimeSettings};
use crate::stream::ChartSeriesModel;
use crate::types::{ChartPoint, Compartment, MAX_RENDER_POINTS};
use egui::{Color32, Ui};
use egui_plot::{Corner, GridMark, Legend, Line, Plot, PlotBounds, PlotPoints};

/// Series colour per compartment
pub fn series_color(compartment: Compartment) -> Color32 {
    match compartment {
        Compartment::Top => Color32::from_rgb(124, 181, 236),
        Compartment::Bottom => Color32::from_rgb(247, 163, 92),
    }
}

/// Owned copy of the visible part of the chart for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartFrame {
    /// Trailing window in epoch ms; `None` shows everything
    pub window: Option<(i64, i64)>,
    pub lines: Vec<(Compartment, Vec<[f64; 2]>)>,
    pub y_range: (f64, f64),
}

impl ChartFrame {
    /// Copy the visible, decimated points; callers hold the chart lock only for this
    pub fn capture(chart: &ChartSeriesModel, settings: &RuntimeSettings) -> Self {
        let window = settings.x_bounds(chart.last_timestamp());
        let lines: Vec<_> = Compartment::all()
            .into_iter()
            .map(|compartment| {
                let points = visible_points(chart.series(compartment), window);
                (compartment, decimate_points(&points, MAX_RENDER_POINTS))
            })
            .collect();
        let y_range = y_bounds(lines.iter().flat_map(|(_, pts)| pts.iter()));
        Self {
            window,
            lines,
            y_range,
        }
    }
}

/// Plot configuration for the device chart
#[derive(Debug, Clone)]
pub struct ChartView {
    pub show_legend: bool,
    pub show_grid: bool,
    pub line_width: f32,
}

impl Default for ChartView {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl ChartView {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            show_legend: config.show_legend,
            show_grid: config.show_grid,
            line_width: config.line_width,
        }
    }

    /// Range selector buttons; the selected one is highlighted while following
    pub fn render_range_selector(&self, ui: &mut Ui, settings: &mut RuntimeSettings) {
        ui.horizontal(|ui| {
            ui.label("Zoom");
            for range in RangeWindow::all() {
                let selected = settings.follow_latest && settings.range == range;
                if ui.selectable_label(selected, range.label()).clicked() {
                    settings.select_range(range);
                }
            }
            if !settings.follow_latest {
                ui.weak("(paused, pick a range to follow)");
            }
        });
    }

    /// Draw both series
    pub fn render(&self, ui: &mut Ui, frame: &ChartFrame, settings: &mut RuntimeSettings) {
        let follow_all = settings.follow_latest && settings.range == RangeWindow::All;

        let mut plot = Plot::new("device_chart")
            .show_axes(true)
            .show_grid(self.show_grid)
            .y_axis_label("°C")
            .x_axis_formatter(|mark, _range| format_time_mark(mark.value))
            .x_grid_spacer(|input| create_time_grid_marks(input.bounds));

        if self.show_legend {
            plot = plot.legend(
                Legend::default()
                    .position(Corner::LeftTop)
                    .background_alpha(0.8),
            );
        }
        plot = plot.auto_bounds([follow_all, follow_all || settings.autoscale_y]);

        let response = plot.show(ui, |plot_ui| {
            if let Some((x_min, x_max)) = frame.window {
                let (y_min, y_max) = frame.y_range;
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [x_min as f64, y_min],
                    [x_max as f64, y_max],
                ));
            }

            for (compartment, points) in &frame.lines {
                if points.is_empty() {
                    continue;
                }
                let line = Line::new(compartment.wire_name(), PlotPoints::from(points.clone()))
                    .color(series_color(*compartment))
                    .width(self.line_width);
                plot_ui.line(line);
            }
        });

        if response.response.dragged() || response.response.double_clicked() {
            settings.pause_follow();
        }
        if response.response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta);
            if scroll.y.abs() > 0.0 {
                settings.pause_follow();
            }
        }
    }
}

/// Points inside `bounds` (inclusive), in series order
pub fn visible_points(series: &[ChartPoint], bounds: Option<(i64, i64)>) -> Vec<[f64; 2]> {
    match bounds {
        Some((min, max)) => series
            .iter()
            .filter(|p| p.x >= min && p.x <= max)
            .map(ChartPoint::as_plot_point)
            .collect(),
        None => series.iter().map(ChartPoint::as_plot_point).collect(),
    }
}

/// Min/max decimation keeping the first and last point
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points || points.is_empty() {
        return points.to_vec();
    }

    let bucket_size = points.len() / (max_points / 2).max(1);
    let mut result = Vec::with_capacity(max_points + 2);
    result.push(points[0]);

    for bucket in points[1..points.len() - 1].chunks(bucket_size.max(1)) {
        let (min_pt, max_pt) = bucket.iter().fold((bucket[0], bucket[0]), |(min, max), pt| {
            (
                if pt[1] < min[1] { *pt } else { min },
                if pt[1] > max[1] { *pt } else { max },
            )
        });
        // Keep time order within the bucket
        if min_pt[0] <= max_pt[0] {
            result.push(min_pt);
            result.push(max_pt);
        } else {
            result.push(max_pt);
            result.push(min_pt);
        }
    }

    if let Some(last) = points.last() {
        result.push(*last);
    }
    result
}

/// Y range of the visible points with 10% padding
fn y_bounds<'a>(points: impl Iterator<Item = &'a [f64; 2]>) -> (f64, f64) {
    let (y_min, y_max) = points.fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
    if y_min <= y_max {
        let range = y_max - y_min;
        let padding = if range > 0.0 { range * 0.1 } else { 1.0 };
        (y_min - padding, y_max + padding)
    } else {
        (-1.0, 1.0)
    }
}

/// Local `HH:MM:SS` for an epoch-millisecond axis value
pub fn format_time_mark(value_ms: f64) -> String {
    chrono::DateTime::from_timestamp_millis(value_ms.round() as i64)
        .map(|utc| utc.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Grid marks on whole seconds/minutes for a millisecond axis
fn create_time_grid_marks(bounds: (f64, f64)) -> Vec<GridMark> {
    let (min, max) = bounds;
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return Vec::new();
    }

    let step = [
        1_000.0, 5_000.0, 10_000.0, 30_000.0, 60_000.0, 300_000.0, 900_000.0, 3_600_000.0,
        21_600_000.0, 86_400_000.0,
    ]
    .into_iter()
    .find(|step| range / step <= 12.0)
    .unwrap_or(86_400_000.0);

    let mut marks = Vec::new();
    let mut current = (min / step).ceil() * step;
    while current <= max && marks.len() < 64 {
        marks.push(GridMark {
            value: current,
            step_size: step,
        });
        current += step;
    }
    marks
}
