//! Two-series chart data for one device session

use crate::types::{parse_sample, ChartPoint, Compartment, HistoryRecord};

/// Destination for drained points
///
/// Implemented by [`ChartSeriesModel`]; tests and benches can plug in a
/// recorder to observe the append order.
pub trait SeriesSink {
    fn append(&mut self, compartment: Compartment, point: ChartPoint);
}

/// Counts from seeding a model with history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub seeded: usize,
    pub skipped: usize,
}

/// Append-only top and bottom compartment series
///
/// Points are kept in append order. Timestamps are expected to be
/// non-decreasing but this is not checked.
#[derive(Debug, Clone, Default)]
pub struct ChartSeriesModel {
    top: Vec<ChartPoint>,
    bottom: Vec<ChartPoint>,
    revision: u64,
}

impl ChartSeriesModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, compartment: Compartment) -> &[ChartPoint] {
        match compartment {
            Compartment::Top => &self.top,
            Compartment::Bottom => &self.bottom,
        }
    }

    pub fn len(&self, compartment: Compartment) -> usize {
        self.series(compartment).len()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }

    pub fn latest(&self, compartment: Compartment) -> Option<ChartPoint> {
        self.series(compartment).last().copied()
    }

    /// Incremented on every append; lets the UI skip unchanged frames
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Newest timestamp across both series
    pub fn last_timestamp(&self) -> Option<i64> {
        self.top
            .last()
            .into_iter()
            .chain(self.bottom.last())
            .map(|p| p.x)
            .max()
    }

    /// Append every parseable history sample, in the given order
    ///
    /// Malformed samples are skipped and counted. Seeding twice appends the
    /// history twice.
    pub fn seed_from_history(&mut self, record: &HistoryRecord) -> SeedReport {
        let mut report = SeedReport::default();
        for compartment in Compartment::all() {
            for sample in record.samples(compartment) {
                match parse_sample(sample) {
                    Ok(point) => {
                        self.append(compartment, point);
                        report.seeded += 1;
                    }
                    Err(e) => {
                        tracing::debug!("Skipping history sample: {}", e);
                        report.skipped += 1;
                    }
                }
            }
        }
        report
    }
}

impl SeriesSink for ChartSeriesModel {
    fn append(&mut self, compartment: Compartment, point: ChartPoint) {
        match compartment {
            Compartment::Top => self.top.push(point),
            Compartment::Bottom => self.bottom.push(point),
        }
        self.revision = self.revision.wrapping_add(1);
    }
}
