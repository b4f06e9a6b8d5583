//! Fixed-cadence transfer from the reading buffer to the chart
//!
//! Each tick removes at most one batch, so a burst of batches is replayed
//! smoothly at one batch per interval. With `N` batches buffered the newest
//! one reaches the chart after roughly `N × interval`.

use super::chart::SeriesSink;
use super::SessionContext;
use crate::types::{Compartment, ReadingBatch};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Default drain cadence
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Toggle is off; the buffer was not touched
    Disabled,
    /// Toggle is on but the buffer was empty
    Idle,
    /// One batch was applied
    Drained { points: usize },
}

/// Append a batch to the chart: bottom compartment first, then top
///
/// Returns the number of points appended.
pub fn apply_batch<S: SeriesSink + ?Sized>(sink: &mut S, batch: &ReadingBatch) -> usize {
    let mut appended = 0;
    for compartment in [Compartment::Bottom, Compartment::Top] {
        for point in batch.points(compartment) {
            sink.append(compartment, *point);
            appended += 1;
        }
    }
    appended
}

/// Drains the session buffer into the chart while the toggle is on
#[derive(Debug, Clone)]
pub struct DrainScheduler {
    context: SessionContext,
    interval: Duration,
}

impl DrainScheduler {
    pub fn new(context: SessionContext, interval: Duration) -> Self {
        Self {
            context,
            interval: if interval.is_zero() {
                DEFAULT_DRAIN_INTERVAL
            } else {
                interval
            },
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one drain step
    pub fn tick(&self) -> TickOutcome {
        if !self.context.toggle().is_enabled() {
            return TickOutcome::Disabled;
        }

        // Buffer lock is released before the chart lock is taken
        let Some(batch) = self.context.dequeue_one() else {
            return TickOutcome::Idle;
        };

        let points = apply_batch(&mut *self.context.lock_chart(), &batch);
        self.context.record_drained();
        tracing::trace!(device = %self.context.device(), points, "Drained batch");
        TickOutcome::Drained { points }
    }

    /// Tick on a fixed interval until `shutdown` flips to `true` or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(
            device = %self.context.device(),
            interval_ms = self.interval.as_millis() as u64,
            "Drain scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(device = %self.context.device(), "Drain scheduler stopped");
    }
}
