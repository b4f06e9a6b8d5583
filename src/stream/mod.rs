//! Real-time telemetry pipeline
//!
//! One device view owns one stream session. Data flows in one direction:
//!
//! ```text
//! push channel ──► StreamIngestor ──► ReadingBuffer ──► DrainScheduler ──► ChartSeriesModel
//!                                                            ▲
//!                                           StreamToggle ────┘
//! ```
//!
//! - [`StreamIngestor`] parses each inbound frame and enqueues it, regardless
//!   of the toggle
//! - [`ReadingBuffer`] is a FIFO shared by the ingestor and the scheduler
//! - [`DrainScheduler`] moves at most one batch per tick into the chart, only
//!   while the toggle is on
//! - [`ChartSeriesModel`] holds the two compartment series, seeded from
//!   history before streaming starts
//!
//! All shared state lives in a [`SessionContext`], which is cheap to clone and
//! is handed to every task of the session. Each critical section is a single
//! enqueue, dequeue or append, and no lock is held across an await point.

pub mod buffer;
pub mod chart;
pub mod drain;
pub mod ingestor;
pub mod session;
pub mod toggle;

pub use buffer::ReadingBuffer;
pub use chart::{ChartSeriesModel, SeedReport, SeriesSink};
pub use drain::{apply_batch, DrainScheduler, TickOutcome};
pub use ingestor::{stream_endpoint, StreamIngestor};
pub use session::{SessionSettings, StreamSession};
pub use toggle::{StreamToggle, ToggleChange, ToggleControl};

use crate::types::{ConnectionStatus, DeviceId, ReadingBatch, StreamStats};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Push channel state as shown to the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct SessionCounters {
    frames_received: AtomicU64,
    frames_malformed: AtomicU64,
    batches_drained: AtomicU64,
}

/// Shared state of one device session
#[derive(Debug, Clone)]
pub struct SessionContext {
    device: DeviceId,
    buffer: Arc<Mutex<ReadingBuffer>>,
    chart: Arc<Mutex<ChartSeriesModel>>,
    toggle: StreamToggle,
    counters: Arc<SessionCounters>,
    channel: Arc<Mutex<ChannelState>>,
}

impl SessionContext {
    /// Create a fresh context; `buffer_capacity` of `None` means unbounded
    pub fn new(device: DeviceId, buffer_capacity: Option<usize>) -> Self {
        Self {
            device,
            buffer: Arc::new(Mutex::new(ReadingBuffer::new(buffer_capacity))),
            chart: Arc::new(Mutex::new(ChartSeriesModel::new())),
            toggle: StreamToggle::new(),
            counters: Arc::new(SessionCounters::default()),
            channel: Arc::new(Mutex::new(ChannelState::default())),
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn toggle(&self) -> &StreamToggle {
        &self.toggle
    }

    /// Lock the chart model. A poisoned lock is recovered, the data is append-only.
    pub fn lock_chart(&self) -> MutexGuard<'_, ChartSeriesModel> {
        self.chart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, ReadingBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a batch onto the buffer tail. Returns `true` if an old batch was evicted.
    pub fn enqueue(&self, batch: ReadingBatch) -> bool {
        self.lock_buffer().enqueue(batch).is_some()
    }

    /// Remove the batch at the buffer head
    pub fn dequeue_one(&self) -> Option<ReadingBatch> {
        self.lock_buffer().dequeue_one()
    }

    pub fn buffered(&self) -> usize {
        self.lock_buffer().len()
    }

    pub(crate) fn record_frame(&self) {
        self.counters.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.counters.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self) {
        self.counters.batches_drained.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the session counters
    pub fn stats(&self) -> StreamStats {
        let (buffered, batches_dropped) = {
            let buffer = self.lock_buffer();
            (buffer.len(), buffer.dropped())
        };
        StreamStats {
            frames_received: self.counters.frames_received.load(Ordering::Relaxed),
            frames_malformed: self.counters.frames_malformed.load(Ordering::Relaxed),
            batches_drained: self.counters.batches_drained.load(Ordering::Relaxed),
            batches_dropped,
            buffered,
        }
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        let mut channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        channel.status = status;
        if status != ConnectionStatus::Error {
            channel.last_error = None;
        }
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        let mut channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        channel.status = ConnectionStatus::Error;
        channel.last_error = Some(message.into());
    }
}
