//! Lifecycle of one device view's pipeline
//!
//! Opening a session seeds the chart from history first, then starts the
//! ingestor and the drain scheduler on the given runtime. Closing it signals
//! both tasks, which send a close frame and stop ticking, and waits for them.

use super::drain::{DrainScheduler, DEFAULT_DRAIN_INTERVAL};
use super::ingestor::{StreamIngestor, DEFAULT_CONNECT_TIMEOUT};
use super::SessionContext;
use crate::types::HistoryRecord;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

/// Parameters for starting a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Push-channel address; `None` runs the session without a channel
    pub endpoint: Option<Url>,
    pub drain_interval: Duration,
    /// Limit for the push-channel connect and handshake
    pub connect_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            drain_interval: DEFAULT_DRAIN_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Running ingestor and drain tasks for one device
#[derive(Debug)]
pub struct StreamSession {
    context: SessionContext,
    shutdown_tx: watch::Sender<bool>,
    ingest_task: Option<JoinHandle<()>>,
    drain_task: JoinHandle<()>,
}

impl StreamSession {
    /// Seed the chart with `history` (once) and start streaming
    pub fn open(
        runtime: &Handle,
        context: SessionContext,
        history: Option<&HistoryRecord>,
        settings: SessionSettings,
    ) -> Self {
        if let Some(record) = history {
            let report = context.lock_chart().seed_from_history(record);
            tracing::info!(
                device = %context.device(),
                seeded = report.seeded,
                skipped = report.skipped,
                "Seeded chart from history"
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ingest_task = settings.endpoint.map(|endpoint| {
            let ingestor =
                StreamIngestor::new(context.clone()).with_connect_timeout(settings.connect_timeout);
            let rx = shutdown_rx.clone();
            runtime.spawn(async move {
                // Failures are already recorded on the session's channel state
                let _ = ingestor.run(endpoint, rx).await;
            })
        });

        let scheduler = DrainScheduler::new(context.clone(), settings.drain_interval);
        let drain_task = runtime.spawn(scheduler.run(shutdown_rx));

        Self {
            context,
            shutdown_tx,
            ingest_task,
            drain_task,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Whether the push-channel task has finished (closed or failed)
    pub fn channel_finished(&self) -> bool {
        self.ingest_task
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Stop both tasks and wait for them
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.ingest_task {
            if let Err(e) = task.await {
                tracing::warn!("Ingest task ended abnormally: {}", e);
            }
        }
        if let Err(e) = self.drain_task.await {
            tracing::warn!("Drain task ended abnormally: {}", e);
        }
        tracing::info!(device = %self.context.device(), "Stream session closed");
    }
}
