//! Backend Worker Thread Implementation
//!
//! This module contains the command loop that runs in a separate thread. It
//! executes request/response calls with the blocking HTTP client and owns the
//! tokio runtime on which stream sessions (ingestor and drain tasks) run.
//!
//! # Responsibilities
//!
//! - **Device list**: Loads the device cards on request
//! - **Session lifecycle**: Loads history and config, seeds the chart and
//!   starts streaming; closes the previous session first
//! - **Configuration updates**: Sends patches and reports the outcome
//! - **Shutdown**: Closes the open session before the thread exits
//!
//! Load failures never prevent a session from opening. The operator sees the
//! error and an empty chart that still fills from the push channel.

use crate::backend::{BackendMessage, DashboardCommand, DeviceApi, OpenedSession};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::query::DeviceQuery;
use crate::stream::{stream_endpoint, SessionContext, SessionSettings, StreamSession};
use crate::types::ConfigPatch;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// How long the loop waits for a command before rechecking the running flag
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The session currently shown in the device view
struct ActiveSession {
    query: DeviceQuery,
    session: StreamSession,
}

/// The backend worker that runs the command loop
pub struct BackendWorker {
    config: DashboardConfig,
    api: Box<dyn DeviceApi>,
    command_rx: Receiver<DashboardCommand>,
    message_tx: Sender<BackendMessage>,
    running: Arc<AtomicBool>,
    runtime: Runtime,
    active: Option<ActiveSession>,
}

impl BackendWorker {
    /// Create a new backend worker and its async runtime
    pub fn new(
        config: DashboardConfig,
        api: Box<dyn DeviceApi>,
        command_rx: Receiver<DashboardCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("fridgewatch-stream")
            .enable_all()
            .build()?;

        Ok(Self {
            config,
            api,
            command_rx,
            message_tx,
            running,
            runtime,
            active: None,
        })
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Backend worker started");

        while self.running.load(Ordering::SeqCst) {
            match self.command_rx.recv_timeout(COMMAND_POLL_INTERVAL) {
                Ok(cmd) => self.handle_command(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                }
            }
        }

        self.close_session();
        let _ = self.message_tx.send(BackendMessage::Shutdown);
        tracing::info!("Backend worker stopped");
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: DashboardCommand) {
        match cmd {
            DashboardCommand::RefreshDevices => self.refresh_devices(),
            DashboardCommand::OpenDevice(query) => self.open_device(query),
            DashboardCommand::CloseDevice => self.close_session(),
            DashboardCommand::Reconnect => {
                if let Some(query) = self.active.as_ref().map(|a| a.query.clone()) {
                    tracing::info!("Reconnecting {}", query.mac);
                    self.open_device(query);
                }
            }
            DashboardCommand::PatchConfig(patch) => self.patch_config(patch),
            DashboardCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn send(&self, msg: BackendMessage) {
        if self.message_tx.send(msg).is_err() {
            tracing::debug!("UI receiver gone, dropping message");
        }
    }

    fn report_error(&self, message: String) {
        tracing::error!("{}", message);
        self.send(BackendMessage::Error(message));
    }

    fn refresh_devices(&self) {
        match self.api.list_devices() {
            Ok(devices) => {
                tracing::info!("Loaded {} devices", devices.len());
                self.send(BackendMessage::DeviceList(devices));
            }
            Err(e) => self.report_error(e.to_string()),
        }
    }

    fn open_device(&mut self, query: DeviceQuery) {
        self.close_session();

        if !query.has_device() {
            self.report_error("View address has no mac parameter".to_string());
            return;
        }
        tracing::info!("Opening device {} ({})", query.mac, query.name);

        let history = self
            .api
            .load_history(&query)
            .map_err(|e| self.report_error(e.to_string()))
            .ok();
        let device_config = self
            .api
            .load_config(&query)
            .map_err(|e| self.report_error(e.to_string()))
            .ok();

        let context = SessionContext::new(query.mac.clone(), self.config.buffer_capacity);
        let endpoint = self
            .config
            .server_url()
            .and_then(|server| stream_endpoint(&server, self.config.stream_port, &query.mac));
        let endpoint = match endpoint {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                context.set_error(e.to_string());
                self.report_error(e.to_string());
                None
            }
        };

        let session = StreamSession::open(
            self.runtime.handle(),
            context.clone(),
            history.as_ref(),
            SessionSettings {
                endpoint,
                drain_interval: self.config.drain_interval(),
                connect_timeout: self.config.connect_timeout(),
            },
        );

        self.send(BackendMessage::SessionOpened(OpenedSession {
            query: query.clone(),
            context,
            meta: history.map(|h| h.meta),
            config: device_config,
        }));
        self.active = Some(ActiveSession { query, session });
    }

    fn close_session(&mut self) {
        if let Some(active) = self.active.take() {
            let device = active.query.mac.clone();
            self.runtime.block_on(active.session.close());
            self.send(BackendMessage::SessionClosed(device));
        }
    }

    fn patch_config(&self, patch: ConfigPatch) {
        let Some(active) = self.active.as_ref() else {
            self.report_error("No device open for configuration update".to_string());
            return;
        };

        let outcome = self.api.patch_config(&active.query, &patch);
        tracing::info!("Config update for {}: {:?}", active.query.mac, outcome);
        self.send(BackendMessage::PatchResult { patch, outcome });
    }
}
