//! Backend module for device server communication
//!
//! All network work runs on a separate thread to keep the UI responsive.
//! The UI talks to it over crossbeam channels.
//!
//! # Architecture
//!
//! - [`DashboardCommand`] - Messages sent from UI to backend (open device, patch config, ...)
//! - [`BackendMessage`] - Messages sent from backend to UI (device list, session, results)
//! - [`FrontendReceiver`] - UI-side handle for sending commands and receiving messages
//! - [`DashboardBackend`] - Main backend entry point that runs the worker loop
//!
//! # Components
//!
//! - [`DeviceApi`] / [`HttpDeviceApi`] - Request/response calls to the device server
//! - [`BackendWorker`] - Command loop; owns the async runtime that runs stream sessions
//!
//! # Example
//!
//! ```ignore
//! use fridgewatch::backend::{DashboardBackend, HttpDeviceApi};
//! use fridgewatch::config::DashboardConfig;
//!
//! let config = DashboardConfig::load_or_default();
//! let api = HttpDeviceApi::new(config.server_url()?, config.request_timeout())?;
//! let (backend, frontend) = DashboardBackend::new(config, Box::new(api));
//!
//! std::thread::spawn(move || backend.run());
//!
//! frontend.open_device(DeviceQuery::new("AA:11", "fridge", "kitchen"));
//! for msg in frontend.drain() {
//!     if let BackendMessage::SessionOpened(opened) = msg {
//!         // Read opened.context.lock_chart() each frame
//!     }
//! }
//! ```

pub mod api;
pub mod worker;

pub use api::{DeviceApi, HttpDeviceApi};
pub use worker::BackendWorker;

use crate::config::DashboardConfig;
use crate::query::DeviceQuery;
use crate::stream::SessionContext;
use crate::types::{ConfigPatch, DeviceConfig, DeviceId, DeviceMeta, DeviceSummary, PatchOutcome};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Channel capacity for commands (UI → backend)
const CMD_CHANNEL_CAPACITY: usize = 64;
/// Channel capacity for messages (backend → UI)
const MSG_CHANNEL_CAPACITY: usize = 256;

/// Message sent from the UI to the backend
#[derive(Debug, Clone)]
pub enum DashboardCommand {
    /// Reload the device list
    RefreshDevices,
    /// Open a device view, closing the current one
    OpenDevice(DeviceQuery),
    /// Close the current device view
    CloseDevice,
    /// Restart the current device's session (new push channel, fresh chart)
    Reconnect,
    /// Send a configuration update for the current device
    PatchConfig(ConfigPatch),
    /// Shutdown the backend
    Shutdown,
}

/// Everything the UI needs to show a newly opened device
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub query: DeviceQuery,
    /// Shared session state; the UI reads the chart and stats from it
    pub context: SessionContext,
    /// Metadata from the history record, if it loaded
    pub meta: Option<DeviceMeta>,
    /// Server-side configuration, if it loaded
    pub config: Option<DeviceConfig>,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum BackendMessage {
    /// Device list update (response to RefreshDevices)
    DeviceList(Vec<DeviceSummary>),
    /// A device session started
    SessionOpened(OpenedSession),
    /// The session of a device was closed
    SessionClosed(DeviceId),
    /// Result of a configuration update
    PatchResult {
        patch: ConfigPatch,
        outcome: PatchOutcome,
    },
    /// A request failed; shown in the status bar
    Error(String),
    /// Backend is shutting down
    Shutdown,
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<DashboardCommand>,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: DashboardCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    pub fn refresh_devices(&self) {
        let _ = self.command_sender.send(DashboardCommand::RefreshDevices);
    }

    pub fn open_device(&self, query: DeviceQuery) {
        let _ = self.command_sender.send(DashboardCommand::OpenDevice(query));
    }

    pub fn close_device(&self) {
        let _ = self.command_sender.send(DashboardCommand::CloseDevice);
    }

    pub fn reconnect(&self) {
        let _ = self.command_sender.send(DashboardCommand::Reconnect);
    }

    pub fn patch_config(&self, patch: ConfigPatch) {
        let _ = self.command_sender.send(DashboardCommand::PatchConfig(patch));
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(DashboardCommand::Shutdown);
    }
}

/// The dashboard backend that runs in a separate thread
pub struct DashboardBackend {
    config: DashboardConfig,
    api: Box<dyn DeviceApi>,
    command_receiver: Receiver<DashboardCommand>,
    message_sender: Sender<BackendMessage>,
    running: Arc<AtomicBool>,
}

impl DashboardBackend {
    /// Create a new backend with communication channels
    pub fn new(config: DashboardConfig, api: Box<dyn DeviceApi>) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);

        let backend = Self {
            config,
            api,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Run the backend loop until shutdown
    pub fn run(self) {
        let message_sender = self.message_sender.clone();
        match BackendWorker::new(
            self.config,
            self.api,
            self.command_receiver,
            self.message_sender,
            self.running,
        ) {
            Ok(mut worker) => worker.run(),
            Err(e) => {
                tracing::error!("Backend failed to start: {}", e);
                let _ = message_sender.send(BackendMessage::Error(e.to_string()));
                let _ = message_sender.send(BackendMessage::Shutdown);
            }
        }
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::types::HistoryRecord;
    use std::sync::atomic::Ordering;

    struct OfflineApi;

    impl DeviceApi for OfflineApi {
        fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
            Ok(Vec::new())
        }
        fn load_history(&self, _: &DeviceQuery) -> Result<HistoryRecord> {
            Ok(HistoryRecord::default())
        }
        fn load_config(&self, _: &DeviceQuery) -> Result<DeviceConfig> {
            Ok(DeviceConfig::default())
        }
        fn patch_config(&self, _: &DeviceQuery, _: &ConfigPatch) -> PatchOutcome {
            PatchOutcome::Delivered
        }
    }

    #[test]
    fn test_backend_creation() {
        let (backend, frontend) = DashboardBackend::new(DashboardConfig::default(), Box::new(OfflineApi));

        assert!(backend.stop_handle().load(Ordering::SeqCst));
        assert!(frontend.send_command(DashboardCommand::Shutdown));
    }

    #[test]
    fn test_frontend_receiver_commands() {
        let (backend, frontend) = DashboardBackend::new(DashboardConfig::default(), Box::new(OfflineApi));

        frontend.refresh_devices();
        frontend.open_device(DeviceQuery::new("AA:11", "fridge", ""));
        frontend.patch_config(ConfigPatch::turned_on(&DeviceId::new("AA:11"), true));
        frontend.reconnect();
        frontend.close_device();
        frontend.shutdown();

        let received: Vec<_> = backend.command_receiver.try_iter().collect();
        assert_eq!(received.len(), 6);
        assert!(matches!(received[1], DashboardCommand::OpenDevice(_)));
        assert!(matches!(received[5], DashboardCommand::Shutdown));
    }

    #[test]
    fn test_drain_empty() {
        let (_backend, frontend) = DashboardBackend::new(DashboardConfig::default(), Box::new(OfflineApi));
        assert!(frontend.drain().is_empty());
        assert!(frontend.try_recv().is_none());
    }
}
