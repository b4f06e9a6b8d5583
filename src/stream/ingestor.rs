//! Push-channel reader for one device
//!
//! Opens `ws://{host}:{stream_port}/devices/{mac}` and turns every text frame
//! into a [`ReadingBatch`] on the session buffer. Frames that do not parse
//! are counted and dropped; the channel stays open. The ingestor never looks
//! at the stream toggle.
//!
//! There is no reconnect. When the channel ends the session reports it as
//! disconnected and the operator can start a new session. Connecting is
//! bounded by a timeout and gives way to shutdown at any point.

use super::SessionContext;
use crate::error::{DashboardError, Result};
use crate::types::{ConnectionStatus, DeviceId, ReadingBatch};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Build the push-channel address for `device` on the host of `server_url`
pub fn stream_endpoint(server_url: &Url, stream_port: u16, device: &DeviceId) -> Result<Url> {
    if device.is_empty() {
        return Err(DashboardError::InvalidInput(
            "no device identifier in view address".to_string(),
        ));
    }
    let host = server_url.host_str().ok_or_else(|| {
        DashboardError::InvalidInput(format!("server URL {} has no host", server_url))
    })?;

    let mut endpoint = Url::parse(&format!("ws://{}:{}/", host, stream_port))?;
    endpoint
        .path_segments_mut()
        .map_err(|_| DashboardError::InvalidInput(format!("cannot build path on {}", server_url)))?
        .clear()
        .push("devices")
        .push(device.as_str());
    Ok(endpoint)
}

/// Default limit for the connect and handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves once `shutdown` is `true` or its sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Parses inbound frames onto the session buffer
#[derive(Debug, Clone)]
pub struct StreamIngestor {
    context: SessionContext,
    connect_timeout: Duration,
}

impl StreamIngestor {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Limit for the connect and handshake; zero keeps the default
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.connect_timeout = timeout;
        }
        self
    }

    /// Handle one text frame. Returns whether it was enqueued.
    pub fn handle_frame(&self, frame: &str) -> bool {
        self.context.record_frame();
        match ReadingBatch::from_json(frame) {
            Ok(batch) => {
                tracing::trace!(
                    device = %self.context.device(),
                    points = batch.point_count(),
                    "Received batch"
                );
                if self.context.enqueue(batch) {
                    tracing::debug!(device = %self.context.device(), "Buffer full, evicted oldest batch");
                }
                true
            }
            Err(e) => {
                self.context.record_malformed();
                tracing::warn!(device = %self.context.device(), "Dropping malformed frame: {}", e);
                false
            }
        }
    }

    /// Connect and read until the server closes, the channel fails or shutdown is signalled
    pub async fn run(self, endpoint: Url, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.context.set_status(ConnectionStatus::Connecting);
        tracing::info!("Opening push channel {}", endpoint);

        let connect = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(endpoint.as_str()),
        );
        let connected = tokio::select! {
            connected = connect => connected,
            _ = shutdown_requested(&mut shutdown) => {
                self.context.set_status(ConnectionStatus::Disconnected);
                tracing::info!(device = %self.context.device(), "Push channel connect abandoned on shutdown");
                return Ok(());
            }
        };
        let (socket, _response) = match connected {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                self.context.set_error(format!("Failed to connect: {}", e));
                tracing::error!("Push channel connect to {} failed: {}", endpoint, e);
                return Err(e.into());
            }
            Err(_) => {
                let message = format!(
                    "No handshake from {} within {} ms",
                    endpoint,
                    self.connect_timeout.as_millis()
                );
                self.context.set_error(message.clone());
                tracing::error!("{}", message);
                return Err(DashboardError::Channel(message));
            }
        };
        self.context.set_status(ConnectionStatus::Connected);
        tracing::info!(device = %self.context.device(), "Push channel connected");

        let (mut write, mut read) = socket.split();
        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_frame(&text);
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            self.handle_frame(text);
                        }
                        Err(_) => {
                            self.context.record_frame();
                            self.context.record_malformed();
                            tracing::warn!(device = %self.context.device(), "Dropping non UTF-8 binary frame");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(device = %self.context.device(), "Server closed push channel: {:?}", frame);
                        break;
                    }
                    // Ping/pong are answered by the transport
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.context.set_error(e.to_string());
                        tracing::error!(device = %self.context.device(), "Push channel error: {}", e);
                        return Err(e.into());
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        if let Err(e) = write.send(Message::Close(None)).await {
                            tracing::debug!("Close frame not sent: {}", e);
                        }
                        break;
                    }
                }
            }
        }

        self.context.set_status(ConnectionStatus::Disconnected);
        tracing::info!(device = %self.context.device(), "Push channel closed");
        Ok(())
    }
}
