//! Request/response calls to the device server
//!
//! [`DeviceApi`] is the seam between the worker and the network. The worker
//! only ever talks to the trait, so tests swap in a mock.
//!
//! # Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | device list | `GET /devices` |
//! | history | `GET /devices/{mac}/data?mac=&type=&name=` |
//! | config | `GET /devices/{mac}/config?mac=&type=&name=` |
//! | config update | `PATCH /devices/{mac}/config?mac=&type=&name=` |

use crate::error::{DashboardError, Result, ResultExt};
use crate::query::DeviceQuery;
use crate::types::{ConfigPatch, DeviceConfig, DeviceSummary, HistoryRecord, PatchOutcome};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Operations the dashboard performs against the device server
pub trait DeviceApi: Send {
    /// All known devices with their stored history
    fn list_devices(&self) -> Result<Vec<DeviceSummary>>;

    /// Stored history of one device
    fn load_history(&self, device: &DeviceQuery) -> Result<HistoryRecord>;

    /// Current configuration of one device
    fn load_config(&self, device: &DeviceQuery) -> Result<DeviceConfig>;

    /// Send a partial configuration update
    ///
    /// Never fails; transport errors are reported as [`PatchOutcome::Failed`].
    fn patch_config(&self, device: &DeviceQuery, patch: &ConfigPatch) -> PatchOutcome;
}

/// [`DeviceApi`] over blocking HTTP
#[derive(Debug, Clone)]
pub struct HttpDeviceApi {
    client: Client,
    base: Url,
}

impl HttpDeviceApi {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{base}/devices[/{mac}/{leaf}]` with the device query appended
    pub fn device_url(&self, device: Option<&DeviceQuery>, leaf: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                DashboardError::InvalidInput(format!("{} cannot be a base URL", self.base))
            })?;
            segments.pop_if_empty().push("devices");
            if let Some(device) = device {
                segments.push(device.mac.as_str());
                if let Some(leaf) = leaf {
                    segments.push(leaf);
                }
            }
        }
        if let Some(device) = device {
            url.query_pairs_mut().extend_pairs(device.request_pairs());
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        let body = Self::success_body(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn success_body(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(DashboardError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl DeviceApi for HttpDeviceApi {
    fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        let url = self.device_url(None, None)?;
        self.get_json(url).context("Loading device list")
    }

    fn load_history(&self, device: &DeviceQuery) -> Result<HistoryRecord> {
        let url = self.device_url(Some(device), Some("data"))?;
        self.get_json(url)
            .with_context(|| format!("Loading history of {}", device.mac))
    }

    fn load_config(&self, device: &DeviceQuery) -> Result<DeviceConfig> {
        let url = self.device_url(Some(device), Some("config"))?;
        self.get_json(url)
            .with_context(|| format!("Loading config of {}", device.mac))
    }

    fn patch_config(&self, device: &DeviceQuery, patch: &ConfigPatch) -> PatchOutcome {
        let url = match self.device_url(Some(device), Some("config")) {
            Ok(url) => url,
            Err(e) => return PatchOutcome::Failed(e.to_string()),
        };
        tracing::debug!("PATCH {} {:?}", url, patch.data);

        let response = match self.client.patch(url).json(patch).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Config update for {} failed: {}", device.mac, e);
                return PatchOutcome::Failed(e.to_string());
            }
        };
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        let outcome = PatchOutcome::from_status(status, body);
        if !outcome.is_delivered() {
            tracing::warn!("Config update for {} not applied: {:?}", device.mac, outcome);
        }
        outcome
    }
}
