//! Core data types for FridgeWatch
//!
//! This module contains the wire and domain types shared by the stream
//! pipeline, the backend worker and the UI.
//!
//! # Main Types
//!
//! - [`DeviceId`] - Opaque MAC-like identifier of one physical device
//! - [`Compartment`] - The two monitored zones (top/bottom) of a fridge
//! - [`ChartPoint`] - A single `(timestamp ms, temperature)` sample
//! - [`ReadingBatch`] - One inbound push-channel message
//! - [`HistoryRecord`] - Full stored history of a device (`"ts:value"` samples)
//! - [`DeviceConfig`] / [`ConfigPatch`] - Server-owned configuration and
//!   the partial updates the operator sends
//!
//! # Wire formats
//!
//! Live batches carry a mapping per compartment from string-encoded epoch
//! milliseconds to temperature:
//!
//! ```json
//! {"data": {"TopCompart": {"2000": "-3.9"}, "BotCompart": {"2000": -4.2}}}
//! ```
//!
//! Temperatures may arrive as JSON strings or numbers. Entries keep the order
//! they have in the document. History packs each sample as `"ts:value"`.

use crate::error::{DashboardError, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of points to render per series for performance
pub const MAX_RENDER_POINTS: usize = 2000;

/// Wire name of the top compartment series
pub const TOP_COMPART: &str = "TopCompart";

/// Wire name of the bottom compartment series
pub const BOT_COMPART: &str = "BotCompart";

/// Opaque device identifier (the device MAC address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One of the two monitored zones of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compartment {
    Top,
    Bottom,
}

impl Compartment {
    /// Both compartments, top first (the chart's series order)
    pub fn all() -> [Compartment; 2] {
        [Compartment::Top, Compartment::Bottom]
    }

    /// Name used on the wire and as the chart series name
    pub fn wire_name(&self) -> &'static str {
        match self {
            Compartment::Top => TOP_COMPART,
            Compartment::Bottom => BOT_COMPART,
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A single chart sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    /// Unix epoch timestamp in milliseconds
    pub x: i64,
    /// Temperature in degrees Celsius
    pub y: f64,
}

impl ChartPoint {
    pub fn new(x: i64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point in plot coordinates (x stays in milliseconds)
    pub fn as_plot_point(&self) -> [f64; 2] {
        [self.x as f64, self.y]
    }

    /// Local wall-clock rendering of the timestamp
    pub fn local_time(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.x)
            .map(|utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| self.x.to_string())
    }
}

/// Parse one packed history sample of the form `"timestamp:value"`
pub fn parse_sample(sample: &str) -> Result<ChartPoint> {
    let (ts, value) = sample.split_once(':').ok_or_else(|| {
        DashboardError::InvalidInput(format!("sample {:?} has no ':' separator", sample))
    })?;
    let x = ts
        .trim()
        .parse::<i64>()
        .map_err(|e| DashboardError::InvalidInput(format!("bad timestamp in {:?}: {}", sample, e)))?;
    let y = value
        .trim()
        .parse::<f64>()
        .map_err(|e| DashboardError::InvalidInput(format!("bad value in {:?}: {}", sample, e)))?;
    Ok(ChartPoint::new(x, y))
}

// ==================== Live batches ====================

/// Samples of one compartment in a live batch, in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompartmentReadings(pub Vec<ChartPoint>);

impl CompartmentReadings {
    pub fn points(&self) -> &[ChartPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Temperature that accepts both `"-4.2"` and `-4.2`
struct Temperature(f64);

impl<'de> Deserialize<'de> for Temperature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TemperatureVisitor;

        impl<'de> Visitor<'de> for TemperatureVisitor {
            type Value = Temperature;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a temperature as number or decimal string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Temperature, E> {
                Ok(Temperature(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Temperature, E> {
                Ok(Temperature(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Temperature, E> {
                Ok(Temperature(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Temperature, E> {
                v.trim()
                    .parse::<f64>()
                    .map(Temperature)
                    .map_err(|_| E::custom(format!("invalid temperature {:?}", v)))
            }
        }

        deserializer.deserialize_any(TemperatureVisitor)
    }
}

impl<'de> Deserialize<'de> for CompartmentReadings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ReadingsVisitor;

        impl<'de> Visitor<'de> for ReadingsVisitor {
            type Value = CompartmentReadings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from epoch milliseconds to temperature")
            }

            // Devices that sampled nothing send `null`
            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(CompartmentReadings::default())
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut points = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Temperature>()? {
                    let x = key.trim().parse::<i64>().map_err(|_| {
                        de::Error::custom(format!("invalid timestamp key {:?}", key))
                    })?;
                    points.push(ChartPoint::new(x, value.0));
                }
                Ok(CompartmentReadings(points))
            }
        }

        deserializer.deserialize_any(ReadingsVisitor)
    }
}

/// Per-compartment payload of a live batch
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BatchData {
    #[serde(rename = "TopCompart", default)]
    pub top: CompartmentReadings,
    #[serde(rename = "BotCompart", default)]
    pub bottom: CompartmentReadings,
}

/// One inbound push-channel message
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ReadingBatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BatchData,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl ReadingBatch {
    /// Parse a push-channel frame
    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Samples for one compartment, in document order
    pub fn points(&self, compartment: Compartment) -> &[ChartPoint] {
        match compartment {
            Compartment::Top => self.data.top.points(),
            Compartment::Bottom => self.data.bottom.points(),
        }
    }

    /// Total number of samples across both compartments
    pub fn point_count(&self) -> usize {
        self.data.top.len() + self.data.bottom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }
}

// ==================== History ====================

/// Identifying metadata of a device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceMeta {
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mac: String,
}

impl DeviceMeta {
    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.mac.clone())
    }
}

/// Packed `"ts:value"` samples per compartment, oldest first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryData {
    #[serde(rename = "TopCompart", default, deserialize_with = "null_as_default")]
    pub top: Vec<String>,
    #[serde(rename = "BotCompart", default, deserialize_with = "null_as_default")]
    pub bottom: Vec<String>,
}

/// Stored history of one device, as served by the data endpoint
///
/// The device list endpoint returns an array of the same shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub meta: DeviceMeta,
    #[serde(default)]
    pub data: HistoryData,
}

impl HistoryRecord {
    /// Raw packed samples of one compartment
    pub fn samples(&self, compartment: Compartment) -> &[String] {
        match compartment {
            Compartment::Top => &self.data.top,
            Compartment::Bottom => &self.data.bottom,
        }
    }

    /// Most recent parseable sample of one compartment
    pub fn last_point(&self, compartment: Compartment) -> Option<ChartPoint> {
        self.samples(compartment)
            .iter()
            .rev()
            .find_map(|s| parse_sample(s).ok())
    }
}

/// One card of the device list; same shape as a history record
pub type DeviceSummary = HistoryRecord;

// ==================== Configuration ====================

/// Operating configuration of a device (server owned, read copy)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub collect_freq: i64,
    #[serde(default)]
    pub send_freq: i64,
    #[serde(default)]
    pub turned_on: bool,
    #[serde(default)]
    pub stream_on: bool,
}

/// Fields of a partial configuration update; unset fields are not sent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatchData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub collect_freq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub send_freq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub turned_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stream_on: Option<bool>,
}

/// Body of a configuration PATCH request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub mac: String,
    pub data: ConfigPatchData,
}

impl ConfigPatch {
    /// Update sampling and report frequencies
    pub fn frequencies(mac: &DeviceId, collect_freq: i64, send_freq: i64) -> Self {
        Self {
            mac: mac.to_string(),
            data: ConfigPatchData {
                collect_freq: Some(collect_freq),
                send_freq: Some(send_freq),
                ..Default::default()
            },
        }
    }

    /// Switch the device on or off
    pub fn turned_on(mac: &DeviceId, turned_on: bool) -> Self {
        Self {
            mac: mac.to_string(),
            data: ConfigPatchData {
                turned_on: Some(turned_on),
                ..Default::default()
            },
        }
    }

    /// Enable or disable live streaming on the device
    pub fn stream_on(mac: &DeviceId, stream_on: bool) -> Self {
        Self {
            mac: mac.to_string(),
            data: ConfigPatchData {
                stream_on: Some(stream_on),
                ..Default::default()
            },
        }
    }

    /// Apply the patched fields to a local config copy
    pub fn apply_to(&self, config: &mut DeviceConfig) {
        if let Some(v) = self.data.collect_freq {
            config.collect_freq = v;
        }
        if let Some(v) = self.data.send_freq {
            config.send_freq = v;
        }
        if let Some(v) = self.data.turned_on {
            config.turned_on = v;
        }
        if let Some(v) = self.data.stream_on {
            config.stream_on = v;
        }
    }
}

/// Result of a configuration PATCH as the operator sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// HTTP 200
    Delivered,
    /// HTTP 400, carrying the server's message verbatim
    Rejected(String),
    /// Any other status or a transport failure
    Failed(String),
}

impl PatchOutcome {
    /// Classify a response by status code
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            200 => PatchOutcome::Delivered,
            400 => PatchOutcome::Rejected(body),
            other => PatchOutcome::Failed(format!("server answered with status {}", other)),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, PatchOutcome::Delivered)
    }
}

// ==================== Status ====================

/// Represents the state of the push channel of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No session or channel closed
    #[default]
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and receiving
    Connected,
    /// Connection error occurred
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Snapshot of the counters of one stream session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Frames received on the push channel
    pub frames_received: u64,
    /// Frames dropped because they did not parse
    pub frames_malformed: u64,
    /// Batches applied to the chart
    pub batches_drained: u64,
    /// Batches evicted from a bounded buffer
    pub batches_dropped: u64,
    /// Batches currently waiting in the buffer
    pub buffered: usize,
}
