//! Test data builders for push frames, history and device configuration

use fridgewatch::types::{DeviceConfig, DeviceMeta, HistoryData, HistoryRecord, ReadingBatch};

/// Builder for push-channel frames
#[derive(Debug, Default, Clone)]
pub struct BatchBuilder {
    top: Vec<(String, String)>,
    bottom: Vec<(String, String)>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(mut self, ts: i64, value: &str) -> Self {
        self.top.push((ts.to_string(), value.to_string()));
        self
    }

    pub fn bottom(mut self, ts: i64, value: &str) -> Self {
        self.bottom.push((ts.to_string(), value.to_string()));
        self
    }

    /// The frame as the server sends it; bottom compartment first
    pub fn to_json(&self) -> String {
        fn entries(pairs: &[(String, String)]) -> String {
            pairs
                .iter()
                .map(|(ts, v)| format!("\"{}\":\"{}\"", ts, v))
                .collect::<Vec<_>>()
                .join(",")
        }
        format!(
            "{{\"data\":{{\"BotCompart\":{{{}}},\"TopCompart\":{{{}}}}}}}",
            entries(&self.bottom),
            entries(&self.top)
        )
    }

    pub fn build(&self) -> ReadingBatch {
        ReadingBatch::from_json(&self.to_json()).expect("builder produced invalid frame")
    }
}

/// Builder for a device history record
#[derive(Debug, Clone)]
pub struct HistoryBuilder {
    meta: DeviceMeta,
    top: Vec<String>,
    bottom: Vec<String>,
}

impl HistoryBuilder {
    pub fn new(mac: &str) -> Self {
        Self {
            meta: DeviceMeta {
                device_type: "fridge".to_string(),
                name: format!("Fridge {}", mac),
                mac: mac.to_string(),
            },
            top: Vec::new(),
            bottom: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.meta.name = name.to_string();
        self
    }

    pub fn top(mut self, sample: &str) -> Self {
        self.top.push(sample.to_string());
        self
    }

    pub fn bottom(mut self, sample: &str) -> Self {
        self.bottom.push(sample.to_string());
        self
    }

    pub fn build(self) -> HistoryRecord {
        HistoryRecord {
            meta: self.meta,
            data: HistoryData {
                top: self.top,
                bottom: self.bottom,
            },
        }
    }
}

/// A powered-on device configuration with streaming off
pub fn device_config(mac: &str) -> DeviceConfig {
    DeviceConfig {
        mac: mac.to_string(),
        collect_freq: 5,
        send_freq: 30,
        turned_on: true,
        stream_on: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fridgewatch::types::{ChartPoint, Compartment};

    #[test]
    fn test_batch_builder_frame_parses() {
        let batch = BatchBuilder::new().top(2000, "-3.9").bottom(2000, "-4.2").build();
        assert_eq!(batch.points(Compartment::Top), &[ChartPoint::new(2000, -3.9)]);
        assert_eq!(batch.points(Compartment::Bottom), &[ChartPoint::new(2000, -4.2)]);
    }

    #[test]
    fn test_history_builder() {
        let record = HistoryBuilder::new("AA:11").top("1000:-4.5").build();
        assert_eq!(record.meta.mac, "AA:11");
        assert_eq!(record.data.top.len(), 1);
        assert!(record.data.bottom.is_empty());
    }
}
