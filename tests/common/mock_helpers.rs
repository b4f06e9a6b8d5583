//! Mock construction helpers

use crossbeam_channel::{bounded, Receiver, Sender};
use fridgewatch::backend::{BackendMessage, DeviceApi, FrontendReceiver};
use fridgewatch::query::DeviceQuery;
use fridgewatch::types::{ConfigPatch, DeviceConfig, DeviceSummary, HistoryRecord, PatchOutcome};
use fridgewatch::Result;
use mockall::mock;
use std::time::{Duration, Instant};

mock! {
    pub DeviceApi {}

    impl DeviceApi for DeviceApi {
        fn list_devices(&self) -> Result<Vec<DeviceSummary>>;
        fn load_history(&self, device: &DeviceQuery) -> Result<HistoryRecord>;
        fn load_config(&self, device: &DeviceQuery) -> Result<DeviceConfig>;
        fn patch_config(&self, device: &DeviceQuery, patch: &ConfigPatch) -> PatchOutcome;
    }
}

/// Create test channels with default size
pub fn create_test_channels<T, U>() -> (Sender<T>, Receiver<T>, Sender<U>, Receiver<U>) {
    let (tx1, rx1) = bounded(16);
    let (tx2, rx2) = bounded(16);
    (tx1, rx1, tx2, rx2)
}

/// Poll the frontend until a message matches `pred` or `timeout` passes.
/// Messages that do not match are returned in the second slot.
pub fn wait_for_message<F>(
    frontend: &FrontendReceiver,
    timeout: Duration,
    mut pred: F,
) -> (Option<BackendMessage>, Vec<BackendMessage>)
where
    F: FnMut(&BackendMessage) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut skipped = Vec::new();
    while Instant::now() < deadline {
        match frontend.receiver.recv_timeout(Duration::from_millis(10)) {
            Ok(msg) if pred(&msg) => return (Some(msg), skipped),
            Ok(msg) => skipped.push(msg),
            Err(_) => {}
        }
    }
    (None, skipped)
}
