//! Operator switch gating the drain scheduler
//!
//! The toggle only decides whether buffered batches reach the chart. It never
//! pauses the push channel and never clears the buffer, so batches received
//! while it is off are shown in order once it is turned back on.

use crate::types::{ConfigPatch, DeviceId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session-local enabled flag, shared between UI and drain task
#[derive(Debug, Clone, Default)]
pub struct StreamToggle {
    enabled: Arc<AtomicBool>,
}

impl StreamToggle {
    /// A new toggle starts off
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Invert the flag and return the new state
    pub fn flip(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::AcqRel)
    }

    /// Button label for the current state
    pub fn label(&self) -> &'static str {
        if self.is_enabled() {
            "On"
        } else {
            "Off"
        }
    }
}

/// Result of operating the toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleChange {
    pub enabled: bool,
    /// `streamOn` update to send, present only when server sync is enabled
    pub patch: Option<ConfigPatch>,
}

/// Toggle bound to a device, optionally mirroring changes to the server
#[derive(Debug, Clone)]
pub struct ToggleControl {
    toggle: StreamToggle,
    device: DeviceId,
    sync_with_server: bool,
}

impl ToggleControl {
    pub fn new(toggle: StreamToggle, device: DeviceId, sync_with_server: bool) -> Self {
        Self {
            toggle,
            device,
            sync_with_server,
        }
    }

    pub fn toggle(&self) -> &StreamToggle {
        &self.toggle
    }

    pub fn flip(&self) -> ToggleChange {
        let enabled = self.toggle.flip();
        self.change(enabled)
    }

    pub fn set(&self, enabled: bool) -> ToggleChange {
        self.toggle.set(enabled);
        self.change(enabled)
    }

    fn change(&self, enabled: bool) -> ToggleChange {
        tracing::debug!(device = %self.device, enabled, "Stream toggle changed");
        ToggleChange {
            enabled,
            patch: self
                .sync_with_server
                .then(|| ConfigPatch::stream_on(&self.device, enabled)),
        }
    }
}
