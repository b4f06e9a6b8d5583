//! Application module
//!
//! Re-exports the main application type from the frontend module.

pub use crate::frontend::DashboardApp;

pub use crate::frontend::{DeviceAction, DeviceViewState};
