//! Integration tests for backend lifecycle
//!
//! These tests run the backend thread against a mocked device API:
//! - Device list loading
//! - Opening a device seeds the chart and publishes the session
//! - Load failures are reported but the session still opens
//! - Configuration updates report their outcome
//! - Shutdown closes the open session

mod common;

use common::builders::{device_config, HistoryBuilder};
use common::mock_helpers::{wait_for_message, MockDeviceApi};
use common::test_timeout;
use fridgewatch::backend::{BackendMessage, DashboardBackend, FrontendReceiver};
use fridgewatch::config::DashboardConfig;
use fridgewatch::error::DashboardError;
use fridgewatch::query::DeviceQuery;
use fridgewatch::types::{Compartment, ConfigPatch, PatchOutcome};
use std::thread::{self, JoinHandle};

/// Config whose push channel points at a closed local port
fn offline_config() -> DashboardConfig {
    DashboardConfig {
        server_url: "http://127.0.0.1:9".to_string(),
        stream_port: 9,
        ..Default::default()
    }
}

fn spawn_backend(api: MockDeviceApi) -> (FrontendReceiver, JoinHandle<()>) {
    let (backend, frontend) = DashboardBackend::new(offline_config(), Box::new(api));
    let handle = thread::spawn(move || backend.run());
    (frontend, handle)
}

fn shutdown(frontend: FrontendReceiver, handle: JoinHandle<()>) {
    frontend.shutdown();
    let (msg, _) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::Shutdown)
    });
    assert!(msg.is_some(), "Backend should acknowledge shutdown");
    assert!(handle.join().is_ok(), "Backend thread should exit cleanly");
}

fn query() -> DeviceQuery {
    DeviceQuery::new("AA:11", "fridge", "Kitchen")
}

#[test]
fn test_backend_creation_and_shutdown() {
    let (frontend, handle) = spawn_backend(MockDeviceApi::new());
    shutdown(frontend, handle);
}

#[test]
fn test_backend_exits_when_ui_dropped() {
    let (frontend, handle) = spawn_backend(MockDeviceApi::new());
    drop(frontend);
    assert!(handle.join().is_ok());
}

#[test]
fn test_refresh_devices() {
    let mut api = MockDeviceApi::new();
    api.expect_list_devices().times(1).returning(|| {
        Ok(vec![
            HistoryBuilder::new("AA:11").top("1000:-4.5").build(),
            HistoryBuilder::new("BB:22").build(),
        ])
    });

    let (frontend, handle) = spawn_backend(api);
    frontend.refresh_devices();

    let (msg, _) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::DeviceList(_))
    });
    match msg {
        Some(BackendMessage::DeviceList(devices)) => {
            assert_eq!(devices.len(), 2);
            assert_eq!(devices[0].meta.mac, "AA:11");
        }
        other => panic!("Expected device list, got {:?}", other),
    }

    shutdown(frontend, handle);
}

#[test]
fn test_open_device_seeds_chart() {
    let mut api = MockDeviceApi::new();
    api.expect_load_history()
        .withf(|q| q.mac.as_str() == "AA:11")
        .times(1)
        .returning(|_| {
            Ok(HistoryBuilder::new("AA:11")
                .name("Kitchen")
                .top("1000:-4.5")
                .bottom("1000:-5.0")
                .build())
        });
    api.expect_load_config()
        .times(1)
        .returning(|q| Ok(device_config(q.mac.as_str())));

    let (frontend, handle) = spawn_backend(api);
    frontend.open_device(query());

    let (msg, _) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SessionOpened(_))
    });
    let Some(BackendMessage::SessionOpened(opened)) = msg else {
        panic!("Expected SessionOpened");
    };
    assert_eq!(opened.query, query());
    assert_eq!(opened.meta.as_ref().map(|m| m.name.as_str()), Some("Kitchen"));
    assert_eq!(opened.config.as_ref().map(|c| c.send_freq), Some(30));
    {
        let chart = opened.context.lock_chart();
        assert_eq!(chart.len(Compartment::Top), 1);
        assert_eq!(chart.len(Compartment::Bottom), 1);
    }
    // Streaming starts paused
    assert!(!opened.context.toggle().is_enabled());

    frontend.close_device();
    let (closed, _) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SessionClosed(_))
    });
    assert!(matches!(closed, Some(BackendMessage::SessionClosed(id)) if id.as_str() == "AA:11"));

    shutdown(frontend, handle);
}

#[test]
fn test_open_device_survives_load_failures() {
    let mut api = MockDeviceApi::new();
    api.expect_load_history()
        .returning(|_| Err(DashboardError::InvalidInput("history unavailable".into())));
    api.expect_load_config()
        .returning(|_| Err(DashboardError::InvalidInput("config unavailable".into())));

    let (frontend, handle) = spawn_backend(api);
    frontend.open_device(query());

    let (msg, skipped) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SessionOpened(_))
    });
    let Some(BackendMessage::SessionOpened(opened)) = msg else {
        panic!("Session should open despite load failures");
    };
    assert!(opened.meta.is_none());
    assert!(opened.config.is_none());
    assert!(opened.context.lock_chart().is_empty());

    let errors = skipped
        .iter()
        .filter(|m| matches!(m, BackendMessage::Error(_)))
        .count();
    assert_eq!(errors, 2);

    shutdown(frontend, handle);
}

#[test]
fn test_open_device_without_mac_reports_error() {
    let (frontend, handle) = spawn_backend(MockDeviceApi::new());
    frontend.open_device(DeviceQuery::from_address("http://host/fridge.html?type=fridge"));

    let (msg, skipped) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::Error(_))
    });
    assert!(msg.is_some());
    assert!(!skipped.iter().any(|m| matches!(m, BackendMessage::SessionOpened(_))));

    shutdown(frontend, handle);
}

#[test]
fn test_patch_outcomes_are_reported() {
    let mut api = MockDeviceApi::new();
    api.expect_load_history()
        .returning(|_| Ok(HistoryBuilder::new("AA:11").build()));
    api.expect_load_config()
        .returning(|q| Ok(device_config(q.mac.as_str())));
    api.expect_patch_config()
        .times(3)
        .returning(|_, patch| match patch.data.collect_freq {
            Some(1) => PatchOutcome::from_status(200, String::new()),
            Some(2) => PatchOutcome::from_status(400, "sendFreq out of range".into()),
            _ => PatchOutcome::from_status(503, String::new()),
        });

    let (frontend, handle) = spawn_backend(api);
    frontend.open_device(query());
    let (opened, _) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::SessionOpened(_))
    });
    assert!(opened.is_some());

    let mac = query().mac;
    for collect in [1, 2, 3] {
        frontend.patch_config(ConfigPatch::frequencies(&mac, collect, 30));
    }

    let mut outcomes = Vec::new();
    while outcomes.len() < 3 {
        let (msg, _) = wait_for_message(&frontend, test_timeout(), |m| {
            matches!(m, BackendMessage::PatchResult { .. })
        });
        match msg {
            Some(BackendMessage::PatchResult { outcome, .. }) => outcomes.push(outcome),
            _ => panic!("Missing patch result"),
        }
    }

    assert_eq!(outcomes[0], PatchOutcome::Delivered);
    assert_eq!(outcomes[1], PatchOutcome::Rejected("sendFreq out of range".into()));
    assert!(matches!(outcomes[2], PatchOutcome::Failed(_)));

    shutdown(frontend, handle);
}

#[test]
fn test_patch_without_open_device_is_an_error() {
    let mut api = MockDeviceApi::new();
    api.expect_patch_config().never();

    let (frontend, handle) = spawn_backend(api);
    frontend.patch_config(ConfigPatch::turned_on(&query().mac, false));

    let (msg, _) = wait_for_message(&frontend, test_timeout(), |m| {
        matches!(m, BackendMessage::Error(_))
    });
    assert!(msg.is_some());

    shutdown(frontend, handle);
}
