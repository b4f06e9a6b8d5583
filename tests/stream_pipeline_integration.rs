//! Integration tests for the live stream pipeline
//!
//! These tests drive the ingest -> buffer -> drain -> chart path without a
//! network, feeding frames through the ingestor and ticking the scheduler:
//! - Ordering across batches and compartments
//! - Toggle gating and independence from ingestion
//! - At most one batch per tick
//! - History seeding followed by live appends

mod common;

use common::builders::{BatchBuilder, HistoryBuilder};
use fridgewatch::stream::{
    DrainScheduler, SessionContext, SessionSettings, StreamIngestor, StreamSession, TickOutcome,
};
use fridgewatch::types::{ChartPoint, Compartment, DeviceId};
use std::time::Duration;

fn pipeline(capacity: Option<usize>) -> (SessionContext, StreamIngestor, DrainScheduler) {
    let context = SessionContext::new(DeviceId::new("AA:11"), capacity);
    let ingestor = StreamIngestor::new(context.clone());
    let scheduler = DrainScheduler::new(context.clone(), Duration::from_millis(50));
    (context, ingestor, scheduler)
}

fn xs(context: &SessionContext, compartment: Compartment) -> Vec<i64> {
    context
        .lock_chart()
        .series(compartment)
        .iter()
        .map(|p| p.x)
        .collect()
}

#[test]
fn test_batches_drain_in_arrival_order() {
    let (context, ingestor, scheduler) = pipeline(None);
    context.toggle().set(true);

    for ts in [3000, 1000, 2000] {
        let frame = BatchBuilder::new().top(ts, "1.0").bottom(ts, "2.0").to_json();
        assert!(ingestor.handle_frame(&frame));
    }
    for _ in 0..3 {
        scheduler.tick();
    }

    // Arrival order, not timestamp order
    assert_eq!(xs(&context, Compartment::Top), vec![3000, 1000, 2000]);
    assert_eq!(xs(&context, Compartment::Bottom), vec![3000, 1000, 2000]);
}

#[test]
fn test_points_within_batch_keep_document_order() {
    let (context, ingestor, scheduler) = pipeline(None);
    context.toggle().set(true);

    ingestor.handle_frame(r#"{"data":{"TopCompart":{"3000":"1","1000":"2","2000":"3"}}}"#);
    scheduler.tick();

    assert_eq!(xs(&context, Compartment::Top), vec![3000, 1000, 2000]);
    assert!(xs(&context, Compartment::Bottom).is_empty());
}

#[test]
fn test_ingestion_continues_while_toggle_off() {
    let (context, ingestor, scheduler) = pipeline(None);

    for ts in [1000, 2000] {
        ingestor.handle_frame(&BatchBuilder::new().top(ts, "-4.0").to_json());
    }
    assert_eq!(scheduler.tick(), TickOutcome::Disabled);
    assert_eq!(context.buffered(), 2);
    assert!(context.lock_chart().is_empty());

    context.toggle().set(true);
    assert!(matches!(scheduler.tick(), TickOutcome::Drained { points: 1 }));
    assert_eq!(context.buffered(), 1);
}

#[test]
fn test_at_most_one_batch_per_tick() {
    let (context, ingestor, scheduler) = pipeline(None);
    context.toggle().set(true);

    for ts in 1..=5 {
        ingestor.handle_frame(&BatchBuilder::new().top(ts * 1000, "0.5").to_json());
    }
    for remaining in (0..5).rev() {
        scheduler.tick();
        assert_eq!(context.buffered(), remaining);
    }
    assert_eq!(scheduler.tick(), TickOutcome::Idle);
    assert_eq!(context.stats().batches_drained, 5);
}

#[test]
fn test_malformed_frame_does_not_stop_ingestion() {
    let (context, ingestor, scheduler) = pipeline(None);
    context.toggle().set(true);

    assert!(ingestor.handle_frame(&BatchBuilder::new().top(1000, "1").to_json()));
    assert!(!ingestor.handle_frame("{not json"));
    assert!(!ingestor.handle_frame(r#"{"data":{"TopCompart":{"abc":"1"}}}"#));
    assert!(ingestor.handle_frame(&BatchBuilder::new().top(2000, "2").to_json()));

    scheduler.tick();
    scheduler.tick();

    assert_eq!(xs(&context, Compartment::Top), vec![1000, 2000]);
    let stats = context.stats();
    assert_eq!(stats.frames_received, 4);
    assert_eq!(stats.frames_malformed, 2);
}

#[test]
fn test_bounded_buffer_evicts_oldest() {
    let (context, ingestor, scheduler) = pipeline(Some(2));
    context.toggle().set(true);

    for ts in [1000, 2000, 3000] {
        ingestor.handle_frame(&BatchBuilder::new().top(ts, "1").to_json());
    }
    assert_eq!(context.stats().batches_dropped, 1);

    scheduler.tick();
    scheduler.tick();
    assert_eq!(xs(&context, Compartment::Top), vec![2000, 3000]);
}

#[test]
fn test_seeding_twice_duplicates_history() {
    let context = SessionContext::new(DeviceId::new("AA:11"), None);
    let record = HistoryBuilder::new("AA:11").top("1000:-4.5").bottom("1000:-4.5").build();

    context.lock_chart().seed_from_history(&record);
    context.lock_chart().seed_from_history(&record);

    assert_eq!(xs(&context, Compartment::Top), vec![1000, 1000]);
    assert_eq!(xs(&context, Compartment::Bottom), vec![1000, 1000]);
}

#[test]
fn test_device_view_scenario() {
    let (context, ingestor, scheduler) = pipeline(None);
    let record = HistoryBuilder::new("AA:11").top("1000:-4.5").bottom("1000:-4.5").build();
    context.lock_chart().seed_from_history(&record);
    context.toggle().set(true);

    let frame = r#"{"data":{"BotCompart":{"2000":"-4.2"},"TopCompart":{"2000":"-3.9"}}}"#;
    for _ in 0..3 {
        assert!(ingestor.handle_frame(frame));
    }

    scheduler.tick();
    {
        let chart = context.lock_chart();
        for compartment in Compartment::all() {
            assert_eq!(chart.len(compartment), 2);
            assert_eq!(chart.series(compartment)[1].x, 2000);
        }
        assert_eq!(chart.series(Compartment::Top)[1], ChartPoint::new(2000, -3.9));
        assert_eq!(chart.series(Compartment::Bottom)[1], ChartPoint::new(2000, -4.2));
    }

    scheduler.tick();
    scheduler.tick();
    assert_eq!(xs(&context, Compartment::Top), vec![1000, 2000, 2000, 2000]);
    assert_eq!(xs(&context, Compartment::Bottom), vec![1000, 2000, 2000, 2000]);
    assert_eq!(context.buffered(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_timer_drains_one_batch_per_interval() {
    let context = SessionContext::new(DeviceId::new("AA:11"), None);
    let ingestor = StreamIngestor::new(context.clone());
    for ts in [2000, 3000, 4000] {
        ingestor.handle_frame(&BatchBuilder::new().top(ts, "-3.0").to_json());
    }

    let record = HistoryBuilder::new("AA:11").top("1000:-4.5").build();
    let session = StreamSession::open(
        &tokio::runtime::Handle::current(),
        context.clone(),
        Some(&record),
        SessionSettings {
            endpoint: None,
            drain_interval: Duration::from_millis(50),
            ..Default::default()
        },
    );

    // Toggle off: nothing but history reaches the chart
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(xs(&context, Compartment::Top), vec![1000]);

    context.toggle().set(true);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(xs(&context, Compartment::Top).len(), 2);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(xs(&context, Compartment::Top), vec![1000, 2000, 3000, 4000]);

    session.close().await;
}
