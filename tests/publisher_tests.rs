use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use vehsim::publisher::{shutdown_channel, ShutdownSignal};
use vehsim::*;

// Paused clock advances to timer deadlines, which are rounded to the millisecond
fn assert_close(actual: Duration, expected: Duration) {
    let tolerance = Duration::from_millis(5);
    assert!(
        actual >= expected && actual <= expected + tolerance,
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

fn bounded_config(cycles: u64) -> PublisherConfig {
    PublisherConfig {
        max_cycles: Some(cycles),
        ..PublisherConfig::default()
    }
}

/// Records every write with the (paused) time it happened at.
#[derive(Clone, Default)]
struct RecordingStore {
    writes: Arc<Mutex<Vec<(Instant, String, Value)>>>,
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        self.writes
            .lock()
            .unwrap()
            .push((Instant::now(), path.to_string(), value.clone()));
        Ok(())
    }
}

/// Rejects every write the way the database does for a revoked secret.
#[derive(Clone, Default)]
struct RejectingStore {
    attempts: Arc<AtomicU32>,
}

#[async_trait]
impl RecordStore for RejectingStore {
    async fn set(&self, _path: &str, _value: &Value) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Auth {
            status: 401,
            message: "Permission denied".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_bounded_run_writes_each_cycle() {
    let store = MemoryStore::new();
    let mut publisher =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(11), bounded_config(4));

    let stats = publisher.run(ShutdownSignal::never()).await.unwrap();

    assert_eq!(stats.cycles_completed, 4);
    assert_eq!(store.write_count(), 4);
    // Every write replaced the same location
    assert_eq!(store.len(), 1);

    let latest = store.get("vehicule1").unwrap();
    assert_eq!(latest["timestamp"].as_str(), stats.last_timestamp.as_deref());
}

#[tokio::test(start_paused = true)]
async fn test_writes_are_spaced_by_interval() {
    let store = RecordingStore::default();
    let mut publisher =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(2), bounded_config(3));

    let started = Instant::now();
    publisher.run(ShutdownSignal::never()).await.unwrap();
    let elapsed = started.elapsed();

    let writes = store.writes.lock().unwrap();
    assert_eq!(writes.len(), 3);
    for pair in writes.windows(2) {
        assert_close(pair[1].0 - pair[0].0, Duration::from_secs(5));
    }
    assert!(writes.iter().all(|(_, path, _)| path == "vehicule1"));

    // No sleep after the final write
    assert_close(elapsed, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_last_write_is_the_stored_value() {
    let store = RecordingStore::default();
    let memory = MemoryStore::new();

    let mut recording =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(21), bounded_config(3));
    let mut replacing =
        Publisher::with_generator(memory.clone(), ReadingGenerator::seeded(21), bounded_config(3));
    recording.run(ShutdownSignal::never()).await.unwrap();
    replacing.run(ShutdownSignal::never()).await.unwrap();

    let writes = store.writes.lock().unwrap();
    let last = &writes.last().unwrap().2;
    let stored = memory.get("vehicule1").unwrap();

    for key in ["altitude", "temperature", "humidity", "speed", "battery", "led", "engine_state"] {
        assert_eq!(last[key], stored[key], "{}", key);
    }
}

#[tokio::test(start_paused = true)]
async fn test_store_receives_fields_in_record_order() {
    let store = RecordingStore::default();
    let mut publisher =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(5), bounded_config(2));
    publisher.run(ShutdownSignal::never()).await.unwrap();

    let expected = [
        "latitude",
        "longitude",
        "altitude",
        "temperature",
        "humidity",
        "speed",
        "battery",
        "engine_state",
        "led",
        "timestamp",
    ];
    let writes = store.writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    for (_, _, value) in writes.iter() {
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, expected);

        // The request body is this value serialized as-is
        let body = serde_json::to_string(value).unwrap();
        assert!(body.starts_with("{\"latitude\":"), "{}", body);
        assert!(body.ends_with(&format!("\"timestamp\":{}}}", value["timestamp"])), "{}", body);
    }
}

#[tokio::test(start_paused = true)]
async fn test_custom_vehicle_location() {
    let store = MemoryStore::new();
    let config = PublisherConfig {
        vehicle_id: "fleet/vehicule7".into(),
        ..bounded_config(1)
    };
    let mut publisher = Publisher::new(store.clone(), config);
    publisher.run(ShutdownSignal::never()).await.unwrap();

    assert!(store.get("fleet/vehicule7").is_some());
    assert!(store.get("vehicule1").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_is_fatal() {
    let store = RejectingStore::default();
    let mut publisher = Publisher::new(store.clone(), PublisherConfig::default());

    let error = publisher.run(ShutdownSignal::never()).await.unwrap_err();

    assert_eq!(error.cycle(), 1);
    assert!(matches!(
        error,
        PublishError::Store { source: StoreError::Auth { status: 401, .. }, .. }
    ));
    // Not retried
    assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(publisher.stats().cycles_completed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_sleep_stops_without_writing() {
    let store = MemoryStore::new();
    let (trigger, signal) = shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        trigger.trigger();
    });

    let started = Instant::now();
    let mut publisher =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(4), PublisherConfig::default());
    let stats = publisher.run(signal).await.unwrap();

    // Writes at t=0 and t=5, cancelled at t=7
    assert_eq!(stats.cycles_completed, 2);
    assert_eq!(store.write_count(), 2);
    assert_close(started.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_trigger_does_not_stop_the_loop() {
    let store = MemoryStore::new();
    let (trigger, signal) = shutdown_channel();
    drop(trigger);

    let mut publisher =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(4), bounded_config(3));
    let stats = publisher.run(signal).await.unwrap();

    assert_eq!(stats.cycles_completed, 3);
}

#[tokio::test]
async fn test_run_cycle_record_matches_rules() {
    let store = MemoryStore::new();
    let mut publisher =
        Publisher::with_generator(store.clone(), ReadingGenerator::seeded(77), PublisherConfig::default());

    for _ in 0..25 {
        let record = publisher.run_cycle().await.unwrap();
        assert_eq!(record.led, status::led_color(record.temperature, record.humidity));
        assert_eq!(record.engine_state, status::engine_state(record.speed));
        assert_eq!(store.get("vehicule1").unwrap(), record.to_json().unwrap());
    }
    assert_eq!(publisher.stats().cycles_completed, 25);
}
