//! Integration tests exercising the store, router, and change bus
//! together.

use std::sync::Arc;

use proptest::prelude::*;

use metra_store::{MetricStore, QueryRouter, ReadingQuery, Rows};
use metra_types::{Address, GroupKind, MetricGroup, Sample};

fn group(id: i64, title: &str, kind: GroupKind) -> MetricGroup {
    MetricGroup {
        id,
        title: title.to_string(),
        description: "integration".to_string(),
        supported: true,
        power: 2.0,
        min_interval: 500,
        max_range: "1000".to_string(),
        resolution: "1".to_string(),
        kind,
    }
}

#[test]
fn monitor_session_lifecycle_end_to_end() {
    let store = Arc::new(MetricStore::open_in_memory().unwrap());
    let router = QueryRouter::new(store.clone());
    let mut changes = store.subscribe();

    // A new session gets the first monotonically-assigned id
    let monitor_id = store.create_monitor(0).unwrap();
    assert_eq!(monitor_id, 1);
    assert_eq!(changes.try_recv().unwrap(), Address::Monitor(1));

    // Batch of three readings for metric 7
    let samples = [
        Sample::new(100, 1.0),
        Sample::new(200, 2.0),
        Sample::new(300, 3.0),
    ];
    let inserted = store.insert_reading_batch(7, monitor_id, &samples).unwrap();
    assert_eq!(inserted, 3);
    assert_eq!(changes.try_recv().unwrap(), Address::MonitorReadings(1));

    // The monitor's data address returns the rows in insertion order
    let result = router.query_path("monitordata/1").unwrap();
    assert_eq!(result.address, Address::MonitorReadings(1));
    match &result.rows {
        Rows::Readings(readings) => {
            assert_eq!(readings.len(), 3);
            for (reading, sample) in readings.iter().zip(&samples) {
                assert_eq!(reading.metric_id, 7);
                assert_eq!(reading.monitor_id, 1);
                assert_eq!(reading.timestamp, sample.timestamp);
                assert_eq!(reading.value, sample.value);
            }
        }
        other => panic!("expected readings, got {other:?}"),
    }

    // Purging at threshold 2 removes everything from monitor 1
    let purged = store.purge_readings(2).unwrap();
    assert_eq!(purged, 3);
    assert_eq!(changes.try_recv().unwrap(), Address::Readings);

    let after = router.query_path("monitordata/1").unwrap();
    assert!(after.rows.is_empty());
    assert!(changes.try_recv().is_err());
}

#[test]
fn catalog_is_visible_through_every_address_shape() {
    let store = Arc::new(MetricStore::open_in_memory().unwrap());
    let router = QueryRouter::new(store.clone());

    store
        .upsert_metric_group(&group(1, "CPU", GroupKind::System))
        .unwrap();
    store
        .upsert_metric_group(&group(2, "Light", GroupKind::Sensor))
        .unwrap();

    assert_eq!(router.query_path("info").unwrap().rows.len(), 2);
    assert_eq!(router.query_path("info/2").unwrap().rows.len(), 1);
    assert_eq!(router.query_path("category/system").unwrap().rows.len(), 1);
    assert_eq!(router.query_path("category/user").unwrap().rows.len(), 0);
}

#[test]
fn readings_survive_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("metrics").join("data.db");

    {
        let store = MetricStore::open(&db_path).unwrap();
        let monitor_id = store.create_monitor(1_000).unwrap();
        store
            .insert_reading_batch(7, monitor_id, &[Sample::new(100, 1.0), Sample::new(200, 2.0)])
            .unwrap();
    }

    let reopened = MetricStore::open(&db_path).unwrap();
    assert_eq!(reopened.count_readings(None).unwrap(), 2);

    let monitor = reopened.get_monitor(1).unwrap().unwrap();
    assert_eq!(monitor.time_offset, 1_000);
    assert!(monitor.is_active());
}

#[test]
fn subscriber_sees_replacement_and_category_change() {
    let store = Arc::new(MetricStore::open_in_memory().unwrap());
    let mut changes = store.subscribe();

    store
        .upsert_metric_group(&group(5, "Pressure", GroupKind::Sensor))
        .unwrap();
    assert_eq!(changes.try_recv().unwrap(), Address::Group(5));
    assert_eq!(
        changes.try_recv().unwrap(),
        Address::Category(GroupKind::Sensor)
    );

    // Re-registering the group under another category notifies the new
    // category's filtered view
    store
        .upsert_metric_group(&group(5, "Pressure", GroupKind::User))
        .unwrap();
    assert_eq!(changes.try_recv().unwrap(), Address::Group(5));
    assert_eq!(
        changes.try_recv().unwrap(),
        Address::Category(GroupKind::User)
    );
}

#[test]
fn bounded_scans_page_through_history() {
    let store = MetricStore::open_in_memory().unwrap();

    for i in 0..10i64 {
        store.insert_reading(7, 1, i * 100, i as f64).unwrap();
    }

    let page = store
        .query_readings(&ReadingQuery::new().monitor(1).oldest_first().limit(4).offset(4))
        .unwrap();
    assert_eq!(page.len(), 4);
    assert_eq!(page[0].timestamp, 400);
    assert_eq!(page[3].timestamp, 700);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn purge_retains_exactly_the_sessions_at_or_above_threshold(
        monitor_ids in proptest::collection::vec(0i64..40, 0..60),
        threshold in 0i64..50,
    ) {
        let store = MetricStore::open_in_memory().unwrap();
        for (i, monitor_id) in monitor_ids.iter().enumerate() {
            store
                .insert_reading(1, *monitor_id, i as i64 * 10, 1.0)
                .unwrap();
        }

        let expected_purged = monitor_ids.iter().filter(|id| **id < threshold).count();
        let purged = store.purge_readings(threshold).unwrap();
        prop_assert_eq!(purged, expected_purged);

        let remaining = store.select_readings(None).unwrap();
        prop_assert!(remaining.iter().all(|r| r.monitor_id >= threshold));
        prop_assert_eq!(remaining.len(), monitor_ids.len() - expected_purged);
    }
}
