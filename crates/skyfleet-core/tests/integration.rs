//! Integration tests for skyfleet-core
//!
//! Most tests run the full ingest, select and readout pipeline against the
//! in-memory mock feed. Tests against the public feeds are ignored by default:
//! `cargo test --package skyfleet-core -- --ignored --nocapture`

use std::sync::Arc;
use std::time::Duration;

use skyfleet_core::time_index::{format_label, to_array_index};
use skyfleet_core::{
    FeedEndpoints, FixedClock, HourOffset, HttpFeedClient, IngestOptions, MockFeed,
    MockFeedBuilder, ObjectKey, Position, RecordingMapView, RetryConfig, SelectionController,
    SnapshotIngestor, SnapshotOutcome, Trajectory, WeatherCache, WeatherReadout,
};
use tokio::time::timeout;

/// Timeout for requests against the public feeds.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(60);

fn ingestor(feed: &Arc<MockFeed>) -> SnapshotIngestor {
    SnapshotIngestor::new(feed.clone()).retry(RetryConfig::none())
}

fn controller(
    feed: &Arc<MockFeed>,
    store: skyfleet_core::TrajectoryStore,
    map: &Arc<RecordingMapView>,
) -> SelectionController {
    SelectionController::new(
        Arc::new(store),
        Arc::new(WeatherCache::new(feed.clone()).retry(RetryConfig::none())),
        map.clone(),
        Arc::new(FixedClock::new(12)),
    )
}

#[tokio::test]
async fn test_failed_hour_does_not_affect_others() {
    let origins = [Position::new(10.0, 20.0), Position::new(-5.0, 100.0)];

    for failing in 0u8..24 {
        let feed = Arc::new(
            MockFeedBuilder::new()
                .drifting_fleet(24, &origins)
                .fail_snapshot(failing)
                .build(),
        );
        let report = ingestor(&feed).ingest_all().await;
        assert_eq!(report.loaded(), 23);

        for (key, trajectory) in report.store.iter() {
            let origin = origins[key.index()];
            for hour in (0..24u8).filter(|h| *h != failing) {
                let expected = Position::new(origin.lat + f64::from(hour) * 0.1, origin.lng);
                assert_eq!(trajectory.position_at(usize::from(hour)).unwrap(), expected);
            }
            let gap = trajectory.position_at(usize::from(failing)).unwrap_err();
            assert!(gap.is_no_data(), "hour {} of {}: {}", failing, key, gap);
        }
    }
}

#[tokio::test]
async fn test_one_success_one_failure() {
    let feed = Arc::new(
        MockFeedBuilder::new()
            .snapshot(0, vec![Position::new(1.0, 2.0), Position::new(3.0, 4.0)])
            .fail_snapshot(1)
            .build(),
    );

    let report = SnapshotIngestor::with_options(feed.clone(), IngestOptions::new().snapshot_count(2))
        .retry(RetryConfig::none())
        .ingest_all()
        .await;

    assert!(report.outcomes[0].outcome.is_loaded());
    assert!(matches!(
        report.outcomes[1].outcome,
        SnapshotOutcome::Failed { .. }
    ));
    assert_eq!(report.store.len(), 2);
    for (_, trajectory) in report.store.iter() {
        assert_eq!(trajectory.len(), 1);
        assert_eq!(trajectory.recorded(), 1);
        assert!(trajectory.position_at(0).is_ok());
    }
}

#[test]
fn test_index_mapping_edges() {
    assert_eq!(to_array_index(HourOffset::new(0).unwrap()), 0);
    assert_eq!(to_array_index(HourOffset::new(-23).unwrap()), 23);
    assert_eq!(format_label(-1), "23:00");
    assert_eq!(format_label(24), "00:00");
}

#[tokio::test]
async fn test_weather_fetched_once_per_key() {
    let feed = Arc::new(MockFeed::new());
    let cache = WeatherCache::new(feed.clone()).retry(RetryConfig::none());
    let trajectory = Trajectory::from_positions(vec![Position::new(1.0, 1.0); 24]);

    cache.fetch_for(ObjectKey::new(3), &trajectory).await;
    assert_eq!(feed.forecast_requests(), 24);

    cache.fetch_for(ObjectKey::new(3), &trajectory).await;
    assert_eq!(feed.forecast_requests(), 24);
}

#[tokio::test]
async fn test_select_pans_to_index_zero() {
    let feed = Arc::new(
        MockFeedBuilder::new()
            .drifting_fleet(24, &[Position::new(10.0, 20.0)])
            .build(),
    );
    let store = ingestor(&feed).ingest_all().await.into_store();
    assert_eq!(store.get(ObjectKey::new(0)).map(Trajectory::len), Some(24));

    let map = Arc::new(RecordingMapView::new());
    let mut controller = controller(&feed, store, &map);
    controller.select_balloon(ObjectKey::new(0)).unwrap();

    assert_eq!(map.pans(), vec![Position::new(10.0, 20.0)]);
}

#[tokio::test]
async fn test_weather_series_keeps_order_of_successes() {
    let feed = Arc::new(MockFeedBuilder::new().fail_forecast_at(2.0, 0.0).build());
    let cache = WeatherCache::new(feed.clone()).retry(RetryConfig::none());
    let trajectory = Trajectory::from_positions([
        Position::new(1.0, 0.0),
        Position::new(2.0, 0.0),
        Position::new(3.0, 0.0),
    ]);

    let series = cache.fetch_for(ObjectKey::new(0), &trajectory).await;

    assert_eq!(series.len(), 2);
    let latitudes: Vec<_> = series.payloads().map(|p| p.latitude).collect();
    assert_eq!(latitudes, vec![Some(1.0), Some(3.0)]);
}

#[tokio::test]
async fn test_full_pipeline_readout() {
    let feed = Arc::new(
        MockFeedBuilder::new()
            .drifting_fleet(24, &[Position::new(40.0, -100.0), Position::new(0.0, 0.0)])
            .fail_snapshot(5)
            .build(),
    );
    let store = ingestor(&feed).ingest_all().await.into_store();
    let map = Arc::new(RecordingMapView::new());
    let mut controller = controller(&feed, store, &map);
    let key = ObjectKey::new(0);

    controller.select_balloon(key).unwrap().await.unwrap();
    // one request per recorded hour; hour 5 was never ingested
    assert_eq!(feed.forecast_requests(), 23);

    controller.set_offset(-3).unwrap();
    let readout = controller.readout().await.unwrap();
    assert_eq!(readout.label, "09:00");
    let expected_lat = 40.0 + 3.0 * 0.1;
    assert_eq!(readout.position, Some(Position::new(expected_lat, -100.0)));
    match readout.weather {
        WeatherReadout::Conditions(c) => {
            // requested at latitude 40.3; window hour 24 + 12 - 3
            let temperature = c.temperature.unwrap();
            assert!((temperature - (expected_lat + 33.0)).abs() < 1e-9);
        }
        other => panic!("expected conditions, got {:?}", other),
    }

    controller.set_offset(-5).unwrap();
    let gap = controller.readout().await.unwrap();
    assert_eq!(gap.position, None);
    assert_eq!(gap.weather, WeatherReadout::Unavailable);
}

#[tokio::test]
async fn test_switching_selection_keeps_both_batches() {
    let feed = Arc::new(
        MockFeedBuilder::new()
            .drifting_fleet(3, &[Position::new(1.0, 1.0), Position::new(2.0, 2.0)])
            .latency(Duration::from_millis(10))
            .build(),
    );
    let store = SnapshotIngestor::with_options(feed.clone(), IngestOptions::new().snapshot_count(3))
        .retry(RetryConfig::none())
        .ingest_all()
        .await
        .into_store();
    let map = Arc::new(RecordingMapView::new());
    let mut controller = controller(&feed, store, &map);

    let first = controller.select_balloon(ObjectKey::new(0)).unwrap();
    let second = controller.select_balloon(ObjectKey::new(1)).unwrap();
    let (a, b) = (first.await.unwrap(), second.await.unwrap());

    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 3);
    assert_eq!(feed.forecast_requests(), 6);

    let readout = controller.readout_at(ObjectKey::new(0), HourOffset::NOW).await;
    assert!(matches!(readout.weather, WeatherReadout::Conditions(_)));
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_live_snapshot_feed() {
    let client = Arc::new(HttpFeedClient::new(FeedEndpoints::default()).unwrap());
    let ingestor = SnapshotIngestor::with_options(client, IngestOptions::new().snapshot_count(2));

    let report = match timeout(NETWORK_TIMEOUT, ingestor.ingest_all()).await {
        Ok(report) => report,
        Err(_) => panic!("Ingestion timed out after {:?}", NETWORK_TIMEOUT),
    };

    for outcome in &report.outcomes {
        println!("  {:02}: {:?}", outcome.hour, outcome.outcome);
    }
    println!("Tracking {} objects", report.store.len());
}
