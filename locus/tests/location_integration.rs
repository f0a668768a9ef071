//! Integration tests for the synchronous location pipeline.
//!
//! These tests verify the complete data flow without any background tasks:
//! - config.ini → runtime configuration → LocationEngine
//! - Fixes → stable estimate → PublishThrottle → PublishedPosition
//! - Stable estimate → ProximityClassifier
//!
//! Run with: `cargo test --test location_integration`

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use locus::config::ConfigFile;
use locus::geo::{distance_meters, Coordinate};
use locus::location::{
    IngestDecision, LocationEngine, PositionFix, ProximityBucket, ProximityClassifier,
    PublishDecision, PublishThrottle, PublishedPosition, RejectReason, RemotePosition,
    SkipReason, StabilizationState, SubjectId,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + chrono::Duration::seconds(secs)
}

fn fix(lat: f64, lon: f64, accuracy_m: f64, secs: i64) -> PositionFix {
    PositionFix::new(lat, lon, Some(accuracy_m), at(secs))
}

fn london_stream() -> Vec<PositionFix> {
    vec![
        fix(51.5074, -0.1278, 8.0, 0),
        fix(51.50742, -0.12778, 6.0, 1),
        fix(51.50739, -0.12781, 9.0, 2),
    ]
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_stream_to_published_position() {
    let mut engine = LocationEngine::default();
    let mut throttle = PublishThrottle::default();

    let mut last_state = None;
    for f in london_stream() {
        let now = f.timestamp;
        last_state = engine.process(f, now).state;
    }

    let Some(StabilizationState::Stable(estimate)) = last_state else {
        panic!("expected a stable estimate, got {:?}", last_state);
    };
    assert!(estimate.confidence >= 0.8);
    assert_eq!(estimate.accuracy.meters(), 6.0);
    assert_eq!(estimate.timestamp, at(2));

    let center = Coordinate::new(51.5074, -0.1278).unwrap();
    assert!(distance_meters(center, estimate.coordinate) < 5.0);

    assert_eq!(
        throttle.maybe_publish(&estimate, at(2)),
        PublishDecision::Published
    );
    assert_eq!(
        throttle.maybe_publish(&estimate, at(3)),
        PublishDecision::Throttled
    );

    let position = PublishedPosition::from(&estimate);
    let json = serde_json::to_value(&position).unwrap();
    assert_eq!(json["accuracy_m"], 6.0);
    assert!(json.get("altitude").is_none());
}

#[test]
fn test_outliers_do_not_move_the_estimate() {
    let mut engine = LocationEngine::default();
    for f in london_stream() {
        let now = f.timestamp;
        engine.process(f, now);
    }
    let before = engine.estimate().cloned().unwrap();

    // ~1.1 km away one second later: implausible jump
    let jump = engine.process(fix(51.5174, -0.1278, 5.0, 3), at(3));
    assert_eq!(
        jump.decision,
        IngestDecision::Rejected(RejectReason::ImplausibleJump)
    );

    // Too inaccurate to use at all
    let vague = engine.process(fix(51.5074, -0.1278, 500.0, 4), at(4));
    assert_eq!(
        vague.decision,
        IngestDecision::Rejected(RejectReason::PoorAccuracy)
    );

    assert_eq!(engine.estimate(), Some(&before));
    assert_eq!(engine.history().len(), 3);
}

#[test]
fn test_throttle_skips_low_accuracy_estimate() {
    let mut engine = LocationEngine::default();
    for f in london_stream() {
        let now = f.timestamp;
        engine.process(f, now);
    }
    let mut estimate = engine.estimate().cloned().unwrap();
    estimate.accuracy = locus::location::Accuracy(250.0);

    let mut throttle = PublishThrottle::default();
    assert_eq!(
        throttle.maybe_publish(&estimate, at(10)),
        PublishDecision::Skipped(SkipReason::LowAccuracy)
    );
    assert!(throttle.last_published().is_none());
}

#[test]
fn test_estimate_to_proximity() {
    let mut engine = LocationEngine::default();
    for f in london_stream() {
        let now = f.timestamp;
        engine.process(f, now);
    }
    let local = engine.estimate().unwrap().coordinate;

    let remotes = vec![
        RemotePosition {
            subject_id: SubjectId::new("far"),
            coordinate: Coordinate::new(51.5074 + 700.0 / 111_195.0, -0.1278).unwrap(),
            timestamp: at(2) - chrono::Duration::minutes(20),
        },
        RemotePosition {
            subject_id: SubjectId::new("near"),
            coordinate: Coordinate::new(51.5074 + 80.0 / 111_195.0, -0.1278).unwrap(),
            timestamp: at(2) - chrono::Duration::minutes(1),
        },
    ];

    let results = ProximityClassifier::default().classify(local, &remotes, at(2));

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].subject_id.as_str(), "near");
    assert_eq!(results[0].bucket, ProximityBucket::VeryClose);
    assert!(results[0].active);
    assert_eq!(results[1].subject_id.as_str(), "far");
    assert_eq!(results[1].bucket, ProximityBucket::InArea);
    assert!(!results[1].active);
}

#[test]
fn test_inactivity_drops_estimate() {
    let mut engine = LocationEngine::default();
    for f in london_stream() {
        let now = f.timestamp;
        engine.process(f, now);
    }

    assert!(!engine.expire_if_inactive(at(200)));
    assert!(engine.estimate().is_some());

    assert!(engine.expire_if_inactive(at(2 + 301)));
    assert!(engine.estimate().is_none());
    assert!(engine.history().is_empty());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_drives_engine() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.ini");
    std::fs::write(
        &config_path,
        r#"
[stabilizer]
min_cluster_size = 4

[ingest]
hard_reject_ceiling_m = 20
"#,
    )
    .unwrap();

    let file = ConfigFile::load_from(&config_path).unwrap();
    let config = file.session_config().unwrap();
    let mut engine = LocationEngine::new(config.engine);

    // 25 m accuracy is now too poor
    let rejected = engine.process(fix(51.5074, -0.1278, 25.0, 0), at(0));
    assert!(!rejected.decision.is_accepted());

    // Three good fixes are no longer enough
    for f in london_stream() {
        let now = f.timestamp;
        engine.process(f, now);
    }
    assert!(engine.estimate().is_none());

    let state = engine.process(fix(51.50741, -0.12779, 4.0, 3), at(3)).state;
    assert!(state.unwrap().is_stable());
}

#[test]
fn test_written_config_round_trips_into_runtime_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("locus").join("config.ini");

    let mut file = ConfigFile::default();
    file.publish.min_interval_secs = 7;
    file.proximity.liveness_window_secs = 120;
    file.save_to(&config_path).unwrap();

    let config = ConfigFile::load_from(&config_path)
        .unwrap()
        .session_config()
        .unwrap();

    assert_eq!(config.throttle.min_interval, Duration::from_secs(7));
    assert_eq!(config.proximity.liveness_window, Duration::from_secs(120));
}
