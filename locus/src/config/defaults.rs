//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation. Values match the defaults of the runtime config types in
//! [`crate::location`].

use std::path::PathBuf;

use super::settings::*;
use crate::location::{
    AccuracyTier, DEFAULT_HARD_REJECT_CEILING_M, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_JUMP_M,
};
use crate::logging::{DEFAULT_LOG_DIR, DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL};

// =============================================================================
// Ingest
// =============================================================================

/// Default gap after which history restarts (30 seconds).
pub const DEFAULT_GAP_RESET_WINDOW_SECS: u64 = 30;

// =============================================================================
// Stabilizer
// =============================================================================

/// Default minimum cluster size.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;

/// Default cluster radius in meters.
pub const DEFAULT_CLUSTER_RADIUS_M: f64 = 15.0;

/// Default cluster size earning the full size score.
pub const DEFAULT_TARGET_CLUSTER_SIZE: usize = 5;

/// Default publish confidence threshold.
pub const DEFAULT_PUBLISH_CONFIDENCE: f64 = 0.8;

/// Default recency horizon (60 seconds).
pub const DEFAULT_RECENCY_HORIZON_SECS: u64 = 60;

/// Default recency weight floor.
pub const DEFAULT_RECENCY_FLOOR: f64 = 0.1;

/// Default "recent" window (10 seconds).
pub const DEFAULT_RECENT_WINDOW_SECS: u64 = 10;

/// Default weight of the cluster size factor.
pub const DEFAULT_WEIGHT_SIZE: f64 = 0.3;

/// Default weight of the accuracy factor.
pub const DEFAULT_WEIGHT_ACCURACY: f64 = 0.4;

/// Default weight of the spread factor.
pub const DEFAULT_WEIGHT_SPREAD: f64 = 0.2;

/// Default weight of the recency factor.
pub const DEFAULT_WEIGHT_RECENCY: f64 = 0.1;

/// Default inactivity timeout (5 minutes).
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 300;

/// Default stabilization timeout before escalating (30 seconds).
pub const DEFAULT_STABILIZATION_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Escalation
// =============================================================================

/// Default first tier of an escalation.
pub const DEFAULT_START_TIER: AccuracyTier = AccuracyTier::Best;

/// Default accuracy below which a one-shot fix is retried (meters).
pub const DEFAULT_RETRY_ACCURACY_M: f64 = 50.0;

/// Default maximum one-shot attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default one-shot request timeout (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default maximum cached fix age (5 seconds).
pub const DEFAULT_MAX_FIX_AGE_SECS: u64 = 5;

// =============================================================================
// Publish
// =============================================================================

/// Default publish accuracy ceiling (meters).
pub const DEFAULT_MAX_PUBLISH_ACCURACY_M: f64 = 200.0;

/// Default minimum publish interval (2 seconds).
pub const DEFAULT_MIN_PUBLISH_INTERVAL_SECS: u64 = 2;

/// Default republish interval (15 seconds).
pub const DEFAULT_PUBLISH_INTERVAL_SECS: u64 = 15;

// =============================================================================
// Proximity
// =============================================================================

/// Default "very close" threshold (meters).
pub const DEFAULT_VERY_CLOSE_M: f64 = 100.0;

/// Default "nearby" threshold (meters).
pub const DEFAULT_NEARBY_M: f64 = 500.0;

/// Default liveness window (5 minutes).
pub const DEFAULT_LIVENESS_WINDOW_SECS: u64 = 300;

/// Default nearby refresh interval (30 seconds).
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Default nearby fetch radius (meters).
pub const DEFAULT_NEARBY_RADIUS_M: f64 = 2_000.0;

// =============================================================================
// Watch
// =============================================================================

/// Default watch tier.
pub const DEFAULT_WATCH_TIER: AccuracyTier = AccuracyTier::High;

/// Default minimum movement between watch fixes (meters).
pub const DEFAULT_WATCH_MIN_DISTANCE_M: f64 = 5.0;

/// Default minimum time between watch fixes (2 seconds).
pub const DEFAULT_WATCH_MIN_INTERVAL_SECS: u64 = 2;

// =============================================================================
// Store
// =============================================================================

/// Default store request timeout (10 seconds).
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            history: HistorySettings {
                capacity: DEFAULT_HISTORY_CAPACITY,
            },
            ingest: IngestSettings {
                hard_reject_ceiling_m: DEFAULT_HARD_REJECT_CEILING_M,
                max_jump_m: DEFAULT_MAX_JUMP_M,
                gap_reset_window_secs: DEFAULT_GAP_RESET_WINDOW_SECS,
            },
            stabilizer: StabilizerSettings {
                min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
                cluster_radius_m: DEFAULT_CLUSTER_RADIUS_M,
                target_cluster_size: DEFAULT_TARGET_CLUSTER_SIZE,
                publish_confidence: DEFAULT_PUBLISH_CONFIDENCE,
                recency_horizon_secs: DEFAULT_RECENCY_HORIZON_SECS,
                recency_floor: DEFAULT_RECENCY_FLOOR,
                recent_window_secs: DEFAULT_RECENT_WINDOW_SECS,
                weight_size: DEFAULT_WEIGHT_SIZE,
                weight_accuracy: DEFAULT_WEIGHT_ACCURACY,
                weight_spread: DEFAULT_WEIGHT_SPREAD,
                weight_recency: DEFAULT_WEIGHT_RECENCY,
                inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
                stabilization_timeout_secs: DEFAULT_STABILIZATION_TIMEOUT_SECS,
            },
            escalation: EscalationSettings {
                start_tier: DEFAULT_START_TIER,
                retry_accuracy_m: DEFAULT_RETRY_ACCURACY_M,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                max_fix_age_secs: DEFAULT_MAX_FIX_AGE_SECS,
            },
            publish: PublishSettings {
                max_accuracy_m: DEFAULT_MAX_PUBLISH_ACCURACY_M,
                min_interval_secs: DEFAULT_MIN_PUBLISH_INTERVAL_SECS,
                interval_secs: DEFAULT_PUBLISH_INTERVAL_SECS,
            },
            proximity: ProximitySettings {
                very_close_m: DEFAULT_VERY_CLOSE_M,
                nearby_m: DEFAULT_NEARBY_M,
                liveness_window_secs: DEFAULT_LIVENESS_WINDOW_SECS,
                refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
                radius_m: DEFAULT_NEARBY_RADIUS_M,
            },
            watch: WatchSettings {
                tier: DEFAULT_WATCH_TIER,
                min_distance_m: DEFAULT_WATCH_MIN_DISTANCE_M,
                min_interval_secs: DEFAULT_WATCH_MIN_INTERVAL_SECS,
            },
            store: StoreSettings {
                base_url: None,
                subject_id: None,
                timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                directory: PathBuf::from(DEFAULT_LOG_DIR),
                file: DEFAULT_LOG_FILE.to_string(),
                level: DEFAULT_LOG_LEVEL.to_string(),
                stdout: true,
            },
        }
    }
}
