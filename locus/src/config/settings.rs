//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::location::AccuracyTier;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// History buffer settings
    pub history: HistorySettings,
    /// Fix ingestion filters
    pub ingest: IngestSettings,
    /// Clustering and confidence settings
    pub stabilizer: StabilizerSettings,
    /// One-shot accuracy escalation
    pub escalation: EscalationSettings,
    /// Publish throttling
    pub publish: PublishSettings,
    /// Proximity buckets and nearby refresh
    pub proximity: ProximitySettings,
    /// Continuous watch parameters
    pub watch: WatchSettings,
    /// Remote location store
    pub store: StoreSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// History buffer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySettings {
    /// Maximum retained fixes
    pub capacity: usize,
}

/// Fix ingestion configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    /// Fixes with worse accuracy than this are rejected (meters)
    pub hard_reject_ceiling_m: f64,
    /// Larger jumps from the previous fix are rejected (meters)
    pub max_jump_m: f64,
    /// After this many seconds without a fix, history restarts
    pub gap_reset_window_secs: u64,
}

/// Stabilizer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizerSettings {
    /// Minimum fixes in a cluster before it can be trusted
    pub min_cluster_size: usize,
    /// Fixes within this distance of the seed join its cluster (meters)
    pub cluster_radius_m: f64,
    /// Cluster size that earns the full size score
    pub target_cluster_size: usize,
    /// Confidence required to publish an estimate (0.0 - 1.0)
    pub publish_confidence: f64,
    /// Age at which recency weight reaches its floor (seconds)
    pub recency_horizon_secs: u64,
    /// Minimum recency weight
    pub recency_floor: f64,
    /// Window counted as "recent" for the recency score (seconds)
    pub recent_window_secs: u64,
    /// Weight of the cluster size factor
    pub weight_size: f64,
    /// Weight of the accuracy factor
    pub weight_accuracy: f64,
    /// Weight of the spread factor
    pub weight_spread: f64,
    /// Weight of the recency factor
    pub weight_recency: f64,
    /// Drop history and estimate after this long without a fix (seconds)
    pub inactivity_timeout_secs: u64,
    /// Stabilizing longer than this triggers escalation (seconds)
    pub stabilization_timeout_secs: u64,
}

/// Escalation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationSettings {
    /// Tier of the first one-shot request
    pub start_tier: AccuracyTier,
    /// Fixes worse than this are retried at a lower tier (meters)
    pub retry_accuracy_m: f64,
    /// Maximum one-shot requests per escalation
    pub max_attempts: u32,
    /// Timeout for each one-shot request (seconds)
    pub request_timeout_secs: u64,
    /// Oldest cached fix a provider may answer with (seconds)
    pub max_fix_age_secs: u64,
}

/// Publish configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSettings {
    /// Estimates worse than this are never published (meters)
    pub max_accuracy_m: f64,
    /// Minimum time between publishes (seconds)
    pub min_interval_secs: u64,
    /// How often an unchanged estimate is offered again (seconds)
    pub interval_secs: u64,
}

/// Proximity configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximitySettings {
    /// Upper bound of "very close" (meters)
    pub very_close_m: f64,
    /// Upper bound of "nearby" (meters)
    pub nearby_m: f64,
    /// Remote positions older than this are inactive (seconds)
    pub liveness_window_secs: u64,
    /// How often nearby subjects are fetched (seconds)
    pub refresh_interval_secs: u64,
    /// Radius for nearby fetches (meters)
    pub radius_m: f64,
}

/// Continuous watch configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    /// Accuracy tier requested from the provider
    pub tier: AccuracyTier,
    /// Minimum movement between delivered fixes (meters)
    pub min_distance_m: f64,
    /// Minimum time between delivered fixes (seconds)
    pub min_interval_secs: u64,
}

/// Remote store configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Base URL of the store API (None = not configured)
    pub base_url: Option<String>,
    /// Identifier published for the local subject (None = not configured)
    pub subject_id: Option<String>,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
    /// Filter used when RUST_LOG is unset
    pub level: String,
    /// Mirror output to stdout
    pub stdout: bool,
}
