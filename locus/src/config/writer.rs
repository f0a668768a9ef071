//! INI serialization for `ConfigFile`.
//!
//! Produces a commented config file so users can edit it by hand.

use std::path::Path;

use super::settings::ConfigFile;

/// Serialize configuration to a commented INI string.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let base_url = config.store.base_url.as_deref().unwrap_or("");
    let subject_id = config.store.subject_id.as_deref().unwrap_or("");
    let log_directory = path_to_string(&config.logging.directory);
    let stdout = if config.logging.stdout { "true" } else { "false" };

    format!(
        r#"[history]
; Maximum accepted fixes kept for clustering (default: 10)
capacity = {}

[ingest]
; Fixes reporting worse accuracy than this are dropped, in meters (default: 100)
hard_reject_ceiling_m = {}
; Fixes further than this from the previous fix are dropped, in meters (default: 200)
max_jump_m = {}
; After this many seconds without a fix, history starts over (default: 30)
gap_reset_window_secs = {}

[stabilizer]
; Fixes needed in one cluster before an estimate can be published (default: 3)
min_cluster_size = {}
; Fixes within this distance of the cluster seed join it, in meters (default: 15)
cluster_radius_m = {}
; Cluster size that earns the full size score (default: 5)
target_cluster_size = {}
; Confidence required to publish, 0.0 - 1.0 (default: 0.8)
publish_confidence = {}
; Fix age in seconds at which recency weight bottoms out (default: 60)
recency_horizon_secs = {}
; Lowest recency weight an old fix can have (default: 0.1)
recency_floor = {}
; Fixes younger than this many seconds count as recent (default: 10)
recent_window_secs = {}
; Confidence weights (defaults: 0.3 / 0.4 / 0.2 / 0.1)
weight_size = {}
weight_accuracy = {}
weight_spread = {}
weight_recency = {}
; Drop history and estimate after this many seconds without a fix (default: 300)
inactivity_timeout_secs = {}
; Escalate accuracy after stabilizing for this many seconds (default: 30)
stabilization_timeout_secs = {}

[escalation]
; Tier of the first one-shot request: best, high, balanced, low, lowest (default: best)
start_tier = {}
; One-shot fixes worse than this are retried at a lower tier, in meters (default: 50)
retry_accuracy_m = {}
; Maximum one-shot requests per escalation (default: 5)
max_attempts = {}
; Timeout for each one-shot request in seconds (default: 10)
request_timeout_secs = {}
; Oldest cached fix a provider may answer with, in seconds (default: 5)
max_fix_age_secs = {}

[publish]
; Estimates worse than this are never published, in meters (default: 200)
max_accuracy_m = {}
; Minimum seconds between publishes (default: 2)
min_interval_secs = {}
; Seconds between offering an unchanged estimate again (default: 15)
interval_secs = {}

[proximity]
; Upper bound of "very close", in meters (default: 100)
very_close_m = {}
; Upper bound of "nearby", in meters (default: 500)
nearby_m = {}
; Remote positions older than this many seconds are inactive (default: 300)
liveness_window_secs = {}
; Seconds between nearby fetches (default: 30)
refresh_interval_secs = {}
; Radius for nearby fetches, in meters (default: 2000)
radius_m = {}

[watch]
; Tier requested for continuous updates (default: high)
tier = {}
; Minimum movement between delivered fixes, in meters (default: 5)
min_distance_m = {}
; Minimum seconds between delivered fixes (default: 2)
min_interval_secs = {}

[store]
; Base URL of the location store API (leave empty to disable publishing)
base_url = {}
; Identifier published for this device
subject_id = {}
; Request timeout in seconds (default: 10)
timeout_secs = {}

[logging]
; Directory for the log file (default: logs)
directory = {}
; Log file name (default: locus.log)
file = {}
; Filter used when RUST_LOG is unset, e.g. info or locus=debug (default: info)
level = {}
; Mirror log output to stdout (default: true)
stdout = {}
"#,
        config.history.capacity,
        config.ingest.hard_reject_ceiling_m,
        config.ingest.max_jump_m,
        config.ingest.gap_reset_window_secs,
        config.stabilizer.min_cluster_size,
        config.stabilizer.cluster_radius_m,
        config.stabilizer.target_cluster_size,
        config.stabilizer.publish_confidence,
        config.stabilizer.recency_horizon_secs,
        config.stabilizer.recency_floor,
        config.stabilizer.recent_window_secs,
        config.stabilizer.weight_size,
        config.stabilizer.weight_accuracy,
        config.stabilizer.weight_spread,
        config.stabilizer.weight_recency,
        config.stabilizer.inactivity_timeout_secs,
        config.stabilizer.stabilization_timeout_secs,
        config.escalation.start_tier,
        config.escalation.retry_accuracy_m,
        config.escalation.max_attempts,
        config.escalation.request_timeout_secs,
        config.escalation.max_fix_age_secs,
        config.publish.max_accuracy_m,
        config.publish.min_interval_secs,
        config.publish.interval_secs,
        config.proximity.very_close_m,
        config.proximity.nearby_m,
        config.proximity.liveness_window_secs,
        config.proximity.refresh_interval_secs,
        config.proximity.radius_m,
        config.watch.tier,
        config.watch.min_distance_m,
        config.watch.min_interval_secs,
        base_url,
        subject_id,
        config.store.timeout_secs,
        log_directory,
        config.logging.file,
        config.logging.level,
        stdout,
    )
}

/// Convert path to string, using ~ for home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
