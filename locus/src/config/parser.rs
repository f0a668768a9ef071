//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::location::AccuracyTier;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// Cross-field checks (bucket ordering, weights) happen when the file is
/// converted into runtime configuration.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [history] section
    if let Some(section) = ini.section(Some("history")) {
        if let Some(v) = section.get("capacity") {
            let capacity: usize = parse_number("history", "capacity", v)?;
            if capacity == 0 {
                return Err(invalid(
                    "history",
                    "capacity",
                    v,
                    "must be at least 1",
                ));
            }
            config.history.capacity = capacity;
        }
    }

    // [ingest] section
    if let Some(section) = ini.section(Some("ingest")) {
        if let Some(v) = section.get("hard_reject_ceiling_m") {
            config.ingest.hard_reject_ceiling_m =
                parse_meters("ingest", "hard_reject_ceiling_m", v)?;
        }
        if let Some(v) = section.get("max_jump_m") {
            config.ingest.max_jump_m = parse_meters("ingest", "max_jump_m", v)?;
        }
        if let Some(v) = section.get("gap_reset_window_secs") {
            config.ingest.gap_reset_window_secs =
                parse_number("ingest", "gap_reset_window_secs", v)?;
        }
    }

    // [stabilizer] section
    if let Some(section) = ini.section(Some("stabilizer")) {
        if let Some(v) = section.get("min_cluster_size") {
            config.stabilizer.min_cluster_size =
                parse_number("stabilizer", "min_cluster_size", v)?;
        }
        if let Some(v) = section.get("cluster_radius_m") {
            config.stabilizer.cluster_radius_m =
                parse_meters("stabilizer", "cluster_radius_m", v)?;
        }
        if let Some(v) = section.get("target_cluster_size") {
            config.stabilizer.target_cluster_size =
                parse_number("stabilizer", "target_cluster_size", v)?;
        }
        if let Some(v) = section.get("publish_confidence") {
            config.stabilizer.publish_confidence =
                parse_fraction("stabilizer", "publish_confidence", v)?;
        }
        if let Some(v) = section.get("recency_horizon_secs") {
            config.stabilizer.recency_horizon_secs =
                parse_number("stabilizer", "recency_horizon_secs", v)?;
        }
        if let Some(v) = section.get("recency_floor") {
            config.stabilizer.recency_floor = parse_fraction("stabilizer", "recency_floor", v)?;
        }
        if let Some(v) = section.get("recent_window_secs") {
            config.stabilizer.recent_window_secs =
                parse_number("stabilizer", "recent_window_secs", v)?;
        }
        if let Some(v) = section.get("weight_size") {
            config.stabilizer.weight_size = parse_weight("stabilizer", "weight_size", v)?;
        }
        if let Some(v) = section.get("weight_accuracy") {
            config.stabilizer.weight_accuracy = parse_weight("stabilizer", "weight_accuracy", v)?;
        }
        if let Some(v) = section.get("weight_spread") {
            config.stabilizer.weight_spread = parse_weight("stabilizer", "weight_spread", v)?;
        }
        if let Some(v) = section.get("weight_recency") {
            config.stabilizer.weight_recency = parse_weight("stabilizer", "weight_recency", v)?;
        }
        if let Some(v) = section.get("inactivity_timeout_secs") {
            config.stabilizer.inactivity_timeout_secs =
                parse_number("stabilizer", "inactivity_timeout_secs", v)?;
        }
        if let Some(v) = section.get("stabilization_timeout_secs") {
            config.stabilizer.stabilization_timeout_secs =
                parse_number("stabilizer", "stabilization_timeout_secs", v)?;
        }
    }

    // [escalation] section
    if let Some(section) = ini.section(Some("escalation")) {
        if let Some(v) = section.get("start_tier") {
            config.escalation.start_tier = parse_tier("escalation", "start_tier", v)?;
        }
        if let Some(v) = section.get("retry_accuracy_m") {
            config.escalation.retry_accuracy_m =
                parse_meters("escalation", "retry_accuracy_m", v)?;
        }
        if let Some(v) = section.get("max_attempts") {
            let attempts: u32 = parse_number("escalation", "max_attempts", v)?;
            if attempts == 0 {
                return Err(invalid(
                    "escalation",
                    "max_attempts",
                    v,
                    "must be at least 1",
                ));
            }
            config.escalation.max_attempts = attempts;
        }
        if let Some(v) = section.get("request_timeout_secs") {
            config.escalation.request_timeout_secs =
                parse_number("escalation", "request_timeout_secs", v)?;
        }
        if let Some(v) = section.get("max_fix_age_secs") {
            config.escalation.max_fix_age_secs =
                parse_number("escalation", "max_fix_age_secs", v)?;
        }
    }

    // [publish] section
    if let Some(section) = ini.section(Some("publish")) {
        if let Some(v) = section.get("max_accuracy_m") {
            config.publish.max_accuracy_m = parse_meters("publish", "max_accuracy_m", v)?;
        }
        if let Some(v) = section.get("min_interval_secs") {
            config.publish.min_interval_secs = parse_number("publish", "min_interval_secs", v)?;
        }
        if let Some(v) = section.get("interval_secs") {
            config.publish.interval_secs = parse_number("publish", "interval_secs", v)?;
        }
    }

    // [proximity] section
    if let Some(section) = ini.section(Some("proximity")) {
        if let Some(v) = section.get("very_close_m") {
            config.proximity.very_close_m = parse_meters("proximity", "very_close_m", v)?;
        }
        if let Some(v) = section.get("nearby_m") {
            config.proximity.nearby_m = parse_meters("proximity", "nearby_m", v)?;
        }
        if let Some(v) = section.get("liveness_window_secs") {
            config.proximity.liveness_window_secs =
                parse_number("proximity", "liveness_window_secs", v)?;
        }
        if let Some(v) = section.get("refresh_interval_secs") {
            config.proximity.refresh_interval_secs =
                parse_number("proximity", "refresh_interval_secs", v)?;
        }
        if let Some(v) = section.get("radius_m") {
            config.proximity.radius_m = parse_meters("proximity", "radius_m", v)?;
        }
    }

    // [watch] section
    if let Some(section) = ini.section(Some("watch")) {
        if let Some(v) = section.get("tier") {
            config.watch.tier = parse_tier("watch", "tier", v)?;
        }
        if let Some(v) = section.get("min_distance_m") {
            let meters: f64 = parse_number("watch", "min_distance_m", v)?;
            if !meters.is_finite() || meters < 0.0 {
                return Err(invalid(
                    "watch",
                    "min_distance_m",
                    v,
                    "must be zero or a positive distance in meters",
                ));
            }
            config.watch.min_distance_m = meters;
        }
        if let Some(v) = section.get("min_interval_secs") {
            config.watch.min_interval_secs = parse_number("watch", "min_interval_secs", v)?;
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim();
            if !v.is_empty() {
                if !(v.starts_with("http://") || v.starts_with("https://")) {
                    return Err(invalid(
                        "store",
                        "base_url",
                        v,
                        "must start with http:// or https://",
                    ));
                }
                config.store.base_url = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("subject_id") {
            let v = v.trim();
            if !v.is_empty() {
                config.store.subject_id = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("timeout_secs") {
            let secs: u64 = parse_number("store", "timeout_secs", v)?;
            if secs == 0 {
                return Err(invalid(
                    "store",
                    "timeout_secs",
                    v,
                    "must be at least 1 second",
                ));
            }
            config.store.timeout_secs = secs;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
        if let Some(v) = section.get("level") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.level = v.to_string();
            }
        }
        if let Some(v) = section.get("stdout") {
            config.logging.stdout = parse_bool(v);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse any `FromStr` number, reporting the key on failure.
fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid(section, key, value, "must be a number"))
}

/// A strictly positive, finite distance.
fn parse_meters(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let meters: f64 = parse_number(section, key, value)?;
    if !meters.is_finite() || meters <= 0.0 {
        return Err(invalid(
            section,
            key,
            value,
            "must be a positive distance in meters",
        ));
    }
    Ok(meters)
}

/// A value in `0.0..=1.0`.
fn parse_fraction(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let fraction: f64 = parse_number(section, key, value)?;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(invalid(
            section,
            key,
            value,
            "must be between 0.0 and 1.0",
        ));
    }
    Ok(fraction)
}

/// A non-negative confidence weight.
fn parse_weight(section: &str, key: &str, value: &str) -> Result<f64, ConfigFileError> {
    let weight: f64 = parse_number(section, key, value)?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(invalid(section, key, value, "must be zero or positive"));
    }
    Ok(weight)
}

fn parse_tier(section: &str, key: &str, value: &str) -> Result<AccuracyTier, ConfigFileError> {
    value.parse::<AccuracyTier>().map_err(|_| {
        invalid(
            section,
            key,
            value,
            "must be one of: best, high, balanced, low, lowest",
        )
    })
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
