//! Proximity classification against remote positions.
//!
//! Each remote subject gets a distance from the local stable estimate, a
//! distance bucket and an activity flag:
//!
//! | Bucket      | Distance        |
//! |-------------|-----------------|
//! | `VeryClose` | < 100 m         |
//! | `Nearby`    | < 500 m         |
//! | `InArea`    | everything else |
//!
//! A remote is active while its timestamp is younger than the liveness
//! window (default 5 minutes).

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{distance_meters, Coordinate};

/// Identifier of a tracked subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Create from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Another subject's published position, as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePosition {
    /// Who published it.
    pub subject_id: SubjectId,

    /// Where they are.
    #[serde(flatten)]
    pub coordinate: Coordinate,

    /// When they published it.
    pub timestamp: DateTime<Utc>,
}

/// Distance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityBucket {
    /// Within the very-close threshold.
    VeryClose,
    /// Within the nearby threshold.
    Nearby,
    /// Anywhere else.
    InArea,
}

impl fmt::Display for ProximityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryClose => write!(f, "very close"),
            Self::Nearby => write!(f, "nearby"),
            Self::InArea => write!(f, "in area"),
        }
    }
}

/// Classification of one remote subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityResult {
    /// The remote subject.
    pub subject_id: SubjectId,

    /// Great-circle distance from the local estimate, in meters.
    pub distance_m: f64,

    /// Distance bucket.
    pub bucket: ProximityBucket,

    /// True if the remote position is younger than the liveness window.
    pub active: bool,
}

/// Configuration for proximity classification.
#[derive(Debug, Clone)]
pub struct ProximityConfig {
    /// Upper bound (exclusive) of `VeryClose`, in meters.
    pub very_close_m: f64,

    /// Upper bound (exclusive) of `Nearby`, in meters.
    pub nearby_m: f64,

    /// Remote positions older than this are inactive.
    pub liveness_window: Duration,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            very_close_m: 100.0,
            nearby_m: 500.0,
            liveness_window: Duration::from_secs(300),
        }
    }
}

impl ProximityConfig {
    /// Bucket for a distance in meters. NaN lands in `InArea`.
    pub fn bucket_for(&self, distance_m: f64) -> ProximityBucket {
        if distance_m < self.very_close_m {
            ProximityBucket::VeryClose
        } else if distance_m < self.nearby_m {
            ProximityBucket::Nearby
        } else {
            ProximityBucket::InArea
        }
    }

    /// Check bucket thresholds are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.very_close_m.is_nan() || self.very_close_m <= 0.0 || self.very_close_m >= self.nearby_m {
            return Err(format!(
                "bucket thresholds must satisfy 0 < very_close ({}) < nearby ({})",
                self.very_close_m, self.nearby_m
            ));
        }
        Ok(())
    }
}

/// Classifies remote positions relative to the local estimate.
#[derive(Debug, Clone, Default)]
pub struct ProximityClassifier {
    config: ProximityConfig,
    local_subject: Option<SubjectId>,
}

impl ProximityClassifier {
    /// Create a classifier.
    pub fn new(config: ProximityConfig) -> Self {
        Self {
            config,
            local_subject: None,
        }
    }

    /// Leave the local subject's own record out of results.
    pub fn excluding(mut self, local_subject: SubjectId) -> Self {
        self.local_subject = Some(local_subject);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Classify `remotes` against `local` at `now`.
    ///
    /// Results are ordered by ascending distance; equal distances keep
    /// their input order.
    pub fn classify(
        &self,
        local: Coordinate,
        remotes: &[RemotePosition],
        now: DateTime<Utc>,
    ) -> Vec<ProximityResult> {
        let mut results: Vec<ProximityResult> = remotes
            .iter()
            .filter(|remote| self.local_subject.as_ref() != Some(&remote.subject_id))
            .map(|remote| {
                let distance_m = distance_meters(local, remote.coordinate);
                // Future timestamps (clock skew) have age zero
                let age = crate::time::age_between(remote.timestamp, now);
                ProximityResult {
                    subject_id: remote.subject_id.clone(),
                    distance_m,
                    bucket: self.config.bucket_for(distance_m),
                    active: age < self.config.liveness_window,
                }
            })
            .collect();

        results.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LOCAL: Coordinate = Coordinate {
        latitude: 51.5074,
        longitude: -0.1278,
    };

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    /// A remote `meters` north of LOCAL, last seen `age_secs` ago.
    fn remote(id: &str, meters: f64, age_secs: i64) -> RemotePosition {
        RemotePosition {
            subject_id: SubjectId::new(id),
            coordinate: Coordinate {
                latitude: LOCAL.latitude + meters / 111_195.0,
                longitude: LOCAL.longitude,
            },
            timestamp: now() - chrono::Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_close_active_and_far_inactive() {
        let classifier = ProximityClassifier::default();
        let remotes = vec![remote("far", 700.0, 20 * 60), remote("near", 80.0, 60)];

        let results = classifier.classify(LOCAL, &remotes, now());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].subject_id.as_str(), "near");
        assert_eq!(results[0].bucket, ProximityBucket::VeryClose);
        assert!(results[0].active);
        assert!((results[0].distance_m - 80.0).abs() < 1.0);

        assert_eq!(results[1].subject_id.as_str(), "far");
        assert_eq!(results[1].bucket, ProximityBucket::InArea);
        assert!(!results[1].active);
    }

    #[test]
    fn test_bucket_boundaries() {
        let config = ProximityConfig::default();
        assert_eq!(config.bucket_for(0.0), ProximityBucket::VeryClose);
        assert_eq!(config.bucket_for(99.9), ProximityBucket::VeryClose);
        assert_eq!(config.bucket_for(100.0), ProximityBucket::Nearby);
        assert_eq!(config.bucket_for(499.9), ProximityBucket::Nearby);
        assert_eq!(config.bucket_for(500.0), ProximityBucket::InArea);
        assert_eq!(config.bucket_for(f64::NAN), ProximityBucket::InArea);
    }

    #[test]
    fn test_liveness_boundary_and_future_timestamps() {
        let classifier = ProximityClassifier::default();
        let remotes = vec![
            remote("edge", 10.0, 300),
            remote("just-in", 20.0, 299),
            remote("future", 30.0, -120),
        ];

        let results = classifier.classify(LOCAL, &remotes, now());
        let active: Vec<(&str, bool)> = results
            .iter()
            .map(|r| (r.subject_id.as_str(), r.active))
            .collect();
        assert_eq!(
            active,
            vec![("edge", false), ("just-in", true), ("future", true)]
        );
    }

    #[test]
    fn test_equal_distances_keep_input_order() {
        let classifier = ProximityClassifier::default();
        let remotes = vec![
            remote("b", 200.0, 0),
            remote("a", 50.0, 0),
            remote("c", 200.0, 0),
            remote("d", 200.0, 0),
        ];

        let ids: Vec<String> = classifier
            .classify(LOCAL, &remotes, now())
            .into_iter()
            .map(|r| r.subject_id.0)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_excludes_local_subject() {
        let classifier = ProximityClassifier::default().excluding(SubjectId::new("me"));
        let remotes = vec![remote("me", 0.0, 0), remote("friend", 40.0, 0)];

        let results = classifier.classify(LOCAL, &remotes, now());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subject_id.as_str(), "friend");
    }

    #[test]
    fn test_empty_remotes() {
        let classifier = ProximityClassifier::default();
        assert!(classifier.classify(LOCAL, &[], now()).is_empty());
    }

    #[test]
    fn test_remote_position_json_shape() {
        let json = r#"{
            "subject_id": "alice",
            "latitude": 51.5,
            "longitude": -0.12,
            "timestamp": "2023-11-14T22:13:20Z"
        }"#;
        let position: RemotePosition = serde_json::from_str(json).unwrap();
        assert_eq!(position.subject_id, SubjectId::new("alice"));
        assert_eq!(position.coordinate.latitude, 51.5);
        assert_eq!(position.timestamp, now());
    }

    #[test]
    fn test_bucket_display_and_serde() {
        assert_eq!(ProximityBucket::VeryClose.to_string(), "very close");
        assert_eq!(ProximityBucket::InArea.to_string(), "in area");
        assert_eq!(
            serde_json::to_string(&ProximityBucket::VeryClose).unwrap(),
            "\"very_close\""
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(ProximityConfig::default().validate().is_ok());
        assert!(ProximityConfig {
            very_close_m: 600.0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
