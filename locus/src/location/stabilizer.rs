//! Stabilizer - turns accepted fixes into a trustworthy estimate.
//!
//! The stabilizer owns the fix history and the current [`StableEstimate`].
//! After every accepted fix, [`Stabilizer::recompute`] clusters the history,
//! scores each cluster and promotes the best one to `Stable` when its
//! confidence clears the publish threshold.
//!
//! # Estimate lifetime
//!
//! - Replaced whenever a cluster clears the threshold
//! - Retained while the engine is `Stabilizing`
//! - Cleared by [`Stabilizer::reset`] or when no fix has been accepted for
//!   the inactivity timeout ([`Stabilizer::expire_if_inactive`])

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cluster::{build_clusters, Cluster, ConfidenceWeights};
use super::fix::{Accuracy, PositionFix};
use super::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::geo::Coordinate;

/// Configuration for clustering and confidence scoring.
#[derive(Debug, Clone)]
pub struct StabilizerConfig {
    /// Maximum fixes kept in history.
    pub history_capacity: usize,

    /// Fewest fixes a cluster needs to be considered.
    pub min_cluster_size: usize,

    /// Maximum pairwise distance between cluster members, in meters.
    pub cluster_radius_m: f64,

    /// Cluster size at which the size factor saturates.
    pub target_cluster_size: usize,

    /// Accuracy (meters) at which the accuracy factor reaches zero.
    pub accuracy_ceiling_m: f64,

    /// Age at which a fix's weight reaches the floor.
    pub recency_horizon: Duration,

    /// Minimum weight of an old fix.
    pub recency_floor: f64,

    /// Fixes younger than this count as recent.
    pub recent_window: Duration,

    /// Confidence needed to publish a stable estimate.
    pub publish_confidence: f64,

    /// Confidence factor weights.
    pub weights: ConfidenceWeights,

    /// Time without an accepted fix before the estimate is dropped.
    pub inactivity_timeout: Duration,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            min_cluster_size: 3,
            cluster_radius_m: 15.0,
            target_cluster_size: 5,
            accuracy_ceiling_m: 100.0,
            recency_horizon: Duration::from_secs(60),
            recency_floor: 0.1,
            recent_window: Duration::from_secs(10),
            publish_confidence: 0.8,
            weights: ConfidenceWeights::default(),
            inactivity_timeout: Duration::from_secs(300),
        }
    }
}

impl StabilizerConfig {
    /// Check values that would make stabilization meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if self.cluster_radius_m <= 0.0 || !self.cluster_radius_m.is_finite() {
            return Err(format!(
                "cluster radius must be positive, got {}",
                self.cluster_radius_m
            ));
        }
        if self.accuracy_ceiling_m <= 0.0 || !self.accuracy_ceiling_m.is_finite() {
            return Err(format!(
                "accuracy ceiling must be positive, got {}",
                self.accuracy_ceiling_m
            ));
        }
        if !(0.0..=1.0).contains(&self.publish_confidence) {
            return Err(format!(
                "publish confidence must be between 0 and 1, got {}",
                self.publish_confidence
            ));
        }
        if !(0.0..=1.0).contains(&self.recency_floor) {
            return Err(format!(
                "recency floor must be between 0 and 1, got {}",
                self.recency_floor
            ));
        }
        if self.min_cluster_size == 0 {
            return Err("minimum cluster size must be at least 1".to_string());
        }
        if self.min_cluster_size > self.history_capacity {
            return Err(format!(
                "minimum cluster size {} exceeds history capacity {}",
                self.min_cluster_size, self.history_capacity
            ));
        }
        self.weights.validate()
    }
}

/// The published-quality position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StableEstimate {
    /// Weighted cluster center.
    pub coordinate: Coordinate,

    /// Best accuracy among cluster members.
    pub accuracy: Accuracy,

    /// Cluster confidence in [0, 1].
    pub confidence: f64,

    /// Capture time of the fix that produced this estimate.
    pub timestamp: DateTime<Utc>,

    /// Altitude from the freshest cluster member.
    pub altitude: Option<f64>,

    /// Heading from the freshest cluster member.
    pub heading: Option<f64>,

    /// Speed from the freshest cluster member.
    pub speed: Option<f64>,
}

impl StableEstimate {
    fn from_cluster(cluster: &Cluster, timestamp: DateTime<Utc>) -> Self {
        let freshest = cluster.freshest();
        Self {
            coordinate: cluster.center,
            accuracy: cluster.best_accuracy,
            confidence: cluster.confidence,
            timestamp,
            altitude: freshest.and_then(|f| f.altitude),
            heading: freshest.and_then(|f| f.heading),
            speed: freshest.and_then(|f| f.speed),
        }
    }
}

/// Result of a recompute.
#[derive(Debug, Clone, PartialEq)]
pub enum StabilizationState {
    /// No cluster has cleared the threshold yet.
    Stabilizing {
        /// Best cluster confidence seen, 0 when there is no cluster.
        confidence: f64,
    },
    /// A new estimate was produced.
    Stable(StableEstimate),
}

impl StabilizationState {
    /// True for [`StabilizationState::Stable`].
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable(_))
    }

    /// Confidence carried by either variant.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Stabilizing { confidence } => *confidence,
            Self::Stable(estimate) => estimate.confidence,
        }
    }
}

/// Owns fix history and the current stable estimate.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    config: StabilizerConfig,
    history: HistoryBuffer,
    estimate: Option<StableEstimate>,
    /// Start of the current run of `Stabilizing` results.
    stabilizing_since: Option<DateTime<Utc>>,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default())
    }
}

impl Stabilizer {
    /// Create a stabilizer with an empty history.
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            history: HistoryBuffer::new(config.history_capacity),
            config,
            estimate: None,
            stabilizing_since: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Accepted fixes, oldest first.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Mutable history, for the ingestor.
    pub fn history_mut(&mut self) -> &mut HistoryBuffer {
        &mut self.history
    }

    /// The last stable estimate, if still valid.
    pub fn estimate(&self) -> Option<&StableEstimate> {
        self.estimate.as_ref()
    }

    /// Re-evaluate history at `now`.
    pub fn recompute(&mut self, now: DateTime<Utc>) -> StabilizationState {
        let min_size = self.config.min_cluster_size.max(1);
        if self.history.len() < min_size {
            return self.stabilizing(0.0, now);
        }

        let clusters = build_clusters(self.history.iter(), &self.config, now);

        // Strictly greater keeps the earlier cluster on ties, which is the
        // one seeded by the newer fix.
        let best = clusters.iter().fold(None::<&Cluster>, |best, c| match best {
            Some(b) if b.confidence >= c.confidence => Some(b),
            _ => Some(c),
        });

        let Some(best) = best else {
            return self.stabilizing(0.0, now);
        };

        if best.len() < min_size || best.confidence < self.config.publish_confidence {
            tracing::trace!(
                confidence = best.confidence,
                members = best.len(),
                "Best cluster below publish threshold"
            );
            return self.stabilizing(best.confidence, now);
        }

        let timestamp = self
            .history
            .latest()
            .map(|f| f.timestamp)
            .unwrap_or(now);
        let estimate = StableEstimate::from_cluster(best, timestamp);

        tracing::debug!(
            latitude = estimate.coordinate.latitude,
            longitude = estimate.coordinate.longitude,
            accuracy_m = estimate.accuracy.meters(),
            confidence = estimate.confidence,
            members = best.len(),
            "Stable estimate updated"
        );

        self.stabilizing_since = None;
        self.estimate = Some(estimate.clone());
        StabilizationState::Stable(estimate)
    }

    /// How long results have continuously been `Stabilizing`.
    ///
    /// Zero while stable or before the first recompute.
    pub fn stabilizing_for(&self, now: DateTime<Utc>) -> Duration {
        self.stabilizing_since
            .map(|since| crate::time::age_between(since, now))
            .unwrap_or(Duration::ZERO)
    }

    /// Start the stabilizing clock at `now` with empty state.
    ///
    /// Used when tracking starts so a device that never produces a usable
    /// fix still counts as stabilizing.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.reset();
        self.stabilizing_since = Some(now);
    }

    /// Drop the estimate and history if no fix was accepted recently.
    ///
    /// Returns true if anything was cleared.
    pub fn expire_if_inactive(&mut self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.history.latest() else {
            return false;
        };
        let idle = last.age_at(now);
        if idle <= self.config.inactivity_timeout {
            return false;
        }

        tracing::debug!(
            idle_secs = idle.as_secs(),
            had_estimate = self.estimate.is_some(),
            "No fix accepted within inactivity timeout, clearing estimate"
        );
        self.history.clear();
        self.estimate = None;
        self.stabilizing_since = Some(now);
        true
    }

    /// Clear history, estimate and the stabilizing clock.
    pub fn reset(&mut self) {
        self.history.clear();
        self.estimate = None;
        self.stabilizing_since = None;
    }

    /// The freshest accepted fix.
    pub fn latest_fix(&self) -> Option<&PositionFix> {
        self.history.latest()
    }

    fn stabilizing(&mut self, confidence: f64, now: DateTime<Utc>) -> StabilizationState {
        if self.stabilizing_since.is_none() {
            self.stabilizing_since = Some(now);
        }
        StabilizationState::Stabilizing { confidence }
    }
}
