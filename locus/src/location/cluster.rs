//! Spatial clustering and confidence scoring.
//!
//! Groups recent fixes into clusters whose members all lie within the
//! cluster radius of each other, then scores how much each cluster's center
//! can be trusted.
//!
//! # Confidence
//!
//! ```text
//! confidence = w_size·size + w_accuracy·accuracy + w_spread·spread + w_recency·recency
//! ```
//!
//! Each factor is in [0, 1] and never decreases as its input improves, and
//! weights are non-negative, so confidence is monotonic in every factor.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::fix::{Accuracy, PositionFix};
use super::stabilizer::StabilizerConfig;
use crate::geo::{distance_meters, normalize_longitude, Coordinate};

/// Weights of the four confidence factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceWeights {
    /// Weight of cluster size relative to the target size.
    pub size: f64,
    /// Weight of the best member accuracy.
    pub accuracy: f64,
    /// Weight of spatial consistency.
    pub spread: f64,
    /// Weight of the fraction of recent members.
    pub recency: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            size: 0.3,
            accuracy: 0.4,
            spread: 0.2,
            recency: 0.1,
        }
    }
}

impl ConfidenceWeights {
    /// Combine factors into a confidence score in [0, 1].
    pub fn score(&self, factors: &ConfidenceFactors) -> f64 {
        let raw = self.size * factors.size
            + self.accuracy * factors.accuracy
            + self.spread * factors.spread
            + self.recency * factors.recency;
        raw.clamp(0.0, 1.0)
    }

    /// Reject weights that would break monotonicity.
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("size", self.size),
            ("accuracy", self.accuracy),
            ("spread", self.spread),
            ("recency", self.recency),
        ];
        for (name, value) in all {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "confidence weight '{}' must be a non-negative number, got {}",
                    name, value
                ));
            }
        }
        if all.iter().all(|(_, v)| *v == 0.0) {
            return Err("at least one confidence weight must be positive".to_string());
        }
        Ok(())
    }
}

/// The four normalized inputs to the confidence score, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceFactors {
    /// Member count relative to the target cluster size.
    pub size: f64,
    /// Best member accuracy relative to the accuracy ceiling (1 = perfect).
    pub accuracy: f64,
    /// Tightness of members around the center (1 = all on the center).
    pub spread: f64,
    /// Fraction of members captured within the recent window.
    pub recency: f64,
}

/// A spatially coherent group of recent fixes.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Member fixes in the order they joined.
    pub members: Vec<PositionFix>,
    /// Accuracy-and-recency-weighted centroid.
    pub center: Coordinate,
    /// Best accuracy among members.
    pub best_accuracy: Accuracy,
    /// Mean distance from members to the center, in meters.
    pub mean_spread_m: f64,
    /// Normalized scoring inputs.
    pub factors: ConfidenceFactors,
    /// Combined confidence in [0, 1].
    pub confidence: f64,
}

impl Cluster {
    /// Number of member fixes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The most recent member fix.
    pub fn freshest(&self) -> Option<&PositionFix> {
        self.members.iter().max_by_key(|m| m.timestamp)
    }
}

/// Partition fixes into clusters, newest fix first.
///
/// A fix joins the first existing cluster whose every member is within the
/// cluster radius; otherwise it seeds a new cluster. Clusters smaller than
/// the minimum size are dropped. The result keeps creation order, so the
/// cluster seeded by the newest fix comes first.
pub fn build_clusters<'a, I>(
    fixes: I,
    config: &StabilizerConfig,
    now: DateTime<Utc>,
) -> Vec<Cluster>
where
    I: DoubleEndedIterator<Item = &'a PositionFix>,
{
    let mut groups: Vec<Vec<&PositionFix>> = Vec::new();

    for fix in fixes.rev() {
        let position = fix.coordinate();
        let home = groups.iter_mut().find(|group| {
            group.iter().all(|member| {
                distance_meters(member.coordinate(), position) <= config.cluster_radius_m
            })
        });

        match home {
            Some(group) => group.push(fix),
            None => groups.push(vec![fix]),
        }
    }

    groups
        .into_iter()
        .filter(|group| group.len() >= config.min_cluster_size.max(1))
        .map(|group| score_cluster(&group, config, now))
        .collect()
}

/// Score one group of fixes.
pub(crate) fn score_cluster(
    members: &[&PositionFix],
    config: &StabilizerConfig,
    now: DateTime<Utc>,
) -> Cluster {
    let center = weighted_center(members, config, now);

    let best_accuracy = members
        .iter()
        .map(|m| m.accuracy_or_worst())
        .fold(Accuracy::UNKNOWN, |best, a| {
            if a.is_better_than(&best) {
                a
            } else {
                best
            }
        });

    let mean_spread_m = if members.is_empty() {
        0.0
    } else {
        members
            .iter()
            .map(|m| distance_meters(m.coordinate(), center))
            .sum::<f64>()
            / members.len() as f64
    };

    let recent = members
        .iter()
        .filter(|m| m.age_at(now) <= config.recent_window)
        .count();

    let factors = ConfidenceFactors {
        size: size_factor(members.len(), config.target_cluster_size),
        accuracy: accuracy_factor(best_accuracy, config.accuracy_ceiling_m),
        spread: spread_factor(mean_spread_m, config.cluster_radius_m),
        recency: if members.is_empty() {
            0.0
        } else {
            recent as f64 / members.len() as f64
        },
    };

    Cluster {
        members: members.iter().map(|m| (*m).clone()).collect(),
        center,
        best_accuracy,
        mean_spread_m,
        confidence: config.weights.score(&factors),
        factors,
    }
}

/// Weight of a fix by age: 1 when new, falling linearly to `floor` at
/// `horizon` and staying there.
pub fn recency_weight(age: Duration, horizon: Duration, floor: f64) -> f64 {
    let floor = floor.clamp(0.0, 1.0);
    let progress = if horizon.is_zero() {
        if age.is_zero() {
            0.0
        } else {
            1.0
        }
    } else {
        (age.as_secs_f64() / horizon.as_secs_f64()).min(1.0)
    };
    1.0 - (1.0 - floor) * progress
}

fn size_factor(count: usize, target: usize) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (count as f64 / target as f64).min(1.0)
}

fn accuracy_factor(best: Accuracy, ceiling_m: f64) -> f64 {
    if ceiling_m <= 0.0 || !best.meters().is_finite() {
        return 0.0;
    }
    (1.0 - best.meters() / ceiling_m).clamp(0.0, 1.0)
}

fn spread_factor(mean_spread_m: f64, radius_m: f64) -> f64 {
    if radius_m <= 0.0 {
        return if mean_spread_m <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - mean_spread_m / radius_m).clamp(0.0, 1.0)
}

/// Accuracy-and-recency-weighted centroid.
///
/// Longitudes are averaged as offsets from the first member so a cluster
/// straddling the antimeridian does not average to the opposite side of
/// the globe.
fn weighted_center(
    members: &[&PositionFix],
    config: &StabilizerConfig,
    now: DateTime<Utc>,
) -> Coordinate {
    let Some(first) = members.first() else {
        return Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        };
    };
    let reference_lon = first.longitude;

    let weights: Vec<f64> = members
        .iter()
        .map(|m| {
            let accuracy_weight = 1.0 / m.accuracy_or_worst().meters().max(1.0);
            accuracy_weight
                * recency_weight(m.age_at(now), config.recency_horizon, config.recency_floor)
        })
        .collect();

    let total: f64 = weights.iter().sum();
    // Unusable weights (all zero) fall back to a plain mean
    let weights = if total > 0.0 && total.is_finite() {
        weights
    } else {
        vec![1.0; members.len()]
    };
    let total: f64 = weights.iter().sum();

    let mut lat_sum = 0.0;
    let mut dlon_sum = 0.0;
    for (member, w) in members.iter().zip(&weights) {
        lat_sum += w * member.latitude;
        dlon_sum += w * normalize_longitude(member.longitude - reference_lon);
    }

    Coordinate {
        latitude: lat_sum / total,
        longitude: normalize_longitude(reference_lon + dlon_sum / total),
    }
}
