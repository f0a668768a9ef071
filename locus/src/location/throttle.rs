//! Publish throttle - rate limits writes of the stable estimate.
//!
//! Two gates apply to every candidate:
//!
//! - Accuracy: estimates worse than the publish ceiling are skipped
//! - Interval: at most one publish per minimum interval, measured from the
//!   last successful publish
//!
//! Async writers use [`PublishThrottle::check`] before the write and
//! [`PublishThrottle::record_published`] once the store confirmed it, so a
//! failed write does not consume the interval.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::stabilizer::StableEstimate;

/// Configuration for the publish throttle.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Estimates with accuracy above this (meters) are not published.
    pub max_publish_accuracy_m: f64,

    /// Minimum time between publishes.
    pub min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_publish_accuracy_m: 200.0,
            min_interval: Duration::from_secs(2),
        }
    }
}

/// Why a publish was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Accuracy worse than the publish ceiling.
    LowAccuracy,
}

/// Outcome of offering an estimate to the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    /// The estimate may be (or was) published.
    Published,
    /// Too soon after the last publish.
    Throttled,
    /// Not publishable at all.
    Skipped(SkipReason),
}

/// Rate limiter for store writes.
#[derive(Debug, Clone, Default)]
pub struct PublishThrottle {
    config: ThrottleConfig,
    last_published: Option<DateTime<Utc>>,
}

impl PublishThrottle {
    /// Create a throttle with no publish history.
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last_published: None,
        }
    }

    /// Decide whether `estimate` may be published at `now`, without
    /// recording anything.
    pub fn check(&self, estimate: &StableEstimate, now: DateTime<Utc>) -> PublishDecision {
        let accuracy = estimate.accuracy.meters();
        if accuracy.is_nan() || accuracy > self.config.max_publish_accuracy_m {
            return PublishDecision::Skipped(SkipReason::LowAccuracy);
        }

        if let Some(last) = self.last_published {
            // A clock that went backwards also counts as too soon
            let elapsed = now.signed_duration_since(last).to_std();
            match elapsed {
                Ok(elapsed) if elapsed >= self.config.min_interval => {}
                _ => return PublishDecision::Throttled,
            }
        }

        PublishDecision::Published
    }

    /// Record a confirmed publish at `now`.
    pub fn record_published(&mut self, now: DateTime<Utc>) {
        self.last_published = Some(now);
    }

    /// Check and, if allowed, record in one step.
    pub fn maybe_publish(&mut self, estimate: &StableEstimate, now: DateTime<Utc>) -> PublishDecision {
        let decision = self.check(estimate, now);
        if decision == PublishDecision::Published {
            self.record_published(now);
        }
        decision
    }

    /// Time of the last recorded publish.
    pub fn last_published(&self) -> Option<DateTime<Utc>> {
        self.last_published
    }

    /// Forget publish history.
    pub fn reset(&mut self) {
        self.last_published = None;
    }
}
