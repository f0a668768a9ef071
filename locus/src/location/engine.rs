//! Location Engine - ingestor and stabilizer run as one sequence.
//!
//! Every fix goes through [`LocationEngine::process`]: the ingestor decides
//! whether it enters history, and an accepted fix immediately triggers a
//! recompute. The engine is synchronous and owns all of its state, so a
//! single task driving it can never interleave two fixes.

use chrono::{DateTime, Utc};

use super::fix::PositionFix;
use super::history::HistoryBuffer;
use super::ingest::{FixIngestor, IngestConfig, IngestDecision};
use super::stabilizer::{StabilizationState, StableEstimate, Stabilizer, StabilizerConfig};
use super::LocationError;

/// Configuration for the engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Fix ingestor settings.
    pub ingest: IngestConfig,

    /// Clustering and confidence settings.
    pub stabilizer: StabilizerConfig,
}

impl EngineConfig {
    /// Validate the combined configuration.
    pub fn validate(&self) -> Result<(), LocationError> {
        let ingest = &self.ingest;
        if ingest.hard_reject_ceiling_m.is_nan() || ingest.hard_reject_ceiling_m <= 0.0 {
            return Err(LocationError::InvalidConfiguration(format!(
                "hard reject ceiling must be positive, got {}",
                ingest.hard_reject_ceiling_m
            )));
        }
        if ingest.max_jump_m.is_nan() || ingest.max_jump_m <= 0.0 {
            return Err(LocationError::InvalidConfiguration(format!(
                "max jump must be positive, got {}",
                ingest.max_jump_m
            )));
        }
        self.stabilizer
            .validate()
            .map_err(LocationError::InvalidConfiguration)
    }
}

/// What happened to one fix.
#[derive(Debug, Clone, PartialEq)]
pub struct FixOutcome {
    /// Ingestor verdict.
    pub decision: IngestDecision,

    /// Recompute result; `None` when the fix was rejected.
    pub state: Option<StabilizationState>,
}

/// Synchronous stabilization pipeline.
///
/// # Usage
///
/// ```
/// use chrono::Utc;
/// use locus::location::{LocationEngine, PositionFix};
///
/// let mut engine = LocationEngine::default();
/// let now = Utc::now();
///
/// let outcome = engine.process(PositionFix::new(51.5074, -0.1278, Some(8.0), now), now);
/// assert!(outcome.decision.is_accepted());
/// assert!(engine.estimate().is_none()); // one fix is not enough
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocationEngine {
    ingestor: FixIngestor,
    stabilizer: Stabilizer,
}

impl LocationEngine {
    /// Create an engine with empty history.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            ingestor: FixIngestor::new(config.ingest),
            stabilizer: Stabilizer::new(config.stabilizer),
        }
    }

    /// Ingest one fix and, if accepted, recompute.
    pub fn process(&mut self, fix: PositionFix, now: DateTime<Utc>) -> FixOutcome {
        let decision = self.ingestor.accept(fix, self.stabilizer.history_mut());
        let state = decision
            .is_accepted()
            .then(|| self.stabilizer.recompute(now));
        FixOutcome { decision, state }
    }

    /// Recompute without a new fix (ages change over time).
    pub fn recompute(&mut self, now: DateTime<Utc>) -> StabilizationState {
        self.stabilizer.recompute(now)
    }

    /// The current stable estimate.
    pub fn estimate(&self) -> Option<&StableEstimate> {
        self.stabilizer.estimate()
    }

    /// Accepted fixes, oldest first.
    pub fn history(&self) -> &HistoryBuffer {
        self.stabilizer.history()
    }

    /// How long the engine has continuously been stabilizing.
    pub fn stabilizing_for(&self, now: DateTime<Utc>) -> std::time::Duration {
        self.stabilizer.stabilizing_for(now)
    }

    /// Drop stale state. Returns true if anything was cleared.
    pub fn expire_if_inactive(&mut self, now: DateTime<Utc>) -> bool {
        self.stabilizer.expire_if_inactive(now)
    }

    /// Reset and start the stabilizing clock at `now`.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.stabilizer.begin(now);
    }

    /// Clear all state.
    pub fn reset(&mut self) {
        self.stabilizer.reset();
    }

    /// Ingestor settings, for callers judging fix quality themselves.
    pub fn ingest_config(&self) -> &IngestConfig {
        self.ingestor.config()
    }

    /// Stabilizer settings.
    pub fn stabilizer_config(&self) -> &StabilizerConfig {
        self.stabilizer.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::ingest::RejectReason;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_stream_becomes_stable_and_rejects_outliers() {
        let mut engine = LocationEngine::default();

        let first = engine.process(PositionFix::new(51.5074, -0.1278, Some(8.0), at(0)), at(0));
        assert_eq!(
            first.state,
            Some(StabilizationState::Stabilizing { confidence: 0.0 })
        );

        // Poor accuracy: rejected, no recompute
        let poor = engine.process(PositionFix::new(51.5074, -0.1278, Some(150.0), at(1)), at(1));
        assert_eq!(
            poor.decision,
            IngestDecision::Rejected(RejectReason::PoorAccuracy)
        );
        assert!(poor.state.is_none());
        assert_eq!(engine.history().len(), 1);

        engine.process(PositionFix::new(51.50742, -0.12778, Some(6.0), at(1)), at(1));
        let third = engine.process(PositionFix::new(51.50739, -0.12781, Some(9.0), at(2)), at(2));

        assert!(third.state.unwrap().is_stable());
        assert!(engine.estimate().is_some());
    }

    #[test]
    fn test_gap_reset_restarts_stabilization() {
        let mut engine = LocationEngine::default();
        for s in 0..3 {
            engine.process(PositionFix::new(51.5074, -0.1278, Some(8.0), at(s)), at(s));
        }
        assert!(engine.estimate().is_some());

        let resumed = engine.process(PositionFix::new(51.52, -0.13, Some(8.0), at(100)), at(100));
        assert_eq!(
            resumed.decision,
            IngestDecision::Accepted {
                history_reset: true
            }
        );
        assert_eq!(engine.history().len(), 1);
        // The old estimate is kept until a new cluster forms
        assert!(!resumed.state.unwrap().is_stable());
        assert!(engine.estimate().is_some());
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let mut config = EngineConfig::default();
        config.ingest.max_jump_m = 0.0;
        assert!(matches!(
            config.validate(),
            Err(LocationError::InvalidConfiguration(_))
        ));

        let mut config = EngineConfig::default();
        config.stabilizer.weights.accuracy = -1.0;
        assert!(config.validate().is_err());
    }
}
