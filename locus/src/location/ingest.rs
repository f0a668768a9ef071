//! Fix Ingestor - quality gate in front of the history buffer.
//!
//! Every fix, streamed or one-shot, passes through [`FixIngestor::accept`]
//! before it can influence the estimate. Rules, in order:
//!
//! 1. Accuracy missing or worse than the hard-reject ceiling → `PoorAccuracy`
//! 2. Older than the last accepted fix → `OutOfOrder`
//! 3. Farther than max-jump from the last accepted fix within the
//!    gap-reset window → `ImplausibleJump`
//!
//! When the gap since the last accepted fix exceeds the gap-reset window the
//! jump check is skipped: tracking resumed after a pause is not an anomaly.
//! The stale history is dropped at that point so the resumed track is not
//! clustered together with where the device used to be.

use std::time::Duration;

use super::fix::PositionFix;
use super::history::HistoryBuffer;
use crate::geo::distance_meters;

/// Default hard-reject accuracy ceiling in meters.
pub const DEFAULT_HARD_REJECT_CEILING_M: f64 = 100.0;

/// Default max plausible jump between consecutive fixes, in meters.
pub const DEFAULT_MAX_JUMP_M: f64 = 200.0;

/// Default gap after which the jump check is skipped.
pub const DEFAULT_GAP_RESET_WINDOW: Duration = Duration::from_secs(30);

/// Configuration for the fix ingestor.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Fixes with accuracy above this (meters) are rejected.
    pub hard_reject_ceiling_m: f64,

    /// Largest distance (meters) accepted between consecutive fixes
    /// inside the gap-reset window.
    pub max_jump_m: f64,

    /// Gap after which the jump check no longer applies.
    pub gap_reset_window: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            hard_reject_ceiling_m: DEFAULT_HARD_REJECT_CEILING_M,
            max_jump_m: DEFAULT_MAX_JUMP_M,
            gap_reset_window: DEFAULT_GAP_RESET_WINDOW,
        }
    }
}

/// Why a fix was kept out of history.
///
/// These are routine filtering outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Accuracy missing or worse than the hard-reject ceiling.
    PoorAccuracy,
    /// Moved farther than physically plausible since the last fix.
    ImplausibleJump,
    /// Captured before the last accepted fix.
    OutOfOrder,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PoorAccuracy => write!(f, "poor accuracy"),
            Self::ImplausibleJump => write!(f, "implausible jump"),
            Self::OutOfOrder => write!(f, "out of order"),
        }
    }
}

/// Outcome of offering a fix to the ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestDecision {
    /// The fix was appended to history.
    Accepted {
        /// True if older history was discarded because of a tracking gap.
        history_reset: bool,
    },
    /// The fix was dropped; history is unchanged.
    Rejected(RejectReason),
}

impl IngestDecision {
    /// True for [`IngestDecision::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Quality gate for incoming fixes.
#[derive(Debug, Clone, Default)]
pub struct FixIngestor {
    config: IngestConfig,
}

impl FixIngestor {
    /// Create an ingestor with the given configuration.
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Check a fix against the rules without touching history.
    pub fn evaluate(&self, fix: &PositionFix, history: &HistoryBuffer) -> IngestDecision {
        let accuracy = fix.accuracy_or_worst().meters();
        if accuracy.is_nan() || accuracy > self.config.hard_reject_ceiling_m {
            return IngestDecision::Rejected(RejectReason::PoorAccuracy);
        }

        let Some(last) = history.latest() else {
            return IngestDecision::Accepted {
                history_reset: false,
            };
        };

        if fix.timestamp < last.timestamp {
            return IngestDecision::Rejected(RejectReason::OutOfOrder);
        }

        let gap = crate::time::age_between(last.timestamp, fix.timestamp);
        if gap > self.config.gap_reset_window {
            return IngestDecision::Accepted {
                history_reset: true,
            };
        }

        let jump = distance_meters(last.coordinate(), fix.coordinate());
        if jump > self.config.max_jump_m {
            return IngestDecision::Rejected(RejectReason::ImplausibleJump);
        }

        IngestDecision::Accepted {
            history_reset: false,
        }
    }

    /// Offer a fix; accepted fixes are appended to `history`.
    pub fn accept(&self, fix: PositionFix, history: &mut HistoryBuffer) -> IngestDecision {
        let decision = self.evaluate(&fix, history);

        match decision {
            IngestDecision::Accepted { history_reset } => {
                if history_reset {
                    tracing::debug!(
                        discarded = history.len(),
                        "Tracking gap detected, resetting fix history"
                    );
                    history.clear();
                }
                history.push(fix);
            }
            IngestDecision::Rejected(reason) => {
                tracing::trace!(
                    latitude = fix.latitude,
                    longitude = fix.longitude,
                    accuracy_m = fix.accuracy.map(|a| a.meters()),
                    %reason,
                    "Fix rejected"
                );
            }
        }

        decision
    }
}
