//! Accuracy escalation - one-shot requests at degrading accuracy tiers.
//!
//! When the engine cannot stabilize from the stream alone, the session asks
//! the provider for a single fix, starting at the best tier and stepping
//! down one tier per failed attempt:
//!
//! ```text
//! Idle → Requesting(tier) ─┬─ fix within retry bar ──────→ Succeeded(fix)
//!                          ├─ poor fix / timeout ────────→ Degrading(lower tier) → Requesting(..)
//!                          ├─ attempts used up ──────────→ Exhausted(last fix)
//!                          └─ permission / services off ─→ Failed(error)
//! ```
//!
//! [`EscalationController`] is the pure state machine; [`EscalationController::run`]
//! drives it against a [`LocationProvider`] with timeouts and cancellation.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::LocationError;
use super::fix::{AccuracyTier, PositionFix};
use super::provider::{FixRequest, LocationProvider};

/// Configuration for accuracy escalation.
#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Tier of the first request.
    pub start_tier: AccuracyTier,

    /// A fix at or below this accuracy (meters) ends escalation.
    pub retry_accuracy_m: f64,

    /// Attempts before giving up.
    pub max_attempts: u32,

    /// Time allowed for each request.
    pub request_timeout: Duration,

    /// Oldest cached fix a provider may answer with.
    pub max_fix_age: Duration,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            start_tier: AccuracyTier::Best,
            retry_accuracy_m: 50.0,
            max_attempts: 5,
            request_timeout: Duration::from_secs(10),
            max_fix_age: Duration::from_secs(5),
        }
    }
}

/// Escalation state.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationState {
    /// Not running.
    Idle,
    /// Waiting for the provider at this tier.
    Requesting(AccuracyTier),
    /// Got a fix within the retry bar.
    Succeeded(PositionFix),
    /// The last attempt failed; the next request uses this tier.
    Degrading(AccuracyTier),
    /// Attempts used up; carries the best-effort fix, if any arrived.
    Exhausted(Option<PositionFix>),
    /// The provider reported an error that needs user action.
    Failed(LocationError),
}

impl EscalationState {
    /// Returns true if no further requests will be made.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::Exhausted(_) | Self::Failed(_)
        )
    }
}

/// Result of a completed escalation run.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    /// A fix within the retry bar.
    Obtained(PositionFix),
    /// Attempts ran out; this is the last fix received, which missed the bar.
    Degraded(PositionFix),
    /// Attempts ran out without any fix.
    Exhausted,
    /// The run was cancelled.
    Cancelled,
}

impl EscalationOutcome {
    /// The fix carried by the outcome, if any.
    pub fn fix(&self) -> Option<&PositionFix> {
        match self {
            Self::Obtained(fix) | Self::Degraded(fix) => Some(fix),
            Self::Exhausted | Self::Cancelled => None,
        }
    }
}

/// Tier step-down state machine.
#[derive(Debug, Clone)]
pub struct EscalationController {
    config: EscalationConfig,
    state: EscalationState,
    attempts: u32,
    last_fix: Option<PositionFix>,
}

impl Default for EscalationController {
    fn default() -> Self {
        Self::new(EscalationConfig::default())
    }
}

impl EscalationController {
    /// Create an idle controller.
    pub fn new(config: EscalationConfig) -> Self {
        Self {
            config,
            state: EscalationState::Idle,
            attempts: 0,
            last_fix: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &EscalationState {
        &self.state
    }

    /// Failed attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start (or restart) escalation. Returns the tier to request.
    pub fn begin(&mut self) -> AccuracyTier {
        self.attempts = 0;
        self.last_fix = None;
        self.state = EscalationState::Requesting(self.config.start_tier);
        self.config.start_tier
    }

    /// Feed the result of the outstanding request.
    ///
    /// Ignored unless a request is outstanding.
    pub fn on_result(&mut self, result: Result<PositionFix, LocationError>) -> &EscalationState {
        let EscalationState::Requesting(tier) = self.state else {
            tracing::trace!(state = ?self.state, "Ignoring escalation result outside a request");
            return &self.state;
        };

        match result {
            Ok(fix) => {
                let accuracy = fix.accuracy_or_worst().meters();
                if accuracy <= self.config.retry_accuracy_m {
                    tracing::debug!(%tier, accuracy_m = accuracy, "Escalation obtained fix");
                    self.state = EscalationState::Succeeded(fix);
                } else {
                    tracing::debug!(
                        %tier,
                        accuracy_m = accuracy,
                        retry_accuracy_m = self.config.retry_accuracy_m,
                        "Escalation fix missed accuracy bar"
                    );
                    self.last_fix = Some(fix);
                    self.degrade(tier);
                }
            }
            Err(error) if error.is_fatal() => {
                tracing::warn!(%tier, error = %error, "Escalation failed");
                self.state = EscalationState::Failed(error);
            }
            Err(error) => {
                tracing::debug!(%tier, error = %error, "Escalation request failed");
                self.degrade(tier);
            }
        }

        &self.state
    }

    /// Move from `Degrading` to `Requesting`. Returns the tier to request.
    pub fn advance(&mut self) -> Option<AccuracyTier> {
        match self.state {
            EscalationState::Degrading(tier) => {
                self.state = EscalationState::Requesting(tier);
                Some(tier)
            }
            EscalationState::Requesting(tier) => Some(tier),
            _ => None,
        }
    }

    /// Abandon escalation.
    pub fn cancel(&mut self) {
        self.state = EscalationState::Idle;
        self.attempts = 0;
        self.last_fix = None;
    }

    /// Run escalation to completion against `provider`.
    ///
    /// Each request is bounded by the request timeout; an elapsed timeout
    /// counts as [`LocationError::Timeout`]. Returns `Err` only for fatal
    /// provider errors.
    pub async fn run<P>(
        &mut self,
        provider: &P,
        cancel: &CancellationToken,
    ) -> Result<EscalationOutcome, LocationError>
    where
        P: LocationProvider + ?Sized,
    {
        let mut tier = self.begin();

        loop {
            let request = FixRequest {
                tier,
                max_age: self.config.max_fix_age,
                timeout: self.config.request_timeout,
            };

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(%tier, "Escalation cancelled");
                    self.cancel();
                    return Ok(EscalationOutcome::Cancelled);
                }
                result = tokio::time::timeout(request.timeout, provider.current_fix(request)) => {
                    result.unwrap_or(Err(LocationError::Timeout))
                }
            };

            match self.on_result(result).clone() {
                EscalationState::Succeeded(fix) => return Ok(EscalationOutcome::Obtained(fix)),
                EscalationState::Exhausted(Some(fix)) => {
                    return Ok(EscalationOutcome::Degraded(fix))
                }
                EscalationState::Exhausted(None) => return Ok(EscalationOutcome::Exhausted),
                EscalationState::Failed(error) => return Err(error),
                EscalationState::Degrading(_) | EscalationState::Requesting(_) => {
                    match self.advance() {
                        Some(next) => tier = next,
                        None => return Ok(EscalationOutcome::Cancelled),
                    }
                }
                EscalationState::Idle => return Ok(EscalationOutcome::Cancelled),
            }
        }
    }

    fn degrade(&mut self, tier: AccuracyTier) {
        self.attempts += 1;
        if self.attempts >= self.config.max_attempts {
            tracing::debug!(attempts = self.attempts, "Escalation exhausted");
            self.state = EscalationState::Exhausted(self.last_fix.take());
        } else {
            // The lowest tier repeats until attempts run out
            self.state = EscalationState::Degrading(tier.lower().unwrap_or(tier));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::provider::{FixSubscription, WatchOptions};
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    fn fix(accuracy: f64) -> PositionFix {
        PositionFix::new(51.5074, -0.1278, Some(accuracy), Utc::now())
    }

    /// Replays scripted results and records requested tiers.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Option<Result<PositionFix, LocationError>>>>,
        tiers: Mutex<Vec<AccuracyTier>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Option<Result<PositionFix, LocationError>>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                tiers: Mutex::new(Vec::new()),
            }
        }

        fn tiers(&self) -> Vec<AccuracyTier> {
            self.tiers.lock().clone()
        }
    }

    impl LocationProvider for ScriptedProvider {
        async fn current_fix(&self, request: FixRequest) -> Result<PositionFix, LocationError> {
            self.tiers.lock().push(request.tier);
            let next = self.script.lock().pop_front();
            match next {
                Some(Some(result)) => result,
                // `None` entries never answer
                Some(None) => std::future::pending().await,
                None => Err(LocationError::ProviderUnavailable("script ended".into())),
            }
        }

        fn subscribe(&self, _options: WatchOptions) -> Result<FixSubscription, LocationError> {
            Ok(FixSubscription::channel(1).1)
        }
    }

    #[test]
    fn test_good_fix_succeeds_immediately() {
        let mut controller = EscalationController::default();
        assert_eq!(controller.begin(), AccuracyTier::Best);

        let state = controller.on_result(Ok(fix(12.0)));
        assert!(matches!(state, EscalationState::Succeeded(_)));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_timeouts_step_down_tiers() {
        let mut controller = EscalationController::default();
        controller.begin();

        let mut tiers = vec![AccuracyTier::Best];
        for _ in 0..4 {
            let state = controller.on_result(Err(LocationError::Timeout)).clone();
            let EscalationState::Degrading(next) = state else {
                panic!("expected Degrading, got {:?}", state);
            };
            assert_eq!(controller.advance(), Some(next));
            tiers.push(next);
        }

        assert_eq!(tiers, AccuracyTier::ALL.to_vec());
        assert_eq!(controller.attempts(), 4);

        // Fifth failure exhausts without a fix
        assert_eq!(
            controller.on_result(Err(LocationError::Timeout)),
            &EscalationState::Exhausted(None)
        );
    }

    #[test]
    fn test_exhausted_keeps_last_poor_fix() {
        let mut controller = EscalationController::new(EscalationConfig {
            max_attempts: 2,
            ..Default::default()
        });
        controller.begin();

        controller.on_result(Ok(fix(80.0)));
        controller.advance();
        let state = controller.on_result(Err(LocationError::ProviderUnavailable("busy".into())));

        let EscalationState::Exhausted(Some(last)) = state else {
            panic!("expected Exhausted with fix, got {:?}", state);
        };
        assert_eq!(last.accuracy_or_worst().meters(), 80.0);
    }

    #[test]
    fn test_lowest_tier_repeats() {
        let mut controller = EscalationController::new(EscalationConfig {
            start_tier: AccuracyTier::Lowest,
            max_attempts: 3,
            ..Default::default()
        });
        controller.begin();

        controller.on_result(Err(LocationError::Timeout));
        assert_eq!(controller.advance(), Some(AccuracyTier::Lowest));
    }

    #[test]
    fn test_fatal_error_fails() {
        let mut controller = EscalationController::default();
        controller.begin();

        let state = controller.on_result(Err(LocationError::PermissionDenied));
        assert_eq!(state, &EscalationState::Failed(LocationError::PermissionDenied));
        assert_eq!(controller.attempts(), 0);
    }

    #[test]
    fn test_result_ignored_when_idle() {
        let mut controller = EscalationController::default();
        assert_eq!(controller.on_result(Ok(fix(5.0))), &EscalationState::Idle);
        assert_eq!(controller.advance(), None);
    }

    #[tokio::test]
    async fn test_run_steps_down_until_good_fix() {
        let provider = ScriptedProvider::new(vec![
            Some(Err(LocationError::Timeout)),
            Some(Ok(fix(120.0))),
            Some(Ok(fix(30.0))),
        ]);
        let mut controller = EscalationController::default();

        let outcome = controller
            .run(&provider, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, EscalationOutcome::Obtained(ref f) if f.accuracy_or_worst().meters() == 30.0));
        assert_eq!(
            provider.tiers(),
            vec![AccuracyTier::Best, AccuracyTier::High, AccuracyTier::Balanced]
        );
    }

    #[tokio::test]
    async fn test_run_times_out_hung_requests() {
        let provider = ScriptedProvider::new(vec![None, None]);
        let mut controller = EscalationController::new(EscalationConfig {
            max_attempts: 2,
            request_timeout: Duration::from_millis(20),
            ..Default::default()
        });

        let outcome = controller
            .run(&provider, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, EscalationOutcome::Exhausted);
        assert_eq!(provider.tiers().len(), 2);
    }

    #[tokio::test]
    async fn test_run_returns_degraded_fix_when_exhausted() {
        let provider = ScriptedProvider::new(vec![Some(Ok(fix(90.0))), Some(Ok(fix(70.0)))]);
        let mut controller = EscalationController::new(EscalationConfig {
            max_attempts: 2,
            ..Default::default()
        });

        let outcome = controller
            .run(&provider, &CancellationToken::new())
            .await
            .unwrap();

        let EscalationOutcome::Degraded(last) = outcome else {
            panic!("expected Degraded, got {:?}", outcome);
        };
        assert_eq!(last.accuracy_or_worst().meters(), 70.0);
    }

    #[tokio::test]
    async fn test_run_propagates_fatal_error() {
        let provider = ScriptedProvider::new(vec![
            Some(Err(LocationError::Timeout)),
            Some(Err(LocationError::ServicesDisabled)),
        ]);
        let mut controller = EscalationController::default();

        let result = controller.run(&provider, &CancellationToken::new()).await;
        assert_eq!(result, Err(LocationError::ServicesDisabled));
    }

    #[tokio::test]
    async fn test_run_cancelled() {
        let provider = ScriptedProvider::new(vec![None]);
        let mut controller = EscalationController::default();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = controller.run(&provider, &cancel).await.unwrap();
        assert_eq!(outcome, EscalationOutcome::Cancelled);
        assert_eq!(controller.state(), &EscalationState::Idle);
    }
}
