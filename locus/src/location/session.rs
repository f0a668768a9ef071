//! Tracking session - the async lifecycle around the engine.
//!
//! A [`TrackingSession`] owns everything that runs in the background for one
//! local subject: the provider subscription, escalation requests, publish
//! and refresh timers. All of it hangs off one [`CancellationToken`], so
//! [`TrackingSession::stop`] (or dropping the session) tears it down in one
//! place.
//!
//! # Tasks
//!
//! ```text
//!                      ┌──────────── escalation reports ───────────┐
//!                      ▼                                           │
//! provider ──fixes──► fix loop (LocationEngine) ──watch──► publish task ──► store.publish
//!                      │                          │
//!                      │                          └──────► refresh task ──► store.fetch_nearby
//!                      ▼                                         │
//!                  SessionEvent::State                 SessionEvent::Proximity
//! ```
//!
//! - **fix loop** exclusively owns the [`LocationEngine`]; fixes are
//!   processed one at a time
//! - **publish task** exclusively owns the [`PublishThrottle`]
//! - **refresh task** classifies nearby subjects against the latest estimate

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::{EngineConfig, LocationEngine};
use super::error::LocationError;
use super::escalation::{EscalationConfig, EscalationController, EscalationOutcome};
use super::fix::PositionFix;
use super::provider::{FixSubscription, LocationProvider, WatchOptions};
use super::proximity::{ProximityClassifier, ProximityConfig, ProximityResult, SubjectId};
use super::stabilizer::{StabilizationState, StableEstimate};
use super::store::{LocationStore, PublishedPosition};
use super::throttle::{PublishDecision, PublishThrottle, ThrottleConfig};

/// Default broadcast channel capacity for session events.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Configuration for a tracking session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ingest and stabilization settings.
    pub engine: EngineConfig,

    /// One-shot escalation settings.
    pub escalation: EscalationConfig,

    /// Publish rate limiting.
    pub throttle: ThrottleConfig,

    /// Proximity buckets and liveness.
    pub proximity: ProximityConfig,

    /// Continuous watch parameters.
    pub watch: WatchOptions,

    /// Stabilizing longer than this triggers escalation.
    pub stabilization_timeout: Duration,

    /// How often the fix loop checks timeouts and inactivity.
    pub housekeeping_interval: Duration,

    /// How often the current estimate is offered to the store without a change.
    pub publish_interval: Duration,

    /// How often nearby subjects are fetched.
    pub refresh_interval: Duration,

    /// Radius for nearby fetches, in meters.
    pub nearby_radius_m: f64,

    /// Local subject, excluded from proximity results.
    pub local_subject: Option<SubjectId>,

    /// Event channel capacity.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            escalation: EscalationConfig::default(),
            throttle: ThrottleConfig::default(),
            proximity: ProximityConfig::default(),
            watch: WatchOptions::default(),
            stabilization_timeout: Duration::from_secs(30),
            housekeeping_interval: Duration::from_secs(1),
            publish_interval: Duration::from_secs(15),
            refresh_interval: Duration::from_secs(30),
            nearby_radius_m: 2_000.0,
            local_subject: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Validate every component configuration.
    pub fn validate(&self) -> Result<(), LocationError> {
        self.engine.validate()?;
        self.proximity
            .validate()
            .map_err(LocationError::InvalidConfiguration)?;

        let intervals = [
            ("housekeeping interval", self.housekeeping_interval),
            ("publish interval", self.publish_interval),
            ("refresh interval", self.refresh_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(LocationError::InvalidConfiguration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        if self.escalation.max_attempts == 0 {
            return Err(LocationError::InvalidConfiguration(
                "escalation needs at least one attempt".to_string(),
            ));
        }
        if self.nearby_radius_m.is_nan() || self.nearby_radius_m <= 0.0 {
            return Err(LocationError::InvalidConfiguration(format!(
                "nearby radius must be positive, got {}",
                self.nearby_radius_m
            )));
        }
        Ok(())
    }
}

/// Events broadcast by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The engine recomputed after an accepted fix.
    State(StabilizationState),
    /// Fresh proximity classification.
    Proximity(Vec<ProximityResult>),
    /// The store confirmed a publish.
    Published(PublishedPosition),
    /// A fatal error stopped tracking.
    Failed(LocationError),
    /// The session was stopped.
    Stopped,
}

/// Snapshot of session state for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingStatus {
    /// True while background tasks are running.
    pub running: bool,

    /// Latest confidence reported by the engine.
    pub confidence: f64,

    /// Current stable estimate.
    pub estimate: Option<StableEstimate>,

    /// Fixes currently in history.
    pub history_len: usize,

    /// Fixes rejected since start.
    pub rejected_fixes: u64,

    /// True while an escalation request is in flight.
    pub escalating: bool,

    /// Time of the last confirmed publish.
    pub last_published: Option<DateTime<Utc>>,

    /// Latest proximity classification.
    pub nearby: Vec<ProximityResult>,

    /// The error that ended the session, if any.
    pub last_error: Option<LocationError>,
}

type SharedStatus = Arc<RwLock<TrackingStatus>>;

/// Handles of a started session.
struct RunningSession {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Location tracking for one local subject.
///
/// # Usage
///
/// ```ignore
/// let mut session = TrackingSession::new(provider, store, SessionConfig::default());
/// let mut events = session.subscribe();
///
/// session.start()?;
/// while let Ok(event) = events.recv().await {
///     match event {
///         SessionEvent::Proximity(nearby) => render(nearby),
///         SessionEvent::Failed(error) => break,
///         _ => {}
///     }
/// }
/// session.stop().await?;
/// ```
pub struct TrackingSession<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
    status: SharedStatus,
    running: Option<RunningSession>,
}

impl<P, S> TrackingSession<P, S>
where
    P: LocationProvider + 'static,
    S: LocationStore + 'static,
{
    /// Create a stopped session.
    pub fn new(provider: Arc<P>, store: Arc<S>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            provider,
            store,
            config,
            events,
            status: Arc::new(RwLock::new(TrackingStatus::default())),
            running: None,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current status snapshot.
    pub fn status(&self) -> TrackingStatus {
        self.status.read().clone()
    }

    /// Current stable estimate.
    pub fn estimate(&self) -> Option<StableEstimate> {
        self.status.read().estimate.clone()
    }

    /// True while tracking is active.
    ///
    /// Turns false on its own when a fatal error ends tracking; call
    /// [`stop`](Self::stop) afterwards to clear the published position.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.cancel.is_cancelled())
    }

    /// Start tracking.
    ///
    /// Subscribes to the provider and spawns the background tasks. Fails
    /// synchronously when the configuration is invalid or the provider
    /// refuses the subscription. Starting a running session does nothing.
    pub fn start(&mut self) -> Result<(), LocationError> {
        if self.is_running() {
            tracing::debug!("Tracking session already running");
            return Ok(());
        }
        self.config.validate()?;

        // A session that failed on its own still holds finished handles
        if let Some(previous) = self.running.take() {
            previous.cancel.cancel();
        }

        let subscription = self.provider.subscribe(self.config.watch)?;

        let cancel = CancellationToken::new();
        let (estimate_tx, estimate_rx) = watch::channel(None);

        *self.status.write() = TrackingStatus {
            running: true,
            ..Default::default()
        };

        let fix_loop = FixLoop {
            engine: LocationEngine::new(self.config.engine.clone()),
            subscription,
            provider: Arc::clone(&self.provider),
            escalation: self.config.escalation.clone(),
            stabilization_timeout: self.config.stabilization_timeout,
            housekeeping_interval: self.config.housekeeping_interval,
            estimate_tx,
            events: self.events.clone(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
        };

        let publisher = PublishTask {
            store: Arc::clone(&self.store),
            throttle: PublishThrottle::new(self.config.throttle.clone()),
            interval: self.config.publish_interval,
            estimate_rx: estimate_rx.clone(),
            events: self.events.clone(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
        };

        let mut classifier = ProximityClassifier::new(self.config.proximity.clone());
        if let Some(local) = &self.config.local_subject {
            classifier = classifier.excluding(local.clone());
        }
        let refresher = RefreshTask {
            store: Arc::clone(&self.store),
            classifier,
            interval: self.config.refresh_interval,
            radius_m: self.config.nearby_radius_m,
            estimate_rx,
            events: self.events.clone(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
        };

        let tasks = vec![
            tokio::spawn(fix_loop.run()),
            tokio::spawn(publisher.run()),
            tokio::spawn(refresher.run()),
        ];

        tracing::info!(
            tier = %self.config.watch.tier,
            min_distance_m = self.config.watch.min_distance_meters,
            "Tracking session started"
        );

        self.running = Some(RunningSession { cancel, tasks });
        Ok(())
    }

    /// Stop tracking.
    ///
    /// Cancels the subscription and any in-flight escalation, waits for the
    /// background tasks, clears local state and removes the published
    /// position from the store. Stopping a stopped session does nothing.
    ///
    /// Local teardown always completes; a failure to clear the store is
    /// returned afterwards.
    pub async fn stop(&mut self) -> Result<(), LocationError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.cancel.cancel();
        for task in running.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Tracking task ended abnormally");
            }
        }

        {
            let mut status = self.status.write();
            let last_error = status.last_error.take();
            *status = TrackingStatus {
                last_error,
                ..Default::default()
            };
        }

        let cleared = self.store.clear().await;
        if let Err(e) = &cleared {
            tracing::warn!(error = %e, "Failed to clear published position");
        }

        let _ = self.events.send(SessionEvent::Stopped);
        tracing::info!("Tracking session stopped");
        cleared
    }
}

impl<P, S> Drop for TrackingSession<P, S> {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

/// Decide whether a new escalation may start.
///
/// Escalations are spaced by `cooldown` measured from the end of the
/// previous one so a device that cannot produce a good fix is not polled
/// continuously.
fn escalation_allowed(
    in_flight: bool,
    last_finished: Option<DateTime<Utc>>,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> bool {
    if in_flight {
        return false;
    }
    last_finished.is_none_or(|t| crate::time::age_between(t, now) >= cooldown)
}

/// Why an escalation was started.
#[derive(Debug, Clone, Copy)]
enum EscalationTrigger {
    Start,
    StabilizationTimeout,
    PoorFix,
}

/// Owns the engine and serializes every fix through it.
struct FixLoop<P> {
    engine: LocationEngine,
    subscription: FixSubscription,
    provider: Arc<P>,
    escalation: EscalationConfig,
    stabilization_timeout: Duration,
    housekeeping_interval: Duration,
    estimate_tx: watch::Sender<Option<StableEstimate>>,
    events: broadcast::Sender<SessionEvent>,
    status: SharedStatus,
    cancel: CancellationToken,
}

impl<P: LocationProvider + 'static> FixLoop<P> {
    async fn run(mut self) {
        let (report_tx, mut report_rx) = mpsc::channel(1);
        let mut housekeeping = tokio::time::interval(self.housekeeping_interval);
        let mut stream_open = true;
        let mut last_finished: Option<DateTime<Utc>> = None;

        self.engine.begin(Utc::now());
        let mut in_flight = self.spawn_escalation(EscalationTrigger::Start, &report_tx, false);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                fix = self.subscription.recv(), if stream_open => {
                    let Some(fix) = fix else {
                        tracing::warn!("Location stream ended, continuing with one-shot requests");
                        stream_open = false;
                        continue;
                    };
                    let poor = fix.accuracy_or_worst().meters() > self.escalation.retry_accuracy_m;
                    self.ingest(fix);

                    let now = Utc::now();
                    if poor
                        && self.engine.estimate().is_none()
                        && escalation_allowed(in_flight, last_finished, self.stabilization_timeout, now)
                    {
                        in_flight = self.spawn_escalation(EscalationTrigger::PoorFix, &report_tx, in_flight);
                    }
                }

                Some(report) = report_rx.recv() => {
                    in_flight = false;
                    last_finished = Some(Utc::now());
                    self.status.write().escalating = false;
                    if !self.handle_escalation(report) {
                        break;
                    }
                }

                _ = housekeeping.tick() => {
                    let now = Utc::now();
                    if self.engine.expire_if_inactive(now) {
                        self.estimate_tx.send_replace(None);
                        self.update_status(None);
                    }

                    if self.engine.stabilizing_for(now) > self.stabilization_timeout
                        && escalation_allowed(in_flight, last_finished, self.stabilization_timeout, now)
                    {
                        in_flight = self.spawn_escalation(
                            EscalationTrigger::StabilizationTimeout,
                            &report_tx,
                            in_flight,
                        );
                    }
                }
            }
        }

        self.subscription.cancel();
        tracing::debug!("Fix loop stopped");
    }

    /// Run one fix through the engine and report the result.
    fn ingest(&mut self, fix: PositionFix) {
        let outcome = self.engine.process(fix, Utc::now());

        let Some(state) = outcome.state else {
            self.status.write().rejected_fixes += 1;
            return;
        };

        if state.is_stable() {
            self.estimate_tx.send_replace(self.engine.estimate().cloned());
        }
        self.update_status(Some(state.confidence()));
        let _ = self.events.send(SessionEvent::State(state));
    }

    /// Apply an escalation report. Returns false if tracking must end.
    fn handle_escalation(&mut self, report: Result<EscalationOutcome, LocationError>) -> bool {
        match report {
            Ok(EscalationOutcome::Obtained(fix)) | Ok(EscalationOutcome::Degraded(fix)) => {
                self.ingest(fix);
                true
            }
            Ok(EscalationOutcome::Exhausted) => {
                tracing::info!("Escalation exhausted without a fix, still stabilizing");
                true
            }
            Ok(EscalationOutcome::Cancelled) => true,
            Err(error) => {
                tracing::warn!(error = %error, "Location unavailable, tracking stopped");
                {
                    let mut status = self.status.write();
                    status.running = false;
                    status.last_error = Some(error.clone());
                }
                let _ = self.events.send(SessionEvent::Failed(error));
                self.cancel.cancel();
                false
            }
        }
    }

    /// Start an escalation in the background. Returns the new in-flight flag.
    fn spawn_escalation(
        &self,
        trigger: EscalationTrigger,
        report_tx: &mpsc::Sender<Result<EscalationOutcome, LocationError>>,
        in_flight: bool,
    ) -> bool {
        if in_flight {
            return true;
        }
        tracing::debug!(?trigger, "Starting accuracy escalation");
        self.status.write().escalating = true;

        let provider = Arc::clone(&self.provider);
        let config = self.escalation.clone();
        let cancel = self.cancel.child_token();
        let report_tx = report_tx.clone();

        tokio::spawn(async move {
            let mut controller = EscalationController::new(config);
            let report = controller.run(provider.as_ref(), &cancel).await;
            // The fix loop may already be gone
            let _ = report_tx.send(report).await;
        });
        true
    }

    fn update_status(&self, confidence: Option<f64>) {
        let mut status = self.status.write();
        if let Some(confidence) = confidence {
            status.confidence = confidence;
        }
        status.estimate = self.engine.estimate().cloned();
        status.history_len = self.engine.history().len();
    }
}

/// Owns the throttle and writes the estimate to the store.
struct PublishTask<S> {
    store: Arc<S>,
    throttle: PublishThrottle,
    interval: Duration,
    estimate_rx: watch::Receiver<Option<StableEstimate>>,
    events: broadcast::Sender<SessionEvent>,
    status: SharedStatus,
    cancel: CancellationToken,
}

impl<S: LocationStore + 'static> PublishTask<S> {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                changed = self.estimate_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.try_publish().await;
                }
                _ = ticker.tick() => self.try_publish().await,
            }
        }
        tracing::debug!("Publish task stopped");
    }

    async fn try_publish(&mut self) {
        let Some(estimate) = self.estimate_rx.borrow_and_update().clone() else {
            return;
        };
        let now = Utc::now();

        match self.throttle.check(&estimate, now) {
            PublishDecision::Published => {}
            PublishDecision::Throttled => {
                tracing::trace!("Publish throttled");
                return;
            }
            PublishDecision::Skipped(reason) => {
                tracing::trace!(?reason, accuracy_m = estimate.accuracy.meters(), "Publish skipped");
                return;
            }
        }

        let position = PublishedPosition::from(&estimate);
        match self.store.publish(&position).await {
            Ok(()) => {
                self.throttle.record_published(now);
                self.status.write().last_published = Some(now);
                let _ = self.events.send(SessionEvent::Published(position));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to publish position, will retry");
            }
        }
    }
}

/// Fetches nearby subjects and classifies them.
struct RefreshTask<S> {
    store: Arc<S>,
    classifier: ProximityClassifier,
    interval: Duration,
    radius_m: f64,
    estimate_rx: watch::Receiver<Option<StableEstimate>>,
    events: broadcast::Sender<SessionEvent>,
    status: SharedStatus,
    cancel: CancellationToken,
}

impl<S: LocationStore + 'static> RefreshTask<S> {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.refresh().await,
            }
        }
        tracing::debug!("Refresh task stopped");
    }

    async fn refresh(&self) {
        let local = self.estimate_rx.borrow().as_ref().map(|e| e.coordinate);
        let Some(local) = local else {
            tracing::trace!("No stable estimate yet, skipping proximity refresh");
            return;
        };

        match self.store.fetch_nearby(self.radius_m).await {
            Ok(remotes) => {
                let results = self.classifier.classify(local, &remotes, Utc::now());
                tracing::debug!(count = results.len(), "Proximity refreshed");
                self.status.write().nearby = results.clone();
                let _ = self.events.send(SessionEvent::Proximity(results));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch nearby positions, will retry");
            }
        }
    }
}
