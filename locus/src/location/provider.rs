//! Location provider interface.
//!
//! The platform location service is abstracted behind [`LocationProvider`]:
//!
//! - [`LocationProvider::current_fix`] - One-shot request at an accuracy tier (pull)
//! - [`LocationProvider::subscribe`] - Continuous watch (push)
//!
//! A subscription is a [`FixSubscription`]: the receiving end of a channel
//! plus a cancellation token shared with the provider. Cancelling or
//! dropping the subscription tells the provider to stop watching.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::LocationError;
use super::fix::{AccuracyTier, PositionFix};

/// Parameters of a one-shot fix request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixRequest {
    /// Requested accuracy tier.
    pub tier: AccuracyTier,

    /// Oldest cached fix the provider may return instead of a fresh one.
    pub max_age: Duration,

    /// How long the provider may take.
    pub timeout: Duration,
}

impl FixRequest {
    /// Request at `tier` with default age and timeout.
    pub fn at_tier(tier: AccuracyTier) -> Self {
        Self {
            tier,
            ..Default::default()
        }
    }
}

impl Default for FixRequest {
    fn default() -> Self {
        Self {
            tier: AccuracyTier::Best,
            max_age: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Parameters of a continuous watch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    /// Requested accuracy tier.
    pub tier: AccuracyTier,

    /// Minimum movement before the provider reports a new fix, in meters.
    pub min_distance_meters: f64,

    /// Minimum time between reported fixes.
    pub min_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            tier: AccuracyTier::High,
            min_distance_meters: 5.0,
            min_interval: Duration::from_secs(2),
        }
    }
}

/// Trait for platform location services.
///
/// Implementations wrap the OS or device location API.
pub trait LocationProvider: Send + Sync {
    /// Request a single fix.
    ///
    /// Callers bound this with their own timeout; implementations should
    /// still honor `request.timeout` where the platform supports it.
    fn current_fix(
        &self,
        request: FixRequest,
    ) -> impl Future<Output = Result<PositionFix, LocationError>> + Send;

    /// Start a continuous watch.
    ///
    /// Fails synchronously with [`LocationError::PermissionDenied`] or
    /// [`LocationError::ServicesDisabled`] when watching is impossible.
    fn subscribe(&self, options: WatchOptions) -> Result<FixSubscription, LocationError>;
}

/// Handle to a continuous watch.
///
/// # Usage
///
/// ```ignore
/// let (tx, mut subscription) = FixSubscription::channel(16);
/// let token = subscription.cancellation_token();
///
/// // Provider side: stop when the token fires
/// tokio::spawn(async move {
///     while !token.is_cancelled() {
///         if tx.send(next_fix().await).await.is_err() {
///             break;
///         }
///     }
/// });
///
/// while let Some(fix) = subscription.recv().await {
///     // ...
/// }
/// ```
#[derive(Debug)]
pub struct FixSubscription {
    receiver: mpsc::Receiver<PositionFix>,
    cancel: CancellationToken,
}

impl FixSubscription {
    /// Wrap an existing receiver and token.
    pub fn new(receiver: mpsc::Receiver<PositionFix>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// Create a bounded channel and the subscription reading from it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<PositionFix>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx, CancellationToken::new()))
    }

    /// Next fix, or `None` once cancelled or the provider hung up.
    pub async fn recv(&mut self) -> Option<PositionFix> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            fix = self.receiver.recv() => fix,
        }
    }

    /// Token the provider watches to stop producing.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the watch.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
    }

    /// Returns true once the watch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for FixSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
