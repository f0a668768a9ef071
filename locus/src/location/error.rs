//! Error types for location tracking.

use thiserror::Error;

/// Errors surfaced by the location provider, the remote store, or the session.
///
/// Routine filtering outcomes are not errors; see
/// [`RejectReason`](super::RejectReason).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// The user has not granted location permission.
    #[error("Location permission denied")]
    PermissionDenied,

    /// Location services are switched off on the device.
    #[error("Location services are disabled")]
    ServicesDisabled,

    /// A one-shot request did not complete in time.
    #[error("Location request timed out")]
    Timeout,

    /// The provider could not produce a fix (no signal, provider busy, ...).
    #[error("Location provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Writing or clearing the published position failed.
    #[error("Failed to write to location store: {0}")]
    StoreWriteFailed(String),

    /// Fetching nearby positions failed.
    #[error("Failed to fetch from location store: {0}")]
    StoreFetchFailed(String),

    /// A configuration value cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl LocationError {
    /// Returns true if the error ends the tracking session.
    ///
    /// Fatal errors need user action (grant permission, enable services)
    /// and are never retried automatically.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::ServicesDisabled)
    }

    /// Returns true if a one-shot request should step down an accuracy tier.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::ProviderUnavailable(_))
    }
}
