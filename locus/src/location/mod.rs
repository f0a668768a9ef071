//! Location stabilization and proximity.
//!
//! This module turns a stream of noisy, variable-accuracy position fixes
//! into a single trustworthy estimate, publishes it at a bounded rate, and
//! classifies other subjects' published positions by distance.
//!
//! # Architecture
//!
//! ```text
//! LocationProvider ──► FixIngestor ──► HistoryBuffer ──► Stabilizer
//!        ▲                                                   │
//!        │ one-shot requests                                 ▼ StableEstimate
//! EscalationController                     PublishThrottle ──► LocationStore
//!                                                             │ fetch_nearby
//!                                          ProximityClassifier ◄┘
//! ```
//!
//! - [`LocationEngine`] runs ingest and stabilization synchronously
//! - [`TrackingSession`] owns the engine plus every timer and subscription
//!
//! # Usage
//!
//! ```ignore
//! use locus::location::{SessionConfig, TrackingSession};
//!
//! let mut session = TrackingSession::new(provider, store, SessionConfig::default());
//! let mut events = session.subscribe();
//! session.start()?;
//! ```

mod cluster;
mod engine;
mod error;
mod escalation;
mod fix;
mod history;
mod ingest;
mod provider;
mod proximity;
mod session;
mod stabilizer;
mod store;
mod throttle;

pub use cluster::{build_clusters, recency_weight, Cluster, ConfidenceFactors, ConfidenceWeights};
pub use engine::{EngineConfig, FixOutcome, LocationEngine};
pub use error::LocationError;
pub use escalation::{EscalationConfig, EscalationController, EscalationOutcome, EscalationState};
pub use fix::{Accuracy, AccuracyTier, PositionFix};
pub use history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
pub use ingest::{
    FixIngestor, IngestConfig, IngestDecision, RejectReason, DEFAULT_GAP_RESET_WINDOW,
    DEFAULT_HARD_REJECT_CEILING_M, DEFAULT_MAX_JUMP_M,
};
pub use provider::{FixRequest, FixSubscription, LocationProvider, WatchOptions};
pub use proximity::{
    ProximityBucket, ProximityClassifier, ProximityConfig, ProximityResult, RemotePosition,
    SubjectId,
};
pub use session::{
    SessionConfig, SessionEvent, TrackingSession, TrackingStatus, DEFAULT_EVENT_CAPACITY,
};
pub use stabilizer::{StabilizationState, StableEstimate, Stabilizer, StabilizerConfig};
pub use store::{
    HttpLocationStore, LocationStore, PublishedPosition, StoreConfig, DEFAULT_STORE_TIMEOUT,
};
pub use throttle::{PublishDecision, PublishThrottle, SkipReason, ThrottleConfig};
