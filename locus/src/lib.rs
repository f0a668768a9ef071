//! Locus - location stabilization and proximity
//!
//! This library turns noisy, intermittent position fixes from a device
//! location provider into one trustworthy estimate, publishes it to a remote
//! store at a bounded rate, and classifies other subjects by distance.
//!
//! # High-Level API
//!
//! For most use cases, [`location::TrackingSession`] wires everything
//! together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use locus::config::ConfigFile;
//! use locus::location::{HttpLocationStore, SessionEvent, TrackingSession};
//!
//! let file = ConfigFile::load()?;
//! let _guard = locus::logging::init_logging(&file.log_settings())?;
//!
//! let store_config = file.store_config().ok_or("store not configured")?;
//! let store = HttpLocationStore::new(&store_config)?;
//! let mut session = TrackingSession::new(Arc::new(provider), Arc::new(store), file.session_config()?);
//! let mut events = session.subscribe();
//! session.start()?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::Proximity(results) = event {
//!         // update UI
//!     }
//! }
//! ```
//!
//! The synchronous core ([`location::LocationEngine`]) can also be driven
//! directly, e.g. from tests or a replay tool.

pub mod config;
pub mod geo;
pub mod location;
pub mod logging;
pub mod time;

/// Version of the Locus library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_modules_are_reachable() {
        let a = geo::Coordinate::new(51.5074, -0.1278).unwrap();
        let b = geo::Coordinate::new(51.5083, -0.1278).unwrap();
        let d = geo::distance_meters(a, b);
        assert!(d > 90.0 && d < 110.0);
    }
}
