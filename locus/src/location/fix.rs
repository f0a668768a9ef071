//! Core fix types.
//!
//! - [`Accuracy`] - Horizontal accuracy radius in meters (lower is better)
//! - [`AccuracyTier`] - Provider accuracy/latency trade-off for a request
//! - [`PositionFix`] - One raw reading from the location provider

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Horizontal accuracy in meters (lower is better).
///
/// Platform providers report accuracy as the radius of a 68% confidence
/// circle around the fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accuracy(pub f64);

impl Accuracy {
    /// Accuracy assumed for a fix that reports none.
    pub const UNKNOWN: Self = Self(f64::INFINITY);

    /// Returns true if this accuracy is better (lower meters) than other.
    #[inline]
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.0 < other.0
    }

    /// Get the accuracy value in meters.
    #[inline]
    pub fn meters(&self) -> f64 {
        self.0
    }
}

impl PartialOrd for Accuracy {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // Lower meters = higher accuracy = greater in ordering
        other.0.partial_cmp(&self.0)
    }
}

/// Accuracy tier for provider requests, best first.
///
/// Higher tiers take longer and cost more battery; lower tiers answer
/// faster from coarser sources (Wi-Fi, cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AccuracyTier {
    /// Highest precision the hardware can deliver.
    Best,
    /// GPS-grade precision.
    #[default]
    High,
    /// Block-level precision, mixed sources.
    Balanced,
    /// Neighborhood-level precision.
    Low,
    /// Whatever is cheapest.
    Lowest,
}

impl AccuracyTier {
    /// All tiers, best first.
    pub const ALL: [AccuracyTier; 5] = [
        AccuracyTier::Best,
        AccuracyTier::High,
        AccuracyTier::Balanced,
        AccuracyTier::Low,
        AccuracyTier::Lowest,
    ];

    /// The next cheaper tier, or `None` at the bottom.
    pub fn lower(self) -> Option<Self> {
        match self {
            Self::Best => Some(Self::High),
            Self::High => Some(Self::Balanced),
            Self::Balanced => Some(Self::Low),
            Self::Low => Some(Self::Lowest),
            Self::Lowest => None,
        }
    }

    /// Stable lowercase name, used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::High => "high",
            Self::Balanced => "balanced",
            Self::Low => "low",
            Self::Lowest => "lowest",
        }
    }
}

impl std::fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccuracyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "high" => Ok(Self::High),
            "balanced" => Ok(Self::Balanced),
            "low" => Ok(Self::Low),
            "lowest" => Ok(Self::Lowest),
            other => Err(format!("unknown accuracy tier '{}'", other)),
        }
    }
}

/// One raw position reading.
///
/// # Timestamp
///
/// `timestamp` is the capture time reported by the provider, not the time
/// the fix reached the engine. All age calculations use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,

    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,

    /// Horizontal accuracy; `None` is treated as worst case.
    pub accuracy: Option<Accuracy>,

    /// Altitude above the WGS84 ellipsoid in meters.
    pub altitude: Option<f64>,

    /// Direction of travel in degrees (0-360).
    pub heading: Option<f64>,

    /// Ground speed in meters per second.
    pub speed: Option<f64>,

    /// Capture time.
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    /// Create a fix with position, accuracy and capture time only.
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: accuracy_m.map(Accuracy),
            altitude: None,
            heading: None,
            speed: None,
            timestamp,
        }
    }

    /// Attach motion vectors to the fix.
    pub fn with_vectors(
        mut self,
        altitude: Option<f64>,
        heading: Option<f64>,
        speed: Option<f64>,
    ) -> Self {
        self.altitude = altitude;
        self.heading = heading;
        self.speed = speed;
        self
    }

    /// Position as a [`Coordinate`].
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Reported accuracy, or [`Accuracy::UNKNOWN`] when absent.
    #[inline]
    pub fn accuracy_or_worst(&self) -> Accuracy {
        self.accuracy.unwrap_or(Accuracy::UNKNOWN)
    }

    /// Age of this fix at `now`. Fixes from the future have age zero.
    #[inline]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        crate::time::age_between(self.timestamp, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_ordering() {
        assert!(Accuracy(5.0).is_better_than(&Accuracy(10.0)));
        assert!(!Accuracy(10.0).is_better_than(&Accuracy(10.0)));
        assert!(Accuracy(5.0) > Accuracy(10.0));
        assert!(Accuracy(10.0).is_better_than(&Accuracy::UNKNOWN));
    }

    #[test]
    fn test_missing_accuracy_is_worst_case() {
        let fix = PositionFix::new(51.5, -0.12, None, Utc::now());
        assert_eq!(fix.accuracy_or_worst(), Accuracy::UNKNOWN);
        assert!(fix.accuracy_or_worst().meters().is_infinite());
    }

    #[test]
    fn test_tier_step_down() {
        assert_eq!(AccuracyTier::Best.lower(), Some(AccuracyTier::High));
        assert_eq!(AccuracyTier::Low.lower(), Some(AccuracyTier::Lowest));
        assert_eq!(AccuracyTier::Lowest.lower(), None);

        // ALL is ordered best first and follows lower()
        for pair in AccuracyTier::ALL.windows(2) {
            assert_eq!(pair[0].lower(), Some(pair[1]));
        }
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!("Balanced".parse::<AccuracyTier>(), Ok(AccuracyTier::Balanced));
        assert_eq!(" best ".parse::<AccuracyTier>(), Ok(AccuracyTier::Best));
        assert!("gps".parse::<AccuracyTier>().is_err());

        for tier in AccuracyTier::ALL {
            assert_eq!(tier.to_string().parse::<AccuracyTier>(), Ok(tier));
        }
    }

    #[test]
    fn test_age_of_future_fix_is_zero() {
        let now = Utc::now();
        let fix = PositionFix::new(0.0, 0.0, Some(5.0), now + chrono::Duration::seconds(3));
        assert_eq!(fix.age_at(now), Duration::ZERO);
    }

    #[test]
    fn test_with_vectors() {
        let fix = PositionFix::new(0.0, 0.0, Some(5.0), Utc::now()).with_vectors(
            Some(12.0),
            Some(90.0),
            Some(1.5),
        );
        assert_eq!(fix.altitude, Some(12.0));
        assert_eq!(fix.heading, Some(90.0));
        assert_eq!(fix.speed, Some(1.5));
    }
}
