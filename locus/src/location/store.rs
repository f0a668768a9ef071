//! Remote location store interface and HTTP client.
//!
//! The store holds the latest published position of every subject. The
//! engine needs three calls from it:
//!
//! - [`LocationStore::publish`] - Write the local subject's position
//! - [`LocationStore::clear`] - Remove it when tracking stops
//! - [`LocationStore::fetch_nearby`] - Read other subjects within a radius
//!
//! [`HttpLocationStore`] talks to a JSON REST backend:
//!
//! ```text
//! PUT    {base}/subjects/{id}/position
//! DELETE {base}/subjects/{id}/position
//! GET    {base}/subjects/{id}/nearby?radius_m=R
//! ```

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::error::LocationError;
use super::proximity::{RemotePosition, SubjectId};
use super::stabilizer::StableEstimate;

/// Default HTTP timeout for store requests.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// The record written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<&StableEstimate> for PublishedPosition {
    fn from(estimate: &StableEstimate) -> Self {
        Self {
            latitude: estimate.coordinate.latitude,
            longitude: estimate.coordinate.longitude,
            accuracy_m: estimate.accuracy.meters(),
            altitude: estimate.altitude,
            heading: estimate.heading,
            speed: estimate.speed,
            timestamp: estimate.timestamp,
        }
    }
}

/// Trait for the remote position store.
///
/// Implementations are scoped to one local subject.
pub trait LocationStore: Send + Sync {
    /// Write the local subject's position.
    fn publish(
        &self,
        position: &PublishedPosition,
    ) -> impl Future<Output = Result<(), LocationError>> + Send;

    /// Remove the local subject's position.
    fn clear(&self) -> impl Future<Output = Result<(), LocationError>> + Send;

    /// Positions of other subjects within `radius_m` of the local subject.
    fn fetch_nearby(
        &self,
        radius_m: f64,
    ) -> impl Future<Output = Result<Vec<RemotePosition>, LocationError>> + Send;
}

/// Connection settings for [`HttpLocationStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store API.
    pub base_url: String,

    /// The local subject.
    pub subject_id: SubjectId,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            subject_id: SubjectId::new(""),
            request_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Body of the nearby response.
#[derive(Deserialize)]
struct NearbyResponse {
    positions: Vec<RemotePosition>,
}

/// JSON REST store client.
///
/// Uses a reusable `reqwest::Client` with connection pooling and timeouts.
#[derive(Debug, Clone)]
pub struct HttpLocationStore {
    http: reqwest::Client,
    position_url: Url,
    nearby_url: Url,
}

impl HttpLocationStore {
    /// Create a client for `config.subject_id`.
    ///
    /// Fails with [`LocationError::InvalidConfiguration`] for an unusable
    /// base URL or an empty subject id.
    pub fn new(config: &StoreConfig) -> Result<Self, LocationError> {
        if config.subject_id.as_str().is_empty() {
            return Err(LocationError::InvalidConfiguration(
                "store subject id is empty".to_string(),
            ));
        }

        let base = Url::parse(&config.base_url).map_err(|e| {
            LocationError::InvalidConfiguration(format!(
                "invalid store URL '{}': {}",
                config.base_url, e
            ))
        })?;

        let position_url = subject_url(&base, &config.subject_id, "position")?;
        let nearby_url = subject_url(&base, &config.subject_id, "nearby")?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LocationError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            http,
            position_url,
            nearby_url,
        })
    }

    /// URL positions are written to and cleared from.
    pub fn position_url(&self) -> &Url {
        &self.position_url
    }

    fn nearby_url_for(&self, radius_m: f64) -> Url {
        let mut url = self.nearby_url.clone();
        url.query_pairs_mut()
            .append_pair("radius_m", &format!("{}", radius_m.max(0.0).round()));
        url
    }
}

/// `{base}/subjects/{id}/{leaf}`, with the id escaped as one path segment.
fn subject_url(base: &Url, subject_id: &SubjectId, leaf: &str) -> Result<Url, LocationError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            LocationError::InvalidConfiguration(format!("store URL '{}' cannot be a base", base))
        })?
        .pop_if_empty()
        .extend(["subjects", subject_id.as_str(), leaf]);
    Ok(url)
}

impl LocationStore for HttpLocationStore {
    async fn publish(&self, position: &PublishedPosition) -> Result<(), LocationError> {
        let response = self
            .http
            .put(self.position_url.clone())
            .json(position)
            .send()
            .await
            .map_err(|e| LocationError::StoreWriteFailed(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| LocationError::StoreWriteFailed(e.to_string()))?;

        tracing::trace!(
            latitude = position.latitude,
            longitude = position.longitude,
            accuracy_m = position.accuracy_m,
            "Position published"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), LocationError> {
        let response = self
            .http
            .delete(self.position_url.clone())
            .send()
            .await
            .map_err(|e| LocationError::StoreWriteFailed(e.to_string()))?;

        // Nothing stored is already cleared
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .map_err(|e| LocationError::StoreWriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn fetch_nearby(&self, radius_m: f64) -> Result<Vec<RemotePosition>, LocationError> {
        let response = self
            .http
            .get(self.nearby_url_for(radius_m))
            .send()
            .await
            .map_err(|e| LocationError::StoreFetchFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| LocationError::StoreFetchFailed(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LocationError::StoreFetchFailed(e.to_string()))?;

        let data: NearbyResponse = serde_json::from_slice(&bytes)
            .map_err(|e| LocationError::StoreFetchFailed(format!("invalid response: {}", e)))?;

        tracing::debug!(count = data.positions.len(), radius_m, "Nearby positions fetched");
        Ok(data.positions)
    }
}
