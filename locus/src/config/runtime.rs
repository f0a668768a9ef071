//! Conversion from file settings to runtime configuration.
//!
//! The INI layer stores plain seconds and meters; the engine works with
//! `Duration`s and nested config structs.

use std::time::Duration;

use super::settings::ConfigFile;
use crate::location::{
    ConfidenceWeights, EngineConfig, EscalationConfig, IngestConfig, LocationError,
    ProximityConfig, SessionConfig, StabilizerConfig, StoreConfig, SubjectId, ThrottleConfig,
    WatchOptions,
};
use crate::logging::LogSettings;

impl ConfigFile {
    /// Build the tracking session configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when values that parse individually do
    /// not work together (e.g. `very_close_m >= nearby_m`).
    pub fn session_config(&self) -> Result<SessionConfig, LocationError> {
        let stabilizer = &self.stabilizer;
        let config = SessionConfig {
            engine: EngineConfig {
                ingest: IngestConfig {
                    hard_reject_ceiling_m: self.ingest.hard_reject_ceiling_m,
                    max_jump_m: self.ingest.max_jump_m,
                    gap_reset_window: Duration::from_secs(self.ingest.gap_reset_window_secs),
                },
                stabilizer: StabilizerConfig {
                    history_capacity: self.history.capacity,
                    min_cluster_size: stabilizer.min_cluster_size,
                    cluster_radius_m: stabilizer.cluster_radius_m,
                    target_cluster_size: stabilizer.target_cluster_size,
                    // The accuracy score is relative to the same ceiling ingest enforces
                    accuracy_ceiling_m: self.ingest.hard_reject_ceiling_m,
                    recency_horizon: Duration::from_secs(stabilizer.recency_horizon_secs),
                    recency_floor: stabilizer.recency_floor,
                    recent_window: Duration::from_secs(stabilizer.recent_window_secs),
                    publish_confidence: stabilizer.publish_confidence,
                    weights: ConfidenceWeights {
                        size: stabilizer.weight_size,
                        accuracy: stabilizer.weight_accuracy,
                        spread: stabilizer.weight_spread,
                        recency: stabilizer.weight_recency,
                    },
                    inactivity_timeout: Duration::from_secs(stabilizer.inactivity_timeout_secs),
                },
            },
            escalation: EscalationConfig {
                start_tier: self.escalation.start_tier,
                retry_accuracy_m: self.escalation.retry_accuracy_m,
                max_attempts: self.escalation.max_attempts,
                request_timeout: Duration::from_secs(self.escalation.request_timeout_secs),
                max_fix_age: Duration::from_secs(self.escalation.max_fix_age_secs),
            },
            throttle: ThrottleConfig {
                max_publish_accuracy_m: self.publish.max_accuracy_m,
                min_interval: Duration::from_secs(self.publish.min_interval_secs),
            },
            proximity: ProximityConfig {
                very_close_m: self.proximity.very_close_m,
                nearby_m: self.proximity.nearby_m,
                liveness_window: Duration::from_secs(self.proximity.liveness_window_secs),
            },
            watch: WatchOptions {
                tier: self.watch.tier,
                min_distance_meters: self.watch.min_distance_m,
                min_interval: Duration::from_secs(self.watch.min_interval_secs),
            },
            stabilization_timeout: Duration::from_secs(stabilizer.stabilization_timeout_secs),
            publish_interval: Duration::from_secs(self.publish.interval_secs),
            refresh_interval: Duration::from_secs(self.proximity.refresh_interval_secs),
            nearby_radius_m: self.proximity.radius_m,
            local_subject: self.store.subject_id.as_deref().map(SubjectId::new),
            ..SessionConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Store connection settings, or `None` until both the URL and the
    /// subject are configured.
    pub fn store_config(&self) -> Option<StoreConfig> {
        let base_url = self.store.base_url.clone()?;
        let subject_id = self.store.subject_id.as_deref()?;
        Some(StoreConfig {
            base_url,
            subject_id: SubjectId::new(subject_id),
            request_timeout: Duration::from_secs(self.store.timeout_secs),
        })
    }

    /// Logging settings for [`crate::logging::init_logging`].
    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            directory: self.logging.directory.clone(),
            file: self.logging.file.clone(),
            level: self.logging.level.clone(),
            stdout: self.logging.stdout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::AccuracyTier;

    #[test]
    fn test_defaults_match_runtime_defaults() {
        let config = ConfigFile::default().session_config().unwrap();
        let runtime = SessionConfig::default();

        let (engine, expected) = (&config.engine, &runtime.engine);
        assert_eq!(
            engine.ingest.hard_reject_ceiling_m,
            expected.ingest.hard_reject_ceiling_m
        );
        assert_eq!(engine.ingest.max_jump_m, expected.ingest.max_jump_m);
        assert_eq!(
            engine.ingest.gap_reset_window,
            expected.ingest.gap_reset_window
        );
        assert_eq!(
            engine.stabilizer.history_capacity,
            expected.stabilizer.history_capacity
        );
        assert_eq!(
            engine.stabilizer.min_cluster_size,
            expected.stabilizer.min_cluster_size
        );
        assert_eq!(
            engine.stabilizer.accuracy_ceiling_m,
            expected.stabilizer.accuracy_ceiling_m
        );
        assert_eq!(
            engine.stabilizer.publish_confidence,
            expected.stabilizer.publish_confidence
        );
        assert_eq!(engine.stabilizer.weights, expected.stabilizer.weights);
        assert_eq!(
            engine.stabilizer.inactivity_timeout,
            expected.stabilizer.inactivity_timeout
        );

        assert_eq!(config.escalation.start_tier, runtime.escalation.start_tier);
        assert_eq!(config.escalation.max_attempts, runtime.escalation.max_attempts);
        assert_eq!(
            config.throttle.max_publish_accuracy_m,
            runtime.throttle.max_publish_accuracy_m
        );
        assert_eq!(config.throttle.min_interval, runtime.throttle.min_interval);
        assert_eq!(config.proximity.nearby_m, runtime.proximity.nearby_m);
        assert_eq!(config.watch.tier, runtime.watch.tier);
        assert_eq!(config.stabilization_timeout, runtime.stabilization_timeout);
        assert_eq!(config.publish_interval, runtime.publish_interval);
        assert_eq!(config.refresh_interval, runtime.refresh_interval);
        assert_eq!(config.nearby_radius_m, runtime.nearby_radius_m);
        assert!(config.local_subject.is_none());
    }

    #[test]
    fn test_session_config_carries_overrides() {
        let mut file = ConfigFile::default();
        file.ingest.hard_reject_ceiling_m = 60.0;
        file.watch.tier = AccuracyTier::Balanced;
        file.publish.interval_secs = 45;
        file.store.subject_id = Some("bob".to_string());

        let config = file.session_config().unwrap();

        assert_eq!(config.engine.ingest.hard_reject_ceiling_m, 60.0);
        assert_eq!(config.engine.stabilizer.accuracy_ceiling_m, 60.0);
        assert_eq!(config.watch.tier, AccuracyTier::Balanced);
        assert_eq!(config.publish_interval, Duration::from_secs(45));
        assert_eq!(config.local_subject, Some(SubjectId::new("bob")));
    }

    #[test]
    fn test_session_config_rejects_inconsistent_values() {
        let mut file = ConfigFile::default();
        file.proximity.very_close_m = 800.0;
        assert!(matches!(
            file.session_config(),
            Err(LocationError::InvalidConfiguration(_))
        ));

        let mut file = ConfigFile::default();
        file.publish.interval_secs = 0;
        assert!(file.session_config().is_err());
    }

    #[test]
    fn test_store_config_requires_url_and_subject() {
        let mut file = ConfigFile::default();
        assert!(file.store_config().is_none());

        file.store.base_url = Some("https://locus.example.com".to_string());
        assert!(file.store_config().is_none());

        file.store.subject_id = Some("alice".to_string());
        file.store.timeout_secs = 4;
        let store = file.store_config().unwrap();
        assert_eq!(store.base_url, "https://locus.example.com");
        assert_eq!(store.subject_id, SubjectId::new("alice"));
        assert_eq!(store.request_timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_log_settings_match_defaults() {
        assert_eq!(ConfigFile::default().log_settings(), LogSettings::default());
    }
}
