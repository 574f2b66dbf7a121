//! Engine configuration

use crate::{ConfigError, CruxResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cadence of the scheduled ranking run (30 minutes).
pub const DEFAULT_RANKING_INTERVAL_SECS: u64 = 30 * 60;

/// Default cap on concurrent per-climber log fetches.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Upper bound accepted for `max_concurrency`.
pub const MAX_CONCURRENCY_LIMIT: usize = 4096;

pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 20;
pub const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 1_000;

/// Retry policy for store transactions that hit a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub initial_backoff: Duration,
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub max_backoff: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_RETRY_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_RETRY_MAX_BACKOFF_MS),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let factor = f64::from(self.backoff_multiplier).powi(exponent);
        let delay = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}

/// Configuration for the counter maintainer and ranking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EngineConfig {
    /// How often the scheduled ranking run fires.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub ranking_interval: Duration,
    /// Maximum number of climbers fetched and scored at the same time.
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    /// Run once immediately when the job starts instead of waiting a full interval.
    pub run_on_startup: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ranking_interval: Duration::from_secs(DEFAULT_RANKING_INTERVAL_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
            run_on_startup: true,
        }
    }
}

impl EngineConfig {
    /// Create EngineConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `CRUX_RANKING_INTERVAL_SECS`: Scheduled ranking cadence (default: 1800)
    /// - `CRUX_MAX_CONCURRENCY`: Concurrent per-climber fetches (default: 16)
    /// - `CRUX_RETRY_MAX_ATTEMPTS`: Transaction attempts on conflict (default: 5)
    /// - `CRUX_RETRY_INITIAL_BACKOFF_MS`: First retry delay (default: 20)
    /// - `CRUX_RETRY_MAX_BACKOFF_MS`: Retry delay ceiling (default: 1000)
    /// - `CRUX_RUN_ON_STARTUP`: Rank immediately on start (default: true)
    pub fn from_env() -> Self {
        let ranking_interval = Duration::from_secs(
            std::env::var("CRUX_RANKING_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RANKING_INTERVAL_SECS),
        );

        let max_concurrency = std::env::var("CRUX_MAX_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);

        let max_attempts = std::env::var("CRUX_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS);

        let initial_backoff = Duration::from_millis(
            std::env::var("CRUX_RETRY_INITIAL_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_INITIAL_BACKOFF_MS),
        );

        let max_backoff = Duration::from_millis(
            std::env::var("CRUX_RETRY_MAX_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_MAX_BACKOFF_MS),
        );

        let run_on_startup = std::env::var("CRUX_RUN_ON_STARTUP")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            ranking_interval,
            max_concurrency,
            retry: RetryPolicy {
                max_attempts,
                initial_backoff,
                max_backoff,
                ..RetryPolicy::default()
            },
            run_on_startup,
        }
    }

    /// Short cadence for local development.
    pub fn development() -> Self {
        Self {
            ranking_interval: Duration::from_secs(10),
            max_concurrency: 4,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CruxResult<()> {
        if self.ranking_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "ranking_interval".to_string(),
                value: format!("{:?}", self.ranking_interval),
                reason: "ranking_interval must be positive".to_string(),
            }
            .into());
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency".to_string(),
                value: self.max_concurrency.to_string(),
                reason: "max_concurrency must be at least 1".to_string(),
            }
            .into());
        }

        if self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency".to_string(),
                value: self.max_concurrency.to_string(),
                reason: format!("max_concurrency must be at most {}", MAX_CONCURRENCY_LIMIT),
            }
            .into());
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                value: self.retry.max_attempts.to_string(),
                reason: "at least one attempt is required".to_string(),
            }
            .into());
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.backoff_multiplier".to_string(),
                value: self.retry.backoff_multiplier.to_string(),
                reason: "backoff_multiplier must be >= 1.0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
