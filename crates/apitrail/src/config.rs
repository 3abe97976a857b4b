//! Tracker configuration: builder API plus environment variable loading.
//!
//! Configuration is assembled once, before the tracker is constructed, and
//! is immutable afterwards. Environment loading follows the `APITRAIL_`
//! prefix convention with optional `.env` file support.
//!
//! # Example
//!
//! ```ignore
//! use apitrail::{load_dotenv, Tracker, TrackerConfig};
//!
//! load_dotenv();
//! let config = TrackerConfig::from_env().expect("APITRAIL_API_KEY must be set");
//! let tracker = Tracker::new(config)?;
//! ```

use crate::mask::MaskRuleSet;
use serde::Deserialize;
use std::time::Duration;

/// Collector the SDK ships records to when no URL is configured.
pub const DEFAULT_COLLECTOR_URL: &str = "https://collector.apitrail.io";

/// Default total attempt ceiling for record delivery.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default base delay for linear retry backoff.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed, including a missing
    /// `APITRAIL_API_KEY`.
    #[error("environment configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Raw environment shape read by [`TrackerConfig::from_env`].
#[derive(Debug, Deserialize)]
struct EnvConfig {
    api_key: String,
    collector_url: Option<String>,
    environment: Option<String>,
    host: Option<String>,
    debug: Option<bool>,
    retry_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
    mask_fields: Option<String>,
}

/// Process-scoped tracker configuration, set once at construction.
///
/// Built with [`TrackerConfig::new`] and the chained setters, or from the
/// environment with [`TrackerConfig::from_env`]:
///
/// ```ignore
/// use apitrail::TrackerConfig;
/// use std::time::Duration;
///
/// let config = TrackerConfig::new("my-api-key")
///     .collector_url("https://logs.internal.example.com")
///     .environment("staging")
///     .host("api-1")
///     .retry_attempts(5)
///     .retry_delay(Duration::from_millis(250))
///     .mask_fields(["session_token"]);
/// ```
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub(crate) api_key: String,
    pub(crate) collector_url: String,
    pub(crate) environment: String,
    pub(crate) host: Option<String>,
    pub(crate) debug: bool,
    pub(crate) retry_attempts: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) mask_rules: MaskRuleSet,
}

impl TrackerConfig {
    /// Create a configuration with the given API key and defaults for
    /// everything else.
    ///
    /// Defaults: collector [`DEFAULT_COLLECTOR_URL`], environment
    /// `"production"`, no host tag, debug off, 3 delivery attempts with a
    /// 1000 ms base delay, built-in mask rule set.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            collector_url: DEFAULT_COLLECTOR_URL.to_string(),
            environment: "production".to_string(),
            host: None,
            debug: false,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            mask_rules: MaskRuleSet::new(),
        }
    }

    /// Load configuration from `APITRAIL_`-prefixed environment variables.
    ///
    /// `APITRAIL_API_KEY` is required. Optional variables:
    /// `APITRAIL_COLLECTOR_URL`, `APITRAIL_ENVIRONMENT`, `APITRAIL_HOST`,
    /// `APITRAIL_DEBUG` (`true`/`false`), `APITRAIL_RETRY_ATTEMPTS`,
    /// `APITRAIL_RETRY_DELAY_MS`, and `APITRAIL_MASK_FIELDS` (comma
    /// separated extra field names).
    pub fn from_env() -> Result<Self, ConfigError> {
        let env: EnvConfig = envy::prefixed("APITRAIL_").from_env()?;

        let mut config = Self::new(env.api_key);
        if let Some(url) = env.collector_url {
            config = config.collector_url(url);
        }
        if let Some(environment) = env.environment {
            config = config.environment(environment);
        }
        if let Some(host) = env.host {
            config = config.host(host);
        }
        if let Some(debug) = env.debug {
            config = config.debug(debug);
        }
        if let Some(attempts) = env.retry_attempts {
            config = config.retry_attempts(attempts);
        }
        if let Some(delay_ms) = env.retry_delay_ms {
            config = config.retry_delay(Duration::from_millis(delay_ms));
        }
        if let Some(fields) = env.mask_fields {
            config = config.mask_fields(
                fields
                    .split(',')
                    .map(|field| field.trim().to_string())
                    .filter(|field| !field.is_empty()),
            );
        }
        Ok(config)
    }

    /// Set the collector base URL.
    pub fn collector_url(mut self, url: impl Into<String>) -> Self {
        self.collector_url = url.into();
        self
    }

    /// Set the environment tag applied to records without a per-call
    /// override.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the host identifier attached to every record.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Enable or disable debug logging of composed records and per-attempt
    /// outcomes. Does not alter delivery semantics.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Set the total delivery attempt ceiling (clamped to at least one).
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Set the base delay for linear retry backoff.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Add field names to the mask rule set, on top of the built-in
    /// defaults. Names are folded to lowercase once, here.
    pub fn mask_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.mask_rules.extend(fields);
        self
    }
}

/// Load variables from a `.env` file in the working directory, if present.
///
/// Call once at startup, before [`TrackerConfig::from_env`]. Missing files
/// are ignored.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}
