use std::env;
use std::fmt;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::retry::{BackoffConfig, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Push gateway endpoint, credential and retry policy.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Server key sent as `Authorization: key=<api_key>`
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Delay before the second attempt in milliseconds
    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,
    /// Growth factor applied to the delay after every failed attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Upper bound on the delay between two attempts
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Random jitter applied to each delay (0.0 to 1.0)
    #[serde(default)]
    pub backoff_jitter: f64,
    /// Cap on the `retries` argument of a send
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_endpoint() -> String {
    "https://android.googleapis.com".to_string()
}

fn default_path() -> String {
    "/gcm/send".to_string()
}

fn default_backoff_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    1.2
}

fn default_max_backoff_ms() -> u64 {
    60_000 // 1 minute
}

fn default_max_attempts() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("gateway.endpoint", default_endpoint())?
            .set_default("gateway.path", default_path())?
            .set_default("gateway.backoff_delay_ms", default_backoff_delay_ms())?
            .set_default("gateway.backoff_factor", default_backoff_factor())?
            .set_default("gateway.max_attempts", default_max_attempts())?
            .set_default("logging.level", default_log_level())?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // PUSH_GATEWAY__API_KEY, PUSH_GATEWAY__MAX_ATTEMPTS, PUSH_LOGGING__JSON, etc.
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl GatewayConfig {
    /// Default configuration with the given server key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_backoff_delay_ms(mut self, delay_ms: u64) -> Self {
        self.backoff_delay_ms = delay_ms;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Full send URL
    pub fn url(&self) -> String {
        format!("{}{}", self.endpoint, self.path)
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Replace unusable values with their defaults.
    ///
    /// A factor below 1.0 (or not finite), zero attempts, a jitter outside
    /// 0.0..=1.0, a zero timeout, or an empty endpoint/path fall back.
    pub fn sanitized(mut self) -> Self {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            self.backoff_factor = default_backoff_factor();
        }
        if self.max_attempts == 0 {
            self.max_attempts = default_max_attempts();
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            self.backoff_jitter = 0.0;
        }
        if self.max_backoff_ms < self.backoff_delay_ms {
            self.max_backoff_ms = self.backoff_delay_ms;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if self.endpoint.is_empty() {
            self.endpoint = default_endpoint();
        }
        if self.path.is_empty() {
            self.path = default_path();
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            BackoffConfig {
                initial_delay_ms: self.backoff_delay_ms,
                max_delay_ms: self.max_backoff_ms,
                multiplier: self.backoff_factor,
                jitter_factor: self.backoff_jitter,
            },
        )
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<unset>" })
            .field("endpoint", &self.endpoint)
            .field("path", &self.path)
            .field("backoff_delay_ms", &self.backoff_delay_ms)
            .field("backoff_factor", &self.backoff_factor)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("backoff_jitter", &self.backoff_jitter)
            .field("max_attempts", &self.max_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_endpoint(),
            path: default_path(),
            backoff_delay_ms: default_backoff_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_jitter: 0.0,
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let gateway = GatewayConfig::default();
        assert_eq!(gateway.url(), "https://android.googleapis.com/gcm/send");
        assert_eq!(gateway.backoff_delay_ms, 1000);
        assert_eq!(gateway.backoff_factor, 1.2);
        assert_eq!(gateway.max_attempts, 10);
        assert!(!gateway.has_api_key());
    }

    #[test]
    fn test_sanitized_restores_defaults() {
        let config = GatewayConfig::new("key")
            .with_backoff_factor(0.5)
            .with_max_attempts(0)
            .with_endpoint("")
            .sanitized();

        assert_eq!(config.backoff_factor, 1.2);
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.endpoint, "https://android.googleapis.com");

        let nan = GatewayConfig::new("key").with_backoff_factor(f64::NAN).sanitized();
        assert_eq!(nan.backoff_factor, 1.2);
    }

    #[test]
    fn test_sanitized_keeps_valid_values() {
        let config = GatewayConfig::new("key")
            .with_endpoint("http://localhost:8080")
            .with_path("/send")
            .with_backoff_delay_ms(250)
            .with_backoff_factor(2.0)
            .with_max_attempts(3)
            .sanitized();

        assert_eq!(config.url(), "http://localhost:8080/send");
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff.initial_delay_ms, 250);
        assert_eq!(policy.backoff.multiplier, 2.0);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let debug = format!("{:?}", GatewayConfig::new("super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        assert!(!GatewayConfig::new("   ").has_api_key());
        assert!(GatewayConfig::new("AIza").has_api_key());
    }
}
