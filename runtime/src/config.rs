//! Environment-driven configuration.
//!
//! Queue names default to `openexam-{ENV}-queue` and
//! `openexam-{ENV}-queue-responses` so a bare deployment only needs `ENV`.
//!
//! # Example
//!
//! ```no_run
//! use genbridge_runtime::config::BridgeConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::from_env()?;
//! println!("Requests go to {}", config.request_queue_url);
//! # Ok(())
//! # }
//! ```

use crate::client::DEFAULT_GENERATION_TIMEOUT;
use crate::consumer::ConsumerConfig;
use genbridge_core::ReceiveOptions;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// SQS never long-polls for more than 20 seconds.
const MAX_WAIT_SECS: u64 = 20;

/// SQS returns at most 10 messages per receive.
const MAX_MESSAGES_PER_POLL: u32 = 10;

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// The variable name
        key: String,
        /// The rejected value
        value: String,
    },

    /// The configuration parsed but is not usable
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Deployment name (`ENV`)
    pub environment: String,
    /// AWS region for the queues
    pub region: String,
    /// Optional endpoint override (e.g. LocalStack)
    pub endpoint_url: Option<String>,
    /// Queue generation requests are sent to
    pub request_queue_url: String,
    /// Queue the worker answers on
    pub response_queue_url: String,
    /// Default wait deadline
    pub generation_timeout: Duration,
    /// Response consumer settings
    pub consumer: ConsumerConfig,
    /// HTTP listen port
    pub port: u16,
    /// Optional Prometheus listen address
    pub metrics_addr: Option<SocketAddr>,
}

impl BridgeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = get("ENV").unwrap_or_else(|| "dev".to_string());
        let defaults = ConsumerConfig::default();

        let config = Self {
            region: get("AWS_REGION").unwrap_or_else(|| "ap-southeast-1".to_string()),
            endpoint_url: get("AWS_ENDPOINT_URL"),
            request_queue_url: get("SQS_REQUEST_QUEUE_URL")
                .unwrap_or_else(|| format!("openexam-{environment}-queue")),
            response_queue_url: get("SQS_RESPONSE_QUEUE_URL")
                .unwrap_or_else(|| format!("openexam-{environment}-queue-responses")),
            generation_timeout: parse_or(
                &get,
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT.as_secs(),
            )
            .map(Duration::from_secs)?,
            consumer: ConsumerConfig {
                receive: ReceiveOptions {
                    max_messages: parse_or(
                        &get,
                        "CONSUMER_MAX_MESSAGES",
                        defaults.receive.max_messages,
                    )?,
                    wait_time: parse_or(
                        &get,
                        "CONSUMER_WAIT_SECS",
                        defaults.receive.wait_time.as_secs(),
                    )
                    .map(Duration::from_secs)?,
                    visibility_timeout: parse_or(
                        &get,
                        "CONSUMER_VISIBILITY_SECS",
                        defaults.receive.visibility_timeout.as_secs(),
                    )
                    .map(Duration::from_secs)?,
                },
                max_receive_count: parse_or(
                    &get,
                    "CONSUMER_MAX_RECEIVE_COUNT",
                    defaults.max_receive_count,
                )?,
                backoff: defaults.backoff,
            },
            port: parse_or(&get, "PORT", 3000)?,
            metrics_addr: get("METRICS_ADDR")
                .map(|value| parse_value("METRICS_ADDR", &value))
                .transpose()?,
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_queue_url == self.response_queue_url {
            return Err(ConfigError::Validation(
                "request and response queues must differ".to_string(),
            ));
        }
        if self.generation_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "GENERATION_TIMEOUT_SECS must be > 0".to_string(),
            ));
        }
        let receive = &self.consumer.receive;
        if !(1..=MAX_MESSAGES_PER_POLL).contains(&receive.max_messages) {
            return Err(ConfigError::Validation(format!(
                "CONSUMER_MAX_MESSAGES must be between 1 and {MAX_MESSAGES_PER_POLL}"
            )));
        }
        if receive.wait_time > Duration::from_secs(MAX_WAIT_SECS) {
            return Err(ConfigError::Validation(format!(
                "CONSUMER_WAIT_SECS must be <= {MAX_WAIT_SECS}"
            )));
        }
        if receive.visibility_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "CONSUMER_VISIBILITY_SECS must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    get(key).map_or(Ok(default), |value| parse_value(key, &value))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
