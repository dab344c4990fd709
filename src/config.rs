//! Client configuration
//!
//! Settings can be built in code or loaded from environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::endpoints::DEFAULT_BASE_URL;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent header sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("royale-rs/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "ROYALE_API_TOKEN";
/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "ROYALE_API_BASE_URL";
/// Environment variable overriding the request timeout (seconds)
pub const TIMEOUT_ENV: &str = "ROYALE_TIMEOUT_SECS";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API token was provided
    #[error("Missing API token: set ROYALE_API_TOKEN")]
    MissingToken,

    /// An environment variable had an unusable value
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings for constructing a [`Client`](crate::Client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bearer token issued by the developer portal
    pub token: String,
    /// API root, without a trailing slash
    pub base_url: String,
    /// Timeout applied to requests without a per-call override
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a config for `token` with default settings
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Loads the config from environment variables
    ///
    /// # Environment Variables
    /// - `ROYALE_API_TOKEN` - API token (required)
    /// - `ROYALE_API_BASE_URL` - API root (default: the official API)
    /// - `ROYALE_TIMEOUT_SECS` - Request timeout in seconds (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the config from the same variables as [`from_env`](Self::from_env),
    /// resolved through `lookup` instead of the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup(TOKEN_ENV)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let mut config = Self::new(token);

        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }

        if let Some(value) = lookup(TIMEOUT_ENV) {
            let secs = value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: TIMEOUT_ENV,
                    value: value.clone(),
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Points the client at a different API root (e.g., a proxy or mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
