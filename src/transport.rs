//! HTTP transport for the Clash Royale API
//!
//! Sends authenticated GET requests and turns responses into JSON values or
//! classified [`ApiError`]s. Nothing here knows about caching.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// Error body returned by the API on non-success responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: Option<String>,
    message: Option<String>,
}

/// Authenticated HTTP client with a default timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport sending the token, user agent and JSON accept headers
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ApiError::from_transport)?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Uses a preconfigured reqwest client as is
    ///
    /// The caller is responsible for its default headers (authorization in
    /// particular).
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `url` and parses the body as JSON
    ///
    /// `timeout` overrides the default timeout for this call only.
    pub async fn get_json(&self, url: &str, timeout: Option<Duration>) -> Result<Value, ApiError> {
        let timeout = timeout.unwrap_or(self.timeout);
        debug!(url, ?timeout, "GET");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from_transport)?;

        if !status.is_success() {
            let message = error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Extracts `reason: message` from an API error body, if it has one
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match (parsed.reason, parsed.message) {
        (Some(reason), Some(message)) => Some(format!("{}: {}", reason, message)),
        (Some(text), None) | (None, Some(text)) => Some(text),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_combines_reason_and_message() {
        assert_eq!(
            error_message(r#"{"reason":"accessDenied","message":"Invalid authorization"}"#),
            Some("accessDenied: Invalid authorization".to_string())
        );
        assert_eq!(
            error_message(r#"{"reason":"notFound"}"#),
            Some("notFound".to_string())
        );
        assert_eq!(error_message("{}"), None);
        assert_eq!(error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_new_rejects_token_with_control_characters() {
        let config = ClientConfig::new("bad\ntoken");
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ApiError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_new_keeps_configured_timeout() {
        let config = ClientConfig::new("token").with_timeout(Duration::from_secs(4));
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(4));
    }
}
