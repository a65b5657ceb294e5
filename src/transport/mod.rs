//! HTTP transport abstraction for talking to the push gateway.
//!
//! The dispatcher only needs "POST this body with these headers, give me the
//! status and body back". Keeping that behind a trait lets tests record
//! requests and script responses without a network.
//!
//! - `HttpTransport`: production implementation on top of `reqwest`

mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpTransport;

/// Errors raised below the HTTP layer (no status code was received).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not connect or the connection broke mid-request
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// A single POST to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl GatewayRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status code and raw body of a gateway answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: String,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs one HTTP POST.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: one transport is shared by every
/// `send` call made on a dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return whatever status the server answered with.
    ///
    /// Non-2xx statuses are not errors at this layer.
    async fn post(&self, request: &GatewayRequest) -> Result<GatewayResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = GatewayRequest {
            url: "https://example.test/send".to_string(),
            headers: vec![
                ("Authorization".to_string(), "key=abc".to_string()),
                ("Content-Length".to_string(), "12".to_string()),
            ],
            body: String::new(),
        };

        assert_eq!(request.header("authorization"), Some("key=abc"));
        assert_eq!(request.header("CONTENT-LENGTH"), Some("12"));
        assert_eq!(request.header("content-type"), None);
    }
}
