use thiserror::Error;

use crate::notification::ValidationError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl PushError {
    /// Whether another attempt may be made after this error.
    ///
    /// Only transport and gateway failures are retried. 400 and 401 are
    /// retried too: the attempt loop does not special-case them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PushError::Transport(_) | PushError::Gateway(_))
    }

    /// Short machine-readable code, used as a metrics label and log field
    pub fn code(&self) -> &'static str {
        match self {
            PushError::Configuration(_) => "CONFIG_ERROR",
            PushError::Validation(_) => "VALIDATION_ERROR",
            PushError::Transport(_) => "TRANSPORT_ERROR",
            PushError::Gateway(e) => e.code(),
            PushError::Parse(_) => "PARSE_ERROR",
        }
    }
}

/// Non-200 answer from the push gateway, classified by status code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("BAD_REQUEST: request could not be parsed as JSON, or it contained invalid fields")]
    BadRequest { details: String },

    #[error("UNAUTHORIZED: there was an error authenticating the sender account")]
    Unauthorized,

    #[error("INTERNAL_SERVER_ERROR")]
    InternalServerError,

    #[error("NOT_IMPLEMENTED: the server does not recognize the request method or cannot fulfill it")]
    NotImplemented,

    #[error("BAD_GATEWAY: the server received an invalid response from the upstream server")]
    BadGateway,

    #[error("SERVICE_UNAVAILABLE: the server is overloaded or down for maintenance")]
    ServiceUnavailable,

    #[error("GATEWAY_TIMEOUT: the server did not receive a timely response from the upstream server")]
    GatewayTimeout,

    #[error("INVALID_REQUEST (status {status})")]
    InvalidRequest { status: u16 },
}

impl GatewayError {
    /// Classify a response status. Returns `None` for 200.
    pub fn from_status(status: u16, body: &str) -> Option<Self> {
        let error = match status {
            200 => return None,
            400 => GatewayError::BadRequest {
                details: body.to_string(),
            },
            401 => GatewayError::Unauthorized,
            500 => GatewayError::InternalServerError,
            501 => GatewayError::NotImplemented,
            502 => GatewayError::BadGateway,
            503 => GatewayError::ServiceUnavailable,
            504 => GatewayError::GatewayTimeout,
            status => GatewayError::InvalidRequest { status },
        };
        Some(error)
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::BadRequest { .. } => "BAD_REQUEST",
            GatewayError::Unauthorized => "UNAUTHORIZED",
            GatewayError::InternalServerError => "INTERNAL_SERVER_ERROR",
            GatewayError::NotImplemented => "NOT_IMPLEMENTED",
            GatewayError::BadGateway => "BAD_GATEWAY",
            GatewayError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            GatewayError::GatewayTimeout => "GATEWAY_TIMEOUT",
            GatewayError::InvalidRequest { .. } => "INVALID_REQUEST",
        }
    }
}

pub type Result<T> = std::result::Result<T, PushError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_200_is_not_an_error() {
        assert_eq!(GatewayError::from_status(200, ""), None);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            GatewayError::from_status(400, "bad field"),
            Some(GatewayError::BadRequest {
                details: "bad field".to_string()
            })
        );
        assert_eq!(
            GatewayError::from_status(401, ""),
            Some(GatewayError::Unauthorized)
        );
        assert_eq!(
            GatewayError::from_status(500, ""),
            Some(GatewayError::InternalServerError)
        );
        assert_eq!(
            GatewayError::from_status(501, ""),
            Some(GatewayError::NotImplemented)
        );
        assert_eq!(
            GatewayError::from_status(502, ""),
            Some(GatewayError::BadGateway)
        );
        assert_eq!(
            GatewayError::from_status(503, ""),
            Some(GatewayError::ServiceUnavailable)
        );
        assert_eq!(
            GatewayError::from_status(504, ""),
            Some(GatewayError::GatewayTimeout)
        );
    }

    #[test]
    fn test_unknown_status_is_invalid_request() {
        assert_eq!(
            GatewayError::from_status(418, ""),
            Some(GatewayError::InvalidRequest { status: 418 })
        );
        assert_eq!(
            GatewayError::from_status(302, ""),
            Some(GatewayError::InvalidRequest { status: 302 })
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PushError::Gateway(GatewayError::Unauthorized).is_retryable());
        assert!(PushError::Transport(TransportError::Timeout).is_retryable());
        assert!(!PushError::Configuration("missing key".to_string()).is_retryable());
        assert!(!PushError::Parse("garbage".to_string()).is_retryable());
        assert!(!PushError::Validation(ValidationError::NoRecipients).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PushError::Gateway(GatewayError::ServiceUnavailable).code(),
            "SERVICE_UNAVAILABLE"
        );
        assert_eq!(PushError::Parse(String::new()).code(), "PARSE_ERROR");
    }
}
