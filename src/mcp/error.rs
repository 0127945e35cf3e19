//! Error types for the MCP client.

use std::time::Duration;

use reqwest::StatusCode;

/// Maximum number of body bytes kept in a [`TransportError::Status`].
pub(crate) const BODY_SNIPPET_LIMIT: usize = 2048;

/// MCP client error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be built before any I/O happened.
    #[error("invalid request: {0}")]
    Construction(String),

    /// Network or HTTP-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered a handshake or enumeration with an error object.
    #[error("server error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// The response payload did not have the shape expected by the operation.
    #[error("failed to parse {operation} result: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// No usable response envelope in the body.
    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request itself failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server replied with a non-2xx status.
    #[error("server returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The redirect chain exceeded the configured limit.
    #[error("too many redirects (limit {max})")]
    TooManyRedirects { max: usize },

    /// A redirect response carried no usable `Location`.
    #[error("invalid redirect location: {location:?}")]
    InvalidRedirect { location: String },

    /// The operation did not complete within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure to find a response envelope in a response body.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The stream ended without a parseable response envelope.
    #[error("no valid JSON-RPC response in response stream")]
    NoResponse {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A single line exceeded the decoder's size bound.
    #[error("response line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

impl TransportError {
    /// Build a status error, keeping only a prefix of the body.
    pub(crate) fn status(status: StatusCode, body: &str) -> Self {
        let mut end = body.len().min(BODY_SNIPPET_LIMIT);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        Self::Status {
            status,
            body: body[..end].to_string(),
        }
    }
}

/// Result type alias for MCP client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_truncates_long_bodies() {
        let body = "x".repeat(BODY_SNIPPET_LIMIT * 2);
        let TransportError::Status { body, .. } =
            TransportError::status(StatusCode::BAD_GATEWAY, &body)
        else {
            panic!("expected Status");
        };
        assert_eq!(body.len(), BODY_SNIPPET_LIMIT);
    }

    #[test]
    fn status_error_respects_char_boundaries() {
        let body = format!("{}é", "x".repeat(BODY_SNIPPET_LIMIT - 1));
        let TransportError::Status { body, .. } =
            TransportError::status(StatusCode::BAD_GATEWAY, &body)
        else {
            panic!("expected Status");
        };
        assert_eq!(body.len(), BODY_SNIPPET_LIMIT - 1);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = Error::Protocol {
            code: -32601,
            message: "method not found".to_string(),
        };
        assert_eq!(err.to_string(), "server error -32601: method not found");

        let err = Error::from(TransportError::TooManyRedirects { max: 10 });
        assert_eq!(err.to_string(), "too many redirects (limit 10)");
    }
}
