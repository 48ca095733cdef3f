use reqwest::StatusCode;
use thiserror::Error;

const REDACTED_BODY_MAX_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unable to reach token endpoint {url}: {source}")]
    TokenRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token endpoint returned no access_token: status={status} body={body}")]
    TokenMissing { status: u16, body: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[Error {status}] {message}")]
    Status { status: u16, message: String },

    #[error("still unauthorized after token refresh: {url} body={body}")]
    Unauthorized { url: String, body: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GraphError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Builds a status error from a failed Graph response body.
    pub fn status(status: StatusCode, context: &str, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            message: format!("{context}: {}", redact_response_body(body)),
        }
    }

    /// HTTP status carried by the error, if the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::TokenMissing { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::TokenRequest { source, .. } | Self::Transport { source, .. } => {
                source.status().map(|status| status.as_u16())
            }
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub(crate) fn redact_response_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= REDACTED_BODY_MAX_LEN {
        return trimmed.to_string();
    }

    let mut cut = REDACTED_BODY_MAX_LEN;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…[truncated {} bytes]", &trimmed[..cut], trimmed.len())
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{redact_response_body, GraphError};

    #[test]
    fn status_error_carries_code_and_body() {
        let error = GraphError::status(StatusCode::FORBIDDEN, "move message", "Access denied");
        assert_eq!(error.status_code(), Some(403));
        assert_eq!(error.to_string(), "[Error 403] move message: Access denied");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let redacted = redact_response_body(&body);
        assert!(redacted.starts_with(&"x".repeat(200)));
        assert!(redacted.ends_with("[truncated 500 bytes]"));
    }

    #[test]
    fn validation_errors_have_no_status() {
        let error = GraphError::validation("subject", "leading wildcard");
        assert!(error.is_validation());
        assert_eq!(error.status_code(), None);
        assert_eq!(error.to_string(), "invalid subject: leading wildcard");
    }
}
