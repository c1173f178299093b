//! Authentication error kinds

use thiserror::Error;

/// Maximum length for error response bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Errors surfaced by the session manager and its transports.
///
/// `Clone` is required because one refresh outcome is handed to every
/// caller waiting on the shared refresh handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Login rejected (HTTP {status}): {message}")]
    LoginRejected { status: u16, message: String },

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Malformed access token: {0}")]
    MalformedToken(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

impl AuthError {
    /// Wrap a transport-level error as `TransportFailure`, keeping the cause chain.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        AuthError::TransportFailure(format!("{:#}", err))
    }

    /// Recast any failure that happened during a refresh as `RefreshFailed`.
    pub fn into_refresh_failure(self) -> Self {
        match self {
            AuthError::RefreshFailed(_) => self,
            other => AuthError::RefreshFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_refresh_failure_wraps_other_kinds() {
        let err = AuthError::TransportFailure("connection reset".to_string());
        assert_eq!(
            err.into_refresh_failure(),
            AuthError::RefreshFailed("Transport failure: connection reset".to_string())
        );
    }

    #[test]
    fn test_into_refresh_failure_keeps_refresh_failed() {
        let err = AuthError::RefreshFailed("HTTP 401".to_string());
        assert_eq!(err.clone().into_refresh_failure(), err);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 510 total bytes"));
        assert_eq!(truncate_body("short"), "short");

        // Never splits a multi-byte character
        let wide = "é".repeat(400);
        assert!(truncate_body(&wide).starts_with(&"é".repeat(250)));
    }

    #[test]
    fn test_login_rejected_display() {
        let err = AuthError::LoginRejected {
            status: 401,
            message: "bad credentials".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Login rejected (HTTP 401): bad credentials"
        );
    }
}
