//! API error types.

use thiserror::Error;

/// Errors that can occur when talking to the persistence API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token was missing or rejected.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The viewer's role may not perform this request.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist (or is outside the viewer's school).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` for failures that retrying cannot fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_) | ApiError::Forbidden(_) | ApiError::NotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_missing_resources_are_permanent() {
        assert!(ApiError::Unauthorized("bad token".into()).is_permanent());
        assert!(ApiError::Forbidden("/grades".into()).is_permanent());
        assert!(ApiError::NotFound("/grading-config".into()).is_permanent());
        assert!(!ApiError::Timeout(30).is_permanent());
        assert!(!ApiError::Status {
            status: 502,
            message: "bad gateway".into()
        }
        .is_permanent());
    }
}
