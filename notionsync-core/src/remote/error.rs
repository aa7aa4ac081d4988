//! Remote API error types.

use std::time::Duration;

use thiserror::Error;

/// Terminal outcome of a remote call, after any retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited by the remote API")]
    RateLimited { retry_after: Option<Duration> },

    #[error("request rejected: {0}")]
    Validation(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

impl RemoteError {
    /// True for failures worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. } | RemoteError::Transient(_))
    }

    /// Maps an HTTP status and response body to an error.
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => RemoteError::Unauthorized(message),
            404 => RemoteError::NotFound(message),
            429 => RemoteError::RateLimited { retry_after },
            409 | 500..=599 => RemoteError::Transient(format!("HTTP {}: {}", status, message)),
            _ => RemoteError::Validation(format!("HTTP {}: {}", status, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RemoteError::from_status(404, "gone".into(), None),
            RemoteError::NotFound("gone".into())
        );
        assert!(matches!(
            RemoteError::from_status(401, "bad token".into(), None),
            RemoteError::Unauthorized(_)
        ));
        assert!(RemoteError::from_status(429, String::new(), None).is_retryable());
        assert!(RemoteError::from_status(503, String::new(), None).is_retryable());
        assert!(!RemoteError::from_status(400, String::new(), None).is_retryable());
    }
}
