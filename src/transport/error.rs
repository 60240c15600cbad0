//! Typed transport errors (spec.md §7 "Transport" family).

use std::time::Duration;

/// Errors raised while submitting a workflow or reading its response.
///
/// Status-code branching follows spec.md §4.4: 401/403 are never retried,
/// 404 is never retried, 429 carries a `retry-after` hint, 5xx is transient
/// and retryable, everything else is an opaque platform error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("authentication failed (status {status})")]
    Auth { status: u16 },

    #[error("workflow endpoint not found (status 404)")]
    NotFound,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transient platform error (status {status})")]
    Transient { status: u16 },

    #[error("platform error (status {status}): {body}")]
    Platform { status: u16, body: String },

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("request was cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether a connect-time retry loop should re-attempt after this error.
    /// Auth failures and non-429 client errors are never retryable; 429 and
    /// 5xx and raw connect failures are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. }
                | TransportError::Transient { .. }
                | TransportError::Connect(_)
        )
    }

    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => TransportError::Auth {
                status: status.as_u16(),
            },
            404 => TransportError::NotFound,
            429 => TransportError::RateLimited { retry_after: None },
            500..=599 => TransportError::Transient {
                status: status.as_u16(),
            },
            other => TransportError::Platform { status: other, body },
        }
    }
}
