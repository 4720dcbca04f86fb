use reqwest::StatusCode;
use thiserror::Error;

/// Top-level error type for the `sconnect-api` crate.
///
/// Retryable HTTP statuses never surface here directly: the executor hands
/// the final response back and each operation decides whether its status is
/// a failure. `sconnect` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Setup ───────────────────────────────────────────────────────
    /// The API key cannot be carried in an HTTP header.
    #[error("Invalid API key: {message}")]
    InvalidApiKey { message: String },

    /// URL parsing error (base address or continuation link).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    /// Never retried.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller's cancellation token fired while a request or backoff
    /// was pending.
    #[error("Operation cancelled")]
    Cancelled,

    // ── Domain ──────────────────────────────────────────────────────
    /// Create or delete finished with a status of 300 or above.
    #[error("{operation} failed: {status}")]
    RequestFailed {
        operation: &'static str,
        status: StatusCode,
    },

    /// Listing returned something other than 200. Carries the raw body.
    #[error("bad response ({}): {body}", .status.as_u16())]
    Api { status: StatusCode, body: String },

    /// A list page matched neither `{"data": [...]}` nor a bare array.
    #[error("response doesn't match expected formats (wrapped or direct array)")]
    UnexpectedFormat { body: String },

    // ── Lookup ──────────────────────────────────────────────────────
    /// No enrolled site carries the requested name.
    #[error("no site found with name {name:?} in organization {organization_id:?}")]
    SiteNotFound {
        name: String,
        organization_id: String,
    },

    /// More than one enrolled site carries the requested name.
    #[error("multiple sites found with name {name:?} ({count} matches)")]
    AmbiguousSiteName { name: String, count: usize },
}

impl Error {
    /// Returns `true` if the caller aborted the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::SiteNotFound { .. } => true,
            Self::RequestFailed { status, .. } | Self::Api { status, .. } => {
                *status == StatusCode::NOT_FOUND
            }
            _ => false,
        }
    }

    /// Returns `true` if the server rejected the API key.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::InvalidApiKey { .. } => true,
            Self::RequestFailed { status, .. } | Self::Api { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }

    /// The HTTP status behind a domain failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestFailed { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_embeds_status_text() {
        let err = Error::RequestFailed {
            operation: "create",
            status: StatusCode::BAD_REQUEST,
        };
        assert_eq!(err.to_string(), "create failed: 400 Bad Request");
    }

    #[test]
    fn api_error_embeds_code_and_body() {
        let err = Error::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: r#"{"errors":["boom"]}"#.into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[test]
    fn classification_helpers() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(
            Error::SiteNotFound {
                name: "hq".into(),
                organization_id: "1".into(),
            }
            .is_not_found()
        );
        assert!(
            Error::RequestFailed {
                operation: "delete",
                status: StatusCode::NOT_FOUND,
            }
            .is_not_found()
        );
        assert!(
            Error::Api {
                status: StatusCode::UNAUTHORIZED,
                body: String::new(),
            }
            .is_unauthorized()
        );
        assert!(!Error::Cancelled.is_not_found());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
