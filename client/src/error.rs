/// Error types for the Triage API client.
use thiserror::Error;

/// Errors surfaced by [`TriageClient`](crate::TriageClient) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No access key was configured. Raised before any request goes out.
    #[error("no access key configured (set HATCHING_TRIAGE_ACCESS_KEY or pass --access-key)")]
    MissingAccessKey,

    /// The service rejected the configured access key (HTTP 401/403).
    #[error("access key rejected by the API")]
    AuthRejected,

    /// The service has no report for the requested identifier (HTTP 404).
    #[error("no report found for {0}")]
    NotFound(String),

    /// Any other non-success response, with the body the service returned.
    #[error("api returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Client-side configuration could not be applied.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Map a non-success HTTP status to the matching error kind. `subject`
    /// names what was requested (usually the sample identifier).
    pub fn from_status(status: u16, body: String, subject: &str) -> Self {
        match status {
            401 | 403 => ClientError::AuthRejected,
            404 => ClientError::NotFound(subject.to_string()),
            _ => ClientError::Api { status, body },
        }
    }
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
