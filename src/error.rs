//! Error types for windowscape. Each surface propagates its own domain
//! enum; there is no catch-all rollup.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised synchronously at submission, before any queue entry is
/// created. Surfaced to the client as a 400.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("No processor registered for job kind {kind}")]
    UnknownKind { kind: String },
}

/// Errors from a processing function or its network collaborators.
/// Absorbed into a Failure outcome at the dispatch boundary; never
/// propagated out of the scheduler loop.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    #[error("Image encode failed: {0}")]
    ImageEncode(String),

    #[error("Worker task panicked or was dropped before completing")]
    WorkerCrashed,

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Errors from outbound network collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl RemoteError {
    /// Classify a reqwest failure against the endpoint it targeted.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            Self::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
