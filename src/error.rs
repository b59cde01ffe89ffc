use std::time::Duration;

/// Error returned when a controller or gateway cannot be built.
///
/// Construction errors are fatal: nothing has been started when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    /// A rate parameter failed validation.
    #[error("invalid rate parameter: {0}")]
    InvalidParameter(&'static str),
    /// No Tokio runtime is available to own the replenisher task.
    #[error("admission controller must be created inside a Tokio runtime")]
    NoRuntime,
    /// The submission endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl From<&'static str> for ConstructionError {
    fn from(message: &'static str) -> Self {
        Self::InvalidParameter(message)
    }
}

/// Error returned when a caller leaves the wait queue without a slot.
///
/// None of these outcomes consume a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// The caller's cancellation token fired.
    #[error("slot acquisition cancelled")]
    Cancelled,
    /// No slot became available before the deadline.
    #[error("no slot acquired within {0:?}")]
    TimedOut(Duration),
    /// The controller was shut down.
    #[error("admission controller is shut down")]
    Closed,
}

/// Error returned by a submission.
///
/// Submission errors are recoverable; whether to retry is the caller's call.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The remote service answered with something other than 200.
    #[error("remote rejected document with status {status_code}: {body}")]
    RemoteRejected {
        /// HTTP status code.
        status_code: u16,
        /// Response body as text.
        body: String,
    },
    /// The document could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// No slot was acquired, so nothing was sent.
    #[error("acquisition failed: {0}")]
    AcquisitionCancelled(#[from] AcquireError),
}
