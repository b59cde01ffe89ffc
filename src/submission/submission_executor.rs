use std::future::Future;

use crate::{Document, SubmissionError};

/// Performs one submission exchange with the remote service.
///
/// Implementations assume the caller already holds a [`Slot`](crate::Slot)
/// and will release it. They must not retry and must not touch slot
/// accounting.
pub trait SubmissionExecutor: Send + Sync {
    /// Sends `document` authenticated with `token`.
    fn execute(
        &self,
        token: &str,
        document: &Document,
    ) -> impl Future<Output = Result<(), SubmissionError>> + Send;
}
