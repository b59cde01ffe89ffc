//! Top-level entrypoint that composes admission control with a submission executor.
//!
//! caller → [`AdmissionController`] → [`SubmissionExecutor`] → remote service.

use std::{fmt, time::Duration};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    AdmissionController, AdmissionOptions, ConstructionError, DEFAULT_ENDPOINT, Document,
    HttpSubmissionExecutor, Slot, SubmissionError, SubmissionExecutor,
};

/// Top-level configuration for [`Gateway`].
#[derive(Clone, Debug)]
pub struct GatewayOptions {
    /// Rate parameters.
    pub admission: AdmissionOptions,
    /// Create-document URL. Defaults to [`DEFAULT_ENDPOINT`].
    pub endpoint: Option<Url>,
    /// Per-request timeout of the HTTP exchange. Does not bound the wait for a slot.
    pub request_timeout: Option<Duration>,
}

/// Rate-limited document gateway.
///
/// Every submission first takes a [`Slot`] from the admission controller,
/// then runs the executor, then releases the slot. The slot is released
/// whatever the outcome, including when the submission future is dropped
/// mid-flight, so a failing remote never shrinks capacity.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use docgate::{AdmissionOptions, Capacity, Gateway, GatewayOptions, WindowDuration};
///
/// # async fn run(document: docgate::Document) -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = Gateway::new(GatewayOptions {
///     admission: AdmissionOptions::new(
///         WindowDuration::try_from(Duration::from_secs(1))?,
///         Capacity::try_from(5)?,
///     ),
///     endpoint: None,
///     request_timeout: Some(Duration::from_secs(30)),
/// })?;
///
/// gateway.submit("access-token", &document).await?;
/// # Ok(())
/// # }
/// ```
pub struct Gateway<E = HttpSubmissionExecutor> {
    admission: AdmissionController,
    executor: E,
}

impl<E: fmt::Debug> fmt::Debug for Gateway<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("admission", &self.admission)
            .field("executor", &self.executor)
            .finish()
    }
}

impl Gateway<HttpSubmissionExecutor> {
    /// Create a new [`Gateway`] talking HTTP.
    ///
    /// # Errors
    ///
    /// Any [`ConstructionError`]; nothing is started on failure.
    pub fn new(options: GatewayOptions) -> Result<Self, ConstructionError> {
        let GatewayOptions {
            admission,
            endpoint,
            request_timeout,
        } = options;

        let endpoint = match endpoint {
            Some(endpoint) => endpoint,
            None => Url::parse(DEFAULT_ENDPOINT)?,
        };

        let executor = HttpSubmissionExecutor::new(endpoint, request_timeout)?;

        Self::with_executor(admission, executor)
    }
}

impl<E: SubmissionExecutor> Gateway<E> {
    /// Create a new [`Gateway`] around a custom executor.
    ///
    /// # Errors
    ///
    /// See [`AdmissionController::new`].
    pub fn with_executor(admission: AdmissionOptions, executor: E) -> Result<Self, ConstructionError> {
        Ok(Self {
            admission: AdmissionController::new(admission)?,
            executor,
        })
    }

    /// Waits for a slot, then submits `document`.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::Transport`], [`SubmissionError::RemoteRejected`] or
    ///   [`SubmissionError::Serialization`] from the executor
    /// - [`SubmissionError::AcquisitionCancelled`] if the gateway was shut down
    pub async fn submit(&self, token: &str, document: &Document) -> Result<(), SubmissionError> {
        let slot = self.admission.acquire().await?;
        self.execute(slot, token, document).await
    }

    /// Like [`submit`](Self::submit), but gives up waiting for a slot when
    /// `cancel` fires. Once a slot is held the exchange runs to completion.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_with_cancel(
        &self,
        token: &str,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<(), SubmissionError> {
        let slot = self.admission.acquire_with_cancel(cancel).await?;
        self.execute(slot, token, document).await
    }

    /// Like [`submit`](Self::submit), but waits for a slot for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_timeout(
        &self,
        token: &str,
        document: &Document,
        timeout: Duration,
    ) -> Result<(), SubmissionError> {
        let slot = self.admission.acquire_timeout(timeout).await?;
        self.execute(slot, token, document).await
    }

    async fn execute(
        &self,
        slot: Slot,
        token: &str,
        document: &Document,
    ) -> Result<(), SubmissionError> {
        let result = self.executor.execute(token, document).await;
        slot.release();
        result
    }

    /// Access the admission controller.
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Access the executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Stops admission. See [`AdmissionController::shutdown`].
    pub fn shutdown(&self) {
        self.admission.shutdown();
    }
}
