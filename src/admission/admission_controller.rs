use std::{fmt, sync::Arc, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    AcquireError, AdmissionStats, Capacity, ConstructionError, PollInterval, Slot,
    WindowDuration,
    admission::{
        rate_window::{Admission, SharedWindow},
        replenisher::Replenisher,
        slot::PendingAcquire,
    },
};

/// Configuration for [`AdmissionController`].
#[derive(Clone, Debug)]
pub struct AdmissionOptions {
    /// Length of one window.
    pub window: WindowDuration,
    /// Slots granted per window.
    pub capacity: Capacity,
    /// Rollover check cadence. Defaults to [`PollInterval::for_window`].
    ///
    /// Must not exceed `window`.
    pub poll_interval: Option<PollInterval>,
}

impl AdmissionOptions {
    /// Options with the default poll interval.
    pub fn new(window: WindowDuration, capacity: Capacity) -> Self {
        Self {
            window,
            capacity,
            poll_interval: None,
        }
    }
}

/// Fixed-window admission controller.
///
/// Grants at most `capacity` slots per window. Once they are gone, callers
/// wait until the background replenisher observes that the window has
/// elapsed and resets the count to `capacity` in one step.
///
/// # Algorithm
///
/// 1. **Acquire:** if a slot is left and nobody is queued, take it.
///    Otherwise join the back of the queue.
/// 2. **Rollover:** every poll tick, if `now - window_started_at >= window`,
///    set `available = capacity`, `window_started_at = now`, then hand slots
///    to queued callers front to back.
/// 3. **Release:** bookkeeping only. Capacity is never restored per release.
///
/// Bursts of up to `capacity` succeed at the start of every window and
/// everybody else waits for the next boundary. There is no partial refill
/// proportional to elapsed time.
///
/// # Fairness
///
/// FIFO. A caller that arrives while others are queued queues behind them,
/// even if a slot happens to be free. Queued callers are served in arrival
/// order, so nobody starves under sustained contention.
///
/// # Cancellation
///
/// Every wait can be abandoned: drop the future, fire a
/// [`CancellationToken`] passed to [`acquire_with_cancel`](Self::acquire_with_cancel),
/// or use [`acquire_timeout`](Self::acquire_timeout). An abandoned wait never
/// changes `available`.
///
/// # Lifecycle
///
/// The replenisher is a Tokio task started by the constructor, so the
/// controller must be built inside a runtime. [`shutdown`](Self::shutdown)
/// (or dropping the controller) stops it and fails every queued caller with
/// [`AcquireError::Closed`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
///
/// use docgate::AdmissionController;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// // 3 submissions per 2 seconds
/// let admission = AdmissionController::with_rate(Duration::from_secs(2), 3)?;
///
/// let slot = admission.acquire().await?;
/// // ... perform the guarded call ...
/// slot.release();
/// # Ok(())
/// # }
/// ```
pub struct AdmissionController {
    shared: Arc<SharedWindow>,
    poll_interval: PollInterval,
    shutdown: CancellationToken,
    replenisher: JoinHandle<()>,
}

impl AdmissionController {
    /// Creates a controller and starts its replenisher.
    ///
    /// # Errors
    ///
    /// - [`ConstructionError::InvalidParameter`] if the poll interval exceeds the window
    /// - [`ConstructionError::NoRuntime`] if called outside a Tokio runtime
    pub fn new(options: AdmissionOptions) -> Result<Self, ConstructionError> {
        let AdmissionOptions {
            window,
            capacity,
            poll_interval,
        } = options;

        let poll_interval = poll_interval.unwrap_or_else(|| PollInterval::for_window(window));

        if *poll_interval > *window {
            return Err(ConstructionError::InvalidParameter(
                "Poll interval must not exceed the window duration",
            ));
        }

        let handle = Handle::try_current().map_err(|_| ConstructionError::NoRuntime)?;

        let shared = Arc::new(SharedWindow::new(capacity, window, Instant::now()));
        let shutdown = CancellationToken::new();
        let replenisher =
            Replenisher::spawn(&handle, shared.clone(), poll_interval, shutdown.clone());

        tracing::debug!(
            capacity = *capacity,
            window = ?*window,
            poll_interval = ?*poll_interval,
            "admission controller started"
        );

        Ok(Self {
            shared,
            poll_interval,
            shutdown,
            replenisher,
        })
    } // end constructor

    /// Creates a controller from raw rate parameters.
    ///
    /// # Errors
    ///
    /// [`ConstructionError::InvalidParameter`] if `capacity` is 0 or `window`
    /// is zero, plus everything [`new`](Self::new) can return.
    pub fn with_rate(window: Duration, capacity: u64) -> Result<Self, ConstructionError> {
        Self::new(AdmissionOptions::new(
            WindowDuration::try_from(window)?,
            Capacity::try_from(capacity)?,
        ))
    }

    /// Waits for a slot in the current or a later window.
    ///
    /// There is no upper bound on the wait. Dropping the returned future
    /// leaves the queue without consuming a slot.
    ///
    /// # Errors
    ///
    /// [`AcquireError::Closed`] if the controller is, or gets, shut down.
    pub async fn acquire(&self) -> Result<Slot, AcquireError> {
        match self.shared.admit() {
            Admission::Granted { epoch } => Ok(Slot::new(self.shared.clone(), epoch)),
            Admission::Queued(grant) => PendingAcquire::new(self.shared.clone(), grant).wait().await,
            Admission::Closed => Err(AcquireError::Closed),
        }
    } // end method acquire

    /// Takes a slot only if one can be granted right now.
    ///
    /// Returns `None` when the window is exhausted or other callers are
    /// already queued.
    pub fn try_acquire(&self) -> Option<Slot> {
        self.shared
            .try_admit()
            .map(|epoch| Slot::new(self.shared.clone(), epoch))
    }

    /// Waits for a slot until `cancel` fires.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use docgate::{AcquireError, AdmissionController, CancellationToken};
    ///
    /// # async fn run(admission: AdmissionController) {
    /// let cancel = CancellationToken::new();
    /// let waiter = cancel.clone();
    ///
    /// tokio::spawn(async move {
    ///     tokio::time::sleep(Duration::from_millis(100)).await;
    ///     waiter.cancel();
    /// });
    ///
    /// match admission.acquire_with_cancel(&cancel).await {
    ///     Ok(slot) => slot.release(),
    ///     Err(AcquireError::Cancelled) => println!("gave up"),
    ///     Err(err) => println!("{err}"),
    /// }
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// - [`AcquireError::Cancelled`] if `cancel` fired first
    /// - [`AcquireError::Closed`] if the controller is shut down
    pub async fn acquire_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Slot, AcquireError> {
        if cancel.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcquireError::Cancelled),
            slot = self.acquire() => slot,
        }
    } // end method acquire_with_cancel

    /// Waits for a slot for at most `timeout`.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::TimedOut`] if no slot was granted in time
    /// - [`AcquireError::Closed`] if the controller is shut down
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Slot, AcquireError> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(slot) => slot,
            Err(_) => Err(AcquireError::TimedOut(timeout)),
        }
    }

    /// Blocks the current OS thread until a slot is granted.
    ///
    /// For callers running on plain threads. Do not call this from inside
    /// an async task: it parks the worker thread.
    ///
    /// # Errors
    ///
    /// [`AcquireError::Closed`] if the controller is shut down.
    pub fn blocking_acquire(&self) -> Result<Slot, AcquireError> {
        futures::executor::block_on(self.acquire())
    }

    /// Current counters.
    pub fn stats(&self) -> AdmissionStats {
        self.shared.stats()
    }

    /// Slots per window.
    pub fn capacity(&self) -> Capacity {
        self.shared.capacity()
    }

    /// Window length.
    pub fn window(&self) -> WindowDuration {
        self.shared.window()
    }

    /// Rollover check cadence in effect.
    pub fn poll_interval(&self) -> PollInterval {
        self.poll_interval
    }

    /// Stops the replenisher and fails all queued callers with
    /// [`AcquireError::Closed`]. Idempotent.
    ///
    /// Slots already held stay valid and can still be released.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }

        self.shutdown.cancel();
        let waiting = self.shared.close();

        tracing::debug!(waiting, "admission controller shut down");
    } // end method shutdown

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn replenish_at(&self, now: Instant) -> bool {
        self.shared.replenish_at(now)
    }

    #[cfg(test)]
    pub(crate) fn replenisher_finished(&self) -> bool {
        self.replenisher.is_finished()
    }

    /// Makes the next rollover check panic.
    #[cfg(test)]
    pub(crate) fn fail_next_replenish(&self) {
        self.shared.fail_next_replenish();
    }

    /// Raw wait queue length, including entries not yet compacted.
    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.shared.queue_len()
    }
} // end of impl

impl fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionController")
            .field("capacity", &*self.capacity())
            .field("window", &*self.window())
            .field("poll_interval", &*self.poll_interval)
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

impl Drop for AdmissionController {
    fn drop(&mut self) {
        self.shutdown();
        self.replenisher.abort();
    }
}
