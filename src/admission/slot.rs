use std::{fmt, sync::Arc};

use crate::{
    AcquireError,
    admission::rate_window::{Grant, SharedWindow},
};

/// One unit of admission capacity, held for the duration of one submission.
///
/// Releasing is tied to ownership: call [`Slot::release`] or simply drop the
/// slot. Either way it is released exactly once, on every exit path
/// including early returns, errors and panics.
///
/// Releasing does not make the slot grantable again in the current window.
/// Capacity comes back only when the window rolls over.
#[must_use = "dropping a slot releases it immediately"]
pub struct Slot {
    shared: Arc<SharedWindow>,
    epoch: u64,
}

impl Slot {
    pub(crate) fn new(shared: Arc<SharedWindow>, epoch: u64) -> Self {
        Self { shared, epoch }
    }

    /// Window the slot was granted in. Starts at 0 and increases by one per rollover.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Marks the slot as done.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("epoch", &self.epoch).finish()
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// A queued caller waiting for the next hand-off.
///
/// If this is dropped before the grant is observed, the caller leaves the
/// queue. A slot handed over in the meantime goes back to its window.
pub(crate) struct PendingAcquire {
    shared: Arc<SharedWindow>,
    grant: Grant,
    settled: bool,
}

impl PendingAcquire {
    pub(crate) fn new(shared: Arc<SharedWindow>, grant: Grant) -> Self {
        Self {
            shared,
            grant,
            settled: false,
        }
    }

    pub(crate) async fn wait(mut self) -> Result<Slot, AcquireError> {
        let received = (&mut self.grant).await;
        self.settled = true;

        match received {
            Ok(epoch) => Ok(Slot::new(self.shared.clone(), epoch)),
            // Sender dropped without a grant: only happens on shutdown.
            Err(_) => Err(AcquireError::Closed),
        }
    }
}

impl Drop for PendingAcquire {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        self.grant.close();

        match self.grant.try_recv() {
            Ok(epoch) => self.shared.restore(epoch),
            Err(_) => self.shared.prune_waiters(),
        }
    }
}
