use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::{sync::oneshot, time::Instant};

use crate::{AdmissionStats, Capacity, WindowDuration};

/// Receiving half of a queued caller's hand-off. Carries the epoch of the
/// window the slot was granted in.
pub(crate) type Grant = oneshot::Receiver<u64>;

pub(crate) enum Admission {
    /// A slot was taken from the current window.
    Granted { epoch: u64 },
    /// No slot right now; wait on the grant.
    Queued(Grant),
    /// The controller is shut down.
    Closed,
}

struct RateWindow {
    available: u64,
    window_started_at: Instant,
    epoch: u64,
    waiters: VecDeque<oneshot::Sender<u64>>,
    /// Waiters that left since the queue was last compacted.
    abandoned: usize,
    closed: bool,
    in_flight: u64,
    granted_total: u64,
    released_total: u64,
}

impl RateWindow {
    fn live_waiters(&self) -> usize {
        self.waiters
            .iter()
            .filter(|waiter| !waiter.is_closed())
            .count()
    }

    fn grant(&mut self) -> u64 {
        self.available -= 1;
        self.in_flight += 1;
        self.granted_total += 1;
        self.epoch
    }

    /// Hands free slots to queued callers in arrival order.
    ///
    /// Callers that gave up are skipped without consuming a slot.
    fn hand_off(&mut self) -> u64 {
        let mut handed = 0;

        while self.available > 0
            && let Some(waiter) = self.waiters.pop_front()
        {
            if waiter.send(self.epoch).is_ok() {
                self.grant();
                handed += 1;
            }
        }

        handed
    }
}

/// The fixed-window counter shared by callers and the replenisher.
///
/// `available`, `window_started_at` and the wait queue live behind one lock,
/// so check-and-decrement and read-check-and-reset are single transitions.
pub(crate) struct SharedWindow {
    capacity: Capacity,
    window: WindowDuration,
    state: Mutex<RateWindow>,
    #[cfg(test)]
    fail_next_replenish: std::sync::atomic::AtomicBool,
}

impl SharedWindow {
    pub(crate) fn new(capacity: Capacity, window: WindowDuration, now: Instant) -> Self {
        Self {
            capacity,
            window,
            state: Mutex::new(RateWindow {
                available: *capacity,
                window_started_at: now,
                epoch: 0,
                waiters: VecDeque::new(),
                abandoned: 0,
                closed: false,
                in_flight: 0,
                granted_total: 0,
                released_total: 0,
            }),
            #[cfg(test)]
            fail_next_replenish: std::sync::atomic::AtomicBool::new(false),
        }
    } // end constructor

    pub(crate) fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub(crate) fn window(&self) -> WindowDuration {
        self.window
    }

    /// Takes a slot if one is free and nobody is queued ahead, otherwise
    /// enqueues the caller.
    pub(crate) fn admit(&self) -> Admission {
        let mut state = self.state.lock();

        if state.closed {
            return Admission::Closed;
        }

        if state.available > 0 && state.waiters.is_empty() {
            let epoch = state.grant();
            tracing::trace!(epoch, available = state.available, "slot granted");
            return Admission::Granted { epoch };
        }

        let (sender, grant) = oneshot::channel();
        state.waiters.push_back(sender);
        tracing::trace!(queued = state.waiters.len(), "caller queued");

        Admission::Queued(grant)
    } // end method admit

    /// Non-blocking variant of [`admit`](Self::admit). Never queues.
    pub(crate) fn try_admit(&self) -> Option<u64> {
        let mut state = self.state.lock();

        if state.closed || state.available == 0 || !state.waiters.is_empty() {
            return None;
        }

        Some(state.grant())
    } // end method try_admit

    /// Resets the window to full capacity if it has elapsed at `now`.
    ///
    /// Returns `true` if a rollover happened. A second call within the same
    /// window is a no-op.
    pub(crate) fn replenish_at(&self, now: Instant) -> bool {
        #[cfg(test)]
        if self
            .fail_next_replenish
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            panic!("injected replenish fault");
        }

        let mut state = self.state.lock();

        if state.closed {
            return false;
        }

        if now.saturating_duration_since(state.window_started_at) < *self.window {
            return false;
        }

        state.available = *self.capacity;
        state.window_started_at = now;
        state.epoch += 1;

        let handed = state.hand_off();

        tracing::debug!(
            epoch = state.epoch,
            handed,
            available = state.available,
            waiting = state.live_waiters(),
            "window rolled over"
        );

        true
    } // end method replenish_at

    /// Undoes a grant whose receiver went away before observing it.
    ///
    /// The slot only goes back if its window is still the current one;
    /// a grant from an earlier window must not add to the new one.
    pub(crate) fn restore(&self, epoch: u64) {
        let mut state = self.state.lock();

        state.in_flight = state.in_flight.saturating_sub(1);
        state.granted_total = state.granted_total.saturating_sub(1);

        if state.closed || state.epoch != epoch {
            return;
        }

        state.available = (state.available + 1).min(*self.capacity);
        state.hand_off();
    } // end method restore

    /// Records that a queued caller stopped waiting.
    ///
    /// Dead entries are compacted once they make up half the queue, so a
    /// burst of cancellations costs amortized O(1) each. Until then
    /// hand-off skips them.
    pub(crate) fn prune_waiters(&self) {
        let mut state = self.state.lock();

        state.abandoned += 1;

        if state.abandoned * 2 >= state.waiters.len() {
            state.waiters.retain(|waiter| !waiter.is_closed());
            state.abandoned = 0;
        }
    }

    /// Bookkeeping for a finished slot. Never touches `available`.
    pub(crate) fn release(&self) {
        let mut state = self.state.lock();

        state.in_flight = state.in_flight.saturating_sub(1);
        state.released_total += 1;
    }

    /// Rejects future admissions and wakes every queued caller.
    ///
    /// Returns the number of callers that were waiting.
    pub(crate) fn close(&self) -> usize {
        let mut state = self.state.lock();

        state.closed = true;
        let waiting = state.live_waiters();
        state.waiters.clear();
        state.abandoned = 0;

        waiting
    }

    #[cfg(test)]
    pub(crate) fn fail_next_replenish(&self) {
        self.fail_next_replenish
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn stats(&self) -> AdmissionStats {
        let state = self.state.lock();

        AdmissionStats {
            capacity: *self.capacity,
            available: state.available,
            in_flight: state.in_flight,
            waiting: state.live_waiters(),
            epoch: state.epoch,
            granted_total: state.granted_total,
            released_total: state.released_total,
        }
    }
} // end of impl
