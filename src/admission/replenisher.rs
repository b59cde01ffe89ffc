use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{PollInterval, admission::rate_window::SharedWindow};

/// Background task that rolls the window over once it has elapsed.
pub(crate) struct Replenisher; // end struct Replenisher

impl Replenisher {
    /// Spawns the loop on `handle`. It runs until `shutdown` is cancelled.
    ///
    /// A panic inside the loop is logged and the loop is started again;
    /// if it stopped, capacity would never come back.
    pub fn spawn(
        handle: &Handle,
        shared: Arc<SharedWindow>,
        poll_interval: PollInterval,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        handle.spawn(async move {
            loop {
                let run = AssertUnwindSafe(Self::run(&shared, poll_interval, &shutdown))
                    .catch_unwind()
                    .await;

                if run.is_ok() || shutdown.is_cancelled() {
                    break;
                }

                tracing::error!("replenisher loop panicked, restarting");

                // keep a persistent fault from spinning
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(*poll_interval) => {}
                }
            }

            tracing::debug!("replenisher stopped");
        })
    } // end method spawn

    async fn run(shared: &SharedWindow, poll_interval: PollInterval, shutdown: &CancellationToken) {
        let mut interval = tokio::time::interval(*poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    shared.replenish_at(Instant::now());
                }
            }
        }
    } // end method run
} // end impl Replenisher
