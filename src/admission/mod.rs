//! Fixed-window admission control.
//!
//! The [`AdmissionController`] owns a single window of `capacity` slots. Callers
//! bracket each guarded operation with a [`Slot`]; the controller's background
//! replenisher resets the window to full capacity once per window boundary.
//!
//! # Key Characteristics
//!
//! - **Fixed window:** full refill at each boundary, no continuous refill
//! - **FIFO:** queued callers are served in arrival order
//! - **Leak-free:** slots are released by ownership, on every exit path
//! - **Cancellable:** abandoned waits never consume a slot
//! - **Process-scoped:** state lives in memory and resets on restart
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use docgate::{AdmissionController, AdmissionOptions, Capacity, PollInterval, WindowDuration};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let admission = AdmissionController::new(AdmissionOptions {
//!     window: WindowDuration::try_from(Duration::from_secs(1))?,
//!     capacity: Capacity::try_from(10)?,
//!     poll_interval: Some(PollInterval::try_from(Duration::from_millis(50))?),
//! })?;
//!
//! if let Some(slot) = admission.try_acquire() {
//!     slot.release();
//! }
//! # Ok(())
//! # }
//! ```

mod admission_controller;
pub use admission_controller::*;

mod rate_window;

mod replenisher;

mod slot;
pub use slot::Slot;
