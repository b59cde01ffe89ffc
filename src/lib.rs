#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod admission;
pub use admission::*;

mod submission;
pub use submission::*;

mod gateway;
pub use gateway::*;

mod error;
pub use error::*;

mod common;
pub use common::{AdmissionStats, Capacity, PollInterval, WindowDuration};

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests;
