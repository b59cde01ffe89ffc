//! Submission of one document to the registration service.
//!
//! Nothing here knows about rate limiting: executors assume a slot is
//! already held.

mod document;
pub use document::*;

mod http_submission_executor;
pub use http_submission_executor::*;

mod submission_executor;
pub use submission_executor::*;
