//! Request interception.
//!
//! Every request is classified, then handled by one of three strategies:
//! - cache-first for static assets
//! - network-first with cache fallback for API reads
//! - queue-on-failure for API writes
//!
//! Anything else is forwarded untouched.

mod classify;
mod interceptor;

pub use classify::{classify, Scope, Strategy};
pub use interceptor::{queued_response, Interceptor, QUEUED_HEADER, QUEUED_STATUS};
