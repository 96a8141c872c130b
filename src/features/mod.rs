//! The offline layer.
//!
//! - `queue`: durable FIFO of writes that could not be delivered
//! - `cache`: named response caches and their lifecycle
//! - `intercept`: request classification and cache strategies
//! - `sync`: replay, client notification, background worker

pub mod cache;
pub mod intercept;
pub mod queue;
pub mod sync;
