//! Durable queue of writes that could not be delivered.
//!
//! A record exists in the queue until its replay succeeds or the server
//! rejects it outright. Iteration order is insertion order, because later
//! writes may depend on earlier ones (create before update).

mod memory;
mod record;
mod store;

pub use memory::MemoryQueueStore;
pub use record::{DiscardedRequest, NewQueuedRequest, QueuedRequest};
pub use store::{QueueStore, SqliteQueueStore};
