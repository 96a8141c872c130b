//! HTTP values and the network transport.

mod message;
mod transport;

pub use message::{Headers, Method, Request, Response};
#[cfg(test)]
pub use transport::MockTransport;
pub use transport::{HttpTransport, Transport, TransportError};
