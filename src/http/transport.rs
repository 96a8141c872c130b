//! Network transport.
//!
//! A transport either produces a response (whatever its status) or fails
//! without one. Only the second case counts as "offline" to the rest of the
//! crate. Once a status line has arrived the server has acted on the
//! request, so a body that breaks off afterwards still yields a response.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::message::{Headers, Method, Request, Response};
use crate::error::PantryError;

/// The request produced no response at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for PantryError {
    fn from(e: TransportError) -> Self {
        Self::Network(e.0)
    }
}

/// Sends requests to the network.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received.
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, PantryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pantry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PantryError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

const fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .map_err(|e| TransportError(format!("{} {}: {e}", request.method, request.url)))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = match response.bytes() {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!(
                    method = %request.method,
                    url = %request.url,
                    status,
                    error = %e,
                    "response body cut off, keeping status"
                );
                Vec::new()
            },
        };

        debug!(method = %request.method, url = %request.url, status, "network response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
