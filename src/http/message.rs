//! Request and response values passed through the offline layer.
//!
//! These are plain owned values so that a request can be classified, stored
//! in the queue, and replayed later without holding any transport state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PantryError;

/// Header map. Names are stored lowercase.
pub type Headers = BTreeMap<String, String>;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Canonical uppercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether a failed request with this method may be queued for replay.
    #[must_use]
    pub const fn is_queueable(&self) -> bool {
        matches!(self, Self::Post | Self::Patch | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            other => Err(PantryError::InvalidRequest(format!(
                "Unsupported method: {other}"
            ))),
        }
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<String>,
}

impl Request {
    /// Create a request with no headers and no body.
    #[must_use]
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Create a `GET` request.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Parse `url` and create a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not absolute or malformed.
    pub fn parse(method: Method, url: &str) -> Result<Self, PantryError> {
        let url = Url::parse(url)
            .map_err(|e| PantryError::InvalidRequest(format!("Invalid URL '{url}': {e}")))?;
        Ok(Self::new(method, url))
    }

    /// Add a header. The name is lowercased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Key used to match this request in a response cache.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }
}

/// A response received from the network, a cache, or synthesized locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Create a JSON response.
    #[must_use]
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string()).with_header("content-type", "application/json")
    }

    /// Add a header. The name is lowercased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_queueable() {
        assert!(Method::Post.is_queueable());
        assert!(Method::Patch.is_queueable());
        assert!(Method::Delete.is_queueable());
        assert!(!Method::Get.is_queueable());
        assert!(!Method::Put.is_queueable());
    }

    #[test]
    fn test_method_serde() {
        let json = serde_json::to_string(&Method::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }

    #[test]
    fn test_request_headers_lowercased() {
        let request = Request::parse(Method::Post, "https://api.test/rest/v1/lists")
            .unwrap()
            .with_header("Authorization", "Bearer t")
            .with_body("{}");

        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer t");
        assert_eq!(request.body.as_deref(), Some("{}"));
        assert_eq!(request.cache_key(), "https://api.test/rest/v1/lists");
    }

    #[test]
    fn test_request_parse_rejects_relative() {
        assert!(Request::parse(Method::Get, "/rest/v1/lists").is_err());
    }

    #[test]
    fn test_response_status_classes() {
        assert!(Response::new(204, "").is_success());
        assert!(Response::new(404, "").is_client_error());
        assert!(Response::new(503, "").is_server_error());
        assert!(!Response::new(302, "").is_success());
    }
}
