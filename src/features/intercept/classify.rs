//! Request classification.
//!
//! Classification is a pure function of the request and the configured
//! scope. It decides which strategy handles a request before anything
//! touches the network.

use std::fmt;

use regex::Regex;
use url::{Origin, Url};

use crate::config::ApiConfig;
use crate::error::PantryError;
use crate::http::{Method, Request};

/// How a request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from the static cache, fetching and storing on a miss.
    CacheFirst,
    /// Fetch, refreshing the API cache; fall back to it when offline.
    NetworkFirstCacheFallback,
    /// Fetch; queue for replay when offline.
    QueueOnFailure,
    /// Forward untouched.
    PassThrough,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirstCacheFallback => "network-first",
            Self::QueueOnFailure => "queue-on-failure",
            Self::PassThrough => "pass-through",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The API origin and the paths that are never cached or queued.
#[derive(Debug, Clone)]
pub struct Scope {
    api_origin: Origin,
    bypass: Vec<Regex>,
}

impl Scope {
    /// Build a scope from the API base URL and bypass path patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a bypass pattern is not a valid regular expression.
    pub fn new(api_base: &Url, bypass: &[String]) -> Result<Self, PantryError> {
        let bypass = bypass
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    PantryError::Config(format!("Invalid bypass pattern '{pattern}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            api_origin: api_base.origin(),
            bypass,
        })
    }

    /// Build a scope from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or a bypass pattern is invalid.
    pub fn from_config(api: &ApiConfig) -> Result<Self, PantryError> {
        Self::new(&api.base_url()?, &api.bypass)
    }

    /// Whether `url` is served by the backend API.
    #[must_use]
    pub fn is_api(&self, url: &Url) -> bool {
        url.origin() == self.api_origin
    }

    /// Whether `url` matches a bypass pattern.
    #[must_use]
    pub fn is_bypassed(&self, url: &Url) -> bool {
        self.bypass.iter().any(|re| re.is_match(url.path()))
    }
}

/// Choose the strategy for a request.
#[must_use]
pub fn classify(request: &Request, scope: &Scope) -> Strategy {
    if !matches!(request.url.scheme(), "http" | "https") {
        return Strategy::PassThrough;
    }
    if scope.is_bypassed(&request.url) {
        return Strategy::PassThrough;
    }

    if scope.is_api(&request.url) {
        match request.method {
            Method::Get => Strategy::NetworkFirstCacheFallback,
            m if m.is_queueable() => Strategy::QueueOnFailure,
            _ => Strategy::PassThrough,
        }
    } else if request.method == Method::Get {
        Strategy::CacheFirst
    } else {
        Strategy::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        let base = Url::parse("https://db.food.test").unwrap();
        Scope::new(&base, &["^/auth/v1/".to_string()]).unwrap()
    }

    fn classify_url(method: Method, url: &str) -> Strategy {
        classify(&Request::parse(method, url).unwrap(), &scope())
    }

    #[test]
    fn test_api_reads_are_network_first() {
        assert_eq!(
            classify_url(Method::Get, "https://db.food.test/rest/v1/products?select=*"),
            Strategy::NetworkFirstCacheFallback
        );
    }

    #[test]
    fn test_api_writes_queue_on_failure() {
        for method in [Method::Post, Method::Patch, Method::Delete] {
            assert_eq!(
                classify_url(method, "https://db.food.test/rest/v1/shopping_items"),
                Strategy::QueueOnFailure
            );
        }
    }

    #[test]
    fn test_other_api_methods_pass_through() {
        assert_eq!(
            classify_url(Method::Put, "https://db.food.test/rest/v1/lists"),
            Strategy::PassThrough
        );
        assert_eq!(
            classify_url(Method::Options, "https://db.food.test/rest/v1/lists"),
            Strategy::PassThrough
        );
    }

    #[test]
    fn test_static_assets_are_cache_first() {
        assert_eq!(
            classify_url(Method::Get, "https://app.food.test/assets/index.js"),
            Strategy::CacheFirst
        );
        assert_eq!(
            classify_url(Method::Post, "https://app.food.test/analytics"),
            Strategy::PassThrough
        );
    }

    #[test]
    fn test_non_network_schemes_pass_through() {
        assert_eq!(
            classify_url(Method::Get, "chrome-extension://abc/script.js"),
            Strategy::PassThrough
        );
        assert_eq!(classify_url(Method::Get, "data:text/plain,hi"), Strategy::PassThrough);
    }

    #[test]
    fn test_bypass_patterns_pass_through() {
        assert_eq!(
            classify_url(Method::Post, "https://db.food.test/auth/v1/token?grant_type=refresh_token"),
            Strategy::PassThrough
        );
    }

    #[test]
    fn test_origin_includes_port() {
        assert_eq!(
            classify_url(Method::Get, "https://db.food.test:8443/rest/v1/products"),
            Strategy::CacheFirst
        );
        assert_eq!(
            classify_url(Method::Get, "https://db.food.test:443/rest/v1/products"),
            Strategy::NetworkFirstCacheFallback
        );
    }

    #[test]
    fn test_invalid_bypass_pattern() {
        let base = Url::parse("https://db.food.test").unwrap();
        assert!(Scope::new(&base, &["(".to_string()]).is_err());
    }
}
