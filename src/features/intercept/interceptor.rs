//! The request interceptor and its cache strategies.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::classify::{classify, Scope, Strategy};
use crate::error::PantryError;
use crate::features::cache::{CacheNames, CacheStorage, ResponseCache};
use crate::features::queue::{NewQueuedRequest, QueueStore};
use crate::features::sync::SyncTrigger;
use crate::http::{Request, Response, Transport};

/// Status of the stand-in response returned for a queued write.
pub const QUEUED_STATUS: u16 = 202;

/// Header carrying the queue id on a stand-in response.
pub const QUEUED_HEADER: &str = "x-pantry-queued";

/// Sits in front of every request the client makes.
pub struct Interceptor {
    transport: Arc<dyn Transport>,
    queue: Arc<dyn QueueStore>,
    static_cache: ResponseCache,
    api_cache: ResponseCache,
    scope: Scope,
    trigger: Option<SyncTrigger>,
}

impl Interceptor {
    /// Create an interceptor over the current cache generation.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        queue: Arc<dyn QueueStore>,
        caches: &CacheStorage,
        names: &CacheNames,
        scope: Scope,
    ) -> Self {
        Self {
            transport,
            queue,
            static_cache: caches.open(&names.static_assets),
            api_cache: caches.open(&names.api),
            scope,
            trigger: None,
        }
    }

    /// Ask `trigger` for a replay whenever a write is queued.
    #[must_use]
    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Returns `PantryError::Network` when the network is unreachable and the
    /// strategy has nothing to fall back on. Error statuses from the server
    /// are returned as responses, not errors.
    pub fn handle_fetch(&self, request: Request) -> Result<Response, PantryError> {
        let strategy = classify(&request, &self.scope);
        debug!(method = %request.method, url = %request.url, %strategy, "intercepted request");

        match strategy {
            Strategy::PassThrough => Ok(self.transport.send(&request)?),
            Strategy::CacheFirst => self.cache_first(&request),
            Strategy::NetworkFirstCacheFallback => self.network_first(&request),
            Strategy::QueueOnFailure => self.queue_on_failure(&request),
        }
    }

    fn cache_first(&self, request: &Request) -> Result<Response, PantryError> {
        match self.static_cache.get(request) {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {},
            Err(e) => warn!(url = %request.url, error = %e, "static cache read failed"),
        }

        let response = self.transport.send(request)?;
        if response.is_success() {
            store_copy(&self.static_cache, request, &response);
        }
        Ok(response)
    }

    fn network_first(&self, request: &Request) -> Result<Response, PantryError> {
        match self.transport.send(request) {
            Ok(response) => {
                if response.is_success() {
                    store_copy(&self.api_cache, request, &response);
                }
                Ok(response)
            },
            Err(network_err) => match self.api_cache.get(request) {
                Ok(Some(cached)) => {
                    info!(url = %request.url, "offline, serving cached API response");
                    Ok(cached)
                },
                Ok(None) => Err(network_err.into()),
                Err(e) => {
                    warn!(url = %request.url, error = %e, "API cache read failed");
                    Err(network_err.into())
                },
            },
        }
    }

    fn queue_on_failure(&self, request: &Request) -> Result<Response, PantryError> {
        let network_err = match self.transport.send(request) {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let queued = match NewQueuedRequest::from_request(request)
            .and_then(|record| self.queue.enqueue(record))
        {
            Ok(queued) => queued,
            Err(e) => {
                error!(url = %request.url, error = %e, "could not queue offline write");
                return Err(network_err.into());
            },
        };

        info!(
            id = queued.id,
            method = %queued.method,
            url = %queued.url,
            "queued offline write"
        );

        if let Some(trigger) = &self.trigger {
            trigger.request_sync();
        }

        Ok(queued_response(queued.id))
    }
}

/// The stand-in response for a write accepted into the queue.
#[must_use]
pub fn queued_response(id: i64) -> Response {
    Response::json(
        QUEUED_STATUS,
        &json!({ "offline": true, "queued": true, "id": id }),
    )
    .with_header(QUEUED_HEADER, id.to_string())
}

// Caching is best effort; the live response is returned either way
fn store_copy(cache: &ResponseCache, request: &Request, response: &Response) {
    if let Err(e) = cache.put(request, response) {
        warn!(cache = cache.name(), url = %request.url, error = %e, "cache write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::queue::{MemoryQueueStore, SqliteQueueStore};
    use crate::http::{Method, MockTransport, TransportError};
    use crate::storage::SharedDatabase;
    use url::Url;

    const API: &str = "https://db.food.test";

    struct Fixture {
        queue: Arc<MemoryQueueStore>,
        caches: CacheStorage,
        names: CacheNames,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                queue: Arc::new(MemoryQueueStore::new()),
                caches: CacheStorage::new(Arc::new(SharedDatabase::in_memory())),
                names: CacheNames::for_version(1),
            }
        }

        fn interceptor(&self, transport: MockTransport) -> Interceptor {
            let scope = Scope::new(&Url::parse(API).unwrap(), &[]).unwrap();
            Interceptor::new(
                Arc::new(transport),
                self.queue.clone(),
                &self.caches,
                &self.names,
                scope,
            )
        }
    }

    fn offline() -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| Err(TransportError("connection refused".to_string())));
        transport
    }

    fn answering(status: u16, body: &'static str) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(move |_| Ok(Response::new(status, body)));
        transport
    }

    fn request(method: Method, url: &str) -> Request {
        Request::parse(method, url).unwrap()
    }

    #[test]
    fn test_cache_first_stores_and_serves() {
        let fixture = Fixture::new();
        let asset = request(Method::Get, "https://app.food.test/index.js");

        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(Response::new(200, "console.log(1)")));
        let interceptor = fixture.interceptor(transport);

        let first = interceptor.handle_fetch(asset.clone()).unwrap();
        let second = interceptor.handle_fetch(asset).unwrap();

        assert_eq!(first.text(), "console.log(1)");
        assert_eq!(second, first);
    }

    #[test]
    fn test_cache_first_skips_unsuccessful_responses() {
        let fixture = Fixture::new();
        let asset = request(Method::Get, "https://app.food.test/missing.png");

        let interceptor = fixture.interceptor(answering(404, "nope"));
        assert_eq!(interceptor.handle_fetch(asset.clone()).unwrap().status, 404);

        let cache = fixture.caches.open(&fixture.names.static_assets);
        assert!(cache.get(&asset).unwrap().is_none());
    }

    #[test]
    fn test_cache_first_miss_offline_fails() {
        let fixture = Fixture::new();
        let interceptor = fixture.interceptor(offline());

        let result = interceptor.handle_fetch(request(Method::Get, "https://app.food.test/"));
        assert!(matches!(result, Err(PantryError::Network(_))));
    }

    #[test]
    fn test_network_first_refreshes_cache() {
        let fixture = Fixture::new();
        let read = request(Method::Get, "https://db.food.test/rest/v1/lists");

        let interceptor = fixture.interceptor(answering(200, r#"[{"id":1}]"#));
        interceptor.handle_fetch(read.clone()).unwrap();

        let cache = fixture.caches.open(&fixture.names.api);
        assert_eq!(cache.get(&read).unwrap().unwrap().text(), r#"[{"id":1}]"#);
        // API reads never land in the static cache
        let static_cache = fixture.caches.open(&fixture.names.static_assets);
        assert!(static_cache.get(&read).unwrap().is_none());
    }

    #[test]
    fn test_network_first_falls_back_offline() {
        let fixture = Fixture::new();
        let read = request(Method::Get, "https://db.food.test/rest/v1/lists");

        fixture
            .interceptor(answering(200, "[1,2]"))
            .handle_fetch(read.clone())
            .unwrap();

        let response = fixture.interceptor(offline()).handle_fetch(read).unwrap();
        assert_eq!(response.text(), "[1,2]");
    }

    #[test]
    fn test_network_first_offline_without_cache_fails() {
        let fixture = Fixture::new();
        let result = fixture
            .interceptor(offline())
            .handle_fetch(request(Method::Get, "https://db.food.test/rest/v1/lists"));

        assert!(matches!(result, Err(PantryError::Network(_))));
    }

    #[test]
    fn test_network_first_matches_exact_request() {
        let fixture = Fixture::new();
        fixture
            .interceptor(answering(200, "all"))
            .handle_fetch(request(Method::Get, "https://db.food.test/rest/v1/lists"))
            .unwrap();

        let result = fixture
            .interceptor(offline())
            .handle_fetch(request(Method::Get, "https://db.food.test/rest/v1/lists?id=eq.1"));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_success_is_returned_unmodified() {
        let fixture = Fixture::new();
        let interceptor = fixture.interceptor(answering(201, r#"{"id":9}"#));

        let response = interceptor
            .handle_fetch(request(Method::Post, "https://db.food.test/rest/v1/lists"))
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.text(), r#"{"id":9}"#);
        assert!(fixture.queue.is_empty().unwrap());
    }

    #[test]
    fn test_write_server_error_is_not_queued() {
        let fixture = Fixture::new();
        let interceptor = fixture.interceptor(answering(503, "unavailable"));

        let response = interceptor
            .handle_fetch(request(Method::Patch, "https://db.food.test/rest/v1/lists"))
            .unwrap();

        assert_eq!(response.status, 503);
        assert!(fixture.queue.is_empty().unwrap());
    }

    #[test]
    fn test_offline_write_is_queued() {
        let fixture = Fixture::new();
        let interceptor = fixture.interceptor(offline());
        let write = request(Method::Post, "https://db.food.test/rest/v1/lists")
            .with_header("authorization", "Bearer session")
            .with_body(r#"{"name":"Groceries"}"#);

        let response = interceptor.handle_fetch(write).unwrap();

        assert_eq!(response.status, QUEUED_STATUS);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["offline"], true);
        assert_eq!(response.headers.get("content-type").unwrap(), "application/json");

        let queued = fixture.queue.list_all().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].headers.get("authorization").unwrap(), "Bearer session");
        assert_eq!(queued[0].body, r#"{"name":"Groceries"}"#);
        assert_eq!(response.headers.get(QUEUED_HEADER).unwrap(), &queued[0].id.to_string());
    }

    #[test]
    fn test_offline_writes_queue_in_issue_order() {
        let fixture = Fixture::new();
        let interceptor = fixture.interceptor(offline());

        for url in [
            "https://db.food.test/lists",
            "https://db.food.test/lists/1/items",
            "https://db.food.test/lists/1",
        ] {
            interceptor.handle_fetch(request(Method::Post, url)).unwrap();
        }

        let urls: Vec<_> = fixture.queue.list_all().unwrap().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://db.food.test/lists",
                "https://db.food.test/lists/1/items",
                "https://db.food.test/lists/1",
            ]
        );
    }

    #[test]
    fn test_unavailable_store_surfaces_network_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let broken = Arc::new(SqliteQueueStore::new(Arc::new(SharedDatabase::at(
            temp_dir.path(),
        ))));
        let caches = CacheStorage::new(Arc::new(SharedDatabase::in_memory()));
        let scope = Scope::new(&Url::parse(API).unwrap(), &[]).unwrap();
        let interceptor = Interceptor::new(
            Arc::new(offline()),
            broken,
            &caches,
            &CacheNames::for_version(1),
            scope,
        );

        let result =
            interceptor.handle_fetch(request(Method::Delete, "https://db.food.test/rest/v1/lists"));

        match result {
            Err(PantryError::Network(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn test_pass_through_is_not_cached() {
        let fixture = Fixture::new();
        let interceptor = fixture.interceptor(answering(200, "ok"));
        let put = request(Method::Put, "https://db.food.test/storage/v1/object/photo.jpg");

        assert_eq!(interceptor.handle_fetch(put).unwrap().status, 200);
        assert!(fixture.queue.is_empty().unwrap());
        assert!(fixture.caches.names().unwrap().is_empty());
    }
}
