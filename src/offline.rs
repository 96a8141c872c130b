//! Wiring of the offline layer from configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Paths};
use crate::error::PantryError;
use crate::features::cache::{self, CacheNames, CacheStorage};
use crate::features::intercept::{Interceptor, Scope};
use crate::features::queue::{QueueStore, SqliteQueueStore};
use crate::features::sync::{ClientNotifier, SyncCoordinator, SyncTrigger};
use crate::http::{HttpTransport, Transport};
use crate::storage::SharedDatabase;

const LEASE_MARGIN: Duration = Duration::from_secs(60);

/// Every component of the offline layer, sharing one database and one
/// transport.
pub struct OfflineLayer {
    config: Config,
    transport: Arc<dyn Transport>,
    queue: Arc<dyn QueueStore>,
    caches: CacheStorage,
    names: CacheNames,
    scope: Scope,
    coordinator: Arc<SyncCoordinator>,
}

impl OfflineLayer {
    /// Build the layer over the on-disk database and the HTTP transport.
    ///
    /// The database is not opened until first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn open(config: Config, paths: &Paths) -> Result<Self, PantryError> {
        let transport = HttpTransport::new(config.sync.request_timeout())?;
        let db = Arc::new(SharedDatabase::at(&paths.database));
        Self::with_parts(config, db, Arc::new(transport))
    }

    /// Build the layer over explicit parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_parts(
        config: Config,
        db: Arc<SharedDatabase>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, PantryError> {
        let scope = Scope::from_config(&config.api)?;
        let queue: Arc<dyn QueueStore> = Arc::new(SqliteQueueStore::new(Arc::clone(&db)));
        let caches = CacheStorage::new(db);
        let names = CacheNames::for_version(config.cache.version);
        // A lease must outlive the slowest single send
        let lease_ttl = config.sync.request_timeout() + LEASE_MARGIN;
        let coordinator = Arc::new(
            SyncCoordinator::new(
                Arc::clone(&transport),
                Arc::clone(&queue),
                Arc::new(ClientNotifier::new()),
            )
            .with_lease_ttl(lease_ttl),
        );

        Ok(Self {
            config,
            transport,
            queue,
            caches,
            names,
            scope,
            coordinator,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn queue(&self) -> &dyn QueueStore {
        self.queue.as_ref()
    }

    #[must_use]
    pub const fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    #[must_use]
    pub const fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    #[must_use]
    pub const fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// An interceptor over the current cache generation.
    #[must_use]
    pub fn interceptor(&self) -> Interceptor {
        Interceptor::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.queue),
            &self.caches,
            &self.names,
            self.scope.clone(),
        )
    }

    /// An interceptor that asks `trigger` for a replay after queueing.
    #[must_use]
    pub fn interceptor_with_trigger(&self, trigger: SyncTrigger) -> Interceptor {
        self.interceptor().with_trigger(trigger)
    }

    /// Precache the configured static assets.
    ///
    /// # Errors
    ///
    /// Returns an error if any asset cannot be fetched or stored.
    pub fn install(&self) -> Result<usize, PantryError> {
        let cache = self.caches.open(&self.names.static_assets);
        cache::install(self.transport.as_ref(), &cache, &self.config.cache.precache)
    }

    /// Delete caches from other generations.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache storage cannot be read or written.
    pub fn activate(&self) -> Result<Vec<String>, PantryError> {
        cache::activate(&self.caches, &self.names)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::features::sync::{SyncMessage, SyncWorker};
    use crate::http::{Method, MockTransport, Request, Response, TransportError};

    fn config() -> Config {
        let mut config = Config::default();
        config.api.base_url = "https://db.food.test".to_string();
        config
    }

    #[test]
    fn test_offline_write_then_replay() {
        let db = Arc::new(SharedDatabase::in_memory());
        let online = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&online);

        let mut transport = MockTransport::new();
        transport.expect_send().returning(move |_| {
            if flag.load(Ordering::SeqCst) {
                Ok(Response::new(201, ""))
            } else {
                Err(TransportError("offline".to_string()))
            }
        });

        let layer = OfflineLayer::with_parts(config(), db, Arc::new(transport)).unwrap();
        let interceptor = layer.interceptor();

        let write = Request::parse(Method::Post, "https://db.food.test/rest/v1/lists").unwrap();
        assert_eq!(interceptor.handle_fetch(write).unwrap().status, 202);
        assert_eq!(layer.queue().len().unwrap(), 1);

        online.store(true, Ordering::SeqCst);
        let report = layer.coordinator().drain().unwrap();

        assert_eq!(report.replayed, 1);
        assert!(layer.queue().is_empty().unwrap());
    }

    #[test]
    fn test_queued_write_wakes_worker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        // The live attempt fails, the replay lands
        let mut transport = MockTransport::new();
        transport.expect_send().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(TransportError("offline".to_string()))
            } else {
                Ok(Response::new(201, ""))
            }
        });

        let layer = OfflineLayer::with_parts(
            config(),
            Arc::new(SharedDatabase::in_memory()),
            Arc::new(transport),
        )
        .unwrap();
        // Polling alone would not run a pass within the test
        let worker =
            SyncWorker::spawn(Arc::clone(layer.coordinator()), Duration::from_secs(3600)).unwrap();
        let rx = layer.coordinator().notifier().subscribe();
        let interceptor = layer.interceptor_with_trigger(worker.trigger());

        let write = Request::parse(Method::Post, "https://db.food.test/rest/v1/lists").unwrap();
        assert_eq!(interceptor.handle_fetch(write).unwrap().status, 202);

        let message = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            message,
            SyncMessage::SyncComplete {
                replayed: 1,
                discarded: 0,
                remaining: 0,
            }
        );
        assert!(layer.queue().is_empty().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        worker.shutdown().unwrap();
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.api.bypass = vec!["[".to_string()];

        let result = OfflineLayer::with_parts(
            config,
            Arc::new(SharedDatabase::in_memory()),
            Arc::new(MockTransport::new()),
        );
        assert!(matches!(result, Err(PantryError::Config(_))));
    }

    #[test]
    fn test_cache_generation_follows_config() {
        let mut config = config();
        config.cache.version = 7;

        let layer = OfflineLayer::with_parts(
            config,
            Arc::new(SharedDatabase::in_memory()),
            Arc::new(MockTransport::new()),
        )
        .unwrap();

        assert_eq!(layer.cache_names().api, "pantry-api-v7");
        assert!(layer.activate().unwrap().is_empty());
    }
}
