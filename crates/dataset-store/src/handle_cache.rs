//! Bounded LRU cache of opened dataset handles.
//!
//! Opening a harmonized document is the expensive step of an
//! extraction, so opened handles are kept resident up to a configured
//! capacity with strict least-recently-used eviction.
//!
//! Stampede control: concurrent `acquire` calls for one uncached
//! (dataset, date, source) key perform exactly one underlying load.
//! The load runs in a spawned task whose outcome is distributed to
//! all waiters through a shared future; a caller that times out stops
//! waiting and clears the in-flight slot so later callers may retry,
//! while the spawned load keeps running and still populates the cache
//! if it eventually succeeds.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use tokio::sync::{Mutex, RwLock};

use crate::handle::DatasetHandle;
use crate::store::{DataSource, HarmonizedStore, StoreError, StoreResult};

/// Cache key: one handle per (dataset, date, source tier).
pub type HandleKey = (String, NaiveDate, DataSource);

type SharedLoad = Shared<BoxFuture<'static, StoreResult<Arc<DatasetHandle>>>>;

/// Statistics for the handle cache.
#[derive(Debug, Default, Clone)]
pub struct HandleCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub timeouts: u64,
    pub evictions: u64,
    pub entries: usize,
    pub resident_bytes: u64,
}

impl HandleCacheStats {
    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Bounded, stampede-safe cache of opened dataset handles.
pub struct HandleCache {
    store: Arc<dyn HarmonizedStore>,
    cache: Arc<RwLock<LruCache<HandleKey, Arc<DatasetHandle>>>>,
    in_flight: Arc<Mutex<HashMap<HandleKey, SharedLoad>>>,
    stats: Arc<RwLock<HandleCacheStats>>,
    load_timeout: Duration,
    capacity: usize,
}

impl HandleCache {
    /// Create a cache over `store` holding at most `capacity` handles,
    /// with each load bounded by `load_timeout`.
    pub fn new(store: Arc<dyn HarmonizedStore>, capacity: usize, load_timeout: Duration) -> Self {
        let cache_size = NonZeroUsize::new(capacity.max(1)).expect("capacity must be > 0");

        Self {
            store,
            cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(RwLock::new(HandleCacheStats::default())),
            load_timeout,
            capacity,
        }
    }

    /// Get the handle for (dataset, date, source), loading on miss.
    ///
    /// File absent maps to `StoreError::Unavailable`, structural
    /// failure to `StoreError::Corrupt`, and a load exceeding the
    /// timeout to `Unavailable` with the in-flight slot cleared.
    pub async fn acquire(
        &self,
        dataset: &str,
        date: NaiveDate,
        source: DataSource,
    ) -> StoreResult<Arc<DatasetHandle>> {
        let key: HandleKey = (dataset.to_string(), date, source);

        if let Some(handle) = self.cache.write().await.get(&key) {
            self.stats.write().await.hits += 1;
            return Ok(handle.clone());
        }

        let load = self.join_or_start_load(&key).await?;

        match tokio::time::timeout(self.load_timeout, load).await {
            Ok(result) => result,
            Err(_) => {
                // Stop waiting; the spawned load continues and will
                // populate the cache on its own if it completes.
                self.in_flight.lock().await.remove(&key);
                self.stats.write().await.timeouts += 1;
                tracing::warn!(
                    dataset,
                    %date,
                    source = source.label(),
                    timeout_ms = self.load_timeout.as_millis() as u64,
                    "handle load timed out"
                );
                Err(StoreError::Unavailable(format!(
                    "{}/{} load timed out after {} ms",
                    dataset,
                    date,
                    self.load_timeout.as_millis()
                )))
            }
        }
    }

    /// Find the in-flight load for `key`, or start one.
    async fn join_or_start_load(&self, key: &HandleKey) -> StoreResult<SharedLoad> {
        let mut in_flight = self.in_flight.lock().await;

        // A load that completed while we waited for the lock has
        // already populated the cache.
        if let Some(handle) = self.cache.write().await.get(key) {
            self.stats.write().await.hits += 1;
            let handle = handle.clone();
            return Ok(async move { Ok(handle) }.boxed().shared());
        }

        self.stats.write().await.misses += 1;

        if let Some(existing) = in_flight.get(key) {
            return Ok(existing.clone());
        }

        let store = self.store.clone();
        let cache = self.cache.clone();
        let in_flight_map = self.in_flight.clone();
        let stats = self.stats.clone();
        let task_key = key.clone();

        let task = tokio::spawn(async move {
            let (dataset, date, source) = (&task_key.0, task_key.1, task_key.2);
            let result = store.load(dataset, date, source).await.map(Arc::new);

            {
                let mut stats = stats.write().await;
                stats.loads += 1;
                if result.is_err() {
                    stats.load_failures += 1;
                }
            }

            if let Ok(handle) = &result {
                let mut cache = cache.write().await;
                if let Some((evicted_key, evicted)) = cache.push(task_key.clone(), handle.clone()) {
                    let mut stats = stats.write().await;
                    // push returns the old value on key re-insert too;
                    // only a different key is a real eviction.
                    if evicted_key != task_key {
                        stats.evictions += 1;
                    }
                    stats.resident_bytes =
                        stats.resident_bytes.saturating_sub(evicted.size_bytes as u64);
                }
                let mut stats = stats.write().await;
                stats.resident_bytes += handle.size_bytes as u64;
                stats.entries = cache.len();
            }

            in_flight_map.lock().await.remove(&task_key);
            result
        });

        let load: SharedLoad = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(StoreError::Io(format!("load task failed: {}", e))),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(key.clone(), load.clone());
        Ok(load)
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> HandleCacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.entries = self.cache.read().await.len();
        stats
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of resident handles.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Drop every resident handle.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        let mut stats = self.stats.write().await;
        stats.entries = 0;
        stats.resident_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HarmonizedDocument;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Store double that counts loads and can delay or fail them.
    struct CountingStore {
        loads: AtomicU64,
        delay: Duration,
        fail: bool,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                loads: AtomicU64::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn load_count(&self) -> u64 {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HarmonizedStore for CountingStore {
        async fn load(
            &self,
            dataset: &str,
            date: NaiveDate,
            source: DataSource,
        ) -> StoreResult<DatasetHandle> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(StoreError::Unavailable(format!("{}/{}", dataset, date)));
            }

            let mut variables = BTreeMap::new();
            variables.insert("sst".to_string(), vec![18.5, 19.0, 19.5]);
            Ok(DatasetHandle::from_document(
                HarmonizedDocument {
                    dataset: dataset.to_string(),
                    date,
                    cells: 3,
                    fill_value: -9999.0,
                    variables,
                    land_mask: None,
                },
                source,
            ))
        }

        async fn available_dates(&self, _dataset: &str) -> StoreResult<Vec<NaiveDate>> {
            Ok(Vec::new())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let store = Arc::new(CountingStore::new());
        let cache = HandleCache::new(store.clone(), 4, Duration::from_secs(1));

        let first = cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .unwrap();
        let second = cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .unwrap();

        assert_eq!(store.load_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquires_trigger_one_load() {
        let store = Arc::new(CountingStore::with_delay(Duration::from_millis(50)));
        let cache = Arc::new(HandleCache::new(
            store.clone(),
            4,
            Duration::from_secs(5),
        ));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache.acquire("sst", date(23), DataSource::Harmonized).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_failure_is_shared() {
        let store = Arc::new(CountingStore::failing());
        let cache = Arc::new(HandleCache::new(
            store.clone(),
            4,
            Duration::from_secs(1),
        ));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache.acquire("sst", date(23), DataSource::Harmonized).await
            }));
        }
        for task in tasks {
            let result = task.await.unwrap();
            assert!(matches!(result, Err(StoreError::Unavailable(_))));
        }
    }

    #[tokio::test]
    async fn test_failed_load_retries_on_next_acquire() {
        let store = Arc::new(CountingStore::failing());
        let cache = HandleCache::new(store.clone(), 4, Duration::from_secs(1));

        assert!(cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .is_err());
        assert!(cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .is_err());

        // Failures are not cached; each acquire retried the store.
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let store = Arc::new(CountingStore::new());
        let cache = HandleCache::new(store.clone(), 3, Duration::from_secs(1));

        for d in 1..=9 {
            cache
                .acquire("sst", date(d), DataSource::Harmonized)
                .await
                .unwrap();
            assert!(cache.len().await <= 3);
        }

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.evictions, 6);
    }

    #[tokio::test]
    async fn test_lru_eviction_order() {
        let store = Arc::new(CountingStore::new());
        let cache = HandleCache::new(store.clone(), 2, Duration::from_secs(1));

        cache
            .acquire("sst", date(1), DataSource::Harmonized)
            .await
            .unwrap();
        cache
            .acquire("sst", date(2), DataSource::Harmonized)
            .await
            .unwrap();
        // Touch date(1) so date(2) becomes the LRU entry.
        cache
            .acquire("sst", date(1), DataSource::Harmonized)
            .await
            .unwrap();
        cache
            .acquire("sst", date(3), DataSource::Harmonized)
            .await
            .unwrap();

        assert_eq!(store.load_count(), 3);
        // date(1) survived the eviction triggered by date(3).
        cache
            .acquire("sst", date(1), DataSource::Harmonized)
            .await
            .unwrap();
        assert_eq!(store.load_count(), 3);
        // date(2) was the least recently used entry and got evicted;
        // re-acquiring it loads again.
        cache
            .acquire("sst", date(2), DataSource::Harmonized)
            .await
            .unwrap();
        assert_eq!(store.load_count(), 4);
    }

    #[tokio::test]
    async fn test_slow_load_times_out_but_still_caches() {
        let store = Arc::new(CountingStore::with_delay(Duration::from_millis(100)));
        let cache = HandleCache::new(store.clone(), 4, Duration::from_millis(10));

        let err = cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(cache.stats().await.timeouts, 1);

        // The abandoned load keeps running and lands in the cache.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.len().await, 1);

        cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .unwrap();
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_sources_are_distinct_entries() {
        let store = Arc::new(CountingStore::new());
        let cache = HandleCache::new(store.clone(), 4, Duration::from_secs(1));

        cache
            .acquire("sst", date(23), DataSource::Harmonized)
            .await
            .unwrap();
        cache
            .acquire("sst", date(23), DataSource::RawDerived)
            .await
            .unwrap();

        assert_eq!(store.load_count(), 2);
        assert_eq!(cache.len().await, 2);
    }
}
