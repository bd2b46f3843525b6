//! In-memory cache of assembled responses.
//!
//! Caches full `UnifiedResponse`s keyed by (rounded coordinate, date,
//! sorted dataset set), with TTL expiry, LRU eviction under capacity
//! pressure, and singleflight deduplication: at most one concurrent
//! computation per key, with all other requesters receiving the
//! in-flight computation's result.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::future::{BoxFuture, Future, FutureExt, Shared};
use lru::LruCache;
use ocean_common::{Coordinate, OceanError, OceanResult};
use tokio::sync::{Mutex, RwLock};

use crate::types::UnifiedResponse;

/// Coordinate precision for cache keys: 4 decimal places (~11 m).
const KEY_PRECISION: f64 = 10_000.0;

/// Cache key for assembled responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ResponseKey {
    /// Latitude quantized to 4 decimal places.
    lat_q: i64,
    /// Longitude quantized to 4 decimal places.
    lon_q: i64,
    /// Requested date.
    pub date: NaiveDate,
    /// Sorted, deduplicated dataset set.
    pub datasets: Vec<String>,
}

impl ResponseKey {
    /// Derive the key from an already-normalized coordinate.
    pub fn new(coordinate: &Coordinate, date: NaiveDate, datasets: &[String]) -> Self {
        let mut datasets = datasets.to_vec();
        datasets.sort();
        datasets.dedup();

        Self {
            lat_q: (coordinate.latitude * KEY_PRECISION).round() as i64,
            lon_q: (coordinate.longitude * KEY_PRECISION).round() as i64,
            date,
            datasets,
        }
    }

    /// String form used by the LRU cache.
    fn to_string_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.lat_q,
            self.lon_q,
            self.date,
            self.datasets.join("+")
        )
    }
}

/// Cached response entry.
struct CachedResponse {
    response: Arc<UnifiedResponse>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Statistics for the response cache.
#[derive(Debug, Default, Clone)]
pub struct ResponseCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub computes: u64,
    pub expired: u64,
    pub entries: usize,
}

impl ResponseCacheStats {
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

type SharedCompute = Shared<BoxFuture<'static, Result<Arc<UnifiedResponse>, ComputeFailed>>>;

/// Cloneable carrier for the only non-domain failure mode: the
/// spawned compute task aborting.
#[derive(Debug, Clone)]
struct ComputeFailed(String);

/// LRU + TTL cache of assembled responses with stampede control.
pub struct ResponseCache {
    cache: Arc<RwLock<LruCache<String, CachedResponse>>>,
    in_flight: Arc<Mutex<HashMap<String, SharedCompute>>>,
    stats: Arc<RwLock<ResponseCacheStats>>,
    ttl: Duration,
    capacity: usize,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` responses, each
    /// expiring `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cache_size = NonZeroUsize::new(capacity.max(1)).expect("capacity must be > 0");

        Self {
            cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(RwLock::new(ResponseCacheStats::default())),
            ttl,
            capacity,
        }
    }

    /// Return the cached response for `key`, or run `compute` to
    /// produce and cache it. Concurrent callers for the same key
    /// share a single computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: ResponseKey,
        compute: F,
    ) -> OceanResult<Arc<UnifiedResponse>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UnifiedResponse> + Send + 'static,
    {
        let string_key = key.to_string_key();

        if let Some(response) = self.lookup(&string_key).await {
            return Ok(response);
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().await;

            // A compute finishing while we waited for the lock has
            // already populated the cache.
            if let Some(response) = self.lookup_silent(&string_key).await {
                return Ok(response);
            }

            if let Some(existing) = in_flight.get(&string_key) {
                existing.clone()
            } else {
                self.stats.write().await.computes += 1;

                let cache = self.cache.clone();
                let in_flight_map = self.in_flight.clone();
                let stats = self.stats.clone();
                let ttl = self.ttl;
                let task_key = string_key.clone();
                let fut = compute();

                let task = tokio::spawn(async move {
                    let response = Arc::new(fut.await);

                    {
                        let mut cache = cache.write().await;
                        cache.push(
                            task_key.clone(),
                            CachedResponse {
                                response: response.clone(),
                                inserted_at: Instant::now(),
                                ttl,
                            },
                        );
                        stats.write().await.entries = cache.len();
                    }

                    in_flight_map.lock().await.remove(&task_key);
                    response
                });

                let shared: SharedCompute = async move {
                    task.await
                        .map_err(|e| ComputeFailed(format!("compute task failed: {}", e)))
                }
                .boxed()
                .shared();

                in_flight.insert(string_key.clone(), shared.clone());
                shared
            }
        };

        shared
            .await
            .map_err(|ComputeFailed(msg)| OceanError::Internal(msg))
    }

    /// Cache lookup with hit/miss accounting. Expired entries count
    /// as misses and are dropped lazily.
    async fn lookup(&self, key: &str) -> Option<Arc<UnifiedResponse>> {
        let result = self.lookup_silent(key).await;
        let mut stats = self.stats.write().await;
        match &result {
            Some(_) => stats.hits += 1,
            None => stats.misses += 1,
        }
        result
    }

    async fn lookup_silent(&self, key: &str) -> Option<Arc<UnifiedResponse>> {
        let mut cache = self.cache.write().await;
        match cache.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.response.clone()),
            Some(_) => {
                cache.pop(key);
                self.stats.write().await.expired += 1;
                None
            }
            None => None,
        }
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> ResponseCacheStats {
        let mut stats = self.stats.read().await.clone();
        stats.entries = self.cache.read().await.len();
        stats
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of cached responses.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}
