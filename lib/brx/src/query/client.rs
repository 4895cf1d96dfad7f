use std::any::{Any, type_name};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use super::QueryKey;
use crate::{Error, Result};

/// Type-erased cache entry.
#[derive(Clone)]
pub struct CachedValue {
    value: Arc<dyn Any + Send + Sync>,
    stale_time: Duration,
    epoch: u64,
}

impl CachedValue {
    fn new<T: Send + Sync + 'static>(value: T, stale_time: Duration, epoch: u64) -> Self {
        Self {
            value: Arc::new(value),
            stale_time,
            epoch,
        }
    }

    fn downcast<T: Clone + 'static>(&self, key: &QueryKey) -> Result<T> {
        self.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| {
                Error::validation(
                    key.to_string(),
                    format!("cached value is not a {}", type_name::<T>()),
                )
            })
    }

    /// How long the entry stays fresh.
    #[must_use]
    pub const fn stale_time(&self) -> Duration {
        self.stale_time
    }
}

impl std::fmt::Debug for CachedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedValue")
            .field("stale_time", &self.stale_time)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

/// Invalidation history: the epoch at which each prefix was last invalidated.
///
/// An entry whose fetch started before the latest invalidation of one of its
/// prefixes is stale, even when it landed in the cache afterwards.
#[derive(Default)]
struct Epochs {
    current: AtomicU64,
    invalidated: Mutex<HashMap<QueryKey, u64>>,
}

impl Epochs {
    fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    fn bump(&self, prefix: &QueryKey) {
        let epoch = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.invalidated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(prefix.clone(), epoch);
    }

    fn invalidated_at(&self, key: &QueryKey) -> u64 {
        self.invalidated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix))
            .map(|(_, epoch)| *epoch)
            .max()
            .unwrap_or_default()
    }

    fn is_outdated(&self, key: &QueryKey, entry: &CachedValue) -> bool {
        entry.epoch < self.invalidated_at(key)
    }
}

/// A fresh entry lives for its own stale time, counted from its last write.
struct StaleAfter;

impl Expiry<QueryKey, CachedValue> for StaleAfter {
    fn expire_after_create(
        &self,
        _key: &QueryKey,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.stale_time)
    }

    fn expire_after_update(
        &self,
        _key: &QueryKey,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.stale_time)
    }
}

/// Shared cache behind every query and mutation binding.
///
/// Cloning is cheap: clones share the same cache.
#[derive(Clone)]
pub struct QueryClient {
    cache: Cache<QueryKey, CachedValue>,
    default_stale_time: Duration,
    epochs: Arc<Epochs>,
    mutations: Arc<Mutex<HashMap<QueryKey, usize>>>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.cache.entry_count())
            .field("default_stale_time", &self.default_stale_time)
            .finish_non_exhaustive()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    /// Default freshness window of a cached result.
    pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);

    /// Default maximum number of cached entries.
    pub const DEFAULT_MAX_CAPACITY: u64 = 1_000;

    /// Create a client with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a client builder.
    #[must_use]
    pub fn builder() -> QueryClientBuilder {
        QueryClientBuilder::default()
    }

    /// Stale time used when a query does not set one.
    #[must_use]
    pub const fn default_stale_time(&self) -> Duration {
        self.default_stale_time
    }

    /// Return the fresh cached value of `key`, or run `fetch` and cache its result.
    ///
    /// Concurrent calls for the same absent key share one `fetch`. Failures
    /// are returned to every waiter and are not cached. A result whose fetch
    /// overlapped an invalidation of `key` is discarded and fetched again.
    ///
    /// # Errors
    ///
    /// Returns the error of `fetch`, or [`Error::Validation`] if the entry
    /// cached under `key` holds another type.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        fetch: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>> + Send,
    {
        loop {
            let epoch = self.epochs.current();
            let init = async {
                debug!(key = %key, "query cache miss");
                fetch()
                    .await
                    .map(|value| CachedValue::new(value, stale_time, epoch))
            };

            let entry = self
                .cache
                .try_get_with(key.clone(), init)
                .await
                .map_err(Arc::unwrap_or_clone)?;

            if !self.epochs.is_outdated(key, &entry) {
                return entry.downcast(key);
            }
            debug!(key = %key, "query invalidated while fetching, refetching");
            self.cache.invalidate(key).await;
        }
    }

    /// The fresh cached value of `key`, if any.
    pub async fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.cache.get(key).await?;
        if self.epochs.is_outdated(key, &entry) {
            return None;
        }
        entry.downcast(key).ok()
    }

    /// Replace the cached value of `key`, fresh for the default stale time.
    pub async fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        self.cache
            .insert(
                key,
                CachedValue::new(value, self.default_stale_time, self.epochs.current()),
            )
            .await;
    }

    /// Drop every entry whose key starts with `prefix`, including results of
    /// fetches still in flight.
    pub async fn invalidate(&self, prefix: &QueryKey) {
        self.epochs.bump(prefix);
        let matching: Vec<_> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();

        debug!(prefix = %prefix, count = matching.len(), "invalidating queries");
        for key in matching {
            self.cache.invalidate(key.as_ref()).await;
        }
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.epochs.bump(&QueryKey::default());
        self.cache.invalidate_all();
    }

    /// Number of mutations in flight whose key starts with `prefix`, or all of
    /// them when `prefix` is `None`.
    #[must_use]
    pub fn is_mutating(&self, prefix: Option<&QueryKey>) -> usize {
        self.mutations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(key, _)| prefix.is_none_or(|prefix| key.starts_with(prefix)))
            .map(|(_, count)| count)
            .sum()
    }

    pub(super) fn begin_mutation(&self, key: &QueryKey) -> MutationGuard {
        *self
            .mutations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default() += 1;

        MutationGuard {
            mutations: Arc::clone(&self.mutations),
            key: key.clone(),
        }
    }
}

/// Decrements the in-flight counter of a mutation when dropped.
pub(super) struct MutationGuard {
    mutations: Arc<Mutex<HashMap<QueryKey, usize>>>,
    key: QueryKey,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        let mut mutations = self
            .mutations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = mutations.get_mut(&self.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                mutations.remove(&self.key);
            }
        }
    }
}

/// Builder for [`QueryClient`].
#[derive(Debug, Clone)]
pub struct QueryClientBuilder {
    max_capacity: u64,
    default_stale_time: Duration,
}

impl Default for QueryClientBuilder {
    fn default() -> Self {
        Self {
            max_capacity: QueryClient::DEFAULT_MAX_CAPACITY,
            default_stale_time: QueryClient::DEFAULT_STALE_TIME,
        }
    }
}

impl QueryClientBuilder {
    /// Maximum number of cached entries.
    #[must_use]
    pub const fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Stale time of queries that do not set one.
    #[must_use]
    pub const fn default_stale_time(mut self, stale_time: Duration) -> Self {
        self.default_stale_time = stale_time;
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> QueryClient {
        let cache = Cache::builder()
            .max_capacity(self.max_capacity)
            .expire_after(StaleAfter)
            .build();

        QueryClient {
            cache,
            default_stale_time: self.default_stale_time,
            epochs: Arc::default(),
            mutations: Arc::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};

    use super::*;
    use crate::{ApiError, query_key};

    #[tokio::test]
    async fn fresh_entry_is_served_from_cache() {
        let client = QueryClient::new();
        let calls = AtomicUsize::new(0);
        let key = query_key!["posts", 1];

        for _ in 0..3 {
            let value: u32 = client
                .fetch_query(&key, Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .expect("value");
            check!(value == 42);
        }

        check!(calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let client = QueryClient::new();
        let key = query_key!["posts"];

        let result: Result<u32> = client
            .fetch_query(&key, Duration::from_secs(60), || async {
                Err(ApiError::new("boom", 500).into())
            })
            .await;
        let_assert!(Err(Error::Api(err)) = result);
        check!(err.status() == 500);

        check!(client.get_query_data::<u32>(&key).await.is_none());

        let value: u32 = client
            .fetch_query(&key, Duration::from_secs(60), || async { Ok(7) })
            .await
            .expect("second attempt");
        check!(value == 7);
    }

    #[tokio::test]
    async fn concurrent_fetches_are_coalesced() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = query_key!["tasks"];

        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(vec![1_u8, 2, 3])
            }
        };

        let (first, second) = tokio::join!(
            client.fetch_query(&key, Duration::from_secs(60), fetch),
            client.fetch_query(&key, Duration::from_secs(60), fetch),
        );

        check!(first.expect("first") == vec![1, 2, 3]);
        check!(second.expect("second") == vec![1, 2, 3]);
        check!(calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn invalidate_uses_prefixes() {
        let client = QueryClient::new();
        client.set_query_data(query_key!["posts", 1], 1_u32).await;
        client.set_query_data(query_key!["posts", 5], 5_u32).await;
        client.set_query_data(query_key!["tasks"], 0_u32).await;

        client.invalidate(&query_key!["posts"]).await;

        check!(client.get_query_data::<u32>(&query_key!["posts", 1]).await.is_none());
        check!(client.get_query_data::<u32>(&query_key!["posts", 5]).await.is_none());
        check!(client.get_query_data::<u32>(&query_key!["tasks"]).await == Some(0));
    }

    #[tokio::test]
    async fn invalidation_beats_a_fetch_in_flight() {
        let client = QueryClient::new();
        let server_version = AtomicUsize::new(1);
        let calls = AtomicUsize::new(0);
        let key = query_key!["tasks"];

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            let seen = server_version.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(seen)
        };

        let (during, ()) = tokio::join!(
            client.fetch_query(&key, Duration::from_secs(60), fetch),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                server_version.store(2, Ordering::SeqCst);
                client.invalidate(&query_key!["tasks"]).await;
            },
        );
        check!(during.expect("refetched") == 2);

        let after: usize = client
            .fetch_query(&key, Duration::from_secs(60), fetch)
            .await
            .expect("cached");
        check!(after == 2);
        check!(client.get_query_data::<usize>(&key).await == Some(2));
        check!(calls.load(Ordering::SeqCst) == 2);
    }

    #[tokio::test]
    async fn invalidate_all_drops_fetches_in_flight() {
        let client = QueryClient::new();
        let key = query_key!["posts", 5];
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(call)
        };

        let (during, ()) = tokio::join!(
            client.fetch_query(&key, Duration::from_secs(60), fetch),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                client.invalidate_all();
            },
        );
        check!(during.expect("refetched") == 1);
    }

    #[tokio::test]
    async fn type_mismatch_is_reported() {
        let client = QueryClient::new();
        let key = query_key!["posts"];
        client.set_query_data(key.clone(), "text".to_string()).await;

        let result: Result<u32> = client
            .fetch_query(&key, Duration::from_secs(60), || async { Ok(1) })
            .await;
        let_assert!(Err(Error::Validation { path, .. }) = result);
        check!(path == r#"["posts"]"#);
    }

    #[test]
    fn mutation_guard_counts() {
        let client = QueryClient::new();
        let key = query_key!["tasks", "create"];

        let first = client.begin_mutation(&key);
        let second = client.begin_mutation(&key);
        check!(client.is_mutating(None) == 2);
        check!(client.is_mutating(Some(&query_key!["tasks"])) == 2);
        check!(client.is_mutating(Some(&query_key!["posts"])) == 0);

        drop(first);
        check!(client.is_mutating(None) == 1);
        drop(second);
        check!(client.is_mutating(None) == 0);
    }
}
