// Cache de consultas: chave -> último resultado bom, com dedup de requisições
// em andamento e política de retry. Pertence ao AppState, nada global.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::utils::AppError;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Data younger than this is served without refetching.
    pub stale_time: Duration,
    pub retry: u32,
    pub retry_delay: Duration,
    /// Entries nobody read or fetched for this long are dropped by `gc`.
    pub gc_time: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5),
            retry: 3,
            retry_delay: Duration::from_secs(1),
            gc_time: Duration::from_secs(300),
        }
    }
}

/// What a page sees for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot<V> {
    pub data: V,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub error: Option<AppError>,
    pub failure_count: u32,
    pub is_fetching: bool,
}

impl<V: Default> QuerySnapshot<V> {
    /// Snapshot of a query whose key is missing: nothing fetched, nothing to show.
    pub fn disabled() -> Self {
        Self {
            data: V::default(),
            data_updated_at: None,
            error: None,
            failure_count: 0,
            is_fetching: false,
        }
    }
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, AppError>>>;

struct Entry<V> {
    data: Option<V>,
    data_updated_at: Option<DateTime<Utc>>,
    error: Option<AppError>,
    failure_count: u32,
    invalidated: bool,
    in_flight: Option<SharedFetch<V>>,
    last_used: Instant,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            data: None,
            data_updated_at: None,
            error: None,
            failure_count: 0,
            invalidated: false,
            in_flight: None,
            last_used: Instant::now(),
        }
    }
}

pub struct QueryCache<K, V> {
    options: QueryOptions,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `producer` for `key`, or joins the request already in flight for
    /// it. Failures keep the last good data and only record the error.
    pub async fn fetch<F, Fut>(&self, key: K, producer: F) -> Result<V, AppError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, AppError>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.lock();
            let entry = entries.entry(key.clone()).or_default();
            entry.last_used = Instant::now();
            match &entry.in_flight {
                Some(in_flight) => {
                    log::trace!("🔁 Joining in-flight query");
                    in_flight.clone()
                }
                None => {
                    let fut = with_retry(producer, self.options.retry, self.options.retry_delay)
                        .boxed()
                        .shared();
                    entry.in_flight = Some(fut.clone());
                    fut
                }
            }
        };

        let result = shared.clone().await;
        self.settle(&key, &shared, &result);
        result
    }

    /// Disabled for `None`. Otherwise serves fresh data from the cache and
    /// fetches first when the entry is stale, missing or invalidated.
    pub async fn query<F, Fut>(&self, key: Option<K>, producer: F) -> QuerySnapshot<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, AppError>> + Send + 'static,
    {
        let Some(key) = key else {
            return QuerySnapshot::disabled();
        };

        if !self.is_stale(&key, Utc::now()) {
            return self.snapshot(&key);
        }

        if let Err(e) = self.fetch(key.clone(), producer).await {
            log::warn!("⚠️  Query failed, serving last known data: {}", e);
        }
        self.snapshot(&key)
    }

    pub fn snapshot(&self, key: &K) -> QuerySnapshot<V> {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = Instant::now();
                QuerySnapshot {
                    data: entry.data.clone().unwrap_or_default(),
                    data_updated_at: entry.data_updated_at,
                    error: entry.error.clone(),
                    failure_count: entry.failure_count,
                    is_fetching: entry.in_flight.is_some(),
                }
            }
            None => QuerySnapshot::disabled(),
        }
    }

    /// Forces the next `query` for `key` to refetch.
    pub fn invalidate(&self, key: &K) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Forgets `key` entirely. A request still in flight for it finds no
    /// entry when it settles and is dropped.
    pub fn remove(&self, key: &K) {
        self.lock().remove(key);
    }

    /// Drops idle entries (no request in flight, unused for `gc_time`).
    /// Returns how many were removed.
    pub fn gc(&self) -> usize {
        let gc_time = self.options.gc_time;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.in_flight.is_some() || entry.last_used.elapsed() < gc_time);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_stale(&self, key: &K, now: DateTime<Utc>) -> bool {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return true;
        };
        if entry.invalidated {
            return true;
        }
        match entry.data_updated_at {
            Some(updated) => (now - updated)
                .to_std()
                .map_or(false, |age| age >= self.options.stale_time),
            None => true,
        }
    }

    fn settle(&self, key: &K, fetch: &SharedFetch<V>, result: &Result<V, AppError>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };

        // Só quem compartilha a mesma requisição grava; o primeiro limpa.
        let owns = entry
            .in_flight
            .as_ref()
            .map_or(false, |current| current.ptr_eq(fetch));
        if !owns {
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(data) => {
                entry.data = Some(data.clone());
                entry.data_updated_at = Some(Utc::now());
                entry.error = None;
                entry.failure_count = 0;
                entry.invalidated = false;
            }
            Err(e) => {
                entry.error = Some(e.clone());
                entry.failure_count += 1;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, Entry<V>>> {
        // O lock nunca atravessa um await.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exponential backoff: `retry_delay * 2^attempt`, capped at 30s.
pub fn retry_delay_for(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

fn with_retry<V, F, Fut>(
    producer: F,
    retry: u32,
    base_delay: Duration,
) -> impl Future<Output = Result<V, AppError>> + Send + 'static
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, AppError>> + Send + 'static,
{
    async move {
        let mut attempt = 0;
        loop {
            match producer().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < retry && e.is_retryable() => {
                    let delay = retry_delay_for(base_delay, attempt);
                    log::debug!("🔁 Retry {}/{} in {:?}: {}", attempt + 1, retry, delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_retry() -> QueryOptions {
        QueryOptions {
            stale_time: Duration::from_secs(5),
            retry: 0,
            retry_delay: Duration::from_millis(10),
            ..QueryOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_request() {
        let cache: QueryCache<String, Vec<u32>> = QueryCache::new(no_retry());
        let calls = Arc::new(AtomicU32::new(0));

        let producer = {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(vec![1, 2, 3])
                }
            }
        };

        let (a, b) = futures::join!(
            cache.fetch("orders".to_string(), producer.clone()),
            cache.fetch("orders".to_string(), producer)
        );

        assert_eq!(a.unwrap(), vec![1, 2, 3]);
        assert_eq!(b.unwrap(), vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let snapshot = cache.snapshot(&"orders".to_string());
        assert!(snapshot.data_updated_at.is_some());
        assert!(!snapshot.is_fetching);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_known_data() {
        let cache: QueryCache<&'static str, Vec<u32>> = QueryCache::new(no_retry());

        cache.fetch("k", || async { Ok(vec![7]) }).await.unwrap();
        let first = cache.snapshot(&"k");

        let err = cache
            .fetch("k", || async { Err(AppError::Network("offline".into())) })
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Network("offline".into()));

        let snapshot = cache.snapshot(&"k");
        assert_eq!(snapshot.data, vec![7]);
        assert_eq!(snapshot.data_updated_at, first.data_updated_at);
        assert_eq!(snapshot.failure_count, 1);
        assert!(snapshot.error.is_some());

        cache.fetch("k", || async { Ok(vec![8]) }).await.unwrap();
        let recovered = cache.snapshot(&"k");
        assert_eq!(recovered.data, vec![8]);
        assert_eq!(recovered.failure_count, 0);
        assert!(recovered.error.is_none());
    }

    #[tokio::test]
    async fn test_disabled_query_issues_no_request() {
        let cache: QueryCache<String, Vec<u32>> = QueryCache::new(no_retry());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let snapshot = cache
            .query(None, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1])
                }
            })
            .await;

        assert_eq!(snapshot, QuerySnapshot::disabled());
        assert!(snapshot.data.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_serves_fresh_data_and_refetches_after_invalidate() {
        let cache: QueryCache<&'static str, u32> = QueryCache::new(no_retry());
        let calls = Arc::new(AtomicU32::new(0));

        let producer = {
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) }
            }
        };

        assert_eq!(cache.query(Some("k"), producer.clone()).await.data, 1);
        assert_eq!(cache.query(Some("k"), producer.clone()).await.data, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate(&"k");
        assert_eq!(cache.query(Some("k"), producer).await.data, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_only() {
        let options = QueryOptions {
            stale_time: Duration::from_secs(5),
            retry: 3,
            retry_delay: Duration::from_secs(1),
            ..QueryOptions::default()
        };
        let cache: QueryCache<&'static str, u32> = QueryCache::new(options);

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let value = cache
            .fetch("flaky", move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AppError::Network("reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let auth_attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&auth_attempts);
        let err = cache
            .fetch("denied", move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(AppError::Unauthorized("jwt expired".into()))
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(auth_attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let base = Duration::from_secs(1);
        assert_eq!(retry_delay_for(base, 0), Duration::from_secs(1));
        assert_eq!(retry_delay_for(base, 2), Duration::from_secs(4));
        assert_eq!(retry_delay_for(base, 10), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_evicts_idle_keys() {
        let cache: QueryCache<String, u32> = QueryCache::new(no_retry());

        for i in 0..10_000 {
            cache.query(Some(format!("loja-{}", i)), || async { Ok(0) }).await;
        }
        assert_eq!(cache.len(), 10_000);

        // ainda dentro do gc_time: nada sai
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(cache.gc(), 0);

        cache.snapshot(&"loja-7".to_string());
        tokio::time::sleep(Duration::from_secs(250)).await;
        assert_eq!(cache.gc(), 9_999);
        assert_eq!(cache.len(), 1);
        assert!(cache.snapshot(&"loja-7".to_string()).data_updated_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_keeps_entries_with_request_in_flight() {
        let cache = Arc::new(QueryCache::<&'static str, u32>::new(no_retry()));

        let background = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .fetch("lento", || async {
                        tokio::time::sleep(Duration::from_secs(600)).await;
                        Ok(1)
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(400)).await;
        assert_eq!(cache.gc(), 0);
        assert_eq!(cache.len(), 1);
        background.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_key_ignores_late_result() {
        let cache = Arc::new(QueryCache::<&'static str, u32>::new(no_retry()));

        let background = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .fetch("k", || async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok(1)
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.remove(&"k");
        background.await.unwrap().unwrap();

        assert_eq!(cache.len(), 0);
    }
}
