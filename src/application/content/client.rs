use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};

use super::{ContentError, ContentStore, QueryParams, Revalidate};

const SOURCE: &str = "application::content::client";

/// Typed, cached access to a [`ContentStore`].
#[derive(Clone)]
pub struct ContentClient {
    store: Arc<dyn ContentStore>,
    cache: Arc<QueryCache>,
}

impl ContentClient {
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<QueryCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Run `query` and decode its result as `T`.
    ///
    /// Use `Option<T>` for single-document queries: a `null` result decodes
    /// to `None`.
    pub async fn fetch<T>(
        &self,
        query: &str,
        params: &QueryParams,
        revalidate: Revalidate,
    ) -> Result<T, ContentError>
    where
        T: DeserializeOwned,
    {
        let value = self.fetch_value(query, params, revalidate).await?;
        T::deserialize(value.as_ref()).map_err(ContentError::Decode)
    }

    /// Run `query` and return the raw JSON result.
    pub async fn fetch_value(
        &self,
        query: &str,
        params: &QueryParams,
        revalidate: Revalidate,
    ) -> Result<Arc<Value>, ContentError> {
        if revalidate == Revalidate::Never || !self.cache.is_enabled() {
            metrics::counter!("funguy_content_cache_bypass_total").increment(1);
            return self.store.query(query, params).await.map(Arc::new);
        }

        let key = QueryKey::new(query, params);
        if let Some(entry) = self.cache.get(&key) {
            let age = entry.age(Instant::now());
            if revalidate.is_fresh(age) {
                metrics::counter!("funguy_content_cache_hit_total").increment(1);
                return Ok(entry.value);
            }

            metrics::counter!("funguy_content_cache_stale_total").increment(1);
            debug!(
                target = SOURCE,
                key = %key,
                age_ms = age.as_millis() as u64,
                "Serving stale query result"
            );
            self.spawn_refresh(key, query, params);
            return Ok(entry.value);
        }

        metrics::counter!("funguy_content_cache_miss_total").increment(1);
        let value = Arc::new(self.store.query(query, params).await?);
        self.cache.put(key, Arc::clone(&value), Instant::now());
        Ok(value)
    }

    fn spawn_refresh(&self, key: QueryKey, query: &str, params: &QueryParams) {
        if !self.cache.begin_refresh(&key) {
            return;
        }
        let marker = RefreshMarker {
            cache: Arc::clone(&self.cache),
            key,
        };

        let store = Arc::clone(&self.store);
        let query = query.to_string();
        let params = params.clone();
        tokio::spawn(async move {
            match store.query(&query, &params).await {
                Ok(value) => marker
                    .cache
                    .put(marker.key.clone(), Arc::new(value), Instant::now()),
                Err(error) => {
                    metrics::counter!("funguy_content_cache_refresh_failed_total").increment(1);
                    warn!(
                        target = SOURCE,
                        key = %marker.key,
                        error = %error,
                        "Background refresh failed; keeping stale result"
                    );
                }
            }
        });
    }
}

/// Clears the in-flight refresh mark on drop, including when the refresh
/// task panics or is cancelled.
struct RefreshMarker {
    cache: Arc<QueryCache>,
    key: QueryKey,
}

impl Drop for RefreshMarker {
    fn drop(&mut self) {
        self.cache.finish_refresh(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::cache::CacheConfig;

    /// Store returning a counter-stamped value on every call.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
        fail: AtomicBool,
        seen: Mutex<Vec<String>>,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentStore for CountingStore {
        async fn query(&self, query: &str, params: &QueryParams) -> Result<Value, ContentError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen
                .lock()
                .expect("seen lock")
                .push(format!("{query} {params}"));
            if self.fail.load(Ordering::SeqCst) {
                return Err(ContentError::transport("connection reset"));
            }
            Ok(json!({ "call": call }))
        }
    }

    fn client(store: &Arc<CountingStore>) -> ContentClient {
        let store: Arc<dyn ContentStore> = store.clone();
        ContentClient::new(store, Arc::new(QueryCache::new(&CacheConfig::default())))
    }

    async fn call_number(client: &ContentClient, revalidate: Revalidate) -> u64 {
        let value: Value = client
            .fetch("*[_type == \"post\"]", &QueryParams::new(), revalidate)
            .await
            .expect("fetch");
        value["call"].as_u64().expect("call number")
    }

    async fn wait_for_refresh(client: &ContentClient) {
        let key = QueryKey::new("*[_type == \"post\"]", &QueryParams::new());
        for _ in 0..100 {
            if !client.cache().is_refreshing(&key) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("background refresh did not finish");
    }

    #[tokio::test]
    async fn never_always_hits_the_store() {
        let store = Arc::new(CountingStore::default());
        let client = client(&store);

        assert_eq!(call_number(&client, Revalidate::Never).await, 1);
        assert_eq!(call_number(&client, Revalidate::Never).await, 2);
        assert_eq!(store.calls(), 2);
        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn default_never_refetches() {
        let store = Arc::new(CountingStore::default());
        let client = client(&store);

        assert_eq!(call_number(&client, Revalidate::Default).await, 1);
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(call_number(&client, Revalidate::Default).await, 1);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn window_serves_cached_then_stale_with_one_refresh() {
        let store = Arc::new(CountingStore::default());
        let client = client(&store);
        let sixty = Revalidate::from_seconds(Some(60));

        assert_eq!(call_number(&client, sixty).await, 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(call_number(&client, sixty).await, 1);
        assert_eq!(store.calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(call_number(&client, sixty).await, 1);
        assert_eq!(call_number(&client, sixty).await, 1);
        wait_for_refresh(&client).await;
        assert_eq!(store.calls(), 2);

        assert_eq!(call_number(&client, sixty).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_stale_entry() {
        let store = Arc::new(CountingStore::default());
        let client = client(&store);
        let sixty = Revalidate::from_seconds(Some(60));

        assert_eq!(call_number(&client, sixty).await, 1);
        store.fail.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(call_number(&client, sixty).await, 1);
        wait_for_refresh(&client).await;
        assert_eq!(store.calls(), 2);
        assert_eq!(client.cache().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_refresh_does_not_block_later_refreshes() {
        /// Panics on its second call only.
        #[derive(Default)]
        struct FlakyStore {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl ContentStore for FlakyStore {
            async fn query(&self, _: &str, _: &QueryParams) -> Result<Value, ContentError> {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                assert_ne!(call, 2, "store crashed mid-refresh");
                Ok(json!({ "call": call }))
            }
        }

        let store = Arc::new(FlakyStore::default());
        let dyn_store: Arc<dyn ContentStore> = store.clone();
        let client = ContentClient::new(
            dyn_store,
            Arc::new(QueryCache::new(&CacheConfig::default())),
        );
        let sixty = Revalidate::from_seconds(Some(60));

        assert_eq!(call_number(&client, sixty).await, 1);
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(call_number(&client, sixty).await, 1);
        wait_for_refresh(&client).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);

        assert_eq!(call_number(&client, sixty).await, 1);
        wait_for_refresh(&client).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert_eq!(call_number(&client, sixty).await, 3);
    }

    #[tokio::test]
    async fn miss_propagates_store_errors() {
        let store = Arc::new(CountingStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let client = client(&store);

        let result: Result<Value, _> = client
            .fetch("*[_type == \"post\"]", &QueryParams::new(), Revalidate::Default)
            .await;
        assert!(matches!(result, Err(ContentError::Transport { .. })));
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn null_result_decodes_to_none_and_params_reach_the_store() {
        #[derive(Default)]
        struct NullStore {
            params: Mutex<Option<QueryParams>>,
        }

        #[async_trait]
        impl ContentStore for NullStore {
            async fn query(&self, _: &str, params: &QueryParams) -> Result<Value, ContentError> {
                *self.params.lock().expect("params lock") = Some(params.clone());
                Ok(Value::Null)
            }
        }

        let store = Arc::new(NullStore::default());
        let dyn_store: Arc<dyn ContentStore> = store.clone();
        let client = ContentClient::new(dyn_store, Arc::new(QueryCache::disabled()));
        let params = QueryParams::new().with("slug", "missing");

        let result: Option<Value> = client
            .fetch("*[slug.current == $slug][0]", &params, Revalidate::Default)
            .await
            .expect("fetch");
        assert!(result.is_none());
        assert_eq!(
            store.params.lock().expect("params lock").as_ref(),
            Some(&params)
        );
    }

    #[tokio::test]
    async fn decode_mismatch_is_reported() {
        let store = Arc::new(CountingStore::default());
        let client = client(&store);
        let result: Result<Vec<String>, _> = client
            .fetch("*[_type == \"post\"]", &QueryParams::new(), Revalidate::Default)
            .await;
        assert!(matches!(result, Err(ContentError::Decode(_))));
    }
}
