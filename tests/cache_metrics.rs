use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use funguy::application::content::{
    ContentClient, ContentError, ContentStore, QueryParams, Revalidate,
};
use funguy::cache::{CacheConfig, QueryCache, QueryKey};
use metrics_util::debugging::DebuggingRecorder;
use serde_json::{Value, json};

#[derive(Default)]
struct ToggleStore {
    fail: AtomicBool,
}

#[async_trait]
impl ContentStore for ToggleStore {
    async fn query(&self, query: &str, _params: &QueryParams) -> Result<Value, ContentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ContentError::transport("connection reset"));
        }
        Ok(json!({ "query": query }))
    }
}

async fn fetch(client: &ContentClient, query: &str, revalidate: Revalidate) -> Value {
    client
        .fetch(query, &QueryParams::new(), revalidate)
        .await
        .expect("fetch should succeed")
}

#[tokio::test(start_paused = true)]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = Arc::new(ToggleStore::default());
    let cache = Arc::new(QueryCache::new(&CacheConfig {
        enabled: true,
        capacity: 1,
    }));
    let client = ContentClient::new(store.clone(), Arc::clone(&cache));
    let sixty = Revalidate::from_seconds(Some(60));

    // bypass, miss, hit
    fetch(&client, "*[_type == \"post\"]", Revalidate::Never).await;
    fetch(&client, "*[_type == \"post\"]", sixty).await;
    fetch(&client, "*[_type == \"post\"]", sixty).await;

    // stale serve with a failing background refresh
    store.fail.store(true, Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(61)).await;
    fetch(&client, "*[_type == \"post\"]", sixty).await;
    let key = QueryKey::new("*[_type == \"post\"]", &QueryParams::new());
    for _ in 0..100 {
        if !cache.is_refreshing(&key) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(!cache.is_refreshing(&key));

    // capacity eviction
    store.fail.store(false, Ordering::SeqCst);
    fetch(&client, "*[_type == \"tekTip\"]", sixty).await;
    assert_eq!(cache.len(), 1);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "funguy_content_cache_bypass_total",
        "funguy_content_cache_miss_total",
        "funguy_content_cache_hit_total",
        "funguy_content_cache_stale_total",
        "funguy_content_cache_refresh_failed_total",
        "funguy_content_cache_evict_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
