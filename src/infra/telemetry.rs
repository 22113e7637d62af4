use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "funguy_content_cache_hit_total",
            Unit::Count,
            "Content queries answered from a fresh cache entry."
        );
        describe_counter!(
            "funguy_content_cache_miss_total",
            Unit::Count,
            "Content queries fetched inline because no entry was cached."
        );
        describe_counter!(
            "funguy_content_cache_stale_total",
            Unit::Count,
            "Content queries answered from a stale entry while a refresh runs."
        );
        describe_counter!(
            "funguy_content_cache_bypass_total",
            Unit::Count,
            "Content queries that skipped the cache entirely."
        );
        describe_counter!(
            "funguy_content_cache_refresh_failed_total",
            Unit::Count,
            "Background refreshes that failed and kept the stale entry."
        );
        describe_counter!(
            "funguy_content_cache_evict_total",
            Unit::Count,
            "Cached query results evicted due to capacity."
        );
        describe_histogram!(
            "funguy_content_fetch_ms",
            Unit::Milliseconds,
            "Content store round-trip latency in milliseconds."
        );
    });
}
