//! Content Client: parameterized queries against the hosted document store
//! with a per-call revalidation policy.

mod client;
mod config;
mod params;

use std::num::NonZeroU64;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use client::ContentClient;
pub use config::{
    ContentConfigError, ContentStoreConfig, DEFAULT_API_VERSION, DEFAULT_DATASET,
    configure_content_store, content_store_config,
};
pub use params::{ParamValue, QueryParams, parse_param};

/// Raw query execution against a document store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run `query` with `params` and return the `result` member of the
    /// response, `Value::Null` when the query matched nothing.
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Value, ContentError>;
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content store request failed: {message}")]
    Transport { message: String },
    #[error("content store responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content store rejected the query: {description}")]
    Store { description: String },
    #[error("content result did not match the expected shape")]
    Decode(#[source] serde_json::Error),
}

impl ContentError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn store(description: impl Into<String>) -> Self {
        Self::Store {
            description: description.into(),
        }
    }
}

/// How long a cached query result may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Revalidate {
    /// Cache indefinitely.
    #[default]
    Default,
    /// Always fetch; never read or write the cache.
    Never,
    /// Serve cached results for this many seconds, then serve stale while a
    /// single background refresh runs.
    After(NonZeroU64),
}

impl Revalidate {
    /// `None` maps to [`Revalidate::Default`], zero to [`Revalidate::Never`].
    pub fn from_seconds(seconds: Option<u64>) -> Self {
        match seconds {
            None => Self::Default,
            Some(seconds) => NonZeroU64::new(seconds).map_or(Self::Never, Self::After),
        }
    }

    pub fn window(self) -> Option<Duration> {
        match self {
            Self::After(seconds) => Some(Duration::from_secs(seconds.get())),
            Self::Default | Self::Never => None,
        }
    }

    pub fn is_fresh(self, age: Duration) -> bool {
        match self {
            Self::Default => true,
            Self::Never => false,
            Self::After(seconds) => age < Duration::from_secs(seconds.get()),
        }
    }

    /// `Cache-Control` value for pages rendered under this policy.
    pub fn cache_control(self) -> String {
        match self {
            Self::Default => "public, s-maxage=31536000, stale-while-revalidate".to_string(),
            Self::Never => "private, no-cache, no-store, max-age=0, must-revalidate".to_string(),
            Self::After(seconds) => format!("public, s-maxage={seconds}, stale-while-revalidate"),
        }
    }
}

impl From<Option<u64>> for Revalidate {
    fn from(seconds: Option<u64>) -> Self {
        Self::from_seconds(seconds)
    }
}
