//! Sanity HTTP query API adapter.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::content::{ContentError, ContentStore, ContentStoreConfig, QueryParams};

use super::error::InfraError;

const SOURCE: &str = "infra::sanity";
const MAX_ERROR_BODY: usize = 512;

/// [`ContentStore`] backed by `GET /v{apiVersion}/data/query/{dataset}`.
#[derive(Clone, Debug)]
pub struct SanityStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl SanityStore {
    pub fn new(config: &ContentStoreConfig) -> Result<Self, InfraError> {
        let endpoint = config.query_endpoint().map_err(|err| {
            InfraError::configuration(format!("invalid content store endpoint: {err}"))
        })?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| InfraError::configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone().filter(|token| !token.trim().is_empty()),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("funguy/", env!("CARGO_PKG_VERSION"))
    }

    fn request_url(&self, query: &str, params: &QueryParams) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params.iter() {
                pairs.append_pair(&format!("${name}"), &value.to_json());
            }
        }
        url
    }
}

#[async_trait]
impl ContentStore for SanityStore {
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Value, ContentError> {
        let started_at = Instant::now();
        let mut request = self.client.get(self.request_url(query, params));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ContentError::transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ContentError::transport(err.to_string()))?;
        metrics::histogram!("funguy_content_fetch_ms")
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                return Err(store_error(envelope.error));
            }
            let mut message = String::from_utf8_lossy(&bytes).into_owned();
            message.truncate(floor_char_boundary(&message, MAX_ERROR_BODY));
            return Err(ContentError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            return Err(store_error(envelope.error));
        }
        let envelope: QueryEnvelope =
            serde_json::from_slice(&bytes).map_err(ContentError::Decode)?;
        debug!(
            target = SOURCE,
            server_ms = envelope.ms,
            params = params.len(),
            "Content query completed"
        );
        Ok(envelope.result)
    }
}

fn store_error(body: ErrorBody) -> ContentError {
    let description = body
        .description
        .or(body.kind)
        .unwrap_or_else(|| "unknown query error".to_string());
    ContentError::store(description)
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
    if text.len() <= max {
        return text.len();
    }
    (0..=max)
        .rev()
        .find(|index| text.is_char_boundary(*index))
        .unwrap_or(0)
}
