use std::time::Duration;

use once_cell::sync::OnceCell;
use thiserror::Error;
use url::Url;

pub const DEFAULT_DATASET: &str = "production";
pub const DEFAULT_API_VERSION: &str = "2023-05-03";

/// Connection settings for the hosted content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentStoreConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
    pub request_timeout: Duration,
    /// Replaces the derived `https://{project}.api.sanity.io` origin.
    pub api_base_url: Option<Url>,
}

impl ContentStoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: DEFAULT_DATASET.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            use_cdn: false,
            token: None,
            request_timeout: Duration::from_secs(10),
            api_base_url: None,
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_api_base_url(mut self, url: Url) -> Self {
        self.api_base_url = Some(url);
        self
    }

    /// Origin serving the query API for this project.
    pub fn api_origin(&self) -> Result<Url, url::ParseError> {
        if let Some(base) = &self.api_base_url {
            return Ok(base.clone());
        }
        let host = if self.use_cdn { "apicdn" } else { "api" };
        Url::parse(&format!("https://{}.{host}.sanity.io/", self.project_id))
    }

    /// Full query endpoint: `{origin}/v{apiVersion}/data/query/{dataset}`.
    pub fn query_endpoint(&self) -> Result<Url, url::ParseError> {
        let version = format!("v{}", self.api_version.trim_start_matches('v'));
        let mut endpoint = self.api_origin()?;
        endpoint
            .path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend([version.as_str(), "data", "query", self.dataset.as_str()]);
        Ok(endpoint)
    }
}

#[derive(Debug, Error)]
pub enum ContentConfigError {
    #[error("content store already configured")]
    AlreadyConfigured,
}

static CONTENT_STORE_CONFIG: OnceCell<ContentStoreConfig> = OnceCell::new();

/// Install the process-wide content store configuration. Only the first call
/// succeeds.
pub fn configure_content_store(config: ContentStoreConfig) -> Result<(), ContentConfigError> {
    CONTENT_STORE_CONFIG
        .set(config)
        .map_err(|_| ContentConfigError::AlreadyConfigured)
}

pub fn content_store_config() -> Option<&'static ContentStoreConfig> {
    CONTENT_STORE_CONFIG.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_switches_between_api_and_cdn_hosts() {
        let mut config = ContentStoreConfig::new("abc123");
        assert_eq!(
            config.query_endpoint().expect("endpoint").as_str(),
            "https://abc123.api.sanity.io/v2023-05-03/data/query/production"
        );

        config.use_cdn = true;
        config.api_version = "v2024-01-01".to_string();
        assert_eq!(
            config.query_endpoint().expect("endpoint").as_str(),
            "https://abc123.apicdn.sanity.io/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn base_url_override_keeps_path_layout() {
        let base = Url::parse("http://127.0.0.1:9999/").expect("base url");
        let config = ContentStoreConfig::new("abc123")
            .with_dataset("staging")
            .with_api_base_url(base);
        assert_eq!(
            config.query_endpoint().expect("endpoint").as_str(),
            "http://127.0.0.1:9999/v2023-05-03/data/query/staging"
        );
    }

    #[test]
    fn dataset_is_a_single_encoded_path_segment() {
        let endpoint = ContentStoreConfig::new("proj")
            .with_dataset("stage?evil=1")
            .query_endpoint()
            .expect("endpoint");
        assert_eq!(endpoint.query(), None);
        assert_eq!(
            endpoint.as_str(),
            "https://proj.api.sanity.io/v2023-05-03/data/query/stage%3Fevil=1"
        );
    }
}
