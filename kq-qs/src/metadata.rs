//! Title lookup
//!
//! Resolves a display title for a submitted link through the provider's
//! oEmbed endpoint. Failures are reported as `Error::MetadataLookup`; the
//! store treats every failure as "use the media id".

use async_trait::async_trait;
use kq_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Public oEmbed endpoint
pub const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";
const USER_AGENT: &str = concat!("karaoke-queue/", env!("CARGO_PKG_VERSION"));

/// Source of display titles
#[async_trait]
pub trait TitleLookup: Send + Sync {
    /// Title for `source_url`, or `Error::MetadataLookup`
    async fn lookup_title(&self, source_url: &str) -> Result<String>;
}

/// Lookup that always fails, used when lookups are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTitleLookup;

#[async_trait]
impl TitleLookup for NoopTitleLookup {
    async fn lookup_title(&self, _source_url: &str) -> Result<String> {
        Err(Error::MetadataLookup("lookups disabled".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: Option<String>,
}

/// oEmbed HTTP client
pub struct OEmbedClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl OEmbedClient {
    /// Create a client for the public endpoint
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoint(OEMBED_ENDPOINT, timeout)
    }

    /// Create a client for a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TitleLookup for OEmbedClient {
    async fn lookup_title(&self, source_url: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("url", source_url), ("format", "json")],
        )
        .map_err(|e| Error::MetadataLookup(format!("Bad endpoint: {}", e)))?;

        tracing::debug!(url = %url, "Querying oEmbed");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::MetadataLookup(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::MetadataLookup(format!("oEmbed returned {}", status)));
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::MetadataLookup(format!("Parse error: {}", e)))?;

        body.title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MetadataLookup("Response has no title".to_string()))
    }
}
