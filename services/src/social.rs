use crate::{
    client_utils::{bearer_headers, send_json},
    ServiceResult, SocialPost,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

const PROVIDER: &str = "social_archive";

/// The social-post archive peer.
#[async_trait::async_trait]
pub trait SocialArchive: Send + Sync {
    /// Search the archive. Returns post URLs, most relevant first.
    async fn search(&self, query: &str, max_results: usize) -> ServiceResult<Vec<String>>;
    /// Whether the post behind the URL still exists.
    async fn validate(&self, url: &str) -> ServiceResult<bool>;
    /// Fetch the full post. `None` means the post could not be retrieved
    /// from any configured source.
    async fn fetch(&self, url: &str) -> ServiceResult<Option<SocialPost>>;
}

/// Archive client with a primary and an optional secondary data source.
/// `fetch` falls back to the secondary source when the primary fails or
/// returns nothing; `search` and `validate` only ever hit the primary.
pub struct HttpSocialArchive {
    client: Client,
    primary_url: String,
    secondary_url: Option<String>,
    api_key: String,
}

#[derive(Serialize)]
struct SearchRequestBody<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Serialize)]
struct UrlRequestBody<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponseBody {
    exists: bool,
}

#[derive(Deserialize)]
struct FetchResponseBody {
    #[serde(default)]
    post: Option<SocialPost>,
}

impl HttpSocialArchive {
    #[must_use]
    pub fn new(primary_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            primary_url: primary_url.into(),
            secondary_url: None,
            api_key: api_key.into(),
        }
    }

    /// Configure a secondary source consulted when a primary fetch fails.
    #[must_use]
    pub fn with_secondary(mut self, secondary_url: impl Into<String>) -> Self {
        self.secondary_url = Some(secondary_url.into());
        self
    }

    async fn fetch_from(&self, base_url: &str, url: &str) -> ServiceResult<Option<SocialPost>> {
        let body: FetchResponseBody = send_json(
            &self.client,
            &format!("{base_url}/v1/posts/fetch"),
            &UrlRequestBody { url },
            bearer_headers(&self.api_key, PROVIDER)?,
        )
        .await?;
        Ok(body.post)
    }
}

#[async_trait::async_trait]
impl SocialArchive for HttpSocialArchive {
    async fn search(&self, query: &str, max_results: usize) -> ServiceResult<Vec<String>> {
        let body: SearchResponseBody = send_json(
            &self.client,
            &format!("{}/v1/posts/search", self.primary_url),
            &SearchRequestBody { query, max_results },
            bearer_headers(&self.api_key, PROVIDER)?,
        )
        .await?;
        Ok(body.results)
    }

    async fn validate(&self, url: &str) -> ServiceResult<bool> {
        let body: ValidateResponseBody = send_json(
            &self.client,
            &format!("{}/v1/posts/validate", self.primary_url),
            &UrlRequestBody { url },
            bearer_headers(&self.api_key, PROVIDER)?,
        )
        .await?;
        Ok(body.exists)
    }

    async fn fetch(&self, url: &str) -> ServiceResult<Option<SocialPost>> {
        let primary = self.fetch_from(&self.primary_url, url).await;
        match (&primary, &self.secondary_url) {
            (Ok(Some(_)), _) | (_, None) => primary,
            (Ok(None), Some(secondary)) => self.fetch_from(secondary, url).await,
            (Err(err), Some(secondary)) => {
                warn!(url, error = %err, "primary social source failed, trying secondary");
                self.fetch_from(secondary, url).await
            }
        }
    }
}
