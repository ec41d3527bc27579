use crate::{
    client_utils::{bearer_headers, send_json},
    RenderRequest, RenderResponse, ServiceResult,
};
use reqwest::Client;

const PROVIDER: &str = "renderer";

/// The image/chart-rendering peer.
///
/// A non-success response is a normal outcome, not an error: the service
/// reports it could not produce the artifact and the caller falls back.
#[async_trait::async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(&self, request: RenderRequest) -> ServiceResult<RenderResponse>;
}

pub struct HttpRenderer {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRenderer {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactRenderer for HttpRenderer {
    async fn render(&self, request: RenderRequest) -> ServiceResult<RenderResponse> {
        send_json(
            &self.client,
            &format!("{}/v1/render", self.base_url),
            &request,
            bearer_headers(&self.api_key, PROVIDER)?,
        )
        .await
    }
}
