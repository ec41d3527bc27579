use crate::{
    client_utils::{bearer_headers, send_json},
    ServiceResult, TextModel, TextRequest, TextResponse,
};
use reqwest::Client;
use serde::Serialize;

const PROVIDER: &str = "gateway";

/// HTTP client for the text-generation service.
///
/// The wire contract is a single JSON POST: the request carries the system
/// instructions, the prompt text, an output bound, and a temperature; the
/// response carries the generated content and a finish reason. The finish
/// reason is returned as-is — deciding what a truncated response means is
/// the caller's job.
pub struct TextGateway {
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
}

impl TextGateway {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_id: model_id.into(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequestBody<'a> {
    model: &'a str,
    #[serde(flatten)]
    request: &'a TextRequest,
}

#[async_trait::async_trait]
impl TextModel for TextGateway {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, request: TextRequest) -> ServiceResult<TextResponse> {
        send_json(
            &self.client,
            &format!("{}/v1/generate", self.base_url),
            &GenerateRequestBody {
                model: &self.model_id,
                request: &request,
            },
            bearer_headers(&self.api_key, PROVIDER)?,
        )
        .await
    }
}
