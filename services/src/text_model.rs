use crate::{ServiceResult, TextRequest, TextResponse};

/// A text-generation peer. One call, one response; streaming is not part of
/// the contract. Callers must check `TextResponse::finish_reason` before
/// trusting structured output.
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    fn provider(&self) -> &'static str;
    fn model_id(&self) -> String;
    async fn generate(&self, request: TextRequest) -> ServiceResult<TextResponse>;
}
