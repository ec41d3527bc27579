use crate::{
    FinishReason, ServiceError, ServiceResult, TextModel, TextRequest, TextResponse,
};
use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

/// Result for a mocked `generate` call: either a response or an error.
pub enum MockTextResult {
    Response(TextResponse),
    Error(ServiceError),
}

impl MockTextResult {
    /// A successful response with the given content and a `stop` finish.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Response(TextResponse {
            content: content.into(),
            finish_reason: FinishReason::Stop,
        })
    }

    /// A response whose output was cut off before completion.
    #[must_use]
    pub fn truncated(content: impl Into<String>) -> Self {
        Self::Response(TextResponse {
            content: content.into(),
            finish_reason: FinishReason::Truncated,
        })
    }

    #[must_use]
    pub fn error(error: ServiceError) -> Self {
        Self::Error(error)
    }
}

impl From<TextResponse> for MockTextResult {
    fn from(response: TextResponse) -> Self {
        Self::Response(response)
    }
}

#[derive(Default)]
struct MockTextModelState {
    mocked_results: VecDeque<MockTextResult>,
    tracked_requests: Vec<TextRequest>,
}

/// A mock text-generation model that tracks requests and yields predefined
/// results.
#[derive(Default)]
pub struct MockTextModel {
    state: Mutex<MockTextModelState>,
}

impl MockTextModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTextModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a mocked generate result.
    pub fn enqueue<R: Into<MockTextResult>>(&self, result: R) -> &Self {
        self.lock().mocked_results.push_back(result.into());
        self
    }

    /// Retrieve the tracked requests accumulated so far.
    #[must_use]
    pub fn tracked_requests(&self) -> Vec<TextRequest> {
        self.lock().tracked_requests.clone()
    }

    /// Clear tracked requests and any unconsumed enqueued results.
    pub fn restore(&self) {
        let mut state = self.lock();
        state.mocked_results.clear();
        state.tracked_requests.clear();
    }
}

#[async_trait::async_trait]
impl TextModel for MockTextModel {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model_id(&self) -> String {
        "mock-text-model".to_string()
    }

    async fn generate(&self, request: TextRequest) -> ServiceResult<TextResponse> {
        let mut state = self.lock();
        state.tracked_requests.push(request);

        let result = state.mocked_results.pop_front().ok_or_else(|| {
            ServiceError::Invariant("mock", "no mocked generate results available".to_string())
        })?;

        match result {
            MockTextResult::Response(response) => Ok(response),
            MockTextResult::Error(error) => Err(error),
        }
    }
}
