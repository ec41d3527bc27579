use crate::{ArtifactRenderer, RenderRequest, RenderResponse, ServiceError, ServiceResult};
use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

#[derive(Default)]
struct MockRendererState {
    mocked_results: VecDeque<ServiceResult<RenderResponse>>,
    tracked_requests: Vec<RenderRequest>,
}

/// A mock rendering service that tracks requests and yields predefined
/// results.
#[derive(Default)]
pub struct MockRenderer {
    state: Mutex<MockRendererState>,
}

impl MockRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockRendererState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a successful render pointing at the given artifact URL.
    pub fn enqueue_artifact(&self, artifact_url: impl Into<String>) -> &Self {
        self.enqueue(Ok(RenderResponse {
            success: true,
            artifact_url: Some(artifact_url.into()),
        }))
    }

    /// Enqueue a response where the service reports it could not render.
    pub fn enqueue_unsuccessful(&self) -> &Self {
        self.enqueue(Ok(RenderResponse {
            success: false,
            artifact_url: None,
        }))
    }

    pub fn enqueue(&self, result: ServiceResult<RenderResponse>) -> &Self {
        self.lock().mocked_results.push_back(result);
        self
    }

    #[must_use]
    pub fn tracked_requests(&self) -> Vec<RenderRequest> {
        self.lock().tracked_requests.clone()
    }
}

#[async_trait::async_trait]
impl ArtifactRenderer for MockRenderer {
    async fn render(&self, request: RenderRequest) -> ServiceResult<RenderResponse> {
        let mut state = self.lock();
        state.tracked_requests.push(request);
        state.mocked_results.pop_front().ok_or_else(|| {
            ServiceError::Invariant("mock", "no mocked render results available".to_string())
        })?
    }
}
