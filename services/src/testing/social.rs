use crate::{ServiceError, ServiceResult, SocialArchive, SocialPost};
use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

#[derive(Default)]
struct MockSocialArchiveState {
    mocked_search_results: VecDeque<ServiceResult<Vec<String>>>,
    mocked_validate_results: VecDeque<ServiceResult<bool>>,
    mocked_fetch_results: VecDeque<ServiceResult<Option<SocialPost>>>,
    tracked_queries: Vec<String>,
    tracked_validate_urls: Vec<String>,
    tracked_fetch_urls: Vec<String>,
}

/// A mock social-post archive that tracks calls per method and yields
/// predefined results.
#[derive(Default)]
pub struct MockSocialArchive {
    state: Mutex<MockSocialArchiveState>,
}

impl MockSocialArchive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockSocialArchiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue_search(&self, result: ServiceResult<Vec<String>>) -> &Self {
        self.lock().mocked_search_results.push_back(result);
        self
    }

    pub fn enqueue_validate(&self, result: ServiceResult<bool>) -> &Self {
        self.lock().mocked_validate_results.push_back(result);
        self
    }

    pub fn enqueue_fetch(&self, result: ServiceResult<Option<SocialPost>>) -> &Self {
        self.lock().mocked_fetch_results.push_back(result);
        self
    }

    #[must_use]
    pub fn tracked_queries(&self) -> Vec<String> {
        self.lock().tracked_queries.clone()
    }

    #[must_use]
    pub fn tracked_validate_urls(&self) -> Vec<String> {
        self.lock().tracked_validate_urls.clone()
    }

    #[must_use]
    pub fn tracked_fetch_urls(&self) -> Vec<String> {
        self.lock().tracked_fetch_urls.clone()
    }
}

#[async_trait::async_trait]
impl SocialArchive for MockSocialArchive {
    async fn search(&self, query: &str, _max_results: usize) -> ServiceResult<Vec<String>> {
        let mut state = self.lock();
        state.tracked_queries.push(query.to_string());
        state.mocked_search_results.pop_front().ok_or_else(|| {
            ServiceError::Invariant("mock", "no mocked search results available".to_string())
        })?
    }

    async fn validate(&self, url: &str) -> ServiceResult<bool> {
        let mut state = self.lock();
        state.tracked_validate_urls.push(url.to_string());
        state.mocked_validate_results.pop_front().ok_or_else(|| {
            ServiceError::Invariant("mock", "no mocked validate results available".to_string())
        })?
    }

    async fn fetch(&self, url: &str) -> ServiceResult<Option<SocialPost>> {
        let mut state = self.lock();
        state.tracked_fetch_urls.push(url.to_string());
        state.mocked_fetch_results.pop_front().ok_or_else(|| {
            ServiceError::Invariant("mock", "no mocked fetch results available".to_string())
        })?
    }
}
