use std::{future::Future, time::Duration};

/// Sequential executor for rate-limited peers.
///
/// Runs tasks one at a time with a fixed delay between consecutive tasks
/// (none before the first). The delay policy lives here, not in the
/// caller's control flow, so tests can run with a zero delay.
pub struct FetchQueue {
    delay: Duration,
}

impl FetchQueue {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn run<I, F, Fut, T>(&self, items: I, mut task: F) -> Vec<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut results = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            results.push(task(item).await);
        }
        results
    }
}
