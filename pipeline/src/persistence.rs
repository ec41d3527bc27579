use crate::errors::PipelineError;
use draftforge_services::{Draft, DraftId, DraftStatus, NewDraft, RecordStore};
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, warn};

/// Owns every draft write. The initial save is synchronous and must succeed
/// before the caller learns the draft id; enrichment patches are
/// fire-and-forget and serialized per draft.
///
/// Serialization uses a per-draft async mutex: a patch acquires the lock,
/// reads the latest stored content, applies its transform, and writes the
/// result. Two stages finishing concurrently therefore never overwrite
/// each other's resolved placeholders.
pub struct PersistenceCoordinator {
    store: Arc<dyn RecordStore>,
    locks: Mutex<HashMap<DraftId, Arc<tokio::sync::Mutex<()>>>>,
}

impl PersistenceCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Save the initial draft. This is the hard path: a failure here aborts
    /// the pipeline.
    pub async fn create_draft(&self, draft: NewDraft) -> Result<Draft, PipelineError> {
        Ok(self.store.create_draft(draft).await?)
    }

    /// Patch a draft through an async transform of its latest content.
    ///
    /// Failures are logged and swallowed: by the time a patch runs, the
    /// caller has already been handed the draft id, and a draft that never
    /// gets enriched remains valid and readable.
    pub async fn update_draft<F, Fut>(&self, id: DraftId, transform: F)
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = String>,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let current = match self.store.get_draft(id).await {
            Ok(Some(draft)) => draft.content,
            Ok(None) => {
                warn!(draft_id = %id, "draft disappeared before patch");
                return;
            }
            Err(err) => {
                warn!(draft_id = %id, error = %err, "could not read draft for patch");
                return;
            }
        };

        let updated = transform(current.clone()).await;
        if updated == current {
            debug!(draft_id = %id, "patch produced no changes");
            return;
        }
        if let Err(err) = self.store.update_draft_content(id, updated).await {
            warn!(draft_id = %id, error = %err, "could not write patched draft");
        }
    }

    /// Mark enrichment finished: the draft will not be mutated
    /// automatically anymore.
    pub async fn finalize(&self, id: DraftId) {
        if let Err(err) = self.store.set_draft_status(id, DraftStatus::Ready).await {
            warn!(draft_id = %id, error = %err, "could not finalize draft");
        }
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn lock_for(&self, id: DraftId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_default()
            .clone()
    }
}
