use crate::{
    Draft, DraftId, DraftStatus, ManualProfile, NewDraft, Organization, PreferredCta,
    PreferredLink, ServiceError, ServiceResult, StyleProfile,
};
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use uuid::Uuid;

/// The record store behind the pipeline: drafts keyed by id plus the
/// organization settings tables, which are read-only from this side.
///
/// Draft writes go through `create_draft` / `update_draft_content` /
/// `set_draft_status` only; no other component mutates drafts.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn load_organization(&self, organization_id: &str)
        -> ServiceResult<Option<Organization>>;
    async fn load_style_profile(&self, organization_id: &str)
        -> ServiceResult<Option<StyleProfile>>;
    async fn load_manual_profile(
        &self,
        organization_id: &str,
    ) -> ServiceResult<Option<ManualProfile>>;
    async fn load_preferred_links(&self, organization_id: &str)
        -> ServiceResult<Vec<PreferredLink>>;
    async fn load_preferred_ctas(&self, organization_id: &str)
        -> ServiceResult<Vec<PreferredCta>>;

    async fn create_draft(&self, draft: NewDraft) -> ServiceResult<Draft>;
    async fn get_draft(&self, id: DraftId) -> ServiceResult<Option<Draft>>;
    /// Replace the draft's content wholesale. The replacement is atomic at
    /// the store level; serializing concurrent writers is the caller's job.
    async fn update_draft_content(&self, id: DraftId, content: String) -> ServiceResult<()>;
    async fn set_draft_status(&self, id: DraftId, status: DraftStatus) -> ServiceResult<()>;
    /// Most recently created draft for the organization, if any.
    async fn latest_draft(&self, organization_id: &str) -> ServiceResult<Option<Draft>>;
}

#[derive(Default)]
struct MemoryState {
    organizations: HashMap<String, Organization>,
    style_profiles: HashMap<String, StyleProfile>,
    manual_profiles: HashMap<String, ManualProfile>,
    preferred_links: HashMap<String, Vec<PreferredLink>>,
    preferred_ctas: HashMap<String, Vec<PreferredCta>>,
    drafts: HashMap<DraftId, Draft>,
}

/// In-process `RecordStore`. Backs the integration tests and serves as the
/// single-node default when no relational store is wired in.
#[derive(Default)]
pub struct MemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed_organization(&self, organization: Organization) -> &Self {
        self.lock()
            .organizations
            .insert(organization.id.clone(), organization);
        self
    }

    pub fn seed_style_profile(&self, organization_id: &str, profile: StyleProfile) -> &Self {
        self.lock()
            .style_profiles
            .insert(organization_id.to_string(), profile);
        self
    }

    pub fn seed_manual_profile(&self, organization_id: &str, profile: ManualProfile) -> &Self {
        self.lock()
            .manual_profiles
            .insert(organization_id.to_string(), profile);
        self
    }

    pub fn seed_preferred_links(&self, organization_id: &str, links: Vec<PreferredLink>) -> &Self {
        self.lock()
            .preferred_links
            .insert(organization_id.to_string(), links);
        self
    }

    pub fn seed_preferred_ctas(&self, organization_id: &str, ctas: Vec<PreferredCta>) -> &Self {
        self.lock()
            .preferred_ctas
            .insert(organization_id.to_string(), ctas);
        self
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load_organization(
        &self,
        organization_id: &str,
    ) -> ServiceResult<Option<Organization>> {
        Ok(self.lock().organizations.get(organization_id).cloned())
    }

    async fn load_style_profile(
        &self,
        organization_id: &str,
    ) -> ServiceResult<Option<StyleProfile>> {
        Ok(self.lock().style_profiles.get(organization_id).cloned())
    }

    async fn load_manual_profile(
        &self,
        organization_id: &str,
    ) -> ServiceResult<Option<ManualProfile>> {
        Ok(self.lock().manual_profiles.get(organization_id).cloned())
    }

    async fn load_preferred_links(
        &self,
        organization_id: &str,
    ) -> ServiceResult<Vec<PreferredLink>> {
        Ok(self
            .lock()
            .preferred_links
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_preferred_ctas(
        &self,
        organization_id: &str,
    ) -> ServiceResult<Vec<PreferredCta>> {
        Ok(self
            .lock()
            .preferred_ctas
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_draft(&self, draft: NewDraft) -> ServiceResult<Draft> {
        let now = Utc::now();
        let draft = Draft {
            id: Uuid::new_v4(),
            organization_id: draft.organization_id,
            title: draft.title,
            content: draft.content,
            status: DraftStatus::Enriching,
            created_at: now,
            updated_at: now,
        };
        self.lock().drafts.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn get_draft(&self, id: DraftId) -> ServiceResult<Option<Draft>> {
        Ok(self.lock().drafts.get(&id).cloned())
    }

    async fn update_draft_content(&self, id: DraftId, content: String) -> ServiceResult<()> {
        let mut state = self.lock();
        let draft = state
            .drafts
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("draft {id}")))?;
        draft.content = content;
        draft.updated_at = Utc::now();
        Ok(())
    }

    async fn set_draft_status(&self, id: DraftId, status: DraftStatus) -> ServiceResult<()> {
        let mut state = self.lock();
        let draft = state
            .drafts
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("draft {id}")))?;
        draft.status = status;
        draft.updated_at = Utc::now();
        Ok(())
    }

    async fn latest_draft(&self, organization_id: &str) -> ServiceResult<Option<Draft>> {
        Ok(self
            .lock()
            .drafts
            .values()
            .filter(|draft| draft.organization_id == organization_id)
            .max_by_key(|draft| draft.created_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn draft_roundtrip_and_latest() {
        let store = MemoryRecordStore::new();
        let first = store
            .create_draft(NewDraft {
                organization_id: "org-1".to_string(),
                title: "First".to_string(),
                content: "one".to_string(),
            })
            .await
            .expect("create first");
        let second = store
            .create_draft(NewDraft {
                organization_id: "org-1".to_string(),
                title: "Second".to_string(),
                content: "two".to_string(),
            })
            .await
            .expect("create second");

        store
            .update_draft_content(first.id, "one updated".to_string())
            .await
            .expect("update content");

        let reloaded = store
            .get_draft(first.id)
            .await
            .expect("get draft")
            .expect("draft exists");
        assert_eq!(reloaded.content, "one updated");
        assert_eq!(reloaded.status, DraftStatus::Enriching);

        let latest = store
            .latest_draft("org-1")
            .await
            .expect("latest draft")
            .expect("draft exists");
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn update_missing_draft_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store
            .update_draft_content(Uuid::new_v4(), "content".to_string())
            .await
            .expect_err("missing draft");
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
