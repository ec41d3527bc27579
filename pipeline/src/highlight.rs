use crate::prompt::HighlightType;
use draftforge_services::RecordStore;
use regex::Regex;
use std::{
    collections::BTreeSet,
    sync::{Arc, LazyLock},
};
use tracing::warn;

// The structural marker the assembler instructs the generator to emit.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-highlight="([a-z]+)""#).expect("valid highlight marker pattern")
});

/// Reads which highlight-type labels the organization's most recent draft
/// used, so the next draft rotates to different ones. Pure read; returns
/// the empty set when there is no prior draft or the scan yields nothing.
pub struct HighlightBoxTracker {
    store: Arc<dyn RecordStore>,
}

impl HighlightBoxTracker {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn previous_types(&self, organization_id: &str) -> BTreeSet<HighlightType> {
        match self.store.latest_draft(organization_id).await {
            Ok(Some(draft)) => scan(&draft.content),
            Ok(None) => BTreeSet::new(),
            Err(err) => {
                warn!(organization_id, error = %err, "could not read prior draft");
                BTreeSet::new()
            }
        }
    }
}

fn scan(content: &str) -> BTreeSet<HighlightType> {
    MARKER_RE
        .captures_iter(content)
        .filter_map(|captures| HighlightType::parse(&captures[1]))
        .collect()
}
