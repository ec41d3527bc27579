use crate::cache::GenerationCache;
use draftforge_services::{
    ManualProfile, PreferredCta, PreferredLink, RecordStore, StyleProfile,
};
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Which context slices were actually available when the prompt was
/// assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailabilityFlags {
    pub has_style_data: bool,
    pub has_cta_data: bool,
    pub has_link_data: bool,
}

/// Everything known about an organization at assembly time. Built fresh per
/// generation call (modulo a short-lived cache); never persisted as its own
/// record.
#[derive(Debug, Clone)]
pub struct OrganizationContext {
    pub availability: AvailabilityFlags,
    pub style: Option<StyleProfile>,
    pub manual: Option<ManualProfile>,
    pub preferred_links: Vec<PreferredLink>,
    pub preferred_ctas: Vec<PreferredCta>,
    /// 0..=100. Each availability flag is worth an equal share.
    pub completeness_score: u8,
}

/// Reads an organization's available signals and computes a completeness
/// score. Never fails the pipeline: a slice that cannot be read is
/// substituted with an empty value and lowers the score.
pub struct ContextLoader {
    store: Arc<dyn RecordStore>,
    cache: GenerationCache<OrganizationContext>,
    cache_ttl: Duration,
}

impl ContextLoader {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        cache: GenerationCache<OrganizationContext>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    pub async fn load(&self, organization_id: &str) -> OrganizationContext {
        if let Some(cached) = self.cache.get(organization_id) {
            return cached;
        }

        let style = match self.store.load_style_profile(organization_id).await {
            Ok(style) => style,
            Err(err) => {
                warn!(organization_id, error = %err, "style profile unavailable");
                None
            }
        };
        let manual = match self.store.load_manual_profile(organization_id).await {
            Ok(manual) => manual,
            Err(err) => {
                warn!(organization_id, error = %err, "manual profile unavailable");
                None
            }
        };
        let preferred_links = match self.store.load_preferred_links(organization_id).await {
            Ok(links) => links,
            Err(err) => {
                warn!(organization_id, error = %err, "preferred links unavailable");
                Vec::new()
            }
        };
        let preferred_ctas = match self.store.load_preferred_ctas(organization_id).await {
            Ok(ctas) => ctas,
            Err(err) => {
                warn!(organization_id, error = %err, "preferred ctas unavailable");
                Vec::new()
            }
        };

        let availability = AvailabilityFlags {
            has_style_data: style.is_some(),
            has_cta_data: !preferred_ctas.is_empty(),
            has_link_data: !preferred_links.is_empty(),
        };

        let context = OrganizationContext {
            availability,
            style,
            manual,
            preferred_links,
            preferred_ctas,
            completeness_score: completeness(availability),
        };
        self.cache
            .put(organization_id, context.clone(), self.cache_ttl);
        context
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn completeness(availability: AvailabilityFlags) -> u8 {
    let populated = [
        availability.has_style_data,
        availability.has_cta_data,
        availability.has_link_data,
    ]
    .into_iter()
    .filter(|flag| *flag)
    .count();
    ((populated as f64 / 3.0) * 100.0).round() as u8
}
