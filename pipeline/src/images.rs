use crate::{
    placeholder::{self, remove_token, replace_once, ChartPlaceholder, ImageKind,
        ImagePlaceholder, Placeholder},
    Topic,
};
use draftforge_services::{ArtifactRenderer, RenderRequest, RenderSpec};
use futures::future::join_all;
use regex::Regex;
use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};
use tracing::{debug, warn};

// Catches anything that still looks like a visual placeholder after
// resolution, including malformed instances the parser skipped. Raw
// placeholder syntax must never reach final content.
static LEFTOVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:IMAGE|CHART):[^\n]*$").expect("valid leftover pattern"));

enum Visual {
    Image(ImagePlaceholder),
    Chart(ChartPlaceholder),
}

impl Visual {
    fn token(&self) -> &str {
        match self {
            Self::Image(image) => &image.token,
            Self::Chart(chart) => &chart.token,
        }
    }

    /// Critical placeholders are the only ones dispatched under time
    /// pressure: the hero image and every chart.
    fn is_critical(&self) -> bool {
        match self {
            Self::Chart(_) => true,
            Self::Image(image) => image.kind == ImageKind::Hero,
        }
    }

    fn alt_text(&self) -> &str {
        match self {
            Self::Image(image) => &image.description,
            Self::Chart(chart) => &chart.title,
        }
    }

    fn render_request(&self, brand_guidelines: Option<&str>) -> RenderRequest {
        let spec = match self {
            Self::Image(image) => RenderSpec::Image {
                description: image.description.clone(),
            },
            Self::Chart(chart) => RenderSpec::Chart {
                chart_type: chart.chart_type.as_str().to_string(),
                title: chart.title.clone(),
                labels: chart.labels.clone(),
                values: chart.values.clone(),
            },
        };
        RenderRequest {
            spec,
            brand_guidelines: brand_guidelines.map(ToString::to_string),
        }
    }
}

/// Resolves `IMAGE`/`CHART` placeholders by fanning out to the rendering
/// service under a per-item and a stage-global deadline.
///
/// Only critical placeholders are dispatched; the rest are dropped without
/// a render call — a fixed quality/latency tradeoff, not an oversight. The
/// stage never errors: every failure path ends in a fallback or a deleted
/// token, and an exceeded stage deadline finalizes with whatever subset
/// resolved in time.
pub struct ImageEnrichmentStage {
    renderer: Arc<dyn ArtifactRenderer>,
    item_deadline: Duration,
    stage_deadline: Duration,
}

impl ImageEnrichmentStage {
    #[must_use]
    pub fn new(
        renderer: Arc<dyn ArtifactRenderer>,
        item_deadline: Duration,
        stage_deadline: Duration,
    ) -> Self {
        Self {
            renderer,
            item_deadline,
            stage_deadline,
        }
    }

    pub async fn resolve(
        &self,
        content: &str,
        topic: &Topic,
        brand_guidelines: Option<&str>,
    ) -> String {
        let visuals: Vec<Visual> = placeholder::parse(content)
            .into_iter()
            .filter_map(|item| match item {
                Placeholder::Image(image) => Some(Visual::Image(image)),
                Placeholder::Chart(chart) => Some(Visual::Chart(chart)),
                Placeholder::Social(_) => None,
            })
            .collect();

        let mut updated = content.to_string();
        if !visuals.is_empty() {
            let (critical, deferred): (Vec<_>, Vec<_>) =
                visuals.into_iter().partition(Visual::is_critical);

            let stage_deadline = tokio::time::Instant::now() + self.stage_deadline;
            let outcomes = join_all(critical.into_iter().map(|item| {
                let request = item.render_request(brand_guidelines);
                async move {
                    let artifact_url = self.dispatch(request, stage_deadline).await;
                    (item, artifact_url)
                }
            }))
            .await;

            for (item, artifact_url) in outcomes {
                updated = apply_outcome(&updated, &item, artifact_url, topic);
            }
            for item in deferred {
                debug!(token = item.token(), "non-critical placeholder not dispatched");
                updated = remove_token(&updated, item.token());
            }
        }

        LEFTOVER_RE.replace_all(&updated, "").into_owned()
    }

    async fn dispatch(
        &self,
        request: RenderRequest,
        stage_deadline: tokio::time::Instant,
    ) -> Option<String> {
        let call = tokio::time::timeout(self.item_deadline, self.renderer.render(request));
        match tokio::time::timeout_at(stage_deadline, call).await {
            Err(_) => {
                warn!("stage deadline exceeded, abandoning remaining renders");
                None
            }
            Ok(Err(_)) => {
                warn!("render exceeded its per-item deadline");
                None
            }
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "render call failed");
                None
            }
            Ok(Ok(Ok(response))) if response.success => {
                if response.artifact_url.is_none() {
                    warn!("renderer reported success without an artifact url");
                }
                response.artifact_url
            }
            Ok(Ok(Ok(_))) => {
                warn!("renderer could not produce the artifact");
                None
            }
        }
    }
}

fn apply_outcome(
    content: &str,
    item: &Visual,
    artifact_url: Option<String>,
    topic: &Topic,
) -> String {
    if let Some(url) = artifact_url {
        return replace_once(
            content,
            item.token(),
            &format!("![{}]({url})", item.alt_text()),
        );
    }

    // A failed hero render may fall back to the topic's preview image.
    if let Visual::Image(image) = item {
        if image.kind == ImageKind::Hero {
            if let Some(preview) = &topic.preview_image_url {
                return replace_once(
                    content,
                    item.token(),
                    &format!("![{}]({preview})", topic.title),
                );
            }
        }
    }
    remove_token(content, item.token())
}
