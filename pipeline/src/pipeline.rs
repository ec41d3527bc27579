use crate::{
    cache::{Clock, GenerationCache, SystemClock},
    context::ContextLoader,
    errors::PipelineError,
    highlight::HighlightBoxTracker,
    images::ImageEnrichmentStage,
    invoker::GenerationInvoker,
    persistence::PersistenceCoordinator,
    placeholder::SocialPlaceholder,
    prompt::PromptAssembler,
    queue::FetchQueue,
    social::SocialProofEnrichmentStage,
};
use draftforge_services::{
    ArtifactRenderer, DraftId, NewDraft, RecordStore, SocialArchive, TextModel,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// The subject of one generation call.
#[derive(Debug, Clone)]
pub struct Topic {
    pub title: String,
    /// Used as the hero-image fallback when a hero render fails.
    pub preview_image_url: Option<String>,
}

pub struct GenerateArticleParams {
    pub organization_id: String,
    pub topic: Topic,
    pub audience_description: Option<String>,
    /// Pre-resolved social embeds handed in by an upstream discovery step,
    /// carried as inline-data tokens the generator places verbatim.
    pub prior_social_embeds: Vec<SocialPlaceholder>,
    pub request_ctas: bool,
}

/// What the caller gets back as soon as the draft is saved. Enrichment
/// continues in the background; the draft is valid and readable before it
/// finishes.
#[derive(Debug)]
pub struct GenerateOutcome {
    pub draft_id: DraftId,
    pub title: String,
    pub enrichment: EnrichmentHandle,
}

/// Handle to the detached enrichment work for one draft.
#[derive(Debug)]
pub struct EnrichmentHandle {
    task: tokio::task::JoinHandle<()>,
}

impl EnrichmentHandle {
    /// Wait for both enrichment stages and finalization to complete.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// The generation and enrichment pipeline for one deployment: loads
/// organization context, assembles the prompt, invokes generation, saves
/// the draft, and detaches the two enrichment stages.
pub struct GenerationPipeline {
    store: Arc<dyn RecordStore>,
    loader: ContextLoader,
    assembler: PromptAssembler,
    invoker: GenerationInvoker,
    images: Arc<ImageEnrichmentStage>,
    social: Arc<SocialProofEnrichmentStage>,
    coordinator: Arc<PersistenceCoordinator>,
    tracker: HighlightBoxTracker,
}

impl GenerationPipeline {
    #[must_use]
    pub fn new(params: PipelineParams) -> Self {
        let coordinator = Arc::new(PersistenceCoordinator::new(params.store.clone()));
        Self {
            loader: ContextLoader::new(
                params.store.clone(),
                GenerationCache::new(params.clock),
                params.context_ttl,
            ),
            assembler: PromptAssembler::new(),
            invoker: GenerationInvoker::new(params.model),
            images: Arc::new(ImageEnrichmentStage::new(
                params.renderer,
                params.item_deadline,
                params.stage_deadline,
            )),
            social: Arc::new(SocialProofEnrichmentStage::new(
                params.fast_model,
                params.archive,
                FetchQueue::new(params.fetch_delay),
                params.call_timeout,
                params.max_candidates,
                params.validate_candidates,
            )),
            coordinator,
            tracker: HighlightBoxTracker::new(params.store.clone()),
            store: params.store,
        }
    }

    pub fn builder(
        model: Arc<dyn TextModel>,
        fast_model: Arc<dyn TextModel>,
        renderer: Arc<dyn ArtifactRenderer>,
        archive: Arc<dyn SocialArchive>,
        store: Arc<dyn RecordStore>,
    ) -> PipelineParams {
        PipelineParams::new(model, fast_model, renderer, archive, store)
    }

    /// Generate an article. Returns once the draft is saved; placeholder
    /// enrichment continues in the background and patches the stored
    /// content as it completes.
    pub async fn generate(
        &self,
        params: GenerateArticleParams,
    ) -> Result<GenerateOutcome, PipelineError> {
        let organization = self
            .store
            .load_organization(&params.organization_id)
            .await?
            .ok_or_else(|| PipelineError::OrganizationNotFound(params.organization_id.clone()))?;

        let previous_highlights = self.tracker.previous_types(&organization.id).await;
        let context = self.loader.load(&organization.id).await;
        let prompt = self.assembler.assemble(
            &params.topic,
            params.audience_description.as_deref(),
            &context,
            &previous_highlights,
            params.request_ctas,
            &params.prior_social_embeds,
        );

        let article = self.invoker.invoke(prompt).await?;

        let draft = self
            .coordinator
            .create_draft(NewDraft {
                organization_id: organization.id.clone(),
                title: article.title.clone(),
                content: article.content,
            })
            .await?;
        info!(draft_id = %draft.id, organization_id = organization.id, "draft saved");

        let brand_guidelines = context.style.as_ref().map(|style| style.tone.clone());
        let enrichment = self.spawn_enrichment(
            draft.id,
            params.topic,
            params.audience_description,
            brand_guidelines,
        );

        Ok(GenerateOutcome {
            draft_id: draft.id,
            title: article.title,
            enrichment,
        })
    }

    /// Detach both enrichment stages. They run concurrently on disjoint
    /// placeholder namespaces; the coordinator serializes their patches.
    fn spawn_enrichment(
        &self,
        draft_id: DraftId,
        topic: Topic,
        audience_description: Option<String>,
        brand_guidelines: Option<String>,
    ) -> EnrichmentHandle {
        let image_task = {
            let images = self.images.clone();
            let coordinator = self.coordinator.clone();
            let topic = topic.clone();
            tokio::spawn(async move {
                coordinator
                    .update_draft(draft_id, move |content| async move {
                        images
                            .resolve(&content, &topic, brand_guidelines.as_deref())
                            .await
                    })
                    .await;
            })
        };

        let social_task = {
            let social = self.social.clone();
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .update_draft(draft_id, move |content| async move {
                        social
                            .enrich(&content, &topic, audience_description.as_deref())
                            .await
                    })
                    .await;
            })
        };

        let coordinator = self.coordinator.clone();
        let task = tokio::spawn(async move {
            let _ = image_task.await;
            let _ = social_task.await;
            coordinator.finalize(draft_id).await;
        });
        EnrichmentHandle { task }
    }
}

/// Parameters required to build a pipeline.
/// # Default Values
/// - `context_ttl`: 60s
/// - `item_deadline`: 30s (per render call)
/// - `stage_deadline`: 45s (whole image stage)
/// - `call_timeout`: 15s (every other external call)
/// - `fetch_delay`: 1s between sequential archive fetches
/// - `max_candidates`: 8
/// - `validate_candidates`: true
pub struct PipelineParams {
    pub model: Arc<dyn TextModel>,
    /// The fast/cheap variant used for social-proof query extraction,
    /// selection, and insertion.
    pub fast_model: Arc<dyn TextModel>,
    pub renderer: Arc<dyn ArtifactRenderer>,
    pub archive: Arc<dyn SocialArchive>,
    pub store: Arc<dyn RecordStore>,
    pub clock: Arc<dyn Clock>,
    pub context_ttl: Duration,
    pub item_deadline: Duration,
    pub stage_deadline: Duration,
    pub call_timeout: Duration,
    pub fetch_delay: Duration,
    pub max_candidates: usize,
    pub validate_candidates: bool,
}

impl PipelineParams {
    pub fn new(
        model: Arc<dyn TextModel>,
        fast_model: Arc<dyn TextModel>,
        renderer: Arc<dyn ArtifactRenderer>,
        archive: Arc<dyn SocialArchive>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            model,
            fast_model,
            renderer,
            archive,
            store,
            clock: Arc::new(SystemClock),
            context_ttl: Duration::from_secs(60),
            item_deadline: Duration::from_secs(30),
            stage_deadline: Duration::from_secs(45),
            call_timeout: Duration::from_secs(15),
            fetch_delay: Duration::from_secs(1),
            max_candidates: 8,
            validate_candidates: true,
        }
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn context_ttl(mut self, context_ttl: Duration) -> Self {
        self.context_ttl = context_ttl;
        self
    }

    #[must_use]
    pub fn item_deadline(mut self, item_deadline: Duration) -> Self {
        self.item_deadline = item_deadline;
        self
    }

    #[must_use]
    pub fn stage_deadline(mut self, stage_deadline: Duration) -> Self {
        self.stage_deadline = stage_deadline;
        self
    }

    #[must_use]
    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    #[must_use]
    pub fn fetch_delay(mut self, fetch_delay: Duration) -> Self {
        self.fetch_delay = fetch_delay;
        self
    }

    #[must_use]
    pub fn max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    #[must_use]
    pub fn validate_candidates(mut self, validate_candidates: bool) -> Self {
        self.validate_candidates = validate_candidates;
        self
    }

    #[must_use]
    pub fn build(self) -> GenerationPipeline {
        GenerationPipeline::new(self)
    }
}
