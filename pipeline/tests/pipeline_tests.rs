use draftforge_pipeline::{
    GenerateArticleParams, GenerationPipeline, PipelineError, Topic,
};
use draftforge_services::{
    testing::{MockRenderer, MockSocialArchive, MockTextModel, MockTextResult},
    DraftStatus, MemoryRecordStore, NewDraft, Organization, PreferredLink, RecordStore,
    StyleProfile,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};

struct Harness {
    model: Arc<MockTextModel>,
    fast_model: Arc<MockTextModel>,
    renderer: Arc<MockRenderer>,
    archive: Arc<MockSocialArchive>,
    store: Arc<MemoryRecordStore>,
    pipeline: GenerationPipeline,
}

fn harness() -> Harness {
    let model = Arc::new(MockTextModel::new());
    let fast_model = Arc::new(MockTextModel::new());
    let renderer = Arc::new(MockRenderer::new());
    let archive = Arc::new(MockSocialArchive::new());
    let store = Arc::new(MemoryRecordStore::new());
    store.seed_organization(Organization {
        id: "org-1".to_string(),
        name: "Acme".to_string(),
    });

    let pipeline = GenerationPipeline::builder(
        model.clone(),
        fast_model.clone(),
        renderer.clone(),
        archive.clone(),
        store.clone(),
    )
    .fetch_delay(Duration::ZERO)
    .validate_candidates(false)
    .build();

    Harness {
        model,
        fast_model,
        renderer,
        archive,
        store,
        pipeline,
    }
}

fn article_json(content: &str) -> String {
    json!({
        "title": "Why onboarding flows fail",
        "content": content,
        "tags": ["onboarding"],
        "keywords": ["activation"],
        "suggested_actions": []
    })
    .to_string()
}

fn request() -> GenerateArticleParams {
    GenerateArticleParams {
        organization_id: "org-1".to_string(),
        topic: Topic {
            title: "Why onboarding flows fail".to_string(),
            preview_image_url: None,
        },
        audience_description: Some("product managers".to_string()),
        prior_social_embeds: vec![],
        request_ctas: false,
    }
}

#[tokio::test]
async fn draft_is_saved_then_enriched_and_finalized() {
    let h = harness();
    h.model.enqueue(MockTextResult::text(article_json(
        "Intro paragraph.\n\nIMAGE:hero:founders reviewing a funnel\n\nBody with a claim.",
    )));
    h.renderer.enqueue_artifact("https://cdn.example/hero.png");
    // The social stage degrades end to end: query extraction errors out,
    // the archive search finds nothing.
    h.archive.enqueue_search(Ok(vec![]));

    let outcome = h.pipeline.generate(request()).await.expect("generate");
    assert_eq!(outcome.title, "Why onboarding flows fail");

    // The draft is readable immediately, possibly before enrichment.
    let draft = h
        .store
        .get_draft(outcome.draft_id)
        .await
        .expect("get draft")
        .expect("draft exists");
    assert!(draft.content.contains("Intro paragraph."));

    outcome.enrichment.wait().await;

    let draft = h
        .store
        .get_draft(outcome.draft_id)
        .await
        .expect("get draft")
        .expect("draft exists");
    assert!(draft.content.contains("](https://cdn.example/hero.png)"));
    assert!(!draft.content.contains("IMAGE:"));
    assert!(draft.content.contains("Body with a claim."));
    assert_eq!(draft.status, DraftStatus::Ready);
}

#[tokio::test]
async fn failed_hero_falls_back_to_preview_and_deferred_images_are_dropped() {
    let h = harness();
    h.model.enqueue(MockTextResult::text(article_json(
        "Intro.\n\nIMAGE:hero:a crowded signup form\n\nCHART:bar|Drop-off by \
         step|Email,Password,Card|40,25,35\n\nIMAGE:section:a happy user\n\nClosing.",
    )));
    // Critical placeholders dispatch in document order: hero, then chart.
    h.renderer.enqueue_unsuccessful();
    h.renderer.enqueue_artifact("https://cdn.example/chart.png");
    h.archive.enqueue_search(Ok(vec![]));

    let mut params = request();
    params.topic.preview_image_url = Some("https://cdn.example/preview.png".to_string());

    let outcome = h.pipeline.generate(params).await.expect("generate");
    outcome.enrichment.wait().await;

    let draft = h
        .store
        .get_draft(outcome.draft_id)
        .await
        .expect("get draft")
        .expect("draft exists");
    assert!(draft.content.contains("](https://cdn.example/preview.png)"));
    assert!(draft.content.contains("](https://cdn.example/chart.png)"));
    assert!(!draft.content.contains("IMAGE:"));
    assert!(!draft.content.contains("CHART:"));
    // The section image never reached the renderer.
    assert_eq!(h.renderer.tracked_requests().len(), 2);
}

#[tokio::test]
async fn truncated_generation_aborts_before_any_draft_is_persisted() {
    let h = harness();
    h.model
        .enqueue(MockTextResult::truncated("{\"title\": \"cut"));

    let err = h.pipeline.generate(request()).await.expect_err("truncated");
    assert!(matches!(err, PipelineError::GenerationTruncated));

    let latest = h.store.latest_draft("org-1").await.expect("latest");
    assert!(latest.is_none());
}

#[tokio::test]
async fn unknown_organization_is_a_hard_failure() {
    let h = harness();
    let mut params = request();
    params.organization_id = "org-missing".to_string();

    let err = h.pipeline.generate(params).await.expect_err("missing org");
    assert!(matches!(err, PipelineError::OrganizationNotFound(_)));
}

#[tokio::test]
async fn prompt_reflects_context_and_rotates_highlights() {
    let h = harness();
    h.store.seed_style_profile(
        "org-1",
        StyleProfile {
            tone: "direct, practical".to_string(),
            vocabulary: vec![],
            sample_excerpts: vec![],
        },
    );
    h.store.seed_preferred_links(
        "org-1",
        vec![PreferredLink {
            url: "https://example.com/guide".to_string(),
            label: "Onboarding guide".to_string(),
        }],
    );
    // The previous draft used statistic and tip callouts.
    h.store
        .create_draft(NewDraft {
            organization_id: "org-1".to_string(),
            title: "Prior".to_string(),
            content: "<aside data-highlight=\"statistic\">a</aside>\
                      <aside data-highlight=\"tip\">b</aside>"
                .to_string(),
        })
        .await
        .expect("prior draft");

    h.model
        .enqueue(MockTextResult::text(article_json("Plain body.")));
    h.archive.enqueue_search(Ok(vec![]));

    let outcome = h.pipeline.generate(request()).await.expect("generate");
    outcome.enrichment.wait().await;

    let requests = h.model.tracked_requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].prompt_text;

    assert!(prompt.contains("https://example.com/guide"));
    assert!(prompt.contains("direct, practical"));
    assert!(prompt.contains("Omit calls to action entirely"));
    // Only the six unused highlight types may be offered.
    assert!(prompt.contains("quote, takeaway, warning, definition, process, comparison"));
}

#[tokio::test]
async fn social_proof_flows_from_discovery_to_rendered_embed() {
    let h = harness();
    h.model.enqueue(MockTextResult::text(article_json(
        "Intro.\n\nActivation drops when signup asks too much.\n\nClosing.",
    )));

    let url = "https://posts.example/42";
    h.fast_model.enqueue(MockTextResult::text("onboarding activation drop"));
    h.archive
        .enqueue_search(Ok(vec![url.to_string(), url.to_string()]));
    h.fast_model
        .enqueue(MockTextResult::text(format!("[\"{url}\"]")));
    h.fast_model.enqueue(MockTextResult::text(format!(
        "Intro.\n\nActivation drops when signup asks too much. One founder measured exactly \
         this. Their numbers match what we see.\nSOCIAL:{url}\n\nClosing."
    )));
    h.archive.enqueue_fetch(Ok(Some(draftforge_services::SocialPost {
        url: url.to_string(),
        author: "Dana".to_string(),
        handle: "dana".to_string(),
        text: "We cut signup fields from 9 to 3 and activation doubled".to_string(),
        like_count: 120,
        repost_count: 18,
        published_at: None,
    })));

    let outcome = h.pipeline.generate(request()).await.expect("generate");
    outcome.enrichment.wait().await;

    let draft = h
        .store
        .get_draft(outcome.draft_id)
        .await
        .expect("get draft")
        .expect("draft exists");

    assert!(draft.content.contains("activation doubled"));
    assert!(draft.content.contains("@dana"));
    assert!(!draft.content.contains("SOCIAL:"));
    assert!(draft.content.contains("Intro."));
    assert!(draft.content.contains("Closing."));
    // One query per run, deduplicated candidates.
    assert_eq!(h.archive.tracked_queries(), vec!["onboarding activation drop"]);
    assert_eq!(h.archive.tracked_fetch_urls(), vec![url.to_string()]);
}

#[tokio::test]
async fn prior_inline_embeds_resolve_without_fetching() {
    let h = harness();
    let post = draftforge_services::SocialPost {
        url: "https://posts.example/7".to_string(),
        author: "Riley".to_string(),
        handle: "riley".to_string(),
        text: "Shipping smaller onboarding steps worked for us".to_string(),
        like_count: 30,
        repost_count: 4,
        published_at: None,
    };
    let embed = draftforge_pipeline::SocialPlaceholder::with_inline(post);

    h.model.enqueue(MockTextResult::text(article_json(&format!(
        "Intro.\n\n{}\n\nClosing.",
        embed.token
    ))));
    // Discovery finds nothing new; extraction falls back to the topic.
    h.fast_model.enqueue(MockTextResult::text(""));
    h.archive.enqueue_search(Ok(vec![]));

    let mut params = request();
    params.prior_social_embeds = vec![embed];

    let outcome = h.pipeline.generate(params).await.expect("generate");
    outcome.enrichment.wait().await;

    let draft = h
        .store
        .get_draft(outcome.draft_id)
        .await
        .expect("get draft")
        .expect("draft exists");
    assert!(draft.content.contains("@riley"));
    assert!(!draft.content.contains("SOCIAL:"));
    assert!(h.archive.tracked_fetch_urls().is_empty());
    // Extraction came back empty, so the search used the topic title.
    assert_eq!(
        h.archive.tracked_queries(),
        vec!["Why onboarding flows fail"]
    );
}
