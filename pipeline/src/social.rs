use crate::{
    invoker::strip_code_fences,
    opentelemetry::trace_generation,
    placeholder::{self, replace_once, social_token, Placeholder, SocialPlaceholder},
    queue::FetchQueue,
    Topic,
};
use draftforge_services::{SocialArchive, SocialPost, TextModel, TextRequest};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, warn};

const QUERY_WORD_CAP: usize = 8;
const MIN_SELECTED: usize = 2;
const MAX_SELECTED: usize = 4;

/// Discovers, validates, selects, and embeds third-party posts that support
/// claims made in the draft.
///
/// Steps run strictly in order: query extraction, discovery, validation,
/// selection, insertion, resolution — resolution depends on the tokens
/// insertion creates. Every step short-circuits to "no social proof added"
/// on failure; the stage never errors and never drops draft text.
pub struct SocialProofEnrichmentStage {
    model: Arc<dyn TextModel>,
    archive: Arc<dyn SocialArchive>,
    queue: FetchQueue,
    call_timeout: Duration,
    max_candidates: usize,
    validate_candidates: bool,
}

impl SocialProofEnrichmentStage {
    #[must_use]
    pub fn new(
        model: Arc<dyn TextModel>,
        archive: Arc<dyn SocialArchive>,
        queue: FetchQueue,
        call_timeout: Duration,
        max_candidates: usize,
        validate_candidates: bool,
    ) -> Self {
        Self {
            model,
            archive,
            queue,
            call_timeout,
            max_candidates,
            validate_candidates,
        }
    }

    pub async fn enrich(
        &self,
        content: &str,
        topic: &Topic,
        audience_description: Option<&str>,
    ) -> String {
        let inserted = match self
            .discover_and_insert(content, topic, audience_description)
            .await
        {
            Some(rewritten) => rewritten,
            None => content.to_string(),
        };
        // Resolution always runs: the draft may carry inline-data embeds
        // placed at generation time even when discovery added nothing.
        self.resolve_social(&inserted).await
    }

    async fn discover_and_insert(
        &self,
        content: &str,
        topic: &Topic,
        audience_description: Option<&str>,
    ) -> Option<String> {
        let query = self.extract_query(content, topic, audience_description).await;

        // Exactly one archive query per run; the archive's latency budget
        // does not allow iterative searching.
        let search = tokio::time::timeout(
            self.call_timeout,
            self.archive.search(&query, self.max_candidates),
        )
        .await;
        let candidates = match search {
            Ok(Ok(urls)) => dedupe(urls),
            Ok(Err(err)) => {
                warn!(query, error = %err, "social search failed");
                return None;
            }
            Err(_) => {
                warn!(query, "social search timed out");
                return None;
            }
        };
        if candidates.is_empty() {
            debug!(query, "no social candidates found");
            return None;
        }

        let candidates = if self.validate_candidates {
            self.validated(candidates).await
        } else {
            candidates
        };
        if candidates.is_empty() {
            return None;
        }

        let selected = self.select(content, &candidates).await?;
        if selected.is_empty() {
            // A valid outcome: nothing materially supports the draft.
            debug!("no candidate posts were selected");
            return None;
        }

        self.insert(content, &selected).await
    }

    async fn extract_query(
        &self,
        content: &str,
        topic: &Topic,
        audience_description: Option<&str>,
    ) -> String {
        let audience = audience_description
            .map(|audience| format!(" The article is aimed at {audience}."))
            .unwrap_or_default();
        let prompt = format!(
            "Reduce the following article to exactly one short, concrete search phrase of at \
             most six words, suitable for finding short-form posts about its main claim.\
             {audience} Respond with the phrase only, without quotes.\n\n{content}"
        );

        let response = tokio::time::timeout(
            self.call_timeout,
            trace_generation(
                "extract_query",
                self.model.provider(),
                self.model.model_id(),
                self.model.generate(TextRequest {
                    prompt_text: prompt,
                    max_output_tokens: Some(64),
                    temperature: Some(0.0),
                    ..Default::default()
                }),
            ),
        )
        .await;

        let raw = match response {
            Ok(Ok(response)) => response.content,
            Ok(Err(err)) => {
                warn!(error = %err, "query extraction failed, using topic title");
                return topic.title.clone();
            }
            Err(_) => {
                warn!("query extraction timed out, using topic title");
                return topic.title.clone();
            }
        };
        sanitize_query(&raw).unwrap_or_else(|| {
            debug!(raw, "extracted query was unusable, using topic title");
            topic.title.clone()
        })
    }

    async fn validated(&self, candidates: Vec<String>) -> Vec<String> {
        let checks = self
            .queue
            .run(candidates, |url| async move {
                let check =
                    tokio::time::timeout(self.call_timeout, self.archive.validate(&url)).await;
                let keep = match check {
                    Ok(Ok(exists)) => {
                        if !exists {
                            debug!(url, "candidate post no longer exists");
                        }
                        exists
                    }
                    Ok(Err(err)) => {
                        warn!(url, error = %err, "validation failed, keeping candidate");
                        true
                    }
                    Err(_) => {
                        warn!(url, "validation timed out, keeping candidate");
                        true
                    }
                };
                (url, keep)
            })
            .await;
        checks
            .into_iter()
            .filter(|(_, keep)| *keep)
            .map(|(url, _)| url)
            .collect()
    }

    async fn select(&self, content: &str, candidates: &[String]) -> Option<Vec<String>> {
        let prompt = format!(
            "Below is an article draft and a list of candidate social posts.\nChoose between \
             {MIN_SELECTED} and {MAX_SELECTED} posts that materially support specific claims \
             made in the draft. Respond with a JSON array containing only the chosen URLs, or \
             [] if none qualify.\n\nCandidates:\n{}\n\nDraft:\n{content}",
            candidates.join("\n")
        );

        let response = tokio::time::timeout(
            self.call_timeout,
            trace_generation(
                "select_posts",
                self.model.provider(),
                self.model.model_id(),
                self.model.generate(TextRequest {
                    prompt_text: prompt,
                    max_output_tokens: Some(512),
                    temperature: Some(0.0),
                    ..Default::default()
                }),
            ),
        )
        .await;
        let raw = match response {
            Ok(Ok(response)) => response.content,
            Ok(Err(err)) => {
                warn!(error = %err, "post selection failed");
                return None;
            }
            Err(_) => {
                warn!("post selection timed out");
                return None;
            }
        };

        let Ok(urls) = serde_json::from_str::<Vec<String>>(strip_code_fences(&raw)) else {
            warn!("post selection returned unparsable output");
            return None;
        };
        let allowed: HashSet<&str> = candidates.iter().map(String::as_str).collect();
        let selected: Vec<String> = urls
            .into_iter()
            .filter(|url| allowed.contains(url.as_str()))
            .collect();
        // A repeated url in the reply must not become two tokens for the
        // same post. The prompt's minimum is advisory; a reply with a
        // single url is kept.
        Some(dedupe(selected).into_iter().take(MAX_SELECTED).collect())
    }

    async fn insert(&self, content: &str, selected: &[String]) -> Option<String> {
        let tokens: Vec<String> = selected.iter().map(|url| social_token(url, None)).collect();
        let prompt = format!(
            "Rewrite the article below, preserving all of its original content and order. \
             Insert each of the following tokens verbatim, each on its own line, preceded by \
             two or three sentences connecting the post to a nearby claim. Do not place one in \
             the opening section. Do not add, alter, or remove any other token.\n\nTokens:\n{}\
             \n\nArticle:\n{content}",
            tokens.join("\n")
        );

        let response = tokio::time::timeout(
            self.call_timeout,
            trace_generation(
                "insert_embeds",
                self.model.provider(),
                self.model.model_id(),
                self.model.generate(TextRequest {
                    prompt_text: prompt,
                    max_output_tokens: Some(8192),
                    temperature: Some(0.2),
                    ..Default::default()
                }),
            ),
        )
        .await;
        let rewritten = match response {
            Ok(Ok(response)) => response.content,
            Ok(Err(err)) => {
                warn!(error = %err, "embed insertion failed");
                return None;
            }
            Err(_) => {
                warn!("embed insertion timed out");
                return None;
            }
        };

        // The rewrite must carry exactly the supplied tokens plus whatever
        // SOCIAL tokens the input already had. Anything else means the
        // model invented or dropped tokens and the rewrite cannot be
        // trusted.
        let mut expected: Vec<String> = social_tokens(content);
        expected.extend(tokens);
        expected.sort();
        let mut found = social_tokens(&rewritten);
        found.sort();
        if expected != found {
            warn!("rewrite violated the token set, discarding social insertion");
            return None;
        }
        Some(rewritten)
    }

    async fn resolve_social(&self, content: &str) -> String {
        let socials: Vec<SocialPlaceholder> = placeholder::parse(content)
            .into_iter()
            .filter_map(|item| match item {
                Placeholder::Social(social) => Some(social),
                _ => None,
            })
            .collect();
        if socials.is_empty() {
            return content.to_string();
        }

        let mut updated = content.to_string();
        let mut remote = Vec::new();
        for item in socials {
            match &item.inline {
                // Inline data was handed to us by the discovery step that
                // built the token; no second round trip.
                Some(post) => {
                    let embed = render_embed(post);
                    updated = replace_once(&updated, &item.token, &embed);
                }
                None => remote.push(item),
            }
        }

        let fetched = self
            .queue
            .run(remote, |item| async move {
                let fetch =
                    tokio::time::timeout(self.call_timeout, self.archive.fetch(&item.url)).await;
                let post = match fetch {
                    Ok(Ok(Some(post))) => Some(post),
                    Ok(Ok(None)) => {
                        debug!(url = item.url, "post unavailable from any source");
                        None
                    }
                    Ok(Err(err)) => {
                        warn!(url = item.url, error = %err, "post fetch failed");
                        None
                    }
                    Err(_) => {
                        warn!(url = item.url, "post fetch timed out");
                        None
                    }
                };
                (item, post)
            })
            .await;

        for (item, post) in fetched {
            let replacement = match post {
                Some(post) => render_embed(&post),
                // Keep the reference alive rather than deleting it.
                None => fallback_link(&item.url),
            };
            updated = replace_once(&updated, &item.token, &replacement);
        }
        updated
    }
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn sanitize_query(raw: &str) -> Option<String> {
    let phrase = raw.lines().next()?.trim().trim_matches('"').trim();
    if phrase.is_empty() || phrase.split_whitespace().count() > QUERY_WORD_CAP {
        return None;
    }
    Some(phrase.to_string())
}

fn render_embed(post: &SocialPost) -> String {
    format!(
        "<figure class=\"social-embed\">\n<blockquote>{}</blockquote>\n<figcaption>{} \
         (@{}) · {} likes · {} reposts · <a href=\"{}\">View post</a></figcaption>\n</figure>",
        post.text, post.author, post.handle, post.like_count, post.repost_count, post.url
    )
}

fn fallback_link(url: &str) -> String {
    format!("[View post]({url})")
}

fn social_tokens(content: &str) -> Vec<String> {
    placeholder::parse(content)
        .into_iter()
        .filter_map(|item| match item {
            Placeholder::Social(social) => Some(social.token),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftforge_services::{
        testing::{MockSocialArchive, MockTextModel, MockTextResult},
        ServiceError,
    };

    fn topic() -> Topic {
        Topic {
            title: "Why onboarding flows fail".to_string(),
            preview_image_url: None,
        }
    }

    fn stage(
        model: Arc<MockTextModel>,
        archive: Arc<MockSocialArchive>,
    ) -> SocialProofEnrichmentStage {
        SocialProofEnrichmentStage::new(
            model,
            archive,
            FetchQueue::new(Duration::ZERO),
            Duration::from_secs(15),
            8,
            false,
        )
    }

    fn post(url: &str) -> SocialPost {
        SocialPost {
            url: url.to_string(),
            author: "Dana".to_string(),
            handle: "dana".to_string(),
            text: "We cut signup fields and activation doubled".to_string(),
            like_count: 12,
            repost_count: 3,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn repeated_selection_urls_embed_the_post_once() {
        let model = Arc::new(MockTextModel::new());
        let archive = Arc::new(MockSocialArchive::new());
        let url = "https://posts.example/1";

        model.enqueue(MockTextResult::text("onboarding activation drop"));
        archive.enqueue_search(Ok(vec![url.to_string()]));
        model.enqueue(MockTextResult::text(format!("[\"{url}\", \"{url}\"]")));
        model.enqueue(MockTextResult::text(format!(
            "Intro.\n\nThe claim holds. One founder measured it.\nSOCIAL:{url}\n\nEnd."
        )));
        archive.enqueue_fetch(Ok(Some(post(url))));

        let updated = stage(model, archive.clone())
            .enrich("Intro.\n\nThe claim holds.\n\nEnd.", &topic(), None)
            .await;

        assert_eq!(archive.tracked_fetch_urls(), vec![url.to_string()]);
        assert_eq!(updated.matches("social-embed").count(), 1);
        assert!(!updated.contains("SOCIAL:"));
    }

    #[tokio::test]
    async fn rewrite_with_an_invented_token_is_discarded() {
        let model = Arc::new(MockTextModel::new());
        let archive = Arc::new(MockSocialArchive::new());
        let url = "https://posts.example/1";
        let content = "Intro.\n\nThe claim holds.\n\nEnd.";

        model.enqueue(MockTextResult::text("onboarding activation drop"));
        archive.enqueue_search(Ok(vec![url.to_string()]));
        model.enqueue(MockTextResult::text(format!("[\"{url}\"]")));
        // The rewrite carries the supplied token plus one nobody asked for.
        model.enqueue(MockTextResult::text(format!(
            "Intro.\n\nThe claim holds.\nSOCIAL:{url}\nSOCIAL:https://posts.example/other\n\nEnd."
        )));

        let updated = stage(model, archive.clone())
            .enrich(content, &topic(), None)
            .await;

        assert_eq!(updated, content);
        assert!(archive.tracked_fetch_urls().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_a_plain_link() {
        let model = Arc::new(MockTextModel::new());
        let archive = Arc::new(MockSocialArchive::new());
        let url = "https://posts.example/9";
        let content = format!("Intro.\n\nSOCIAL:{url}\n\nEnd.");

        // Discovery degrades: extraction errors out, the search is empty.
        archive.enqueue_search(Ok(vec![]));
        archive.enqueue_fetch(Err(ServiceError::Invariant(
            "mock",
            "archive unavailable".to_string(),
        )));

        let updated = stage(model, archive).enrich(&content, &topic(), None).await;

        assert!(updated.contains(&format!("[View post]({url})")));
        assert!(!updated.contains("SOCIAL:"));
        assert!(updated.contains("Intro."));
        assert!(updated.contains("End."));
    }

    #[test]
    fn sanitize_rejects_empty_and_overlong_phrases() {
        assert_eq!(
            sanitize_query("  \"user onboarding churn\"  "),
            Some("user onboarding churn".to_string())
        );
        assert_eq!(sanitize_query(""), None);
        assert_eq!(
            sanitize_query("one two three four five six seven eight nine"),
            None
        );
    }

    #[test]
    fn dedupe_preserves_first_occurrence_order() {
        let urls = vec![
            "https://a".to_string(),
            "https://b".to_string(),
            "https://a".to_string(),
        ];
        assert_eq!(dedupe(urls), vec!["https://a", "https://b"]);
    }

    #[test]
    fn embed_carries_attribution_and_engagement() {
        let post = SocialPost {
            url: "https://posts.example/1".to_string(),
            author: "Dana".to_string(),
            handle: "dana".to_string(),
            text: "Onboarding is broken".to_string(),
            like_count: 42,
            repost_count: 7,
            published_at: None,
        };
        let embed = render_embed(&post);
        assert!(embed.contains("Onboarding is broken"));
        assert!(embed.contains("@dana"));
        assert!(embed.contains("42 likes"));
        assert!(embed.contains("https://posts.example/1"));
    }
}
