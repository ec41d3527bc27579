//! The placeholder micro-language embedded in generated content.
//!
//! Three forms, each occupying a whole line of the draft:
//!
//! - `IMAGE:<kind>:<description>` — a rendering prompt for an image.
//! - `CHART:<type>|<title>|<label1,label2,...>|<value1,value2,...>` — all
//!   four fields mandatory, label count must equal value count.
//! - `SOCIAL:<url>` or `SOCIAL:<url>::DATA::<base64(json)>` — the inline
//!   suffix carries an already-fetched post so resolution needs no second
//!   round trip.
//!
//! Parsing is a best-effort scan: zero matches is fine, and a malformed
//! instance of one placeholder never invalidates the others. Resolving a
//! placeholder means one in-place replacement of its exact token text.

use base64::{prelude::BASE64_STANDARD, Engine};
use draftforge_services::SocialPost;
use regex::Regex;
use std::sync::LazyLock;

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^IMAGE:([a-z_]+):(.+)$").expect("valid image pattern"));
static CHART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^CHART:([^|\r\n]+)\|([^|\r\n]+)\|([^|\r\n]+)\|([^|\r\n]+)$")
        .expect("valid chart pattern")
});
static SOCIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^SOCIAL:(\S+)$").expect("valid social pattern"));

/// The closed set of image placeholder kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// The lead image of the article. Critical: prioritized under time
    /// pressure and the only kind with a preview-image fallback.
    Hero,
    Section,
    Diagram,
}

impl ImageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Section => "section",
            Self::Diagram => "diagram",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "hero" => Some(Self::Hero),
            "section" => Some(Self::Section),
            "diagram" => Some(Self::Diagram),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Bar,
    Line,
    Pie,
}

impl ChartType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "pie" => Some(Self::Pie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlaceholder {
    /// The exact matched text, used for in-place replacement.
    pub token: String,
    pub kind: ImageKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlaceholder {
    pub token: String,
    pub chart_type: ChartType,
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialPlaceholder {
    pub token: String,
    pub url: String,
    /// Post data carried inline, decoded from the `::DATA::` suffix.
    pub inline: Option<SocialPost>,
}

impl SocialPlaceholder {
    /// Build a URL-only placeholder, resolved by fetching at enrichment time.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            token: social_token(&url, None),
            url,
            inline: None,
        }
    }

    /// Build a placeholder carrying the already-fetched post inline.
    #[must_use]
    pub fn with_inline(post: SocialPost) -> Self {
        Self {
            token: social_token(&post.url, Some(&post)),
            url: post.url.clone(),
            inline: Some(post),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    Image(ImagePlaceholder),
    Chart(ChartPlaceholder),
    Social(SocialPlaceholder),
}

impl Placeholder {
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Image(image) => &image.token,
            Self::Chart(chart) => &chart.token,
            Self::Social(social) => &social.token,
        }
    }
}

/// Scan content for placeholders, in document order. Each match is
/// validated independently; malformed instances are skipped.
#[must_use]
pub fn parse(content: &str) -> Vec<Placeholder> {
    let mut found: Vec<(usize, Placeholder)> = Vec::new();

    for captures in IMAGE_RE.captures_iter(content) {
        let whole = captures.get(0).map_or("", |m| m.as_str());
        let start = captures.get(0).map_or(0, |m| m.start());
        let Some(kind) = ImageKind::parse(&captures[1]) else {
            continue;
        };
        let description = captures[2].trim().to_string();
        if description.is_empty() {
            continue;
        }
        found.push((
            start,
            Placeholder::Image(ImagePlaceholder {
                token: whole.to_string(),
                kind,
                description,
            }),
        ));
    }

    for captures in CHART_RE.captures_iter(content) {
        let whole = captures.get(0).map_or("", |m| m.as_str());
        let start = captures.get(0).map_or(0, |m| m.start());
        let Some(chart) = parse_chart(whole, &captures) else {
            continue;
        };
        found.push((start, Placeholder::Chart(chart)));
    }

    for captures in SOCIAL_RE.captures_iter(content) {
        let whole = captures.get(0).map_or("", |m| m.as_str());
        let start = captures.get(0).map_or(0, |m| m.start());
        let Some(social) = parse_social(whole, &captures[1]) else {
            continue;
        };
        found.push((start, Placeholder::Social(social)));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, placeholder)| placeholder).collect()
}

fn parse_chart(token: &str, captures: &regex::Captures<'_>) -> Option<ChartPlaceholder> {
    let chart_type = ChartType::parse(&captures[1])?;
    let title = captures[2].trim().to_string();
    if title.is_empty() {
        return None;
    }
    let labels: Vec<String> = captures[3]
        .split(',')
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect();
    let values: Vec<f64> = captures[4]
        .split(',')
        .map(|value| value.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    // Label/value parity is part of the grammar: a mismatch makes the whole
    // placeholder unparsable, never a partial render.
    if labels.is_empty() || labels.len() != values.len() {
        return None;
    }
    Some(ChartPlaceholder {
        token: token.to_string(),
        chart_type,
        title,
        labels,
        values,
    })
}

fn parse_social(token: &str, body: &str) -> Option<SocialPlaceholder> {
    let (url, inline) = match body.split_once("::DATA::") {
        Some((url, encoded)) => {
            let bytes = BASE64_STANDARD.decode(encoded).ok()?;
            let post: SocialPost = serde_json::from_slice(&bytes).ok()?;
            (url, Some(post))
        }
        None => (body, None),
    };
    if !url.starts_with("http") {
        return None;
    }
    Some(SocialPlaceholder {
        token: token.to_string(),
        url: url.to_string(),
        inline,
    })
}

/// Build a `SOCIAL` token, attaching the post inline when available so
/// resolution can skip the fetch.
#[must_use]
pub fn social_token(url: &str, inline: Option<&SocialPost>) -> String {
    match inline.and_then(|post| serde_json::to_vec(post).ok()) {
        Some(bytes) => format!("SOCIAL:{url}::DATA::{}", BASE64_STANDARD.encode(bytes)),
        None => format!("SOCIAL:{url}"),
    }
}

/// Replace exactly the first occurrence of `token`.
pub(crate) fn replace_once(content: &str, token: &str, replacement: &str) -> String {
    content.replacen(token, replacement, 1)
}

/// Remove the first occurrence of `token` outright.
pub(crate) fn remove_token(content: &str, token: &str) -> String {
    replace_once(content, token, "")
}

/// Verbatim placeholder instructions injected into the assembled prompt.
pub(crate) const GRAMMAR_INSTRUCTIONS: &str = "\
Where the article needs a visual or an embedded post, emit a placeholder on its own line, using exactly these forms:
- IMAGE:<kind>:<description> — kind is one of: hero, section, diagram. Emit exactly one hero image placeholder near the top.
- CHART:<type>|<title>|<label1,label2,...>|<value1,value2,...> — type is one of: bar, line, pie. The number of labels must equal the number of values.
- SOCIAL placeholders: only emit the exact SOCIAL tokens you were given, if any; never construct one yourself.
Do not wrap placeholders in markdown formatting and do not put any other text on a placeholder line.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_forms_in_document_order() {
        let post = SocialPost {
            url: "https://posts.example/1".to_string(),
            author: "Dana".to_string(),
            handle: "dana".to_string(),
            text: "Onboarding is broken".to_string(),
            like_count: 10,
            repost_count: 2,
            published_at: None,
        };
        let content = format!(
            "Intro\nIMAGE:hero:a team around a whiteboard\nBody\nCHART:bar|Churn by \
             month|Jan,Feb|4,9\nMore\n{}\n",
            social_token(&post.url, Some(&post))
        );

        let placeholders = parse(&content);
        assert_eq!(placeholders.len(), 3);
        assert!(matches!(
            &placeholders[0],
            Placeholder::Image(image) if image.kind == ImageKind::Hero
        ));
        assert!(matches!(
            &placeholders[1],
            Placeholder::Chart(chart) if chart.labels == vec!["Jan", "Feb"] && chart.values == vec![4.0, 9.0]
        ));
        match &placeholders[2] {
            Placeholder::Social(social) => {
                assert_eq!(social.url, "https://posts.example/1");
                assert_eq!(social.inline.as_ref(), Some(&post));
            }
            other => panic!("expected social placeholder, got {other:?}"),
        }
    }

    #[test]
    fn chart_label_value_mismatch_is_unparsable() {
        let content = "CHART:bar|Signups|Jan,Feb,Mar|1,2\n";
        assert!(parse(content).is_empty());
    }

    #[test]
    fn malformed_instance_does_not_poison_valid_ones() {
        let content = "IMAGE:poster:unknown kind\nIMAGE:section:a valid one\nCHART:scatter|Nope|a|1\n";
        let placeholders = parse(content);
        assert_eq!(placeholders.len(), 1);
        assert!(matches!(
            &placeholders[0],
            Placeholder::Image(image) if image.kind == ImageKind::Section
        ));
    }

    #[test]
    fn undecodable_inline_data_is_skipped() {
        let content = "SOCIAL:https://posts.example/1::DATA::not-base64!\n";
        assert!(parse(content).is_empty());
    }

    #[test]
    fn url_only_social_parses_without_inline() {
        let content = "SOCIAL:https://posts.example/2\n";
        let placeholders = parse(content);
        assert_eq!(placeholders.len(), 1);
        assert!(matches!(
            &placeholders[0],
            Placeholder::Social(social) if social.inline.is_none()
        ));
    }

    #[test]
    fn empty_content_parses_to_empty_list() {
        assert!(parse("").is_empty());
        assert!(parse("Just prose, no placeholders.").is_empty());
    }

    #[test]
    fn replace_once_touches_a_single_occurrence() {
        let content = "A\nIMAGE:hero:x\nB";
        let updated = replace_once(content, "IMAGE:hero:x", "![x](u)");
        assert_eq!(updated, "A\n![x](u)\nB");
    }
}
