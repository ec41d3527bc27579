use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input for a single text-generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instructions: Option<String>,
    pub prompt_text: String,
    /// Upper bound on the size of the generated output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Amount of randomness injected into the response. Ranges from 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Why the text-generation service stopped emitting output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// The output was cut off before completion. Structured output carrying
    /// this finish reason cannot be safely parsed.
    Truncated,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    pub content: String,
    pub finish_reason: FinishReason,
}

/// What the rendering service should produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderSpec {
    Image {
        description: String,
    },
    Chart {
        chart_type: String,
        title: String,
        labels: Vec<String>,
        values: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub spec: RenderSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_guidelines: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResponse {
    pub success: bool,
    #[serde(default)]
    pub artifact_url: Option<String>,
}

/// A short-form third-party post. Ephemeral: obtained from the archive or
/// decoded out of a placeholder, rendered into the draft, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub url: String,
    pub author: String,
    pub handle: String,
    pub text: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub repost_count: u64,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

/// Pre-computed voice profile produced by the style aggregation job.
/// Read-only from this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub tone: String,
    #[serde(default)]
    pub vocabulary: Vec<String>,
    #[serde(default)]
    pub sample_excerpts: Vec<String>,
}

/// Manually entered fallbacks used when no aggregated style data exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualProfile {
    #[serde(default)]
    pub voice_description: Option<String>,
    #[serde(default)]
    pub audience_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredLink {
    pub url: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredCta {
    pub text: String,
    pub url: String,
}

pub type DraftId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Saved and readable, background enrichment may still patch content.
    Enriching,
    /// Both enrichment stages reported completion or timed out; the content
    /// will not be mutated automatically anymore.
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub organization_id: String,
    pub title: String,
    pub content: String,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDraft {
    pub organization_id: String,
    pub title: String,
    pub content: String,
}
