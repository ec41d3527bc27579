use crate::{errors::PipelineError, opentelemetry::trace_generation};
use draftforge_services::{FinishReason, TextModel, TextRequest};
use serde::Deserialize;
use std::sync::Arc;

const SYSTEM_INSTRUCTIONS: &str = "You are a long-form content writer for a specific \
organization. Follow the brand, link, and placeholder instructions in the prompt exactly. \
Always respond with the single JSON object described in the prompt and nothing else.";

/// The documented JSON shape of a generation response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
}

/// Issues the assembled prompt to the text-generation service, once.
///
/// A truncated finish reason is a hard failure: cut-off structured output
/// cannot be safely parsed, and resuming is not possible. Retries, if any,
/// are a caller policy, not this layer's.
pub struct GenerationInvoker {
    model: Arc<dyn TextModel>,
    max_output_tokens: u32,
    temperature: f64,
}

impl GenerationInvoker {
    #[must_use]
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            max_output_tokens: 8192,
            temperature: 0.7,
        }
    }

    #[must_use]
    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub async fn invoke(&self, prompt_text: String) -> Result<GeneratedArticle, PipelineError> {
        let request = TextRequest {
            system_instructions: Some(SYSTEM_INSTRUCTIONS.to_string()),
            prompt_text,
            max_output_tokens: Some(self.max_output_tokens),
            temperature: Some(self.temperature),
        };

        let response = trace_generation(
            "generate_article",
            self.model.provider(),
            self.model.model_id(),
            self.model.generate(request),
        )
        .await?;

        if response.finish_reason == FinishReason::Truncated {
            return Err(PipelineError::GenerationTruncated);
        }

        serde_json::from_str(strip_code_fences(&response.content))
            .map_err(|err| PipelineError::GenerationMalformed(err.to_string()))
    }
}

/// Generators routinely wrap JSON output in a markdown code fence.
pub(crate) fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}
