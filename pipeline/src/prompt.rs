use crate::{
    context::OrganizationContext,
    placeholder::{SocialPlaceholder, GRAMMAR_INSTRUCTIONS},
    Topic,
};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Visual callout categories, rotated across consecutive drafts for the
/// same organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HighlightType {
    Statistic,
    Quote,
    Takeaway,
    Warning,
    Tip,
    Definition,
    Process,
    Comparison,
}

impl HighlightType {
    pub const ALL: [Self; 8] = [
        Self::Statistic,
        Self::Quote,
        Self::Takeaway,
        Self::Warning,
        Self::Tip,
        Self::Definition,
        Self::Process,
        Self::Comparison,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statistic => "statistic",
            Self::Quote => "quote",
            Self::Takeaway => "takeaway",
            Self::Warning => "warning",
            Self::Tip => "tip",
            Self::Definition => "definition",
            Self::Process => "process",
            Self::Comparison => "comparison",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Turns the loaded organization context plus the requested topic into one
/// generation prompt. Deterministic given identical inputs.
///
/// Each optional context slice contributes its own delimited section. An
/// unavailable slice is either omitted (style: a generic voice is the
/// lesser evil) or replaced with an explicit do-not-fabricate instruction
/// (links, calls-to-action: an invented URL is a correctness hazard).
pub struct PromptAssembler {
    max_callouts: usize,
    cta_word_gap: usize,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            max_callouts: 3,
            cta_word_gap: 150,
        }
    }
}

impl PromptAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn assemble(
        &self,
        topic: &Topic,
        audience_description: Option<&str>,
        context: &OrganizationContext,
        previous_highlights: &BTreeSet<HighlightType>,
        request_ctas: bool,
        prior_social_embeds: &[SocialPlaceholder],
    ) -> String {
        let mut sections: Vec<String> = Vec::new();

        let mut task = format!(
            "Write a long-form article on the topic: \"{}\".",
            topic.title
        );
        if let Some(audience) = audience_description {
            let _ = write!(task, " The audience: {audience}.");
        }
        task.push_str(
            "\nRespond with a single JSON object: {\"title\": string, \"content\": string \
             (markdown), \"tags\": string[], \"keywords\": string[], \"suggested_actions\": \
             string[]}.",
        );
        sections.push(task);

        if let Some(voice) = self.voice_section(context) {
            sections.push(voice);
        }

        sections.push(self.links_section(context));
        sections.push(self.cta_section(context, request_ctas));
        sections.push(self.highlights_section(previous_highlights, request_ctas));
        sections.push(GRAMMAR_INSTRUCTIONS.to_string());

        if !prior_social_embeds.is_empty() {
            let mut section = String::from(
                "## Social embeds\nInclude each of the following tokens verbatim, each on its \
                 own line, at a point where the surrounding text relates to the post:",
            );
            for embed in prior_social_embeds {
                let _ = write!(section, "\n{}", embed.token);
            }
            sections.push(section);
        }

        sections.push(
            "## Accuracy\nNever invent named individuals, studies, or statistics. A claim that \
             needs a source may only cite the links provided above. If no suitable source was \
             provided, write the claim without attribution or leave it out."
                .to_string(),
        );

        sections.join("\n\n")
    }

    fn voice_section(&self, context: &OrganizationContext) -> Option<String> {
        if let Some(style) = &context.style {
            let mut section = format!("## Brand voice\nTone: {}.", style.tone);
            if !style.vocabulary.is_empty() {
                let _ = write!(
                    section,
                    "\nPreferred vocabulary: {}.",
                    style.vocabulary.join(", ")
                );
            }
            if !style.sample_excerpts.is_empty() {
                section.push_str("\nSample excerpts of prior writing:");
                for excerpt in &style.sample_excerpts {
                    let _ = write!(section, "\n> {excerpt}");
                }
            }
            return Some(section);
        }
        if let Some(description) = context
            .manual
            .as_ref()
            .and_then(|manual| manual.voice_description.as_deref())
        {
            return Some(format!("## Brand voice\n{description}"));
        }
        // No style data at all: omit the section. A generic voice degrades
        // quality less than instructing the model about missing data would.
        None
    }

    fn links_section(&self, context: &OrganizationContext) -> String {
        if context.preferred_links.is_empty() {
            return "## Outbound links\nNo approved outbound links were provided. Do not \
                    include or invent external links."
                .to_string();
        }
        let mut section = String::from(
            "## Outbound links\nWhere relevant, link to these approved destinations and no \
             others:",
        );
        for link in &context.preferred_links {
            let _ = write!(section, "\n- {}: {}", link.label, link.url);
        }
        section
    }

    fn cta_section(&self, context: &OrganizationContext, request_ctas: bool) -> String {
        if !request_ctas || context.preferred_ctas.is_empty() {
            return "## Calls to action\nOmit calls to action entirely. Do not invent action \
                    links or ask the reader to sign up for anything."
                .to_string();
        }
        let mut section = String::from("## Calls to action\nAvailable actions:");
        for cta in &context.preferred_ctas {
            let _ = write!(section, "\n- {} ({})", cta.text, cta.url);
        }
        let _ = write!(
            section,
            "\nUse at most two, none in the opening section, with at least {} words between \
             any two.",
            self.cta_word_gap
        );
        section
    }

    fn highlights_section(
        &self,
        previous_highlights: &BTreeSet<HighlightType>,
        request_ctas: bool,
    ) -> String {
        let available: Vec<&'static str> = HighlightType::ALL
            .into_iter()
            .filter(|t| !previous_highlights.contains(t))
            .map(HighlightType::as_str)
            .collect();

        let mut section = String::from("## Highlight callouts\n");
        if available.is_empty() {
            section.push_str("Do not include highlight callouts in this article.");
            return section;
        }
        let _ = write!(
            section,
            "Mark each callout as <aside data-highlight=\"TYPE\">...</aside> where TYPE is one \
             of: {}. Use at most {} callouts regardless of article length. Never place a \
             callout in the opening or closing section{}.",
            available.join(", "),
            self.max_callouts,
            if request_ctas {
                ", and never after the final call to action"
            } else {
                ""
            }
        );
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AvailabilityFlags, OrganizationContext};
    use draftforge_services::{PreferredCta, PreferredLink, StyleProfile};

    fn context() -> OrganizationContext {
        OrganizationContext {
            availability: AvailabilityFlags {
                has_style_data: true,
                has_cta_data: false,
                has_link_data: true,
            },
            style: Some(StyleProfile {
                tone: "direct, practical".to_string(),
                vocabulary: vec![],
                sample_excerpts: vec![],
            }),
            manual: None,
            preferred_links: vec![PreferredLink {
                url: "https://example.com/guide".to_string(),
                label: "Onboarding guide".to_string(),
            }],
            preferred_ctas: vec![],
            completeness_score: 67,
        }
    }

    fn topic() -> Topic {
        Topic {
            title: "Why onboarding flows fail".to_string(),
            preview_image_url: None,
        }
    }

    #[test]
    fn rotation_excludes_previous_types_and_caps_callouts() {
        let previous: BTreeSet<HighlightType> =
            [HighlightType::Statistic, HighlightType::Tip].into();
        let prompt =
            PromptAssembler::new().assemble(&topic(), None, &context(), &previous, false, &[]);

        assert!(prompt
            .contains("quote, takeaway, warning, definition, process, comparison"));
        assert!(!prompt.contains("statistic,"));
        assert!(prompt.contains("at most 3 callouts"));
    }

    #[test]
    fn zero_ctas_gets_an_explicit_omit_instruction() {
        let prompt = PromptAssembler::new().assemble(
            &topic(),
            None,
            &context(),
            &BTreeSet::new(),
            true,
            &[],
        );

        assert!(prompt.contains("Omit calls to action entirely"));
        assert!(!prompt.contains("Available actions"));
    }

    #[test]
    fn example_scenario_link_section_present_cta_section_omitted() {
        let previous: BTreeSet<HighlightType> =
            [HighlightType::Statistic, HighlightType::Tip].into();
        let prompt = PromptAssembler::new().assemble(
            &topic(),
            Some("product managers at seed-stage startups"),
            &context(),
            &previous,
            true,
            &[],
        );

        assert!(prompt.contains("https://example.com/guide"));
        assert!(!prompt.contains("Available actions"));
        // 6 of 8 highlight types remain available.
        let listed = HighlightType::ALL
            .into_iter()
            .filter(|t| prompt.contains(&format!("{}", t.as_str())))
            .count();
        assert!(listed >= 6);
    }

    #[test]
    fn assembly_is_deterministic() {
        let previous: BTreeSet<HighlightType> = [HighlightType::Quote].into();
        let assembler = PromptAssembler::new();
        let a = assembler.assemble(&topic(), None, &context(), &previous, false, &[]);
        let b = assembler.assemble(&topic(), None, &context(), &previous, false, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn prior_embed_tokens_appear_verbatim() {
        let embed = crate::placeholder::SocialPlaceholder::from_url("https://posts.example/9");
        let prompt = PromptAssembler::new().assemble(
            &topic(),
            None,
            &context(),
            &BTreeSet::new(),
            false,
            &[embed.clone()],
        );
        assert!(prompt.contains(&embed.token));
    }

    #[test]
    fn ctas_listed_with_spacing_rules_when_available() {
        let mut ctx = context();
        ctx.preferred_ctas = vec![PreferredCta {
            text: "Book a demo".to_string(),
            url: "https://example.com/demo".to_string(),
        }];
        let prompt =
            PromptAssembler::new().assemble(&topic(), None, &ctx, &BTreeSet::new(), true, &[]);
        assert!(prompt.contains("Available actions"));
        assert!(prompt.contains("at least 150 words between"));
        assert!(prompt.contains("none in the opening section"));
    }
}
