mod cache;
mod context;
mod errors;
mod highlight;
mod images;
mod invoker;
mod opentelemetry;
mod persistence;
mod pipeline;
mod placeholder;
mod prompt;
mod queue;
mod social;

pub use cache::{Clock, GenerationCache, SystemClock};
pub use context::{AvailabilityFlags, ContextLoader, OrganizationContext};
pub use errors::PipelineError;
pub use highlight::HighlightBoxTracker;
pub use images::ImageEnrichmentStage;
pub use invoker::{GeneratedArticle, GenerationInvoker};
pub use persistence::PersistenceCoordinator;
pub use pipeline::{
    EnrichmentHandle, GenerateArticleParams, GenerateOutcome, GenerationPipeline, PipelineParams,
    Topic,
};
pub use placeholder::{
    parse, social_token, ChartPlaceholder, ChartType, ImageKind, ImagePlaceholder, Placeholder,
    SocialPlaceholder,
};
pub use prompt::{HighlightType, PromptAssembler};
pub use queue::FetchQueue;
pub use social::SocialProofEnrichmentStage;
