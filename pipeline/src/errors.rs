use thiserror::Error;

/// Hard pipeline failures. Everything else in the pipeline degrades locally
/// and never crosses a stage boundary as an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A service call on the hard path (generation, the initial draft save,
    /// the organization lookup) failed.
    #[error("Service error: {0}")]
    Service(#[from] draftforge_services::ServiceError),
    /// The generation service cut the output off before completion.
    /// Truncated structured output cannot be safely parsed.
    #[error("Generation output was truncated before completion")]
    GenerationTruncated,
    /// The generation service returned something other than the documented
    /// JSON shape.
    #[error("Generation output was malformed: {0}")]
    GenerationMalformed(String),
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),
}
