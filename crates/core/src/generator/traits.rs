//! Trait definitions for the generator module.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::GeneratorError;
use super::types::{GenerationOutcome, GenerationRequest, StepInfo};

/// Receives step progress from a running generation.
///
/// Reports are best-effort. Implementations must not fail and must tolerate
/// being called any number of times, including never.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, info: StepInfo);
}

/// A pluggable multi-step unit of work that turns one item into an artifact.
#[async_trait]
pub trait StepGenerator: Send + Sync {
    /// Returns the name of this generator implementation.
    fn name(&self) -> &str;

    /// Runs the generation for a single item.
    ///
    /// A failed generation is reported as `Ok(GenerationOutcome::Failure)`.
    /// `Err` is reserved for the backend being unusable.
    async fn run(
        &self,
        request: GenerationRequest,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<GenerationOutcome, GeneratorError>;
}
