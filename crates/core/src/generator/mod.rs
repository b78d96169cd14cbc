//! Step generators: the pluggable unit of work run once per campaign item.
//!
//! A generator takes one item input plus its settings and drives it through
//! a fixed sequence of steps (research, script, media, ...), reporting step
//! progress through an optional [`ProgressSink`]. Failures are returned as
//! [`GenerationOutcome::Failure`] so the orchestrator can decide whether to
//! retry from the checkpoint the generator left behind.

mod error;
mod http;
mod traits;
mod types;

use std::sync::Arc;

pub use error::GeneratorError;
pub use http::HttpStepGenerator;
pub use traits::{ProgressSink, StepGenerator};
pub use types::{
    GenerationOutcome, GenerationRequest, ItemSettings, ResumeContext, StepInfo,
};

use crate::config::{GeneratorBackend, GeneratorConfig};

/// Build the generator selected by configuration.
///
/// Returns `Ok(None)` when generation is disabled.
pub fn create_generator(
    config: &GeneratorConfig,
) -> Result<Option<Arc<dyn StepGenerator>>, GeneratorError> {
    match config.backend {
        GeneratorBackend::Disabled => Ok(None),
        GeneratorBackend::Http => {
            let http = config.http.clone().ok_or_else(|| {
                GeneratorError::Backend("generator.http section is required".to_string())
            })?;
            Ok(Some(Arc::new(HttpStepGenerator::new(http)?)))
        }
    }
}
