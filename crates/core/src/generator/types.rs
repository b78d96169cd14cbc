//! Request and outcome types for step generators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::{AutomationSettings, IntermediateData};

/// Per-item settings handed to the generator.
///
/// The campaign's automation settings plus the publish time computed for
/// this particular item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSettings {
    #[serde(flatten)]
    pub automation: AutomationSettings,
    /// When the item should be published, if it is scheduled at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_publish_at: Option<DateTime<Utc>>,
}

/// Resume information for a retried generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeContext {
    pub is_retry: bool,
    /// Step at which the previous attempt failed.
    pub failed_step: Option<u32>,
    /// First step the generator should run.
    pub resume_step: u32,
    /// Checkpoint left by the previous attempt.
    pub intermediate_data: Option<IntermediateData>,
}

impl ResumeContext {
    /// Resume context for a retry following a failed attempt.
    pub fn after_failure(
        failed_step: Option<u32>,
        intermediate_data: Option<IntermediateData>,
    ) -> Self {
        let resume_step = intermediate_data
            .as_ref()
            .map(IntermediateData::resume_step)
            .unwrap_or(1);

        Self {
            is_retry: true,
            failed_step,
            resume_step,
            intermediate_data,
        }
    }
}

/// A single unit of work for a step generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub campaign_id: String,
    pub item_index: usize,
    /// Opaque item input, e.g. a topic.
    pub item: serde_json::Value,
    pub settings: ItemSettings,
    pub user_id: String,
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeContext>,
}

impl GenerationRequest {
    /// Same request, resuming from a previous failure.
    pub fn with_resume(mut self, resume: ResumeContext) -> Self {
        self.resume = Some(resume);
        self
    }
}

/// Result of running a step generator on one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// The item was generated.
    Success {
        artifact_id: String,
        #[serde(default)]
        metadata: serde_json::Value,
    },

    /// The item could not be generated.
    Failure {
        error: String,
        /// Whether an automatic retry is worthwhile.
        #[serde(default)]
        retryable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_step: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intermediate_data: Option<IntermediateData>,
    },
}

impl GenerationOutcome {
    /// Successful outcome with no metadata.
    pub fn success(artifact_id: impl Into<String>) -> Self {
        Self::Success {
            artifact_id: artifact_id.into(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Failure outcome without step information.
    pub fn failure(error: impl Into<String>, retryable: bool) -> Self {
        Self::Failure {
            error: error.into(),
            retryable,
            failed_step: None,
            intermediate_data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether this is a failure that warrants an automatic retry.
    pub fn is_retryable_failure(&self) -> bool {
        matches!(self, Self::Failure { retryable: true, .. })
    }
}

/// A progress report from inside a running generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// 1-based step number.
    pub step: u32,
    pub stage_name: String,
    /// Progress within the stage, 0-100.
    pub progress: u8,
}

impl StepInfo {
    pub fn new(step: u32, stage_name: impl Into<String>, progress: u8) -> Self {
        Self {
            step,
            stage_name: stage_name.into(),
            progress: progress.min(100),
        }
    }
}
