//! Types for the batch orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::CampaignStatus;
use crate::progress::ProgressSummary;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Campaign not found.
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    /// Invalid campaign or item state for operation.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Item index outside the campaign's item list.
    #[error("item index {index} out of range for campaign with {len} items")]
    ItemOutOfRange { index: usize, len: usize },

    /// Another trigger claimed the campaign or item first.
    #[error("campaign {0} is already being generated")]
    AlreadyRunning(String),

    /// Campaign store error.
    #[error("campaign store error: {0}")]
    Store(#[from] crate::campaign::StoreError),
}

impl OrchestratorError {
    pub(crate) fn invalid_state(expected: impl Into<String>, actual: impl ToString) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }
}

/// How an external stop request should leave the campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    /// Stop after the current item; the batch can be started again later.
    Pause,
    /// Stop after the current item for good.
    #[default]
    Cancel,
}

impl StopKind {
    /// Campaign status requested by this kind of stop.
    pub fn status(&self) -> CampaignStatus {
        match self {
            StopKind::Pause => CampaignStatus::Paused,
            StopKind::Cancel => CampaignStatus::Cancelled,
        }
    }
}

/// Result of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub campaign_id: String,
    /// Campaign status when the run ended.
    pub status: CampaignStatus,
    /// Item counts when the run ended.
    pub progress: ProgressSummary,
    /// Whether the run stopped on a pause or cancel request.
    pub stopped_early: bool,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Campaign runs executing in this process.
    pub active_runs: Vec<String>,
    /// Campaigns marked generating in the store.
    pub generating_count: usize,
    /// Campaigns paused and waiting to be resumed.
    pub paused_count: usize,
}
