//! Campaign batch generation API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use batchgen_core::{
    progress, BatchOrchestrator, Campaign, CampaignStatus, ItemStatus, OrchestratorError,
    ProgressSnapshot, StopKind, StoreError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for stopping a batch
#[derive(Debug, Default, Deserialize)]
pub struct CancelBatchBody {
    /// "pause" to allow resuming later, "cancel" otherwise (default)
    #[serde(default)]
    pub mode: StopKind,
}

/// Response for batch operations
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub campaign_id: String,
    pub status: CampaignStatus,
    pub message: String,
}

/// Response for item operations
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub campaign_id: String,
    pub index: usize,
    pub item: ItemStatus,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct CampaignErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<CampaignErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(CampaignErrorResponse {
            error: error.into(),
        }),
    )
}

impl From<OrchestratorError> for CampaignErrorResponse {
    fn from(e: OrchestratorError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

fn orchestrator_error(e: OrchestratorError) -> ApiError {
    let status = match &e {
        OrchestratorError::CampaignNotFound(_)
        | OrchestratorError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        OrchestratorError::InvalidState { .. }
        | OrchestratorError::AlreadyRunning(_)
        | OrchestratorError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
        OrchestratorError::ItemOutOfRange { .. } => StatusCode::BAD_REQUEST,
        OrchestratorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(CampaignErrorResponse::from(e)))
}

fn require_orchestrator(state: &AppState) -> Result<&BatchOrchestrator, ApiError> {
    state.orchestrator().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Batch generation not available. Check that a generator backend is configured.",
        )
    })
}

fn load_campaign(state: &AppState, id: &str) -> Result<Campaign, ApiError> {
    match state.store().get(id) {
        Ok(Some(campaign)) => Ok(campaign),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Campaign not found: {}", id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get a campaign by ID
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    load_campaign(&state, &id).map(Json)
}

/// Start (or resume) batch generation in the background
pub async fn generate_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError> {
    let orchestrator = require_orchestrator(&state)?;
    let campaign = orchestrator.spawn_start(&id).map_err(orchestrator_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchResponse {
            campaign_id: campaign.id,
            status: campaign.status,
            message: format!(
                "Batch generation started for {} items",
                campaign.items.len()
            ),
        }),
    ))
}

/// Get batch progress
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let campaign = load_campaign(&state, &id)?;
    Ok(Json(progress::snapshot(&campaign)))
}

/// Pause or cancel a running batch after the current item
pub async fn cancel_batch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<CancelBatchBody>>,
) -> Result<Json<BatchResponse>, ApiError> {
    let orchestrator = require_orchestrator(&state)?;
    let mode = body.map(|Json(b)| b.mode).unwrap_or_default();

    let campaign = orchestrator
        .request_stop(&id, mode)
        .map_err(orchestrator_error)?;

    Ok(Json(BatchResponse {
        campaign_id: campaign.id,
        status: campaign.status,
        message: "Batch will stop after the current item".to_string(),
    }))
}

/// Manually override the status of one item
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
    Json(item): Json<ItemStatus>,
) -> Result<Json<ItemResponse>, ApiError> {
    let orchestrator = require_orchestrator(&state)?;

    let item = orchestrator
        .override_item(&id, index, item)
        .map_err(orchestrator_error)?;

    Ok(Json(ItemResponse {
        campaign_id: id,
        index,
        item,
    }))
}

/// Retry one failed item in the background
pub async fn retry_item(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let orchestrator = require_orchestrator(&state)?;

    let campaign = orchestrator
        .spawn_retry_item(&id, index)
        .map_err(orchestrator_error)?;

    let item = campaign
        .item_status(index)
        .cloned()
        .unwrap_or(ItemStatus::Pending);

    Ok((
        StatusCode::ACCEPTED,
        Json(ItemResponse {
            campaign_id: campaign.id,
            index,
            item,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                OrchestratorError::CampaignNotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                OrchestratorError::InvalidState {
                    expected: "draft".to_string(),
                    actual: "completed".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                OrchestratorError::AlreadyRunning("x".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                OrchestratorError::ItemOutOfRange { index: 3, len: 1 },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrchestratorError::Store(StoreError::Database("locked".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let (status, _) = orchestrator_error(error);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_cancel_body_defaults_to_cancel() {
        let body: CancelBatchBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.mode, StopKind::Cancel);

        let body: CancelBatchBody = serde_json::from_str(r#"{"mode":"pause"}"#).unwrap();
        assert_eq!(body.mode, StopKind::Pause);
    }
}
