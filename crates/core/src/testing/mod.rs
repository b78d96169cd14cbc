//! Testing utilities and mock implementations.
//!
//! This module provides a mock step generator and campaign fixtures, allowing
//! batch runs to be exercised end to end without a real generation backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use batchgen_core::testing::{fixtures, MockStepGenerator};
//!
//! let store = SqliteCampaignStore::in_memory()?;
//! let campaign = store.create(fixtures::create_request(3))?;
//! let generator = MockStepGenerator::new();
//!
//! // Build a BatchOrchestrator around them...
//! ```

mod mock_generator;

pub use mock_generator::{CallHook, MockStepGenerator};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use serde_json::json;

    use crate::campaign::{
        AutomationSettings, Campaign, CampaignStatus, CreateCampaignRequest, IntermediateData,
        ItemStatus, ItemStatuses,
    };

    /// Item inputs `"topic 0"`, `"topic 1"`, ...
    pub fn items(count: usize) -> Vec<serde_json::Value> {
        (0..count).map(|i| json!(format!("topic {}", i))).collect()
    }

    /// Create request for a draft campaign with `count` items.
    pub fn create_request(count: usize) -> CreateCampaignRequest {
        CreateCampaignRequest {
            user_id: "user-1".to_string(),
            workspace_id: "workspace-1".to_string(),
            items: items(count),
            automation_settings: AutomationSettings::default(),
        }
    }

    /// In-memory draft campaign with `count` items and no item statuses.
    pub fn campaign(count: usize) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: "campaign-1".to_string(),
            status: CampaignStatus::Draft,
            items: items(count),
            item_statuses: ItemStatuses::new(),
            generated_artifact_ids: Vec::new(),
            automation_settings: AutomationSettings::default(),
            user_id: "user-1".to_string(),
            workspace_id: "workspace-1".to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Completed item status.
    pub fn completed_status(artifact_id: &str) -> ItemStatus {
        ItemStatus::Completed {
            started_at: Some(Utc::now()),
            completed_at: Utc::now(),
            artifact_id: artifact_id.to_string(),
        }
    }

    /// Failed item status with no step information.
    pub fn failed_status(error: &str) -> ItemStatus {
        ItemStatus::Failed {
            started_at: Some(Utc::now()),
            completed_at: Utc::now(),
            error: error.to_string(),
            failed_step: None,
            intermediate_data: None,
        }
    }

    /// Failed item status that got past `completed_step` before failing.
    pub fn failed_status_at_step(error: &str, completed_step: u32) -> ItemStatus {
        ItemStatus::Failed {
            started_at: Some(Utc::now()),
            completed_at: Utc::now(),
            error: error.to_string(),
            failed_step: Some(completed_step + 1),
            intermediate_data: Some(IntermediateData::at_step(completed_step)),
        }
    }
}
