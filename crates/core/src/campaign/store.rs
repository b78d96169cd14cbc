//! Campaign storage trait and types.

use thiserror::Error;

use crate::campaign::{AutomationSettings, Campaign, CampaignStatus, ItemStatuses};

/// Error type for campaign store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Campaign not found.
    #[error("campaign not found: {0}")]
    NotFound(String),

    /// A conditional update lost against a concurrent writer.
    #[error("version conflict on campaign {campaign_id}: expected {expected}, found {actual}")]
    VersionConflict {
        campaign_id: String,
        expected: u64,
        actual: u64,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Shallow partial update of a campaign.
///
/// Fields left as `None` are not touched. Maps are replaced wholesale, so
/// callers read-modify-write `item_statuses` themselves.
#[derive(Debug, Clone, Default)]
pub struct CampaignUpdate {
    /// Only apply the update if the stored version still matches.
    pub expected_version: Option<u64>,
    pub status: Option<CampaignStatus>,
    pub item_statuses: Option<ItemStatuses>,
    pub generated_artifact_ids: Option<Vec<String>>,
}

impl CampaignUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_item_statuses(mut self, item_statuses: ItemStatuses) -> Self {
        self.item_statuses = Some(item_statuses);
        self
    }

    pub fn with_generated_artifact_ids(mut self, ids: Vec<String>) -> Self {
        self.generated_artifact_ids = Some(ids);
        self
    }

    /// Make the update conditional on the stored version.
    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Request to create a new campaign (external CRUD path).
#[derive(Debug, Clone)]
pub struct CreateCampaignRequest {
    pub user_id: String,
    pub workspace_id: String,
    pub items: Vec<serde_json::Value>,
    pub automation_settings: AutomationSettings,
}

/// Filter for listing campaigns.
#[derive(Debug, Clone)]
pub struct CampaignFilter {
    /// Filter by status.
    pub status: Option<CampaignStatus>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for CampaignFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Durable repository for campaign records.
pub trait CampaignStore: Send + Sync {
    /// Get a campaign by ID.
    fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError>;

    /// Apply a shallow partial update and return the stored result.
    fn update(&self, id: &str, update: CampaignUpdate) -> Result<Campaign, StoreError>;

    /// List campaigns matching the filter, oldest first.
    fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, StoreError>;
}
