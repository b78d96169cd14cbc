//! Campaign and per-item status types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A batch generation job: an ordered list of items generated one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique campaign identifier.
    pub id: String,
    /// Current lifecycle status.
    pub status: CampaignStatus,
    /// Opaque per-item inputs (e.g. topics), addressed by index.
    pub items: Vec<serde_json::Value>,
    /// Lifecycle record per item index.
    #[serde(default)]
    pub item_statuses: ItemStatuses,
    /// Artifacts produced so far, in completion order.
    #[serde(default)]
    pub generated_artifact_ids: Vec<String>,
    /// Publishing automation settings shared by all items.
    #[serde(default)]
    pub automation_settings: AutomationSettings,
    /// Owner of the campaign, forwarded to the generator.
    pub user_id: String,
    /// Workspace the campaign belongs to, forwarded to the generator.
    pub workspace_id: String,
    /// Optimistic concurrency token, bumped on every update.
    pub version: u64,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
    /// When the campaign was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Number of items in the campaign.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Status of the item at `index`, if one has been recorded.
    pub fn item_status(&self, index: usize) -> Option<&ItemStatus> {
        self.item_statuses.get(index)
    }

    /// Whether `index` addresses an item of this campaign.
    pub fn is_valid_index(&self, index: usize) -> bool {
        index < self.items.len()
    }
}

/// Campaign lifecycle status.
///
/// Transitions: `draft | paused -> generating -> completed | failed`, with
/// `paused` and `cancelled` reachable from `generating` by external request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Generating,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl CampaignStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [CampaignStatus; 6] = [
        CampaignStatus::Draft,
        CampaignStatus::Generating,
        CampaignStatus::Paused,
        CampaignStatus::Cancelled,
        CampaignStatus::Completed,
        CampaignStatus::Failed,
    ];

    /// Stable string form, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Generating => "generating",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Cancelled => "cancelled",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Whether a batch run may be started from this status.
    pub fn can_start(&self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Paused)
    }

    /// Whether an external stop request has been made.
    pub fn is_stop_requested(&self) -> bool {
        matches!(self, CampaignStatus::Paused | CampaignStatus::Cancelled)
    }

    /// Whether the batch has finished running.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle record of a single item.
///
/// The variants carry exactly the fields that are meaningful in each state,
/// so a completed item always has an artifact and a failed one an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not started yet.
    Pending,

    /// Generation in progress.
    Generating {
        started_at: DateTime<Utc>,
        /// Live step marker, updated best-effort while generating.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<StepProgress>,
    },

    /// Generated successfully.
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
        completed_at: DateTime<Utc>,
        artifact_id: String,
    },

    /// Generation failed.
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
        completed_at: DateTime<Utc>,
        error: String,
        /// Step at which generation failed, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_step: Option<u32>,
        /// Resumable checkpoint left by the last attempt.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intermediate_data: Option<IntermediateData>,
    },
}

impl ItemStatus {
    /// Stable string name of the status.
    pub fn state_type(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Generating { .. } => "generating",
            ItemStatus::Completed { .. } => "completed",
            ItemStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ItemStatus::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemStatus::Failed { .. })
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, ItemStatus::Generating { .. })
    }

    /// Artifact produced by a completed item.
    pub fn artifact_id(&self) -> Option<&str> {
        match self {
            ItemStatus::Completed { artifact_id, .. } => Some(artifact_id),
            _ => None,
        }
    }

    /// Error recorded for a failed item.
    pub fn error(&self) -> Option<&str> {
        match self {
            ItemStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Live progress marker of an item being generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    /// 1-based step currently running.
    pub current_step: u32,
    /// Human readable stage name reported by the generator.
    pub stage_name: String,
    /// Progress within the stage, 0-100.
    pub stage_progress: u8,
}

/// Opaque resumable checkpoint produced by a failed generation attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntermediateData {
    /// Last step that finished successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_step: Option<u32>,
    /// Generator-specific state, passed back untouched on retry.
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl IntermediateData {
    /// Checkpoint recording that `step` finished.
    pub fn at_step(step: u32) -> Self {
        Self {
            completed_step: Some(step),
            data: serde_json::Map::new(),
        }
    }

    /// Attach a generator-specific value.
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Step a retry should resume at.
    pub fn resume_step(&self) -> u32 {
        self.completed_step
            .map(|step| step.saturating_add(1))
            .unwrap_or(1)
    }
}

/// Index-keyed item status arena.
///
/// Serialised as a JSON object keyed by the decimal index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemStatuses(BTreeMap<usize, ItemStatus>);

impl ItemStatuses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena with an explicit `pending` entry for each of `count` items.
    pub fn all_pending(count: usize) -> Self {
        Self((0..count).map(|index| (index, ItemStatus::Pending)).collect())
    }

    pub fn get(&self, index: usize) -> Option<&ItemStatus> {
        self.0.get(&index)
    }

    pub fn insert(&mut self, index: usize, status: ItemStatus) -> Option<ItemStatus> {
        self.0.insert(index, status)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ItemStatus)> {
        self.0.iter().map(|(index, status)| (*index, status))
    }

    /// Insert `pending` for every index below `count` that has no entry.
    ///
    /// Returns the number of entries added.
    pub fn fill_pending(&mut self, count: usize) -> usize {
        let mut added = 0;
        for index in 0..count {
            if let std::collections::btree_map::Entry::Vacant(entry) = self.0.entry(index) {
                entry.insert(ItemStatus::Pending);
                added += 1;
            }
        }
        added
    }

    /// Whether the item at `index` already completed.
    pub fn is_completed(&self, index: usize) -> bool {
        self.get(index).is_some_and(ItemStatus::is_completed)
    }
}

impl FromIterator<(usize, ItemStatus)> for ItemStatuses {
    fn from_iter<I: IntoIterator<Item = (usize, ItemStatus)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How generated items are scheduled for publishing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Publish as soon as generated (no timestamp).
    #[default]
    Immediate,
    /// Spread items evenly from a start date.
    Continuous,
    /// Explicit per-item dates.
    Scheduled,
    /// Any mode this version does not know about.
    #[serde(other)]
    Unknown,
}

/// Campaign-level publishing automation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationSettings {
    #[serde(default)]
    pub mode: ScheduleMode,
    /// Target platforms; no platforms means nothing gets scheduled.
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items_per_day: Option<u32>,
    /// Explicit publish date per item index (scheduled mode).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schedule: BTreeMap<usize, DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_status_serialization_is_tagged() {
        let status = ItemStatus::Completed {
            started_at: None,
            completed_at: Utc::now(),
            artifact_id: "artifact-1".to_string(),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["artifact_id"], "artifact-1");
        assert!(json.get("started_at").is_none());
    }

    #[test]
    fn test_failed_status_requires_error() {
        let result: Result<ItemStatus, _> = serde_json::from_value(json!({
            "status": "failed",
            "completed_at": "2024-01-01T00:00:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_item_statuses_keys_are_decimal_strings() {
        let mut statuses = ItemStatuses::new();
        statuses.insert(0, ItemStatus::Pending);
        statuses.insert(12, ItemStatus::Pending);

        let json = serde_json::to_value(&statuses).unwrap();
        assert_eq!(json["0"]["status"], "pending");
        assert_eq!(json["12"]["status"], "pending");

        let parsed: ItemStatuses = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, statuses);
    }

    #[test]
    fn test_fill_pending_keeps_existing_entries() {
        let mut statuses = ItemStatuses::new();
        statuses.insert(
            1,
            ItemStatus::Completed {
                started_at: None,
                completed_at: Utc::now(),
                artifact_id: "a".to_string(),
            },
        );

        let added = statuses.fill_pending(3);

        assert_eq!(added, 2);
        assert_eq!(statuses.len(), 3);
        assert!(statuses.is_completed(1));
        assert_eq!(statuses.get(0), Some(&ItemStatus::Pending));
        assert_eq!(statuses.get(2), Some(&ItemStatus::Pending));
    }

    #[test]
    fn test_intermediate_data_resume_step() {
        assert_eq!(IntermediateData::default().resume_step(), 1);
        assert_eq!(IntermediateData::at_step(1).resume_step(), 2);
        assert_eq!(IntermediateData::at_step(u32::MAX).resume_step(), u32::MAX);
    }

    #[test]
    fn test_intermediate_data_keeps_opaque_fields() {
        let data: IntermediateData = serde_json::from_value(json!({
            "completed_step": 2,
            "script": "draft text"
        }))
        .unwrap();

        assert_eq!(data.completed_step, Some(2));
        assert_eq!(data.data["script"], "draft text");

        let back = serde_json::to_value(&data).unwrap();
        assert_eq!(back["script"], "draft text");
    }

    #[test]
    fn test_unknown_schedule_mode() {
        let settings: AutomationSettings =
            serde_json::from_value(json!({ "mode": "weekly", "platforms": ["x"] })).unwrap();
        assert_eq!(settings.mode, ScheduleMode::Unknown);
    }

    #[test]
    fn test_campaign_status_round_trip_str() {
        for status in CampaignStatus::ALL {
            assert_eq!(CampaignStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CampaignStatus::parse("archived"), None);
    }

    #[test]
    fn test_campaign_status_predicates() {
        assert!(CampaignStatus::Draft.can_start());
        assert!(CampaignStatus::Paused.can_start());
        assert!(!CampaignStatus::Generating.can_start());
        assert!(CampaignStatus::Cancelled.is_stop_requested());
        assert!(CampaignStatus::Failed.is_terminal());
    }
}
