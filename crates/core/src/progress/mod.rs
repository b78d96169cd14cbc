//! Aggregate progress of a campaign batch run.

use serde::{Deserialize, Serialize};

use crate::campaign::{Campaign, CampaignStatus, ItemStatus, ItemStatuses};

/// Number of steps a generation goes through.
pub const TOTAL_STEPS: u32 = 5;

const STAGE_NAMES: [&str; TOTAL_STEPS as usize] = [
    "Researching topic",
    "Writing script",
    "Generating media",
    "Assembling",
    "Finalizing",
];

/// Stage name shown for an item that has not reported a step yet.
pub const STARTING_STAGE: &str = "Starting";

/// Display name of a 1-based generation step.
pub fn stage_name(step: u32) -> String {
    step.checked_sub(1)
        .and_then(|i| STAGE_NAMES.get(i as usize))
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Step {}", step))
}

/// Percentage of the generation done once `step` is running.
pub fn step_percentage(step: u32) -> u8 {
    (step.saturating_mul(100) / TOTAL_STEPS).min(100) as u8
}

/// The item currently being generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub index: usize,
    pub stage: String,
    pub progress: u8,
}

/// Counts of items by status.
///
/// `completed + failed + pending + in_progress == total` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub current_item: Option<CurrentItem>,
}

impl ProgressSummary {
    /// Whether every item has reached a final state.
    pub fn is_finished(&self) -> bool {
        self.pending == 0 && self.in_progress == 0
    }
}

/// Count item statuses and describe the item in flight.
pub fn summarize(statuses: &ItemStatuses) -> ProgressSummary {
    let mut summary = ProgressSummary {
        total: statuses.len(),
        ..Default::default()
    };

    for (index, status) in statuses.iter() {
        match status {
            ItemStatus::Pending => summary.pending += 1,
            ItemStatus::Completed { .. } => summary.completed += 1,
            ItemStatus::Failed { .. } => summary.failed += 1,
            ItemStatus::Generating { progress, .. } => {
                summary.in_progress += 1;
                if summary.current_item.is_none() {
                    summary.current_item = Some(match progress {
                        Some(p) => CurrentItem {
                            index,
                            stage: stage_name(p.current_step),
                            progress: step_percentage(p.current_step),
                        },
                        None => CurrentItem {
                            index,
                            stage: STARTING_STAGE.to_string(),
                            progress: 0,
                        },
                    });
                }
            }
        }
    }

    summary
}

/// Error recorded against a single failed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub index: usize,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<u32>,
}

/// Progress view of a campaign as served to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub campaign_id: String,
    pub status: CampaignStatus,
    #[serde(flatten)]
    pub summary: ProgressSummary,
    pub errors: Vec<ItemError>,
}

/// Build the progress view of a campaign.
///
/// Records that predate per-item tracking have no item statuses; their
/// counts are derived from the item list and the artifacts produced.
pub fn snapshot(campaign: &Campaign) -> ProgressSnapshot {
    let summary = if campaign.item_statuses.is_empty() {
        let total = campaign.items.len();
        let completed = campaign.generated_artifact_ids.len().min(total);
        ProgressSummary {
            total,
            completed,
            pending: total - completed,
            ..Default::default()
        }
    } else {
        summarize(&campaign.item_statuses)
    };

    let errors = campaign
        .item_statuses
        .iter()
        .filter_map(|(index, status)| match status {
            ItemStatus::Failed {
                error, failed_step, ..
            } => Some(ItemError {
                index,
                error: error.clone(),
                failed_step: *failed_step,
            }),
            _ => None,
        })
        .collect();

    ProgressSnapshot {
        campaign_id: campaign.id.clone(),
        status: campaign.status,
        summary,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::StepProgress;
    use crate::testing::fixtures;
    use chrono::Utc;

    fn generating(step: Option<u32>) -> ItemStatus {
        ItemStatus::Generating {
            started_at: Utc::now(),
            progress: step.map(|current_step| StepProgress {
                current_step,
                stage_name: String::new(),
                stage_progress: 0,
            }),
        }
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(stage_name(1), "Researching topic");
        assert_eq!(stage_name(5), "Finalizing");
        assert_eq!(stage_name(0), "Step 0");
        assert_eq!(stage_name(7), "Step 7");
    }

    #[test]
    fn test_step_percentage() {
        assert_eq!(step_percentage(1), 20);
        assert_eq!(step_percentage(3), 60);
        assert_eq!(step_percentage(5), 100);
        assert_eq!(step_percentage(9), 100);
    }

    #[test]
    fn test_summarize_counts_add_up() {
        let statuses: ItemStatuses = vec![
            (0, fixtures::completed_status("a-0")),
            (1, fixtures::failed_status("boom")),
            (2, generating(Some(2))),
            (3, ItemStatus::Pending),
            (4, ItemStatus::Pending),
        ]
        .into_iter()
        .collect();

        let summary = summarize(&statuses);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.pending, 2);
        assert_eq!(
            summary.completed + summary.failed + summary.pending + summary.in_progress,
            summary.total
        );
        assert_eq!(
            summary.current_item,
            Some(CurrentItem {
                index: 2,
                stage: "Writing script".to_string(),
                progress: 40,
            })
        );
        assert!(!summary.is_finished());
    }

    #[test]
    fn test_current_item_without_step_metadata() {
        let statuses: ItemStatuses = vec![(0, generating(None))].into_iter().collect();
        let current = summarize(&statuses).current_item.unwrap();
        assert_eq!(current.stage, "Starting");
        assert_eq!(current.progress, 0);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&ItemStatuses::new());
        assert_eq!(summary, ProgressSummary::default());
        assert!(summary.is_finished());
    }

    #[test]
    fn test_snapshot_of_legacy_record() {
        let mut campaign = fixtures::campaign(4);
        campaign.generated_artifact_ids = vec!["a".to_string(), "b".to_string()];

        let snap = snapshot(&campaign);

        assert_eq!(snap.summary.total, 4);
        assert_eq!(snap.summary.completed, 2);
        assert_eq!(snap.summary.pending, 2);
        assert!(snap.errors.is_empty());
    }

    #[test]
    fn test_snapshot_lists_item_errors() {
        let mut campaign = fixtures::campaign(2);
        campaign.item_statuses.insert(0, fixtures::completed_status("a-0"));
        campaign.item_statuses.insert(1, fixtures::failed_status("quota exceeded"));

        let snap = snapshot(&campaign);

        assert_eq!(snap.errors.len(), 1);
        assert_eq!(snap.errors[0].index, 1);
        assert_eq!(snap.errors[0].error, "quota exceeded");

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["status"], "draft");
    }
}
