//! Publish-time computation for campaign items.

use chrono::{DateTime, Duration, Utc};

use crate::campaign::{AutomationSettings, Campaign, ScheduleMode};
use crate::generator::ItemSettings;

/// Compute when the item at `item_index` should be published.
///
/// Returns `None` when the item is not scheduled: no target platforms,
/// immediate or unknown mode, a continuous schedule with no start date, or
/// no explicit date for this index.
pub fn compute(settings: &AutomationSettings, item_index: usize) -> Option<DateTime<Utc>> {
    if settings.platforms.is_empty() {
        return None;
    }

    match settings.mode {
        ScheduleMode::Continuous => {
            let start = settings.start_date?;
            let per_day = match settings.max_items_per_day {
                Some(n) if n > 0 => n as u64,
                _ => 1,
            };
            // Whole hours only: floor(index * 24 / per_day).
            let hours = (item_index as u64).checked_mul(24)? / per_day;
            let offset = Duration::try_hours(i64::try_from(hours).ok()?)?;
            start.checked_add_signed(offset)
        }
        ScheduleMode::Scheduled => settings.schedule.get(&item_index).copied(),
        ScheduleMode::Immediate | ScheduleMode::Unknown => None,
    }
}

/// Settings handed to the generator for one item of `campaign`.
pub fn item_settings(campaign: &Campaign, item_index: usize) -> ItemSettings {
    ItemSettings {
        automation: campaign.automation_settings.clone(),
        scheduled_publish_at: compute(&campaign.automation_settings, item_index),
    }
}
