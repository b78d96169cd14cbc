//! Campaign records and their durable storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteCampaignStore;
pub use store::{CampaignFilter, CampaignStore, CampaignUpdate, CreateCampaignRequest, StoreError};
pub use types::{
    AutomationSettings, Campaign, CampaignStatus, IntermediateData, ItemStatus, ItemStatuses,
    ScheduleMode, StepProgress,
};
