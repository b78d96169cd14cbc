//! Batch orchestrator implementation.
//!
//! Drives the items of a campaign through the step generator one at a time:
//! - Every item transition is persisted before the next step starts
//! - Pause/cancel requests are honoured between items
//! - A retryable failure is retried once, resuming from its checkpoint

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::campaign::{
    Campaign, CampaignFilter, CampaignStatus, CampaignStore, CampaignUpdate, ItemStatus,
    StepProgress, StoreError,
};
use crate::generator::{
    GenerationOutcome, GenerationRequest, GeneratorError, ProgressSink, ResumeContext,
    StepGenerator, StepInfo,
};
use crate::metrics;
use crate::progress::{self, ProgressSummary};
use crate::schedule;

use super::config::OrchestratorConfig;
use super::types::{BatchSummary, OrchestratorError, OrchestratorStatus, StopKind};

/// Attempts for an orchestrator write that races external requests.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Error recorded on an item whose generation was cut short by a restart.
pub const INTERRUPTED_ERROR: &str = "generation interrupted by a restart";

/// ProgressSink that persists step progress onto the item being generated.
struct CampaignProgressUpdater {
    campaign_id: String,
    item_index: usize,
    started_at: DateTime<Utc>,
    store: Arc<dyn CampaignStore>,
}

impl CampaignProgressUpdater {
    fn try_update(&self, info: &StepInfo) -> Result<(), StoreError> {
        let campaign = self
            .store
            .get(&self.campaign_id)?
            .ok_or_else(|| StoreError::NotFound(self.campaign_id.clone()))?;

        // Only the live marker of an item still generating is touched.
        if !campaign
            .item_status(self.item_index)
            .is_some_and(ItemStatus::is_generating)
        {
            return Ok(());
        }

        let mut statuses = campaign.item_statuses.clone();
        statuses.insert(
            self.item_index,
            ItemStatus::Generating {
                started_at: self.started_at,
                progress: Some(StepProgress {
                    current_step: info.step,
                    stage_name: info.stage_name.clone(),
                    stage_progress: info.progress,
                }),
            },
        );

        self.store.update(
            &self.campaign_id,
            CampaignUpdate::new()
                .with_item_statuses(statuses)
                .expecting_version(campaign.version),
        )?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressSink for CampaignProgressUpdater {
    async fn report(&self, info: StepInfo) {
        if let Err(e) = self.try_update(&info) {
            metrics::PROGRESS_WRITES_DROPPED.inc();
            tracing::warn!(
                "Failed to update progress for item {} of campaign {}: {}",
                self.item_index,
                self.campaign_id,
                e
            );
        }
    }
}

/// Aggregate status of a batch that ran to the end.
///
/// A batch fails only when nothing at all succeeded.
pub fn aggregate_status(summary: &ProgressSummary) -> CampaignStatus {
    if summary.completed == 0 && summary.failed > 0 {
        CampaignStatus::Failed
    } else {
        CampaignStatus::Completed
    }
}

/// The batch orchestrator - generates the items of campaigns sequentially.
#[derive(Clone)]
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn CampaignStore>,
    generator: Arc<dyn StepGenerator>,

    // Runtime state
    active: Arc<RwLock<HashSet<String>>>,
}

impl BatchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn CampaignStore>,
        generator: Arc<dyn StepGenerator>,
    ) -> Self {
        Self {
            config,
            store,
            generator,
            active: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let mut active_runs: Vec<String> = self.active.read().await.iter().cloned().collect();
        active_runs.sort();

        let count = |status| {
            self.store
                .list(&CampaignFilter::new().with_status(status).with_limit(i64::MAX))
                .map(|c| c.len())
                .unwrap_or(0)
        };

        OrchestratorStatus {
            active_runs,
            generating_count: count(CampaignStatus::Generating),
            paused_count: count(CampaignStatus::Paused),
        }
    }

    /// Run the batch for a campaign to completion or until it is stopped.
    ///
    /// The campaign must be `draft` or `paused`. Items already completed are
    /// skipped, so starting a paused campaign resumes it.
    pub async fn start(&self, campaign_id: &str) -> Result<BatchSummary, OrchestratorError> {
        let campaign = self.claim(campaign_id)?;
        self.run_claimed(campaign).await
    }

    /// Validate and claim a campaign, then run its batch in the background.
    ///
    /// Returns the claimed campaign, now `generating`.
    pub fn spawn_start(&self, campaign_id: &str) -> Result<Campaign, OrchestratorError> {
        let campaign = self.claim(campaign_id)?;

        let orchestrator = self.clone();
        let claimed = campaign.clone();
        tokio::spawn(async move {
            let id = claimed.id.clone();
            if let Err(e) = orchestrator.run_claimed(claimed).await {
                error!("Batch run for campaign {} failed: {}", id, e);
            }
        });

        Ok(campaign)
    }

    /// Ask a running batch to pause or cancel after the current item.
    pub fn request_stop(
        &self,
        campaign_id: &str,
        kind: StopKind,
    ) -> Result<Campaign, OrchestratorError> {
        let campaign = self.update_with(campaign_id, |campaign| {
            if campaign.status != CampaignStatus::Generating {
                return Err(OrchestratorError::invalid_state(
                    "generating",
                    campaign.status,
                ));
            }
            Ok(CampaignUpdate::new().with_status(kind.status()))
        })?;

        info!("Campaign {} marked {} by request", campaign_id, campaign.status);
        Ok(campaign)
    }

    /// Regenerate a single failed item from scratch.
    ///
    /// If the campaign had already finished, its aggregate status is
    /// recomputed afterwards.
    pub async fn retry_item(
        &self,
        campaign_id: &str,
        item_index: usize,
    ) -> Result<ItemStatus, OrchestratorError> {
        let (campaign, started_at) = self.claim_item(campaign_id, item_index)?;
        self.run_claimed_item(campaign, item_index, started_at).await
    }

    /// Validate and claim a failed item, then regenerate it in the background.
    pub fn spawn_retry_item(
        &self,
        campaign_id: &str,
        item_index: usize,
    ) -> Result<Campaign, OrchestratorError> {
        let (campaign, started_at) = self.claim_item(campaign_id, item_index)?;

        let orchestrator = self.clone();
        let claimed = campaign.clone();
        tokio::spawn(async move {
            let id = claimed.id.clone();
            if let Err(e) = orchestrator
                .run_claimed_item(claimed, item_index, started_at)
                .await
            {
                error!("Retry of item {} of campaign {} failed: {}", item_index, id, e);
            }
        });

        Ok(campaign)
    }

    /// Overwrite the status of one item, bypassing generation.
    ///
    /// A completed override also records its artifact on the campaign.
    pub fn override_item(
        &self,
        campaign_id: &str,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<ItemStatus, OrchestratorError> {
        self.update_with(campaign_id, |campaign| {
            if !campaign.is_valid_index(item_index) {
                return Err(OrchestratorError::ItemOutOfRange {
                    index: item_index,
                    len: campaign.item_count(),
                });
            }
            Ok(item_update(campaign, item_index, status.clone()))
        })?;

        info!(
            "Item {} of campaign {} manually set to {}",
            item_index,
            campaign_id,
            status.state_type()
        );
        Ok(status)
    }

    /// Resume campaigns a previous process left `generating`.
    ///
    /// Each one is moved to `paused`, its interrupted items reset to
    /// `pending`, and started again in the background. Items left
    /// `generating` on any other campaign (a manual retry, or a run stopped
    /// mid-item) are marked failed so they can be retried. Returns the ids
    /// of the campaigns resumed.
    ///
    /// Meant to run once at startup, before any batch is started.
    pub fn recover_interrupted(&self) -> Result<Vec<String>, OrchestratorError> {
        if !self.config.resume_on_startup {
            debug!("Resume on startup disabled, skipping recovery");
            return Ok(Vec::new());
        }

        let campaigns = self
            .store
            .list(&CampaignFilter::new().with_limit(i64::MAX))?;

        let mut resumed = Vec::new();
        for campaign in campaigns {
            if campaign.status != CampaignStatus::Generating {
                self.fail_stranded_items(&campaign);
                continue;
            }

            let mut statuses = campaign.item_statuses.clone();
            let interrupted: Vec<usize> = statuses
                .iter()
                .filter(|(_, status)| status.is_generating())
                .map(|(index, _)| index)
                .collect();
            for index in interrupted {
                statuses.insert(index, ItemStatus::Pending);
            }

            let paused = self.store.update(
                &campaign.id,
                CampaignUpdate::new()
                    .with_status(CampaignStatus::Paused)
                    .with_item_statuses(statuses)
                    .expecting_version(campaign.version),
            );

            match paused {
                Ok(_) => match self.spawn_start(&campaign.id) {
                    Ok(_) => {
                        info!("Resumed interrupted campaign: {}", campaign.id);
                        resumed.push(campaign.id);
                    }
                    Err(e) => warn!("Failed to resume campaign {}: {}", campaign.id, e),
                },
                Err(e) => warn!("Failed to recover campaign {}: {}", campaign.id, e),
            }
        }

        if !resumed.is_empty() {
            info!("Recovered {} interrupted campaigns", resumed.len());
        }
        Ok(resumed)
    }

    /// Mark items stuck in `generating` on a campaign that is not running
    /// as failed.
    fn fail_stranded_items(&self, campaign: &Campaign) {
        if !campaign
            .item_statuses
            .iter()
            .any(|(_, status)| status.is_generating())
        {
            return;
        }

        let result = self.update_with(&campaign.id, |c| {
            let mut statuses = c.item_statuses.clone();
            let stranded: Vec<(usize, DateTime<Utc>)> = statuses
                .iter()
                .filter_map(|(index, status)| match status {
                    ItemStatus::Generating { started_at, .. } => Some((index, *started_at)),
                    _ => None,
                })
                .collect();
            for (index, started_at) in stranded {
                statuses.insert(
                    index,
                    failed_status(started_at, INTERRUPTED_ERROR.to_string(), None, None),
                );
            }
            Ok(CampaignUpdate::new().with_item_statuses(statuses))
        });

        match result {
            Ok(_) => info!(
                "Marked interrupted items of {} campaign {} as failed",
                campaign.status, campaign.id
            ),
            Err(e) => warn!(
                "Failed to reset interrupted items of campaign {}: {}",
                campaign.id, e
            ),
        }
    }

    /// Move a campaign to `generating`, pre-populating every item status.
    fn claim(&self, campaign_id: &str) -> Result<Campaign, OrchestratorError> {
        let campaign = self.load(campaign_id)?;

        if !campaign.status.can_start() {
            return Err(OrchestratorError::invalid_state(
                "draft or paused",
                campaign.status,
            ));
        }

        let mut statuses = campaign.item_statuses.clone();
        statuses.fill_pending(campaign.item_count());

        let update = CampaignUpdate::new()
            .with_status(CampaignStatus::Generating)
            .with_item_statuses(statuses)
            .expecting_version(campaign.version);

        match self.store.update(campaign_id, update) {
            Ok(claimed) => Ok(claimed),
            Err(StoreError::VersionConflict { .. }) => {
                Err(OrchestratorError::AlreadyRunning(campaign_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move a failed item to `generating` ahead of a manual retry.
    fn claim_item(
        &self,
        campaign_id: &str,
        item_index: usize,
    ) -> Result<(Campaign, DateTime<Utc>), OrchestratorError> {
        let campaign = self.load(campaign_id)?;

        if !campaign.is_valid_index(item_index) {
            return Err(OrchestratorError::ItemOutOfRange {
                index: item_index,
                len: campaign.item_count(),
            });
        }
        if campaign.status == CampaignStatus::Generating {
            return Err(OrchestratorError::invalid_state(
                "campaign not generating",
                campaign.status,
            ));
        }
        match campaign.item_status(item_index) {
            Some(ItemStatus::Failed { .. }) => {}
            other => {
                return Err(OrchestratorError::invalid_state(
                    "failed item",
                    other.map(ItemStatus::state_type).unwrap_or("pending"),
                ))
            }
        }

        let started_at = Utc::now();
        let update = item_update(
            &campaign,
            item_index,
            ItemStatus::Generating {
                started_at,
                progress: None,
            },
        )
        .expecting_version(campaign.version);

        match self.store.update(campaign_id, update) {
            Ok(claimed) => Ok((claimed, started_at)),
            Err(StoreError::VersionConflict { .. }) => {
                Err(OrchestratorError::AlreadyRunning(campaign_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn run_claimed(&self, campaign: Campaign) -> Result<BatchSummary, OrchestratorError> {
        let campaign_id = campaign.id.clone();
        info!(
            "Starting batch generation for campaign {} ({} items)",
            campaign_id,
            campaign.item_count()
        );

        self.active.write().await.insert(campaign_id.clone());
        let result = self.run_items(&campaign).await;
        let result = match result {
            Ok(stopped) => self.finish(&campaign_id, stopped),
            Err(e) => Err(e),
        };
        self.active.write().await.remove(&campaign_id);

        match result {
            Ok(summary) => {
                metrics::CAMPAIGN_RUNS
                    .with_label_values(&[summary.status.as_str()])
                    .inc();
                info!(
                    "Batch for campaign {} ended {}: {} completed, {} failed of {}",
                    campaign_id,
                    summary.status,
                    summary.progress.completed,
                    summary.progress.failed,
                    summary.progress.total
                );
                Ok(summary)
            }
            Err(e) => {
                metrics::CAMPAIGN_RUNS.with_label_values(&["error"]).inc();
                error!("Batch for campaign {} aborted: {}", campaign_id, e);
                if let Err(mark_err) = self.store.update(
                    &campaign_id,
                    CampaignUpdate::new().with_status(CampaignStatus::Failed),
                ) {
                    error!(
                        "Failed to mark campaign {} as failed: {}",
                        campaign_id, mark_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Generate every item that is not completed yet.
    ///
    /// Returns the requested status if the loop was stopped early.
    async fn run_items(
        &self,
        campaign: &Campaign,
    ) -> Result<Option<CampaignStatus>, OrchestratorError> {
        for index in 0..campaign.item_count() {
            let current = self.load(&campaign.id)?;

            if current.status.is_stop_requested() {
                info!(
                    "Campaign {} {} before item {}, stopping",
                    campaign.id, current.status, index
                );
                return Ok(Some(current.status));
            }

            if current.item_statuses.is_completed(index) {
                debug!("Item {} of campaign {} already completed, skipping", index, campaign.id);
                continue;
            }

            let started_at = Utc::now();
            let generating = ItemStatus::Generating {
                started_at,
                progress: None,
            };
            match self.update_with(&campaign.id, |c| Ok(item_update(c, index, generating.clone())))
            {
                Ok(updated) => {
                    self.generate_item(&updated, index, started_at).await;
                }
                Err(e) => {
                    warn!(
                        "Failed to mark item {} of campaign {} generating: {}",
                        index, campaign.id, e
                    );
                    self.persist_item_result(
                        &campaign.id,
                        index,
                        failed_status(started_at, e.to_string(), None, None),
                    );
                }
            }
        }

        Ok(None)
    }

    /// Write the final campaign status after the item loop ended.
    fn finish(
        &self,
        campaign_id: &str,
        stopped: Option<CampaignStatus>,
    ) -> Result<BatchSummary, OrchestratorError> {
        if let Some(status) = stopped {
            let campaign = self.load(campaign_id)?;
            return Ok(BatchSummary {
                campaign_id: campaign_id.to_string(),
                status,
                progress: progress::summarize(&campaign.item_statuses),
                stopped_early: true,
            });
        }

        let campaign = self.update_with(campaign_id, |c| {
            // A stop requested after the last item keeps its status.
            if c.status.is_stop_requested() {
                return Ok(CampaignUpdate::new());
            }
            let summary = progress::summarize(&c.item_statuses);
            Ok(CampaignUpdate::new().with_status(aggregate_status(&summary)))
        })?;

        Ok(BatchSummary {
            campaign_id: campaign_id.to_string(),
            status: campaign.status,
            progress: progress::summarize(&campaign.item_statuses),
            stopped_early: false,
        })
    }

    async fn run_claimed_item(
        &self,
        campaign: Campaign,
        item_index: usize,
        started_at: DateTime<Utc>,
    ) -> Result<ItemStatus, OrchestratorError> {
        metrics::MANUAL_RETRIES.inc();
        info!("Retrying item {} of campaign {}", item_index, campaign.id);

        let status = self.generate_item(&campaign, item_index, started_at).await;

        if campaign.status.is_terminal() {
            let updated = self.update_with(&campaign.id, |c| {
                if !c.status.is_terminal() {
                    return Ok(CampaignUpdate::new());
                }
                let summary = progress::summarize(&c.item_statuses);
                Ok(CampaignUpdate::new().with_status(aggregate_status(&summary)))
            })?;
            if updated.status != campaign.status {
                info!(
                    "Campaign {} status recomputed: {} -> {}",
                    campaign.id, campaign.status, updated.status
                );
            }
        }

        Ok(status)
    }

    /// Run the generator for one item already marked `generating` and
    /// persist the result. Never fails: errors become a failed item.
    async fn generate_item(
        &self,
        campaign: &Campaign,
        index: usize,
        started_at: DateTime<Utc>,
    ) -> ItemStatus {
        let timer = Instant::now();
        let item = campaign.items.get(index).cloned().unwrap_or_default();

        let request = GenerationRequest {
            campaign_id: campaign.id.clone(),
            item_index: index,
            item,
            settings: schedule::item_settings(campaign, index),
            user_id: campaign.user_id.clone(),
            workspace_id: campaign.workspace_id.clone(),
            resume: None,
        };

        let sink: Arc<dyn ProgressSink> = Arc::new(CampaignProgressUpdater {
            campaign_id: campaign.id.clone(),
            item_index: index,
            started_at,
            store: Arc::clone(&self.store),
        });

        debug!("Generating item {} of campaign {}", index, campaign.id);

        let status = match self.run_with_retry(request, sink).await {
            Ok(GenerationOutcome::Success { artifact_id, .. }) => {
                info!(
                    "Item {} of campaign {} completed: {}",
                    index, campaign.id, artifact_id
                );
                ItemStatus::Completed {
                    started_at: Some(started_at),
                    completed_at: Utc::now(),
                    artifact_id,
                }
            }
            Ok(GenerationOutcome::Failure {
                error,
                failed_step,
                intermediate_data,
                ..
            }) => {
                warn!("Item {} of campaign {} failed: {}", index, campaign.id, error);
                failed_status(started_at, error, failed_step, intermediate_data)
            }
            Err(e) => {
                warn!(
                    "Generator error on item {} of campaign {}: {}",
                    index, campaign.id, e
                );
                failed_status(started_at, e.to_string(), None, None)
            }
        };

        let result = if status.is_completed() { "completed" } else { "failed" };
        metrics::ITEMS_PROCESSED.with_label_values(&[result]).inc();
        metrics::ITEM_DURATION
            .with_label_values(&[result])
            .observe(timer.elapsed().as_secs_f64());

        self.persist_item_result(&campaign.id, index, status.clone());
        status
    }

    /// Run the generator, retrying once from the checkpoint on a retryable
    /// failure.
    async fn run_with_retry(
        &self,
        request: GenerationRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<GenerationOutcome, GeneratorError> {
        let first = self
            .generator
            .run(request.clone(), Some(Arc::clone(&sink)))
            .await?;

        let (error, failed_step, intermediate_data) = match first {
            GenerationOutcome::Failure {
                error,
                retryable: true,
                failed_step,
                intermediate_data,
            } => (error, failed_step, intermediate_data),
            outcome => return Ok(outcome),
        };

        let resume = ResumeContext::after_failure(failed_step, intermediate_data);
        warn!(
            "Item {} of campaign {} failed at step {:?} ({}), retrying from step {} in {}ms",
            request.item_index,
            request.campaign_id,
            failed_step,
            error,
            resume.resume_step,
            self.config.retry_backoff_ms
        );
        metrics::AUTOMATIC_RETRIES.inc();

        tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms)).await;

        self.generator
            .run(request.with_resume(resume), Some(sink))
            .await
    }

    fn persist_item_result(&self, campaign_id: &str, index: usize, status: ItemStatus) {
        if let Err(e) = self.update_with(campaign_id, |c| Ok(item_update(c, index, status.clone())))
        {
            error!(
                "Failed to persist {} status of item {} of campaign {}: {}",
                status.state_type(),
                index,
                campaign_id,
                e
            );
        }
    }

    fn load(&self, campaign_id: &str) -> Result<Campaign, OrchestratorError> {
        self.store
            .get(campaign_id)?
            .ok_or_else(|| OrchestratorError::CampaignNotFound(campaign_id.to_string()))
    }

    /// Read-modify-write a campaign, re-reading and retrying when an
    /// external request changed it in between.
    fn update_with<F>(&self, campaign_id: &str, mut build: F) -> Result<Campaign, OrchestratorError>
    where
        F: FnMut(&Campaign) -> Result<CampaignUpdate, OrchestratorError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let campaign = self.load(campaign_id)?;
            let update = build(&campaign)?.expecting_version(campaign.version);

            match self.store.update(campaign_id, update) {
                Ok(updated) => return Ok(updated),
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(
                        "Concurrent update on campaign {}, retrying (attempt {})",
                        campaign_id, attempt
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Update replacing the status of one item.
///
/// A completed status also appends its artifact to the campaign.
fn item_update(campaign: &Campaign, index: usize, status: ItemStatus) -> CampaignUpdate {
    let mut update = CampaignUpdate::new();

    if let Some(artifact_id) = status.artifact_id() {
        if !campaign
            .generated_artifact_ids
            .iter()
            .any(|id| id == artifact_id)
        {
            let mut ids = campaign.generated_artifact_ids.clone();
            ids.push(artifact_id.to_string());
            update = update.with_generated_artifact_ids(ids);
        }
    }

    let mut statuses = campaign.item_statuses.clone();
    statuses.insert(index, status);
    update.with_item_statuses(statuses)
}

fn failed_status(
    started_at: DateTime<Utc>,
    error: String,
    failed_step: Option<u32>,
    intermediate_data: Option<crate::campaign::IntermediateData>,
) -> ItemStatus {
    ItemStatus::Failed {
        started_at: Some(started_at),
        completed_at: Utc::now(),
        error,
        failed_step,
        intermediate_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::SqliteCampaignStore;
    use crate::testing::{fixtures, MockStepGenerator};

    fn setup() -> (Arc<SqliteCampaignStore>, Arc<MockStepGenerator>, BatchOrchestrator) {
        let store = Arc::new(SqliteCampaignStore::in_memory().unwrap());
        let generator = Arc::new(MockStepGenerator::new());
        let config = OrchestratorConfig {
            retry_backoff_ms: 1,
            ..Default::default()
        };
        let orchestrator = BatchOrchestrator::new(
            config,
            Arc::clone(&store) as Arc<dyn CampaignStore>,
            Arc::clone(&generator) as Arc<dyn StepGenerator>,
        );
        (store, generator, orchestrator)
    }

    #[test]
    fn test_aggregate_status_policy() {
        let mut summary = ProgressSummary {
            total: 2,
            failed: 2,
            ..Default::default()
        };
        assert_eq!(aggregate_status(&summary), CampaignStatus::Failed);

        summary.failed = 1;
        summary.completed = 1;
        assert_eq!(aggregate_status(&summary), CampaignStatus::Completed);

        assert_eq!(
            aggregate_status(&ProgressSummary::default()),
            CampaignStatus::Completed
        );
    }

    #[test]
    fn test_item_update_appends_artifact_once() {
        let mut campaign = fixtures::campaign(2);
        campaign.generated_artifact_ids = vec!["a-0".to_string()];

        let update = item_update(&campaign, 0, fixtures::completed_status("a-0"));
        assert!(update.generated_artifact_ids.is_none());

        let update = item_update(&campaign, 1, fixtures::completed_status("a-1"));
        assert_eq!(
            update.generated_artifact_ids,
            Some(vec!["a-0".to_string(), "a-1".to_string()])
        );
        assert!(update.item_statuses.unwrap().is_completed(1));
    }

    #[tokio::test]
    async fn test_start_requires_startable_status() {
        let (store, _generator, orchestrator) = setup();
        let campaign = store.create(fixtures::create_request(1)).unwrap();
        store
            .update(
                &campaign.id,
                CampaignUpdate::new().with_status(CampaignStatus::Completed),
            )
            .unwrap();

        let result = orchestrator.start(&campaign.id).await;
        assert!(matches!(result, Err(OrchestratorError::InvalidState { .. })));

        let unchanged = store.get(&campaign.id).unwrap().unwrap();
        assert_eq!(unchanged.status, CampaignStatus::Completed);
        assert!(unchanged.item_statuses.is_empty());
    }

    #[tokio::test]
    async fn test_start_unknown_campaign() {
        let (_store, _generator, orchestrator) = setup();
        let result = orchestrator.start("missing").await;
        assert!(matches!(result, Err(OrchestratorError::CampaignNotFound(_))));
    }

    #[tokio::test]
    async fn test_progress_updater_writes_marker() {
        let (store, _generator, _orchestrator) = setup();
        let campaign = store.create(fixtures::create_request(1)).unwrap();
        let started_at = Utc::now();
        store
            .update(
                &campaign.id,
                item_update(
                    &campaign,
                    0,
                    ItemStatus::Generating {
                        started_at,
                        progress: None,
                    },
                ),
            )
            .unwrap();

        let updater = CampaignProgressUpdater {
            campaign_id: campaign.id.clone(),
            item_index: 0,
            started_at,
            store: Arc::clone(&store) as Arc<dyn CampaignStore>,
        };
        updater.report(StepInfo::new(3, "Generating media", 40)).await;

        let stored = store.get(&campaign.id).unwrap().unwrap();
        match stored.item_status(0) {
            Some(ItemStatus::Generating {
                progress: Some(p), ..
            }) => {
                assert_eq!(p.current_step, 3);
                assert_eq!(p.stage_progress, 40);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_progress_updater_ignores_finished_item() {
        let (store, _generator, _orchestrator) = setup();
        let campaign = store.create(fixtures::create_request(1)).unwrap();
        store
            .update(
                &campaign.id,
                item_update(&campaign, 0, fixtures::completed_status("a-0")),
            )
            .unwrap();

        let updater = CampaignProgressUpdater {
            campaign_id: campaign.id.clone(),
            item_index: 0,
            started_at: Utc::now(),
            store: Arc::clone(&store) as Arc<dyn CampaignStore>,
        };
        updater.report(StepInfo::new(2, "Writing script", 0)).await;

        let stored = store.get(&campaign.id).unwrap().unwrap();
        assert!(stored.item_statuses.is_completed(0));
    }

    #[tokio::test]
    async fn test_progress_updater_swallows_missing_campaign() {
        let (store, _generator, _orchestrator) = setup();
        let updater = CampaignProgressUpdater {
            campaign_id: "missing".to_string(),
            item_index: 0,
            started_at: Utc::now(),
            store: store as Arc<dyn CampaignStore>,
        };
        updater.report(StepInfo::new(1, "Researching topic", 0)).await;
    }
}
