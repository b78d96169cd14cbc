//! Mock step generator for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::generator::{
    GenerationOutcome, GenerationRequest, GeneratorError, ProgressSink, StepGenerator, StepInfo,
};
use crate::progress::{stage_name, TOTAL_STEPS};

/// Callback invoked with every request before the mock answers it.
pub type CallHook = Arc<dyn Fn(&GenerationRequest) + Send + Sync>;

/// Scripted answer for one call.
enum Scripted {
    Outcome(GenerationOutcome),
    Error(GeneratorError),
}

/// Mock implementation of the StepGenerator trait.
///
/// Provides controllable behavior for testing:
/// - Record every request for assertions
/// - Script per-item outcomes or backend errors, consumed in order
/// - Report step progress through the sink
/// - Run a hook on each call (e.g. to pause the campaign mid-batch)
///
/// Items without a scripted answer succeed with artifact id
/// `"{campaign_id}-{item_index}"`.
///
/// # Example
///
/// ```rust,ignore
/// use batchgen_core::testing::MockStepGenerator;
///
/// let generator = MockStepGenerator::new();
/// generator
///     .push_outcome(1, GenerationOutcome::failure("rate limited", true))
///     .await;
///
/// // Run the batch...
///
/// assert_eq!(generator.calls_for(1).await.len(), 2);
/// ```
pub struct MockStepGenerator {
    /// Recorded requests, in call order.
    calls: Arc<RwLock<Vec<GenerationRequest>>>,
    /// Scripted answers per item index.
    scripts: Arc<RwLock<HashMap<usize, VecDeque<Scripted>>>>,
    /// Whether to report every step through the progress sink.
    report_steps: Arc<RwLock<bool>>,
    /// Simulated generation duration.
    delay: Arc<RwLock<Duration>>,
    /// Hook run on each call.
    on_call: Arc<RwLock<Option<CallHook>>>,
}

impl Default for MockStepGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStepGenerator {
    /// Create a new mock generator.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            scripts: Arc::new(RwLock::new(HashMap::new())),
            report_steps: Arc::new(RwLock::new(true)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            on_call: Arc::new(RwLock::new(None)),
        }
    }

    /// Queue an outcome for the next call on `item_index`.
    pub async fn push_outcome(&self, item_index: usize, outcome: GenerationOutcome) {
        self.scripts
            .write()
            .await
            .entry(item_index)
            .or_default()
            .push_back(Scripted::Outcome(outcome));
    }

    /// Queue a backend error for the next call on `item_index`.
    pub async fn push_error(&self, item_index: usize, error: GeneratorError) {
        self.scripts
            .write()
            .await
            .entry(item_index)
            .or_default()
            .push_back(Scripted::Error(error));
    }

    /// Get all recorded requests.
    pub async fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.calls.read().await.clone()
    }

    /// Get the recorded requests for one item.
    pub async fn calls_for(&self, item_index: usize) -> Vec<GenerationRequest> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|r| r.item_index == item_index)
            .cloned()
            .collect()
    }

    /// Get the number of calls made.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Enable or disable step progress reports.
    pub async fn set_report_steps(&self, report: bool) {
        *self.report_steps.write().await = report;
    }

    /// Set the simulated generation duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Install a hook run with each request.
    pub async fn set_on_call(&self, hook: CallHook) {
        *self.on_call.write().await = Some(hook);
    }

    async fn next_scripted(&self, item_index: usize) -> Option<Scripted> {
        self.scripts
            .write()
            .await
            .get_mut(&item_index)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl StepGenerator for MockStepGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(
        &self,
        request: GenerationRequest,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<GenerationOutcome, GeneratorError> {
        self.calls.write().await.push(request.clone());

        let hook = self.on_call.read().await.clone();
        if let Some(hook) = hook {
            hook(&request);
        }

        if *self.report_steps.read().await {
            if let Some(sink) = &progress {
                let first = request.resume.as_ref().map(|r| r.resume_step).unwrap_or(1);
                for step in first..=TOTAL_STEPS {
                    sink.report(StepInfo::new(step, stage_name(step), 0)).await;
                }
            }
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.next_scripted(request.item_index).await {
            Some(Scripted::Outcome(outcome)) => Ok(outcome),
            Some(Scripted::Error(error)) => Err(error),
            None => Ok(GenerationOutcome::success(format!(
                "{}-{}",
                request.campaign_id, request.item_index
            ))),
        }
    }
}
