//! Batch orchestrator for campaign generation.
//!
//! The orchestrator drives the items of a campaign through the step
//! generator:
//! - **Sequential**: one item at a time per campaign, each awaited to the end
//! - **Durable**: every transition is written to the store before moving on,
//!   so a restarted process resumes at the first unfinished item
//! - **Cooperative**: pause/cancel requests are picked up between items

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{aggregate_status, BatchOrchestrator, INTERRUPTED_ERROR};
pub use types::{BatchSummary, OrchestratorError, OrchestratorStatus, StopKind};
