pub mod campaign;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod schedule;
pub mod testing;

pub use campaign::{
    AutomationSettings, Campaign, CampaignFilter, CampaignStatus, CampaignStore, CampaignUpdate,
    CreateCampaignRequest, IntermediateData, ItemStatus, ItemStatuses, ScheduleMode,
    SqliteCampaignStore, StepProgress, StoreError,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    GeneratorBackend, GeneratorConfig, HttpGeneratorConfig, SanitizedConfig, ServerConfig,
};
pub use generator::{
    create_generator, GenerationOutcome, GenerationRequest, GeneratorError, HttpStepGenerator,
    ItemSettings, ProgressSink, ResumeContext, StepGenerator, StepInfo,
};
pub use orchestrator::{
    BatchOrchestrator, BatchSummary, OrchestratorConfig, OrchestratorError, OrchestratorStatus,
    StopKind,
};
pub use progress::{summarize, ProgressSnapshot, ProgressSummary};
