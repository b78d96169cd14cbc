//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Fixed wait before the single automatic retry of a failed item
    /// (milliseconds).
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Resume campaigns left `generating` by a previous process on startup.
    #[serde(default = "default_resume_on_startup")]
    pub resume_on_startup: bool,
}

fn default_retry_backoff() -> u64 {
    2000 // 2 seconds
}

fn default_resume_on_startup() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: default_retry_backoff(),
            resume_on_startup: default_resume_on_startup(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.retry_backoff_ms, 2000);
        assert!(config.resume_on_startup);
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert_eq!(config.retry_backoff_ms, 2000);
        assert!(config.resume_on_startup);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            retry_backoff_ms = 500
            resume_on_startup = false
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.retry_backoff_ms, 500);
        assert!(!config.resume_on_startup);
    }
}
