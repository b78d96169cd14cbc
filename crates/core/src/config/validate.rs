use super::{
    types::{Config, GeneratorBackend},
    ConfigError,
};

/// Longest automatic retry backoff accepted (10 minutes).
const MAX_RETRY_BACKOFF_MS: u64 = 600_000;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Retry backoff is at most 10 minutes
/// - HTTP generator has a usable URL and timeout when selected
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
        return Err(ConfigError::ValidationError(format!(
            "orchestrator.retry_backoff_ms cannot exceed {}",
            MAX_RETRY_BACKOFF_MS
        )));
    }

    if config.generator.backend == GeneratorBackend::Http {
        let http = config.generator.http.as_ref().ok_or_else(|| {
            ConfigError::ValidationError(
                "generator.http is required when generator.backend = \"http\"".to_string(),
            )
        })?;

        if !(http.base_url.starts_with("http://") || http.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(
                "generator.http.base_url must start with http:// or https://".to_string(),
            ));
        }

        if http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generator.http.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}
