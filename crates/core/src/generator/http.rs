//! HTTP step generator backed by a remote generation service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::HttpGeneratorConfig;

use super::{GenerationOutcome, GenerationRequest, GeneratorError, ProgressSink, StepGenerator};

/// Generator that delegates each item to a remote service.
///
/// The request is POSTed as JSON to `{base_url}/generate`. The service
/// answers with a `GenerationOutcome`. Server-side and transport errors are
/// turned into retryable failures, client errors into permanent ones.
pub struct HttpStepGenerator {
    client: Client,
    config: HttpGeneratorConfig,
}

impl HttpStepGenerator {
    /// Create a new HTTP generator.
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeneratorError::Backend(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl StepGenerator for HttpStepGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn run(
        &self,
        request: GenerationRequest,
        _progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<GenerationOutcome, GeneratorError> {
        let url = format!("{}/generate", self.base_url());
        debug!(
            "Requesting generation of item {} for campaign {} from {}",
            request.item_index, request.campaign_id, url
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Generation request for campaign {} timed out", request.campaign_id);
                return Ok(GenerationOutcome::failure(
                    GeneratorError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                    .to_string(),
                    true,
                ));
            }
            Err(e) => {
                warn!("Generation request for campaign {} failed: {}", request.campaign_id, e);
                return Ok(GenerationOutcome::failure(
                    GeneratorError::Http(e.to_string()).to_string(),
                    true,
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<GenerationOutcome>()
                .await
                .map_err(|e| GeneratorError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let error = format!(
            "generator returned HTTP {}: {}",
            status.as_u16(),
            body.chars().take(200).collect::<String>()
        );

        Ok(GenerationOutcome::failure(error, is_retryable_status(status)))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
