use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("batchgen.db")
}

/// Generator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Generator backend type
    #[serde(default)]
    pub backend: GeneratorBackend,
    /// HTTP-specific configuration (required when backend = "http")
    #[serde(default)]
    pub http: Option<HttpGeneratorConfig>,
}

/// Available generator backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorBackend {
    /// No generator; batch endpoints answer 503.
    #[default]
    Disabled,
    Http,
}

impl GeneratorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorBackend::Disabled => "disabled",
            GeneratorBackend::Http => "http",
        }
    }
}

/// Remote generation service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpGeneratorConfig {
    /// Service URL (e.g., "http://localhost:9100")
    pub base_url: String,
    /// Bearer token sent with each request
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 600)
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

fn default_generator_timeout() -> u64 {
    600
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub orchestrator: OrchestratorConfig,
    pub generator: SanitizedGeneratorConfig,
}

/// Sanitized generator config (API key redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGeneratorConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<SanitizedHttpGeneratorConfig>,
}

/// Sanitized HTTP generator config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedHttpGeneratorConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            orchestrator: config.orchestrator.clone(),
            generator: SanitizedGeneratorConfig {
                backend: config.generator.backend.as_str().to_string(),
                http: config
                    .generator
                    .http
                    .as_ref()
                    .map(|h| SanitizedHttpGeneratorConfig {
                        base_url: h.base_url.clone(),
                        api_key_configured: h.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                        timeout_secs: h.timeout_secs,
                    }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_server_section() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "batchgen.db");
        assert_eq!(config.orchestrator.retry_backoff_ms, 2000);
        assert_eq!(config.generator.backend, GeneratorBackend::Disabled);
        assert!(config.generator.http.is_none());
    }

    #[test]
    fn test_deserialize_with_custom_database_path() {
        let toml = r#"
[database]
path = "/data/campaigns.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.database.path.to_str().unwrap(),
            "/data/campaigns.sqlite"
        );
    }

    #[test]
    fn test_deserialize_with_generator_config() {
        let toml = r#"
[generator]
backend = "http"

[generator.http]
base_url = "http://localhost:9100"
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.generator.backend, GeneratorBackend::Http);
        let http = config.generator.http.unwrap();
        assert_eq!(http.base_url, "http://localhost:9100");
        assert_eq!(http.api_key.as_deref(), Some("secret"));
        assert_eq!(http.timeout_secs, 600);
    }

    #[test]
    fn test_deserialize_unknown_backend_fails() {
        let toml = r#"
[generator]
backend = "carrier-pigeon"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_redacts_api_key() {
        let config = Config {
            generator: GeneratorConfig {
                backend: GeneratorBackend::Http,
                http: Some(HttpGeneratorConfig {
                    base_url: "http://localhost:9100".to_string(),
                    api_key: Some("super-secret".to_string()),
                    timeout_secs: 30,
                }),
            },
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.generator.backend, "http");
        let http = sanitized.generator.http.as_ref().unwrap();
        assert!(http.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
