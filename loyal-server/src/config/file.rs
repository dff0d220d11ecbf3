//! TOML file configuration structures.
//!
//! These structs directly map to the `loyal-config.toml` file format. Every
//! section is optional.

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub accrual: AccrualConfig,
    pub pipeline: PipelineConfig,
    pub auth: AuthConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Accrual system section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Background pipeline section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: i64,
    pub idle_interval_secs: u64,
    pub channel_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            idle_interval_secs: 30,
            channel_buffer: 256,
        }
    }
}

/// Session signing section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key for session token signatures. Generated per process when absent.
    pub secret: Option<String>,
    pub session_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "0.0.0.0:3000"

[accrual]
base_url = "http://accrual.internal:8081"
request_timeout_secs = 5

[pipeline]
batch_size = 50
idle_interval_secs = 10
channel_buffer = 64

[auth]
secret = "change-me"
session_ttl_secs = 3600
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:3000");
        assert_eq!(config.accrual.base_url, "http://accrual.internal:8081");
        assert_eq!(config.accrual.request_timeout_secs, 5);
        assert_eq!(config.pipeline.batch_size, 50);
        assert_eq!(config.pipeline.idle_interval_secs, 10);
        assert_eq!(config.pipeline.channel_buffer, 64);
        assert_eq!(config.auth.secret.as_deref(), Some("change-me"));
        assert_eq!(config.auth.session_ttl_secs, 3600);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: FileConfig = toml::from_str("[pipeline]\nbatch_size = 10\n").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.accrual.base_url, "http://localhost:8081");
        assert_eq!(config.pipeline.batch_size, 10);
        assert_eq!(config.pipeline.idle_interval_secs, 30);
        assert!(config.auth.secret.is_none());
    }
}
