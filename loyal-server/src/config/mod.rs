//! Configuration module for loyal-server.
//!
//! Handles loading configuration from an optional TOML file, then applying
//! CLI arguments and environment variables on top.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    AccrualConfig, AuthConfig, LoadedConfig, PipelineConfig, ServerConfig,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Path used when `--config` is not given. Its absence is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "./loyal-config.toml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("database URI not set (use -d or DATABASE_URI)")]
    MissingDatabaseUri,
}

/// Values taken from the command line or its environment variables.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub database_uri: Option<String>,
    pub accrual_address: Option<Url>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    required: bool,
    overrides: CliOverrides,
}

impl ConfigLoader {
    /// `config_path` of `None` reads [`DEFAULT_CONFIG_PATH`] if it exists.
    pub fn new(config_path: Option<impl AsRef<Path>>, overrides: CliOverrides) -> Self {
        let (config_path, required) = match config_path {
            Some(path) => (path.as_ref().to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        Self {
            config_path,
            required,
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if any
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = self.read_file()?;

        if let Some(listen) = &self.overrides.listen {
            file_config.server.listen = listen.clone();
        }
        if let Some(address) = &self.overrides.accrual_address {
            file_config.accrual.base_url = address.to_string();
        }

        let database_uri = self
            .overrides
            .database_uri
            .clone()
            .filter(|uri| !uri.is_empty())
            .ok_or(ConfigError::MissingDatabaseUri)?;

        let accrual_url = self.validate(&file_config)?;

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            database_uri,
            accrual: AccrualConfig {
                base_url: accrual_url,
                request_timeout: Duration::from_secs(file_config.accrual.request_timeout_secs),
            },
            pipeline: PipelineConfig {
                batch_size: file_config.pipeline.batch_size,
                idle_interval: Duration::from_secs(file_config.pipeline.idle_interval_secs),
                channel_buffer: file_config.pipeline.channel_buffer,
            },
            auth: build_auth(file_config.auth),
        })
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => {
                tracing::info!("Configuration loaded from {:?}", self.config_path);
                Ok(toml::from_str(&content)?)
            }
            Err(e) if !self.required && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {:?}, using defaults", self.config_path);
                Ok(FileConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check value ranges and return the parsed accrual URL.
    fn validate(&self, config: &FileConfig) -> Result<Url, ConfigError> {
        if config.pipeline.batch_size <= 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.batch_size must be positive".to_string(),
            ));
        }
        if config.pipeline.channel_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.channel_buffer must be positive".to_string(),
            ));
        }
        if config.auth.session_ttl_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_ttl_secs must be positive".to_string(),
            ));
        }

        let url = Url::parse(&config.accrual.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "invalid accrual address {}: {e}",
                config.accrual.base_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "accrual address must be http or https, got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

fn build_auth(auth: file::AuthConfig) -> AuthConfig {
    let key: Box<[u8]> = match auth.secret {
        Some(secret) if !secret.is_empty() => secret.into_bytes().into_boxed_slice(),
        _ => {
            tracing::warn!(
                "No auth.secret configured; using a random session key, sessions will not survive a restart"
            );
            rand::random::<[u8; 32]>().into()
        }
    };
    AuthConfig::new(key, auth.session_ttl_secs)
}
