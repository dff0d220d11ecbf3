//! Validated runtime configuration.
//!
//! The pipeline and accrual types live in `loyal-core::config`; this module
//! adds the parts only the server needs.

pub use loyal_core::config::{AccrualConfig, PipelineConfig};

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: String,
}

/// Session token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    key: Box<[u8]>,
    pub session_ttl_secs: i64,
}

impl AuthConfig {
    pub fn new(key: impl Into<Box<[u8]>>, session_ttl_secs: i64) -> Self {
        Self {
            key: key.into(),
            session_ttl_secs,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("key", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

/// Everything `main` needs to start the service.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub database_uri: String,
    pub accrual: AccrualConfig,
    pub pipeline: PipelineConfig,
    pub auth: AuthConfig,
}
