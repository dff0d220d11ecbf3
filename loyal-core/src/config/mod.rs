//! Configuration types for the loyalty service.
//!
//! These types represent the validated runtime configuration used by the
//! pipeline and the accrual client. Loading and parsing is handled by the
//! server crate.

use std::time::Duration;
use url::Url;

/// Tuning for the background accrual pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of pending orders read per scan.
    pub batch_size: i64,
    /// Pause after a scan that found nothing new.
    pub idle_interval: Duration,
    /// Capacity of each stage-to-stage channel.
    pub channel_buffer: usize,
}

impl PipelineConfig {
    pub const DEFAULT_BATCH_SIZE: i64 = 100;
    pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(30);
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            idle_interval: Self::DEFAULT_IDLE_INTERVAL,
            channel_buffer: crate::events::DEFAULT_CHANNEL_BUFFER,
        }
    }
}

/// Where and how to reach the external accrual system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl AccrualConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
