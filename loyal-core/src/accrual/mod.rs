//! Client side of the external accrual system.

mod client;

pub use client::AccrualClient;

use crate::entities::OrderStatus;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Delay used when a throttle response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Errors returned by an accrual query.
#[derive(Debug, Error)]
pub enum AccrualError {
    /// The service asked us to wait before asking again.
    #[error("throttled, retry after {} seconds", .retry_after.as_secs())]
    Throttled { retry_after: Duration },

    /// The service does not know this order number.
    #[error("order is not registered in the accrual system")]
    OrderNotFound,

    #[error("accrual system internal error")]
    Internal,

    /// A report carrying an accrual below zero.
    #[error("accrual system reported a negative accrual {0}")]
    NegativeAccrual(Decimal),

    #[error("unexpected accrual response status {0}")]
    UnexpectedStatus(u16),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("accrual response parsing error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The accrual system's view of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualReport {
    pub number: String,
    pub status: OrderStatus,
    /// Zero unless the order is `PROCESSED`.
    pub accrual: Decimal,
}

/// Something that can be asked for an order's accrual status.
#[async_trait]
pub trait AccrualSource: Send + Sync {
    async fn order_status(&self, number: &str) -> Result<AccrualReport, AccrualError>;
}
