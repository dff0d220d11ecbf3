//! Event type definitions.
//!
//! Events flowing between pipeline stages:
//! - `PendingOrder`: TaskGenerator -> StatusReconciler
//! - `StatusChange`: StatusReconciler -> BalanceUpdater

use crate::entities::OrderStatus;
use rust_decimal::Decimal;

pub use crate::entities::order_records::PendingOrder;

/// A status reported by the accrual system that differs from the stored one.
///
/// `order` carries the status as it was when the order was scanned; the
/// updater applies `status` only if the stored order is still non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order: PendingOrder,
    pub status: OrderStatus,
    /// Points awarded, rounded to two decimal places. Zero unless `PROCESSED`.
    pub accrual: Decimal,
}
