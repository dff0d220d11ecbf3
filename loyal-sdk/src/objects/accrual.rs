//! Response body of the external accrual service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::orders::OrderStatus;

/// `200 OK` body of `GET /api/orders/{number}` on the accrual service.
///
/// The service omits `accrual` for anything but `PROCESSED` orders; it
/// defaults to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualOrderResponse {
    pub order: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub accrual: Decimal,
}
