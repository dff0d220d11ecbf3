//! Balance and withdrawal payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response of `GET /api/user/balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

/// Request body of `POST /api/user/balance/withdraw`.
///
/// `order` is the label the points are spent on; it must pass the same
/// checksum as uploaded order numbers but is never looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
}

/// One entry of `GET /api/user/withdrawals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: time::OffsetDateTime,
}
