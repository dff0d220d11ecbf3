//! Order payloads returned by the user API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order lifecycle status as it appears on the wire.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `loyal-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// `PROCESSED` and `INVALID` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Processed | OrderStatus::Invalid)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Registered => write!(f, "REGISTERED"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Invalid => write!(f, "INVALID"),
            OrderStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// One uploaded order in `GET /api/user/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: time::OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processed).unwrap(),
            "\"PROCESSED\""
        );
        let status: OrderStatus = serde_json::from_str("\"REGISTERED\"").unwrap();
        assert_eq!(status, OrderStatus::Registered);
        assert!(serde_json::from_str::<OrderStatus>("\"processed\"").is_err());
    }

    #[test]
    fn test_order_response_omits_missing_accrual() {
        let order = OrderResponse {
            number: "9278923470".to_string(),
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: time::macros::datetime!(2020-12-10 15:15:45 +3),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("accrual").is_none());
        assert_eq!(json["uploaded_at"], "2020-12-10T15:15:45+03:00");

        let processed = OrderResponse {
            accrual: Some(Decimal::new(500, 0)),
            status: OrderStatus::Processed,
            ..order
        };
        let json = serde_json::to_value(&processed).unwrap();
        assert_eq!(json["accrual"], serde_json::json!(500.0));
    }
}
