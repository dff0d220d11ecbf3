pub mod balances;
pub mod order_records;
pub mod users;
pub mod withdrawals;

use loyal_sdk::objects::OrderStatus as SdkOrderStatus;

/// Scale of every stored amount (`NUMERIC(20, 2)`).
pub const MONEY_SCALE: u32 = 2;

/// Order lifecycle status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `loyal_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE", type_name = "order_status")]
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
        SdkOrderStatus::from(*self).fmt(f)
    }
}

impl From<OrderStatus> for SdkOrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::New => SdkOrderStatus::New,
            OrderStatus::Registered => SdkOrderStatus::Registered,
            OrderStatus::Processing => SdkOrderStatus::Processing,
            OrderStatus::Invalid => SdkOrderStatus::Invalid,
            OrderStatus::Processed => SdkOrderStatus::Processed,
        }
    }
}

impl From<SdkOrderStatus> for OrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::New => OrderStatus::New,
            SdkOrderStatus::Registered => OrderStatus::Registered,
            SdkOrderStatus::Processing => OrderStatus::Processing,
            SdkOrderStatus::Invalid => OrderStatus::Invalid,
            SdkOrderStatus::Processed => OrderStatus::Processed,
        }
    }
}
