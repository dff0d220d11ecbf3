//! Wire types shared between the server, the pipeline and API consumers.

pub mod accrual;
pub mod auth;
pub mod balance;
pub mod orders;

pub use accrual::AccrualOrderResponse;
pub use auth::Credentials;
pub use balance::{BalanceResponse, WithdrawRequest, WithdrawalResponse};
pub use orders::{OrderResponse, OrderStatus};
