//! The order ledger: orders, balances, withdrawals and user accounts.
//!
//! Every mutation is a single conditional unit of work. The pipeline depends
//! on the narrow [`OrderScanner`] and [`StatusApplier`] traits; the HTTP layer
//! depends on [`Ledger`] and [`Accounts`].

mod postgres;
#[cfg(any(test, feature = "memory-ledger"))]
mod memory;

pub use postgres::PgLedger;
#[cfg(any(test, feature = "memory-ledger"))]
pub use memory::MemoryLedger;

pub use crate::entities::balances::Balance;
pub use crate::entities::order_records::{ApplyOutcome, OrderRecord, PendingOrder};
pub use crate::entities::users::UserCredentials;
pub use crate::entities::withdrawals::Withdrawal;

use crate::entities::MONEY_SCALE;
use crate::events::StatusChange;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Storage failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("order number already uploaded by another user")]
    ClaimedByAnotherUser,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum WithdrawError {
    /// Zero, negative, or finer than two decimal places.
    #[error("invalid withdrawal amount")]
    InvalidAmount,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("login already taken")]
    LoginTaken,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Non-error outcome of uploading an order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// A new order was created for the caller.
    Accepted,
    /// The caller had already uploaded this number.
    AlreadyUploaded,
}

impl IntakeOutcome {
    /// Map the owner reported by an insert-or-lookup onto the caller.
    pub(crate) fn resolve(
        inserted: bool,
        owner: i64,
        caller: i64,
    ) -> Result<IntakeOutcome, IntakeError> {
        if inserted {
            Ok(IntakeOutcome::Accepted)
        } else if owner == caller {
            Ok(IntakeOutcome::AlreadyUploaded)
        } else {
            Err(IntakeError::ClaimedByAnotherUser)
        }
    }
}

/// Reject amounts that cannot be stored exactly or are not a debit.
pub(crate) fn check_withdrawal_amount(amount: Decimal) -> Result<Decimal, WithdrawError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > MONEY_SCALE {
        return Err(WithdrawError::InvalidAmount);
    }
    Ok(amount)
}

/// Source of non-terminal orders for the task generator.
#[async_trait]
pub trait OrderScanner: Send + Sync {
    /// Up to `limit` non-terminal orders with id greater than `after_id`,
    /// ascending by id.
    async fn pending_orders(&self, after_id: i64, limit: i64)
    -> Result<Vec<PendingOrder>, LedgerError>;
}

/// Sink for status changes found by the reconciler.
#[async_trait]
pub trait StatusApplier: Send + Sync {
    /// Finalize the order if it is still non-terminal and credit its owner
    /// when it became `PROCESSED`. Atomic.
    async fn apply_status_change(&self, change: &StatusChange)
    -> Result<ApplyOutcome, LedgerError>;
}

/// Full ledger surface used by the HTTP layer.
#[async_trait]
pub trait Ledger: OrderScanner + StatusApplier {
    /// Insert the number as a `NEW` order owned by `user_id`, or report who
    /// already owns it.
    async fn insert_order(&self, number: &str, user_id: i64)
    -> Result<IntakeOutcome, IntakeError>;

    /// Debit `amount` and record a withdrawal against `order_number`, only if
    /// the live balance covers it.
    async fn withdraw(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, WithdrawError>;

    /// The user's orders, newest first.
    async fn user_orders(&self, user_id: i64) -> Result<Vec<OrderRecord>, LedgerError>;

    /// The user's balance; zero if they never had one.
    async fn balance(&self, user_id: i64) -> Result<Balance, LedgerError>;

    /// The user's withdrawals, newest first.
    async fn user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError>;
}

/// User account storage.
#[async_trait]
pub trait Accounts: Send + Sync {
    /// Create a user and return its id.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, RegisterError>;

    async fn find_user(&self, login: &str) -> Result<Option<UserCredentials>, LedgerError>;
}
