//! Event system for the accrual pipeline.
//!
//! # Event Flow
//!
//! 1. `TaskGenerator` scans the ledger and emits `PendingOrder`
//! 2. `StatusReconciler` asks the accrual system and emits `StatusChange`
//! 3. `BalanceUpdater` applies the change to the ledger
//!
//! A `StatusChange` may be applied more than once; only the first one that
//! finds the order non-terminal takes effect.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, PendingOrderReceiver, PendingOrderSender, StatusChangeReceiver,
    StatusChangeSender, pending_order_channel, status_change_channel,
};

pub use types::{PendingOrder, StatusChange};
