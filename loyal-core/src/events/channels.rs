//! Event channel factories and handles.
//!
//! Bounded channels connect the pipeline stages, so a slow stage applies
//! back-pressure to the one before it.

use super::types::{PendingOrder, StatusChange};
use tokio::sync::mpsc;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for pending orders.
pub type PendingOrderSender = mpsc::Sender<PendingOrder>;
/// Receiver handle for pending orders.
pub type PendingOrderReceiver = mpsc::Receiver<PendingOrder>;

/// Sender handle for StatusChange events.
pub type StatusChangeSender = mpsc::Sender<StatusChange>;
/// Receiver handle for StatusChange events.
pub type StatusChangeReceiver = mpsc::Receiver<StatusChange>;

/// Create a new pending order channel.
///
/// `buffer` must be non-zero.
pub fn pending_order_channel(buffer: usize) -> (PendingOrderSender, PendingOrderReceiver) {
    mpsc::channel(buffer)
}

/// Create a new StatusChange channel.
///
/// `buffer` must be non-zero.
pub fn status_change_channel(buffer: usize) -> (StatusChangeSender, StatusChangeReceiver) {
    mpsc::channel(buffer)
}
