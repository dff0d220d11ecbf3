//! Pipeline stages for the accrual reconciliation loop.
//!
//! - `TaskGenerator`: scans the ledger, emits `PendingOrder`
//! - `StatusReconciler`: receives `PendingOrder`, emits `StatusChange`
//! - `BalanceUpdater`: receives `StatusChange`, commits it to the ledger

pub mod balance_updater;
pub mod pipeline;
pub mod status_reconciler;
pub mod task_generator;

pub use balance_updater::BalanceUpdater;
pub use pipeline::{PipelineHandle, spawn_pipeline};
pub use status_reconciler::{StatusChecker, StatusReconciler};
pub use task_generator::{GeneratorError, TaskGenerator};

use tokio::sync::watch;

/// Resolves once shutdown is signalled or the sender is gone.
pub async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}
