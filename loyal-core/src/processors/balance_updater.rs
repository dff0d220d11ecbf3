//! BalanceUpdater processor.
//!
//! The BalanceUpdater is responsible for:
//! - Receiving `StatusChange` from the StatusReconciler
//! - Committing the new status, and the owner's credit for processed orders,
//!   in one ledger transaction
//!
//! A change for an order that is already terminal is dropped quietly. A failed
//! commit is not retried: terminal orders are never rescanned, so the failure
//! is logged at error level for manual reconciliation.

use super::shutdown_requested;
use crate::events::{StatusChange, StatusChangeReceiver};
use crate::ledger::{ApplyOutcome, LedgerError, StatusApplier};
use kanau::processor::Processor;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub struct BalanceUpdater {
    applier: Arc<dyn StatusApplier>,
    change_rx: StatusChangeReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl BalanceUpdater {
    pub fn new(
        applier: Arc<dyn StatusApplier>,
        change_rx: StatusChangeReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            applier,
            change_rx,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!("BalanceUpdater started");

        loop {
            let change = tokio::select! {
                biased;

                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    info!("BalanceUpdater received shutdown signal");
                    break;
                }

                change = self.change_rx.recv() => match change {
                    Some(change) => change,
                    None => {
                        info!("StatusChange channel closed");
                        break;
                    }
                },
            };

            let order_id = change.order.id;
            let order_number = change.order.number.clone();
            let status = change.status;
            let accrual = change.accrual;

            if let Err(e) = self.process(change).await {
                error!(
                    order_id,
                    order_number = %order_number,
                    status = %status,
                    accrual = %accrual,
                    error = %e,
                    "Failed to apply order status change; needs manual reconciliation"
                );
            }
        }

        info!("BalanceUpdater shutdown complete");
    }
}

impl Processor<StatusChange> for BalanceUpdater {
    type Output = ApplyOutcome;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, name = "BalanceUpdater", fields(order_id = change.order.id))]
    async fn process(&self, change: StatusChange) -> Result<ApplyOutcome, LedgerError> {
        let outcome = self.applier.apply_status_change(&change).await?;
        match outcome {
            ApplyOutcome::Applied {
                user_id,
                credited: Some(amount),
            } => info!(
                user_id,
                status = %change.status,
                credited = %amount,
                "Order processed, balance credited"
            ),
            ApplyOutcome::Applied { .. } => {
                debug!(status = %change.status, "Order status updated")
            }
            ApplyOutcome::AlreadyFinal => {
                debug!("Order already final, dropping status change")
            }
        }
        Ok(outcome)
    }
}
