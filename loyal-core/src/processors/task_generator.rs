//! TaskGenerator processor.
//!
//! The TaskGenerator is responsible for:
//! - Paging through non-terminal orders in ascending id order
//! - Emitting each one as a `PendingOrder`
//! - Sleeping and restarting from id zero once a pass comes back empty
//!
//! A ledger read failure stops the generator and is returned to the caller.

use super::shutdown_requested;
use crate::config::PipelineConfig;
use crate::events::PendingOrderSender;
use crate::ledger::{LedgerError, OrderScanner};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("failed to scan pending orders: {0}")]
    Scan(#[from] LedgerError),
}

pub struct TaskGenerator {
    scanner: Arc<dyn OrderScanner>,
    task_tx: PendingOrderSender,
    shutdown_rx: watch::Receiver<bool>,
    batch_size: i64,
    idle_interval: Duration,
}

impl TaskGenerator {
    pub fn new(
        scanner: Arc<dyn OrderScanner>,
        task_tx: PendingOrderSender,
        shutdown_rx: watch::Receiver<bool>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            scanner,
            task_tx,
            shutdown_rx,
            batch_size: config.batch_size,
            idle_interval: config.idle_interval,
        }
    }

    /// Run until shutdown, until the downstream stage goes away, or until a
    /// scan fails.
    pub async fn run(mut self) -> Result<(), GeneratorError> {
        info!("TaskGenerator started");

        let mut last_id = 0;
        'scan: loop {
            let scan = tokio::select! {
                biased;

                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    info!("TaskGenerator received shutdown signal");
                    break 'scan;
                }

                scan = self.scanner.pending_orders(last_id, self.batch_size) => scan,
            };

            let orders = match scan {
                Ok(orders) => orders,
                Err(e) => {
                    error!(error = %e, after_id = last_id, "Failed to scan pending orders");
                    return Err(e.into());
                }
            };

            if orders.is_empty() {
                debug!(
                    idle_secs = self.idle_interval.as_secs(),
                    "No more pending orders, waiting before the next pass"
                );
                tokio::select! {
                    biased;

                    _ = shutdown_requested(&mut self.shutdown_rx) => {
                        info!("TaskGenerator received shutdown signal");
                        break 'scan;
                    }

                    _ = tokio::time::sleep(self.idle_interval) => {}
                }
                last_id = 0;
                continue;
            }

            debug!(count = orders.len(), after_id = last_id, "Scanned pending orders");

            for order in orders {
                last_id = last_id.max(order.id);
                let sent = tokio::select! {
                    biased;

                    _ = shutdown_requested(&mut self.shutdown_rx) => {
                        info!("TaskGenerator received shutdown signal");
                        break 'scan;
                    }

                    sent = self.task_tx.send(order) => sent,
                };
                if sent.is_err() {
                    info!("PendingOrder channel closed");
                    break 'scan;
                }
            }
        }

        info!("TaskGenerator shutdown complete");
        Ok(())
    }
}
