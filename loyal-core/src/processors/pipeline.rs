//! Wiring of the three pipeline stages.

use super::{BalanceUpdater, GeneratorError, StatusReconciler, TaskGenerator};
use crate::accrual::AccrualSource;
use crate::config::PipelineConfig;
use crate::events::{pending_order_channel, status_change_channel};
use crate::ledger::{OrderScanner, StatusApplier};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;

/// Join handles of a running pipeline.
///
/// The generator finishing with an error means the pipeline cannot make
/// progress; callers should broadcast shutdown and then [`join`](Self::join).
pub struct PipelineHandle {
    pub generator: JoinHandle<Result<(), GeneratorError>>,
    pub reconciler: JoinHandle<()>,
    pub updater: JoinHandle<()>,
}

impl PipelineHandle {
    /// Wait for the reconciler and the updater to drain and exit.
    ///
    /// Use after the generator handle has already been awaited.
    pub async fn join_stages(self) {
        if let Err(e) = self.reconciler.await {
            error!(error = %e, "StatusReconciler task failed");
        }
        if let Err(e) = self.updater.await {
            error!(error = %e, "BalanceUpdater task failed");
        }
    }

    /// Wait for all three stages; returns the generator's outcome.
    pub async fn join(mut self) -> Result<(), GeneratorError> {
        let result = match (&mut self.generator).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "TaskGenerator task failed");
                Ok(())
            }
        };
        self.join_stages().await;
        result
    }
}

/// Spawn generator, reconciler and updater connected by bounded channels,
/// all listening on `shutdown_rx`.
pub fn spawn_pipeline(
    scanner: Arc<dyn OrderScanner>,
    accrual: Arc<dyn AccrualSource>,
    applier: Arc<dyn StatusApplier>,
    config: &PipelineConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> PipelineHandle {
    let (task_tx, task_rx) = pending_order_channel(config.channel_buffer);
    let (change_tx, change_rx) = status_change_channel(config.channel_buffer);

    let generator = TaskGenerator::new(scanner, task_tx, shutdown_rx.clone(), config);
    let reconciler = StatusReconciler::new(accrual, task_rx, change_tx, shutdown_rx.clone());
    let updater = BalanceUpdater::new(applier, change_rx, shutdown_rx);

    PipelineHandle {
        generator: tokio::spawn(generator.run()),
        reconciler: tokio::spawn(reconciler.run()),
        updater: tokio::spawn(updater.run()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::{AccrualError, AccrualReport};
    use crate::entities::OrderStatus;
    use crate::events::PendingOrder;
    use crate::ledger::{Ledger, LedgerError, MemoryLedger};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct ScriptedAccrual {
        script: Mutex<VecDeque<Result<AccrualReport, AccrualError>>>,
    }

    #[async_trait]
    impl AccrualSource for ScriptedAccrual {
        async fn order_status(&self, _number: &str) -> Result<AccrualReport, AccrualError> {
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(AccrualError::OrderNotFound))
        }
    }

    fn report(status: OrderStatus, accrual: i64) -> Result<AccrualReport, AccrualError> {
        Ok(AccrualReport {
            number: "79927398713".to_string(),
            status,
            accrual: Decimal::from(accrual),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_flows_to_balance() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.insert_order("79927398713", 1).await.unwrap();
        let accrual = Arc::new(ScriptedAccrual {
            script: Mutex::new(VecDeque::from([
                report(OrderStatus::Processing, 0),
                Err(AccrualError::Throttled {
                    retry_after: Duration::from_secs(1),
                }),
                report(OrderStatus::Processed, 500),
            ])),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pipeline = spawn_pipeline(
            ledger.clone(),
            accrual,
            ledger.clone(),
            &PipelineConfig::default(),
            shutdown_rx,
        );

        let mut waited = 0;
        while ledger.balance(1).await.unwrap().current != Decimal::from(500) {
            assert!(waited < 300, "order was never credited");
            tokio::time::sleep(Duration::from_secs(1)).await;
            waited += 1;
        }

        let order = ledger.order("79927398713").await.unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.accrual, Some(Decimal::from(500)));

        shutdown_tx.send(true).unwrap();
        assert!(pipeline.join().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stages_exit_on_shutdown() {
        let ledger = Arc::new(MemoryLedger::new());
        let accrual = Arc::new(ScriptedAccrual {
            script: Mutex::new(VecDeque::new()),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pipeline = spawn_pipeline(
            ledger.clone(),
            accrual,
            ledger,
            &PipelineConfig::default(),
            shutdown_rx,
        );

        tokio::time::sleep(Duration::from_secs(90)).await;
        shutdown_tx.send(true).unwrap();
        assert!(pipeline.join().await.is_ok());
    }

    struct BrokenScanner;

    #[async_trait]
    impl OrderScanner for BrokenScanner {
        async fn pending_orders(
            &self,
            _after_id: i64,
            _limit: i64,
        ) -> Result<Vec<PendingOrder>, LedgerError> {
            Err(LedgerError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_failure_drains_downstream_stages() {
        let accrual = Arc::new(ScriptedAccrual {
            script: Mutex::new(VecDeque::new()),
        });
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let pipeline = spawn_pipeline(
            Arc::new(BrokenScanner),
            accrual,
            Arc::new(MemoryLedger::new()),
            &PipelineConfig::default(),
            shutdown_rx,
        );

        let result = tokio::time::timeout(Duration::from_secs(5), pipeline.join())
            .await
            .expect("stages kept running after the generator failed");
        assert!(matches!(result, Err(GeneratorError::Scan(_))));
    }
}
