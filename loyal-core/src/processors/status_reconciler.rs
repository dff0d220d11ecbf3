//! StatusReconciler processor.
//!
//! The StatusReconciler is responsible for:
//! - Receiving `PendingOrder` from the TaskGenerator
//! - Querying the accrual system for each order, one at a time
//! - Waiting out throttling for as long as the accrual system asks
//! - Emitting a `StatusChange` only when the status moved
//!
//! Unknown orders and accrual failures are logged and skipped; the next full
//! pass picks the order up again.

use super::shutdown_requested;
use crate::accrual::{AccrualError, AccrualReport, AccrualSource};
use crate::entities::MONEY_SCALE;
use crate::events::{PendingOrder, PendingOrderReceiver, StatusChange, StatusChangeSender};
use kanau::processor::Processor;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Turns one pending order into an optional status change.
#[derive(Clone)]
pub struct StatusChecker {
    accrual: Arc<dyn AccrualSource>,
}

impl StatusChecker {
    pub fn new(accrual: Arc<dyn AccrualSource>) -> Self {
        Self { accrual }
    }

    /// Query the accrual system, retrying the same request for as long as it
    /// keeps answering with a throttle.
    async fn fetch_with_backoff(&self, number: &str) -> Result<AccrualReport, AccrualError> {
        loop {
            match self.accrual.order_status(number).await {
                Err(AccrualError::Throttled { retry_after }) => {
                    warn!(
                        order_number = number,
                        retry_after_secs = retry_after.as_secs(),
                        "Accrual system throttled the query, backing off"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                other => return other,
            }
        }
    }
}

impl Processor<PendingOrder> for StatusChecker {
    type Output = Option<StatusChange>;
    type Error = AccrualError;
    #[tracing::instrument(skip_all, name = "StatusChecker", fields(order_id = order.id))]
    async fn process(&self, order: PendingOrder) -> Result<Option<StatusChange>, AccrualError> {
        let report = self.fetch_with_backoff(&order.number).await?;

        if report.status == order.status {
            debug!(status = %report.status, "Accrual status unchanged");
            return Ok(None);
        }

        if report.accrual < Decimal::ZERO {
            return Err(AccrualError::NegativeAccrual(report.accrual));
        }
        let accrual = report
            .accrual
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        debug!(
            from = %order.status,
            to = %report.status,
            accrual = %accrual,
            "Accrual status changed"
        );
        Ok(Some(StatusChange {
            order,
            status: report.status,
            accrual,
        }))
    }
}

pub struct StatusReconciler {
    checker: StatusChecker,
    task_rx: PendingOrderReceiver,
    change_tx: StatusChangeSender,
    shutdown_rx: watch::Receiver<bool>,
}

impl StatusReconciler {
    pub fn new(
        accrual: Arc<dyn AccrualSource>,
        task_rx: PendingOrderReceiver,
        change_tx: StatusChangeSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            checker: StatusChecker::new(accrual),
            task_rx,
            change_tx,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!("StatusReconciler started");

        loop {
            let order = tokio::select! {
                biased;

                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    info!("StatusReconciler received shutdown signal");
                    break;
                }

                order = self.task_rx.recv() => match order {
                    Some(order) => order,
                    None => {
                        info!("PendingOrder channel closed");
                        break;
                    }
                },
            };

            let order_id = order.id;
            let order_number = order.number.clone();

            // Throttle backoff can be long; it must not hold up shutdown.
            let checked = tokio::select! {
                biased;

                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    info!("StatusReconciler received shutdown signal");
                    break;
                }

                checked = self.checker.process(order) => checked,
            };

            let change = match checked {
                Ok(Some(change)) => change,
                Ok(None) => continue,
                Err(AccrualError::OrderNotFound) => {
                    info!(
                        order_id,
                        order_number = %order_number,
                        "Order is not registered in the accrual system, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    error!(
                        order_id,
                        order_number = %order_number,
                        error = %e,
                        "Failed to query accrual status, skipping until next pass"
                    );
                    continue;
                }
            };

            let sent = tokio::select! {
                biased;

                _ = shutdown_requested(&mut self.shutdown_rx) => {
                    info!("StatusReconciler received shutdown signal");
                    break;
                }

                sent = self.change_tx.send(change) => sent,
            };
            if sent.is_err() {
                info!("StatusChange channel closed");
                break;
            }
        }

        info!("StatusReconciler shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;
    use crate::events::{pending_order_channel, status_change_channel};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    /// Answers from a script, then reports every further order as unknown.
    #[derive(Default)]
    struct ScriptedAccrual {
        script: Mutex<VecDeque<Result<AccrualReport, AccrualError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAccrual {
        fn new(script: Vec<Result<AccrualReport, AccrualError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl AccrualSource for ScriptedAccrual {
        async fn order_status(&self, number: &str) -> Result<AccrualReport, AccrualError> {
            self.calls.lock().await.push(number.to_string());
            self.script
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(AccrualError::OrderNotFound))
        }
    }

    fn order(id: i64, status: OrderStatus) -> PendingOrder {
        PendingOrder {
            id,
            number: "79927398713".to_string(),
            status,
        }
    }

    fn report(status: OrderStatus, accrual: &str) -> Result<AccrualReport, AccrualError> {
        Ok(AccrualReport {
            number: "79927398713".to_string(),
            status,
            accrual: Decimal::from_str(accrual).unwrap(),
        })
    }

    fn throttled(secs: u64) -> Result<AccrualReport, AccrualError> {
        Err(AccrualError::Throttled {
            retry_after: Duration::from_secs(secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_same_query_after_throttle() {
        let accrual = ScriptedAccrual::new(vec![
            throttled(1),
            throttled(1),
            report(OrderStatus::Processed, "500"),
        ]);
        let checker = StatusChecker::new(accrual.clone());

        let started = Instant::now();
        let change = checker
            .process(order(1, OrderStatus::New))
            .await
            .unwrap()
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(change.status, OrderStatus::Processed);
        assert_eq!(change.accrual, Decimal::from(500));
        assert_eq!(accrual.calls.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_unchanged_status_emits_nothing() {
        let accrual = ScriptedAccrual::new(vec![report(OrderStatus::Processing, "0")]);
        let checker = StatusChecker::new(accrual);

        let change = checker
            .process(order(1, OrderStatus::Processing))
            .await
            .unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn test_accrual_rounded_to_cents() {
        let accrual = ScriptedAccrual::new(vec![report(OrderStatus::Processed, "729.985")]);
        let checker = StatusChecker::new(accrual);

        let change = checker
            .process(order(1, OrderStatus::Registered))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.accrual, Decimal::from_str("729.99").unwrap());
    }

    #[tokio::test]
    async fn test_non_throttle_errors_are_not_retried() {
        let accrual = ScriptedAccrual::new(vec![Err(AccrualError::Internal)]);
        let checker = StatusChecker::new(accrual.clone());

        let result = checker.process(order(1, OrderStatus::New)).await;
        assert!(matches!(result, Err(AccrualError::Internal)));
        assert_eq!(accrual.calls.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_accrual_is_rejected() {
        let accrual = ScriptedAccrual::new(vec![report(OrderStatus::Processed, "-10")]);
        let checker = StatusChecker::new(accrual);

        let result = checker.process(order(1, OrderStatus::New)).await;
        assert!(matches!(result, Err(AccrualError::NegativeAccrual(_))));
    }

    #[tokio::test]
    async fn test_exits_when_task_channel_closes() {
        let accrual = ScriptedAccrual::new(vec![]);
        let (task_tx, task_rx) = pending_order_channel(16);
        let (change_tx, mut change_rx) = status_change_channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle =
            tokio::spawn(StatusReconciler::new(accrual, task_rx, change_tx, shutdown_rx).run());

        drop(task_tx);
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("StatusReconciler kept running after its input closed")
            .unwrap();
        assert!(change_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forwards_changes_and_skips_failures() {
        let accrual = ScriptedAccrual::new(vec![
            Err(AccrualError::OrderNotFound),
            Err(AccrualError::Internal),
            report(OrderStatus::Processing, "0"),
            report(OrderStatus::Processed, "-1"),
            throttled(1),
            throttled(1),
            report(OrderStatus::Processed, "500"),
        ]);
        let (task_tx, task_rx) = pending_order_channel(16);
        let (change_tx, mut change_rx) = status_change_channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle =
            tokio::spawn(StatusReconciler::new(accrual, task_rx, change_tx, shutdown_rx).run());

        for id in 1..=5 {
            task_tx.send(order(id, OrderStatus::Processing)).await.unwrap();
        }
        drop(task_tx);

        let change = change_rx.recv().await.unwrap();
        assert_eq!(change.order.id, 5);
        assert_eq!(change.status, OrderStatus::Processed);

        assert!(change_rx.recv().await.is_none());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("StatusReconciler kept running after its input closed")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let accrual = ScriptedAccrual::new(vec![throttled(3600)]);
        let (task_tx, task_rx) = pending_order_channel(16);
        let (change_tx, mut change_rx) = status_change_channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle =
            tokio::spawn(StatusReconciler::new(accrual, task_rx, change_tx, shutdown_rx).run());

        task_tx.send(order(1, OrderStatus::New)).await.unwrap();
        tokio::task::yield_now().await;

        let started = Instant::now();
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(3600));
        assert!(change_rx.recv().await.is_none());
    }
}
