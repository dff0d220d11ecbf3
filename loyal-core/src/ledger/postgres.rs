use super::{
    Accounts, ApplyOutcome, Balance, IntakeError, IntakeOutcome, Ledger, LedgerError, OrderRecord,
    OrderScanner, PendingOrder, RegisterError, StatusApplier, UserCredentials, WithdrawError,
    Withdrawal, check_withdrawal_amount,
};
use crate::entities::balances::GetBalance;
use crate::entities::order_records::{
    ApplyOrderStatusChange, GetPendingOrders, InsertOrderIfAbsent, ListUserOrders,
};
use crate::entities::users::{GetUserByLogin, InsertUser};
use crate::entities::withdrawals::{ListUserWithdrawals, WithdrawFromBalance};
use crate::events::StatusChange;
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// PostgreSQL ledger backed by the workspace migrations.
#[derive(Debug, Clone)]
pub struct PgLedger {
    db: DatabaseProcessor,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor { pool },
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db.pool
    }
}

#[async_trait]
impl OrderScanner for PgLedger {
    async fn pending_orders(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<PendingOrder>, LedgerError> {
        Ok(self.db.process(GetPendingOrders { after_id, limit }).await?)
    }
}

#[async_trait]
impl StatusApplier for PgLedger {
    async fn apply_status_change(
        &self,
        change: &StatusChange,
    ) -> Result<ApplyOutcome, LedgerError> {
        let cmd = ApplyOrderStatusChange {
            order_id: change.order.id,
            status: change.status,
            accrual: change.accrual,
        };
        Ok(self.db.process(cmd).await?)
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn insert_order(
        &self,
        number: &str,
        user_id: i64,
    ) -> Result<IntakeOutcome, IntakeError> {
        let claim = self
            .db
            .process(InsertOrderIfAbsent {
                number: number.to_string(),
                user_id,
            })
            .await
            .map_err(LedgerError::from)?;
        IntakeOutcome::resolve(claim.inserted, claim.user_id, user_id)
    }

    async fn withdraw(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, WithdrawError> {
        let amount = check_withdrawal_amount(amount)?;
        let withdrawal = self
            .db
            .process(WithdrawFromBalance {
                user_id,
                order_number: order_number.to_string(),
                amount,
            })
            .await
            .map_err(LedgerError::from)?;
        withdrawal.ok_or(WithdrawError::InsufficientFunds)
    }

    async fn user_orders(&self, user_id: i64) -> Result<Vec<OrderRecord>, LedgerError> {
        Ok(self.db.process(ListUserOrders { user_id }).await?)
    }

    async fn balance(&self, user_id: i64) -> Result<Balance, LedgerError> {
        Ok(self.db.process(GetBalance { user_id }).await?)
    }

    async fn user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError> {
        Ok(self.db.process(ListUserWithdrawals { user_id }).await?)
    }
}

#[async_trait]
impl Accounts for PgLedger {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, RegisterError> {
        let id = self
            .db
            .process(InsertUser {
                login: login.to_string(),
                password_hash: password_hash.to_string(),
            })
            .await
            .map_err(LedgerError::from)?;
        id.ok_or(RegisterError::LoginTaken)
    }

    async fn find_user(&self, login: &str) -> Result<Option<UserCredentials>, LedgerError> {
        Ok(self
            .db
            .process(GetUserByLogin {
                login: login.to_string(),
            })
            .await?)
    }
}

/// These need a live PostgreSQL reachable through `DATABASE_URL`:
/// `cargo test -p loyal-core -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;
    use std::str::FromStr;

    async fn user(ledger: &PgLedger, login: &str) -> i64 {
        ledger.create_user(login, "hash").await.unwrap()
    }

    fn change(order: PendingOrder, status: OrderStatus, accrual: i64) -> StatusChange {
        StatusChange {
            order,
            status,
            accrual: Decimal::from(accrual),
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_intake_ownership(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let alice = user(&ledger, "alice").await;
        let bob = user(&ledger, "bob").await;

        assert_eq!(
            ledger.insert_order("79927398713", alice).await.unwrap(),
            IntakeOutcome::Accepted
        );
        assert_eq!(
            ledger.insert_order("79927398713", alice).await.unwrap(),
            IntakeOutcome::AlreadyUploaded
        );
        assert!(matches!(
            ledger.insert_order("79927398713", bob).await,
            Err(IntakeError::ClaimedByAnotherUser)
        ));
        assert_eq!(ledger.user_orders(alice).await.unwrap().len(), 1);
        assert!(ledger.user_orders(bob).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_concurrent_intake_by_two_users(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let alice = user(&ledger, "alice").await;
        let bob = user(&ledger, "bob").await;

        let (a, b) = tokio::join!(
            ledger.insert_order("12345678903", alice),
            ledger.insert_order("12345678903", bob),
        );
        let accepted = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Ok(IntakeOutcome::Accepted)))
            .count();
        let claimed = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(IntakeError::ClaimedByAnotherUser)))
            .count();
        assert_eq!((accepted, claimed), (1, 1));
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_concurrent_intake_by_same_user(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let alice = user(&ledger, "alice").await;

        let (a, b) = tokio::join!(
            ledger.insert_order("12345678903", alice),
            ledger.insert_order("12345678903", alice),
        );
        let mut outcomes = [a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == IntakeOutcome::AlreadyUploaded);
        assert_eq!(
            outcomes,
            [IntakeOutcome::Accepted, IntakeOutcome::AlreadyUploaded]
        );
        assert_eq!(ledger.user_orders(alice).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_processed_credits_exactly_once(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let alice = user(&ledger, "alice").await;
        ledger.insert_order("79927398713", alice).await.unwrap();

        let pending = ledger.pending_orders(0, 100).await.unwrap();
        assert_eq!(pending.len(), 1);
        let order = pending[0].clone();

        let first = ledger
            .apply_status_change(&change(order.clone(), OrderStatus::Processed, 500))
            .await
            .unwrap();
        assert_eq!(
            first,
            ApplyOutcome::Applied {
                user_id: alice,
                credited: Some(Decimal::from(500)),
            }
        );
        let second = ledger
            .apply_status_change(&change(order, OrderStatus::Processed, 500))
            .await
            .unwrap();
        assert_eq!(second, ApplyOutcome::AlreadyFinal);

        let balance = ledger.balance(alice).await.unwrap();
        assert_eq!(balance.current, Decimal::from(500));
        assert!(ledger.pending_orders(0, 100).await.unwrap().is_empty());

        let orders = ledger.user_orders(alice).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Processed);
        assert_eq!(orders[0].accrual, Some(Decimal::from(500)));
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_intermediate_status_keeps_order_pending(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let alice = user(&ledger, "alice").await;
        ledger.insert_order("79927398713", alice).await.unwrap();
        let order = ledger.pending_orders(0, 100).await.unwrap().remove(0);

        let outcome = ledger
            .apply_status_change(&change(order, OrderStatus::Processing, 0))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                user_id: alice,
                credited: None,
            }
        );
        let pending = ledger.pending_orders(0, 100).await.unwrap();
        assert_eq!(pending[0].status, OrderStatus::Processing);
        assert_eq!(ledger.balance(alice).await.unwrap(), Balance::default());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_withdraw_guards_on_live_balance(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let alice = user(&ledger, "alice").await;
        ledger.insert_order("79927398713", alice).await.unwrap();
        let order = ledger.pending_orders(0, 100).await.unwrap().remove(0);
        ledger
            .apply_status_change(&change(order, OrderStatus::Processed, 10))
            .await
            .unwrap();

        assert!(matches!(
            ledger.withdraw(alice, "2377225624", Decimal::from(20)).await,
            Err(WithdrawError::InsufficientFunds)
        ));
        let balance = ledger.balance(alice).await.unwrap();
        assert_eq!(balance.current, Decimal::from(10));
        assert_eq!(balance.withdrawn, Decimal::ZERO);
        assert!(ledger.user_withdrawals(alice).await.unwrap().is_empty());

        let withdrawal = ledger
            .withdraw(alice, "2377225624", Decimal::from_str("10.00").unwrap())
            .await
            .unwrap();
        assert_eq!(withdrawal.order_number, "2377225624");
        let balance = ledger.balance(alice).await.unwrap();
        assert_eq!(balance.current, Decimal::ZERO);
        assert_eq!(balance.withdrawn, Decimal::from(10));
        assert_eq!(ledger.user_withdrawals(alice).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires PostgreSQL"]
    async fn test_duplicate_login_rejected(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        user(&ledger, "alice").await;
        assert!(matches!(
            ledger.create_user("alice", "other").await,
            Err(RegisterError::LoginTaken)
        ));
        let found = ledger.find_user("alice").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "hash");
        assert!(ledger.find_user("nobody").await.unwrap().is_none());
    }
}
