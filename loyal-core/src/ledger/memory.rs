use super::{
    Accounts, ApplyOutcome, Balance, IntakeError, IntakeOutcome, Ledger, LedgerError, OrderRecord,
    OrderScanner, PendingOrder, RegisterError, StatusApplier, UserCredentials, WithdrawError,
    Withdrawal, check_withdrawal_amount,
};
use crate::entities::OrderStatus;
use crate::events::StatusChange;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-process ledger with the same atomicity guarantees as [`super::PgLedger`].
///
/// Each operation holds one lock for its whole unit of work.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<UserCredentials>,
    orders: Vec<OrderRecord>,
    balances: HashMap<i64, Balance>,
    withdrawals: Vec<(i64, Withdrawal)>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's balance.
    pub async fn set_balance(&self, user_id: i64, balance: Balance) {
        self.state.lock().await.balances.insert(user_id, balance);
    }

    pub async fn order(&self, number: &str) -> Option<OrderRecord> {
        let state = self.state.lock().await;
        state.orders.iter().find(|o| o.number == number).cloned()
    }

    /// Set an order's status directly, bypassing the terminal guard.
    pub async fn force_status(&self, number: &str, status: OrderStatus) {
        let mut state = self.state.lock().await;
        if let Some(order) = state.orders.iter_mut().find(|o| o.number == number) {
            order.status = status;
        }
    }
}

#[async_trait]
impl OrderScanner for MemoryLedger {
    async fn pending_orders(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<PendingOrder>, LedgerError> {
        let state = self.state.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state
            .orders
            .iter()
            .filter(|o| !o.status.is_terminal() && o.id > after_id)
            .take(limit)
            .map(|o| PendingOrder {
                id: o.id,
                number: o.number.clone(),
                status: o.status,
            })
            .collect())
    }
}

#[async_trait]
impl StatusApplier for MemoryLedger {
    async fn apply_status_change(
        &self,
        change: &StatusChange,
    ) -> Result<ApplyOutcome, LedgerError> {
        let mut state = self.state.lock().await;
        let accrual = (change.status == OrderStatus::Processed).then_some(change.accrual);

        let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.id == change.order.id && !o.status.is_terminal())
        else {
            return Ok(ApplyOutcome::AlreadyFinal);
        };
        order.status = change.status;
        order.accrual = accrual;
        let user_id = order.user_id;

        if let Some(amount) = accrual {
            state.balances.entry(user_id).or_default().current += amount;
        }

        Ok(ApplyOutcome::Applied {
            user_id,
            credited: accrual,
        })
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn insert_order(
        &self,
        number: &str,
        user_id: i64,
    ) -> Result<IntakeOutcome, IntakeError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.orders.iter().find(|o| o.number == number) {
            return IntakeOutcome::resolve(false, existing.user_id, user_id);
        }
        let id = state.orders.last().map_or(1, |o| o.id + 1);
        state.orders.push(OrderRecord {
            id,
            number: number.to_string(),
            user_id,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: time::OffsetDateTime::now_utc(),
        });
        Ok(IntakeOutcome::Accepted)
    }

    async fn withdraw(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, WithdrawError> {
        let amount = check_withdrawal_amount(amount)?;
        let mut state = self.state.lock().await;
        let Some(balance) = state
            .balances
            .get_mut(&user_id)
            .filter(|b| b.current >= amount)
        else {
            return Err(WithdrawError::InsufficientFunds);
        };
        balance.current -= amount;
        balance.withdrawn += amount;

        let withdrawal = Withdrawal {
            order_number: order_number.to_string(),
            amount,
            processed_at: time::OffsetDateTime::now_utc(),
        };
        state.withdrawals.push((user_id, withdrawal.clone()));
        Ok(withdrawal)
    }

    async fn user_orders(&self, user_id: i64) -> Result<Vec<OrderRecord>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn balance(&self, user_id: i64) -> Result<Balance, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.balances.get(&user_id).copied().unwrap_or_default())
    }

    async fn user_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .withdrawals
            .iter()
            .rev()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, w)| w.clone())
            .collect())
    }
}

#[async_trait]
impl Accounts for MemoryLedger {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, RegisterError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|u| u.login == login) {
            return Err(RegisterError::LoginTaken);
        }
        let id = state.users.last().map_or(1, |u| u.id + 1);
        state.users.push(UserCredentials {
            id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        });
        Ok(id)
    }

    async fn find_user(&self, login: &str) -> Result<Option<UserCredentials>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.login == login).cloned())
    }
}
