use crate::entities::balances::Balance;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Withdrawal {
    pub order_number: String,
    pub amount: Decimal,
    pub processed_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// Debit the user's balance and append a withdrawal record in one
/// transaction.
///
/// Returns `None` when the balance does not cover `amount`.
pub struct WithdrawFromBalance {
    pub user_id: i64,
    pub order_number: String,
    pub amount: Decimal,
}

impl Processor<WithdrawFromBalance> for DatabaseProcessor {
    type Output = Option<Withdrawal>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:WithdrawFromBalance")]
    async fn process(&self, cmd: WithdrawFromBalance) -> Result<Option<Withdrawal>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if !Balance::debit_tx(&mut tx, cmd.user_id, cmd.amount).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        let withdrawal =
            Withdrawal::insert_tx(&mut tx, cmd.user_id, &cmd.order_number, cmd.amount).await?;

        tx.commit().await?;
        Ok(Some(withdrawal))
    }
}

#[derive(Debug, Clone)]
/// Get every withdrawal of a user, newest first.
pub struct ListUserWithdrawals {
    pub user_id: i64,
}

impl Processor<ListUserWithdrawals> for DatabaseProcessor {
    type Output = Vec<Withdrawal>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUserWithdrawals")]
    async fn process(&self, query: ListUserWithdrawals) -> Result<Vec<Withdrawal>, sqlx::Error> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT order_number, amount, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at DESC, id DESC
            "#,
        )
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(withdrawals)
    }
}

impl Withdrawal {
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, sqlx::Error> {
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (user_id, order_number, amount)
            VALUES ($1, $2, $3)
            RETURNING order_number, amount, processed_at
            "#,
        )
        .bind(user_id)
        .bind(order_number)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;
        Ok(withdrawal)
    }
}
