use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;

/// A user's spendable and historically withdrawn points.
///
/// A user without a row has a zero balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct Balance {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

#[derive(Debug, Clone)]
pub struct GetBalance {
    pub user_id: i64,
}

impl Processor<GetBalance> for DatabaseProcessor {
    type Output = Balance;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetBalance")]
    async fn process(&self, query: GetBalance) -> Result<Balance, sqlx::Error> {
        let balance = sqlx::query_as::<_, Balance>(
            r#"
            SELECT current, withdrawn
            FROM balances
            WHERE user_id = $1
            "#,
        )
        .bind(query.user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance.unwrap_or_default())
    }
}

impl Balance {
    /// Add `amount` to the user's current balance, creating the row if needed.
    pub async fn credit_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i64,
        amount: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO balances (user_id, current)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET current = balances.current + EXCLUDED.current
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Move `amount` from current to withdrawn, guarded on the live balance.
    ///
    /// Returns `false` when the balance is missing or too small; nothing is
    /// changed in that case.
    pub async fn debit_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i64,
        amount: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE balances
            SET current = current - $2, withdrawn = withdrawn + $2
            WHERE user_id = $1 AND current >= $2
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
