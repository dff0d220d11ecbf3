use crate::entities::OrderStatus;
use crate::entities::balances::Balance;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;

/// A full order row, as listed to its owner.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub number: String,
    pub user_id: i64,
    pub status: OrderStatus,
    pub accrual: Option<Decimal>,
    pub uploaded_at: time::OffsetDateTime,
}

/// A non-terminal order picked up by the task generator.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingOrder {
    pub id: i64,
    pub number: String,
    pub status: OrderStatus,
}

/// Result of inserting an order number that may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderClaim {
    /// Owner of the row after the statement, whether or not it inserted.
    pub user_id: i64,
    pub inserted: bool,
}

/// Outcome of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The order was still non-terminal and now carries the new status.
    Applied {
        user_id: i64,
        /// Amount added to the owner's balance, if the order was processed.
        credited: Option<Decimal>,
    },
    /// The order was already terminal; nothing changed.
    AlreadyFinal,
}

#[derive(Debug, Clone)]
/// Insert a `NEW` order or, if the number is taken, report its owner.
///
/// The conflicting row is locked by the no-op update, so a concurrent insert
/// of the same number is observed after it commits instead of being missed
/// by this statement's snapshot.
pub struct InsertOrderIfAbsent {
    pub number: String,
    pub user_id: i64,
}

impl Processor<InsertOrderIfAbsent> for DatabaseProcessor {
    type Output = OrderClaim;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrderIfAbsent")]
    async fn process(&self, insert: InsertOrderIfAbsent) -> Result<OrderClaim, sqlx::Error> {
        let claim = sqlx::query_as::<_, OrderClaim>(
            r#"
            INSERT INTO orders (number, user_id, status)
            VALUES ($1, $2, 'NEW')
            ON CONFLICT (number) DO UPDATE SET number = EXCLUDED.number
            RETURNING user_id, (xmax = 0) AS inserted
            "#,
        )
        .bind(insert.number)
        .bind(insert.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(claim)
    }
}

#[derive(Debug, Clone)]
/// Get up to `limit` non-terminal orders with an id above `after_id`,
/// in ascending id order.
pub struct GetPendingOrders {
    pub after_id: i64,
    pub limit: i64,
}

impl Processor<GetPendingOrders> for DatabaseProcessor {
    type Output = Vec<PendingOrder>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPendingOrders")]
    async fn process(&self, query: GetPendingOrders) -> Result<Vec<PendingOrder>, sqlx::Error> {
        let orders = sqlx::query_as::<_, PendingOrder>(
            r#"
            SELECT id, number, status
            FROM orders
            WHERE status NOT IN ('INVALID', 'PROCESSED')
              AND id > $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(query.after_id)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}

#[derive(Debug, Clone)]
/// Get every order uploaded by a user, newest first.
pub struct ListUserOrders {
    pub user_id: i64,
}

impl Processor<ListUserOrders> for DatabaseProcessor {
    type Output = Vec<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUserOrders")]
    async fn process(&self, query: ListUserOrders) -> Result<Vec<OrderRecord>, sqlx::Error> {
        let orders = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT id, number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}

#[derive(Debug, Clone)]
/// Move a still non-terminal order to `status` and, when it becomes
/// `PROCESSED`, credit its owner with `accrual`. Both happen in one
/// transaction.
pub struct ApplyOrderStatusChange {
    pub order_id: i64,
    pub status: OrderStatus,
    pub accrual: Decimal,
}

impl Processor<ApplyOrderStatusChange> for DatabaseProcessor {
    type Output = ApplyOutcome;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ApplyOrderStatusChange")]
    async fn process(&self, change: ApplyOrderStatusChange) -> Result<ApplyOutcome, sqlx::Error> {
        let processed = change.status == OrderStatus::Processed;
        let accrual = processed.then_some(change.accrual);

        let mut tx = self.pool.begin().await?;

        let Some(user_id) =
            OrderRecord::update_status_if_pending_tx(&mut tx, change.order_id, change.status, accrual)
                .await?
        else {
            tx.rollback().await?;
            return Ok(ApplyOutcome::AlreadyFinal);
        };

        if let Some(amount) = accrual {
            Balance::credit_tx(&mut tx, user_id, amount).await?;
        }

        tx.commit().await?;

        Ok(ApplyOutcome::Applied {
            user_id,
            credited: accrual,
        })
    }
}

impl OrderRecord {
    /// Update status and accrual unless the order is already terminal.
    ///
    /// Returns the owner when a row was updated.
    pub async fn update_status_if_pending_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: i64,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<Option<i64>, sqlx::Error> {
        let owner = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3
            WHERE id = $1
              AND status NOT IN ('INVALID', 'PROCESSED')
            RETURNING user_id
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(accrual)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(owner)
    }
}
