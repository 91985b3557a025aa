use async_trait::async_trait;
use chrono::Utc;
use domain::{Order, OrderStatus, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderId, Result, StoreError,
    store::{NewOrder, OrderRow, OrderStore, OrderUpdate, UpdateOptions, decode_status},
};

/// PostgreSQL-backed order store implementation.
///
/// Conditional updates are a single `UPDATE ... WHERE id = $1 AND status = $n`
/// statement, so the row lock taken by PostgreSQL arbitrates concurrent writers.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        OrderRow {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            part_ids: row.try_get("part_ids")?,
            total_price_cents: row.try_get("total_price_cents")?,
            status: row.try_get("status")?,
            payment_method: row.try_get("payment_method")?,
            transaction_id: row.try_get("transaction_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }
        .into_order()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: NewOrder) -> Result<OrderId> {
        let order_id = OrderId::new();
        let part_ids: Vec<String> = order
            .line_item_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO orders (id, owner_id, part_ids, total_price_cents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(order.owner_id.as_uuid())
        .bind(&part_ids)
        .bind(order.total_price.cents())
        .bind(OrderStatus::PendingPayment.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!(%order_id, "order row inserted");
        Ok(order_id)
    }

    async fn get(&self, order_id: OrderId) -> Result<Order> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, part_ids, total_price_cents, status,
                   payment_method, transaction_id, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::OrderNotFound(order_id))?;

        Self::row_to_order(row)
    }

    async fn update(
        &self,
        order_id: OrderId,
        update: OrderUpdate,
        options: UpdateOptions,
    ) -> Result<()> {
        let (payment_method, transaction_id) = match &update.payment {
            Some(payment) => (
                Some(payment.method.as_str()),
                Some(payment.transaction_id.as_str()),
            ),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = COALESCE($2, status),
                payment_method = COALESCE($3, payment_method),
                transaction_id = COALESCE($4, transaction_id),
                updated_at = $5
            WHERE id = $1
              AND ($6::TEXT IS NULL OR status = $6)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(update.status.map(|s| s.as_str()))
        .bind(payment_method)
        .bind(transaction_id)
        .bind(Utc::now())
        .bind(options.expected_status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing matched: either the row is missing or its status differs.
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        let raw = current.ok_or(StoreError::OrderNotFound(order_id))?;
        let actual = decode_status(order_id, &raw)?;
        let expected = options.expected_status.unwrap_or(actual);

        metrics::counter!("order_store_status_conflicts_total").increment(1);
        Err(StoreError::StatusConflict {
            order_id,
            expected,
            actual,
        })
    }
}
