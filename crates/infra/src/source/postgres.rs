//! Postgres-backed inventory source.
//!
//! Read-only: the back office owns the schema. Expected tables:
//!
//! - `branches (id uuid primary key)`
//! - `products (id uuid primary key, unit_cost numeric, lead_time_days int4,
//!   lead_time_std_days numeric null, minimum_order_quantity numeric,
//!   order_unit numeric null, active bool)`
//! - `branch_stock (product_id uuid, branch_id uuid, quantity numeric)`
//! - `stock_movements (product_id uuid, branch_id uuid, occurred_at timestamptz,
//!   quantity numeric, direction text)` where outbound rows carry
//!   `direction = 'out'`
//!
//! The intelligence traits are synchronous, so every call blocks on the
//! runtime handle captured at construction. Call from a blocking thread
//! (e.g. `tokio::task::spawn_blocking`), never from inside an async task.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::{debug, error};

use microfin_core::{BranchId, ProductId};
use microfin_intelligence::{
    ProductCatalog, ProductMetadata, SourceError, Transaction, TransactionHistory,
};

#[derive(Clone)]
pub struct PostgresInventorySource {
    pool: PgPool,
    handle: Handle,
}

fn unavailable(operation: &'static str) -> impl FnOnce(sqlx::Error) -> SourceError {
    move |e| {
        error!(operation, error = %e, "inventory query failed");
        SourceError::Unavailable(format!("{operation}: {e}"))
    }
}

impl PostgresInventorySource {
    /// Must be called from within a Tokio runtime.
    pub fn new(pool: PgPool) -> Result<Self, SourceError> {
        let handle = Handle::try_current()
            .map_err(|e| SourceError::Unavailable(format!("no tokio runtime: {e}")))?;
        Ok(Self { pool, handle })
    }

    pub fn with_handle(pool: PgPool, handle: Handle) -> Self {
        Self { pool, handle }
    }

    fn ensure_product(&self, product_id: ProductId) -> Result<(), SourceError> {
        let found = self.handle.block_on(async {
            sqlx::query("SELECT 1 FROM products WHERE id = $1")
                .bind(*product_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
        });
        match found.map_err(unavailable("ensure_product"))? {
            Some(_) => Ok(()),
            None => Err(SourceError::NotFound(format!("product {product_id}"))),
        }
    }

    fn ensure_branch(&self, branch_id: BranchId) -> Result<(), SourceError> {
        let found = self.handle.block_on(async {
            sqlx::query("SELECT 1 FROM branches WHERE id = $1")
                .bind(*branch_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
        });
        match found.map_err(unavailable("ensure_branch"))? {
            Some(_) => Ok(()),
            None => Err(SourceError::NotFound(format!("branch {branch_id}"))),
        }
    }
}

impl TransactionHistory for PostgresInventorySource {
    fn transaction_history(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>, SourceError> {
        self.ensure_product(product_id)?;
        if let Some(branch) = branch_id {
            self.ensure_branch(branch)?;
        }

        let rows = self
            .handle
            .block_on(async {
                sqlx::query(
                    r#"
                    SELECT occurred_at, quantity
                    FROM stock_movements
                    WHERE product_id = $1
                      AND ($2::uuid IS NULL OR branch_id = $2)
                      AND direction = 'out'
                      AND occurred_at >= $3::date
                    ORDER BY occurred_at
                    "#,
                )
                .bind(*product_id.as_uuid())
                .bind(branch_id.map(|b| *b.as_uuid()))
                .bind(since)
                .fetch_all(&self.pool)
                .await
            })
            .map_err(unavailable("transaction_history"))?;

        let history = rows
            .iter()
            .map(|row| {
                let occurred_at: DateTime<Utc> = row.try_get("occurred_at")?;
                let quantity: Decimal = row.try_get("quantity")?;
                Ok(Transaction::new(occurred_at, quantity))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(unavailable("transaction_history"))?;

        debug!(product = %product_id, branch = ?branch_id, %since, rows = history.len(), "history loaded");
        Ok(history)
    }
}

impl ProductCatalog for PostgresInventorySource {
    fn product_metadata(
        &self,
        product_id: ProductId,
        branch_id: Option<BranchId>,
    ) -> Result<ProductMetadata, SourceError> {
        if let Some(branch) = branch_id {
            self.ensure_branch(branch)?;
        }

        let row = self
            .handle
            .block_on(async {
                sqlx::query(
                    r#"
                    SELECT
                        p.unit_cost,
                        p.lead_time_days,
                        p.lead_time_std_days,
                        p.minimum_order_quantity,
                        p.order_unit,
                        COALESCE((
                            SELECT SUM(s.quantity)
                            FROM branch_stock s
                            WHERE s.product_id = p.id
                              AND ($2::uuid IS NULL OR s.branch_id = $2)
                        ), 0) AS current_stock
                    FROM products p
                    WHERE p.id = $1
                    "#,
                )
                .bind(*product_id.as_uuid())
                .bind(branch_id.map(|b| *b.as_uuid()))
                .fetch_optional(&self.pool)
                .await
            })
            .map_err(unavailable("product_metadata"))?
            .ok_or_else(|| SourceError::NotFound(format!("product {product_id}")))?;

        let read = |row: &sqlx::postgres::PgRow| -> Result<ProductMetadata, sqlx::Error> {
            let lead_time: i32 = row.try_get("lead_time_days")?;
            Ok(ProductMetadata {
                product_id,
                branch_id,
                current_stock: row.try_get("current_stock")?,
                unit_cost: row.try_get("unit_cost")?,
                lead_time_days: u32::try_from(lead_time).unwrap_or(0),
                lead_time_std_days: row.try_get("lead_time_std_days")?,
                minimum_order_quantity: row.try_get("minimum_order_quantity")?,
                order_unit: row.try_get("order_unit")?,
            })
        };
        read(&row).map_err(unavailable("product_metadata"))
    }

    fn branches_holding_stock(&self, product_id: ProductId) -> Result<Vec<BranchId>, SourceError> {
        self.ensure_product(product_id)?;
        let rows = self
            .handle
            .block_on(async {
                sqlx::query(
                    r#"
                    SELECT branch_id
                    FROM branch_stock
                    WHERE product_id = $1 AND quantity > 0
                    ORDER BY branch_id
                    "#,
                )
                .bind(*product_id.as_uuid())
                .fetch_all(&self.pool)
                .await
            })
            .map_err(unavailable("branches_holding_stock"))?;

        rows.iter()
            .map(|row| row.try_get::<uuid::Uuid, _>("branch_id").map(BranchId::from_uuid))
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable("branches_holding_stock"))
    }

    fn list_products(&self) -> Result<Vec<ProductId>, SourceError> {
        let rows = self
            .handle
            .block_on(async {
                sqlx::query("SELECT id FROM products WHERE active ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            })
            .map_err(unavailable("list_products"))?;

        rows.iter()
            .map(|row| row.try_get::<uuid::Uuid, _>("id").map(ProductId::from_uuid))
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable("list_products"))
    }
}
