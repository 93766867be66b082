//! Scoped data access for the stock ledger
//!
//! [`StockStore`] is the only way the reconciliation services read or write
//! ledger rows. Every read is restricted to an organization and, when the
//! scope names one, a branch. Opening and closing stock are only ever written
//! through upserts keyed by `(item_id, date, organization_id, branch_id)`.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    BranchTransfer, ClosingStock, ClosingStockUpsert, DayActivity, Item, OpeningStock,
    OpeningStockUpsert, Restocking, Sale, Scope, WasteSpoilage,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

#[async_trait]
pub trait StockStore: Send + Sync {
    /// Check that the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;

    /// Items visible in the scope, including organization-wide items
    async fn list_items(&self, scope: &Scope) -> AppResult<Vec<Item>>;

    async fn find_item(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<Option<Item>>;

    async fn opening_stock(&self, scope: &Scope, date: NaiveDate) -> AppResult<Vec<OpeningStock>>;

    async fn closing_stock(&self, scope: &Scope, date: NaiveDate) -> AppResult<Vec<ClosingStock>>;

    /// Sales, restocking and waste in the scope, plus every transfer leaving
    /// or entering the scoped branch (every transfer of the organization when
    /// the scope has no branch)
    async fn day_activity(&self, scope: &Scope, date: NaiveDate) -> AppResult<DayActivity>;

    /// Upsert all rows as one committed unit
    async fn upsert_opening_stock(&self, rows: &[OpeningStockUpsert]) -> AppResult<()>;

    /// Upsert all rows as one committed unit
    async fn upsert_closing_stock(&self, rows: &[ClosingStockUpsert]) -> AppResult<()>;

    /// Whether any sale, opening or closing stock row references the item
    async fn item_has_history(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<bool>;

    /// Returns false when no such item exists
    async fn delete_item(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<bool>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStockStore {
    db: PgPool,
}

impl PgStockStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn list_items(&self, scope: &Scope) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, organization_id, branch_id, name, unit, low_stock_threshold,
                   cost_price, selling_price
            FROM items
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR branch_id IS NULL OR branch_id = $2)
            ORDER BY name ASC
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    async fn find_item(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, organization_id, branch_id, name, unit, low_stock_threshold,
                   cost_price, selling_price
            FROM items
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(item_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(item)
    }

    async fn opening_stock(&self, scope: &Scope, date: NaiveDate) -> AppResult<Vec<OpeningStock>> {
        let rows = sqlx::query_as::<_, OpeningStock>(
            r#"
            SELECT id, item_id, organization_id, branch_id, date, quantity,
                   cost_price, selling_price, is_manual, notes
            FROM opening_stock
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND date = $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn closing_stock(&self, scope: &Scope, date: NaiveDate) -> AppResult<Vec<ClosingStock>> {
        let rows = sqlx::query_as::<_, ClosingStock>(
            r#"
            SELECT id, item_id, organization_id, branch_id, date, quantity, notes
            FROM closing_stock
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND date = $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn day_activity(&self, scope: &Scope, date: NaiveDate) -> AppResult<DayActivity> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, item_id, organization_id, branch_id, date, quantity,
                   price_per_unit, total_price
            FROM sales
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND date = $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        let restockings = sqlx::query_as::<_, Restocking>(
            r#"
            SELECT id, item_id, organization_id, branch_id, date, quantity,
                   cost_price, selling_price
            FROM restockings
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND date = $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        let waste = sqlx::query_as::<_, WasteSpoilage>(
            r#"
            SELECT id, item_id, organization_id, branch_id, date, quantity, reason
            FROM waste_spoilage
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND date = $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        let transfers = sqlx::query_as::<_, BranchTransfer>(
            r#"
            SELECT id, item_id, organization_id, from_branch_id, to_branch_id, date, quantity
            FROM branch_transfers
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR from_branch_id = $2 OR to_branch_id = $2)
              AND date = $3
            "#,
        )
        .bind(scope.organization_id)
        .bind(scope.branch_id)
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(DayActivity {
            sales,
            restockings,
            waste,
            transfers,
        })
    }

    async fn upsert_opening_stock(&self, rows: &[OpeningStockUpsert]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO opening_stock (
                    item_id, organization_id, branch_id, date, quantity,
                    cost_price, selling_price, is_manual, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT ON CONSTRAINT opening_stock_item_date_scope_key
                DO UPDATE SET quantity = EXCLUDED.quantity,
                              cost_price = EXCLUDED.cost_price,
                              selling_price = EXCLUDED.selling_price,
                              is_manual = EXCLUDED.is_manual,
                              notes = EXCLUDED.notes,
                              updated_at = NOW()
                "#,
            )
            .bind(row.item_id)
            .bind(row.organization_id)
            .bind(row.branch_id)
            .bind(row.date)
            .bind(row.quantity)
            .bind(row.cost_price)
            .bind(row.selling_price)
            .bind(row.is_manual)
            .bind(&row.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_closing_stock(&self, rows: &[ClosingStockUpsert]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO closing_stock (item_id, organization_id, branch_id, date, quantity, notes)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT ON CONSTRAINT closing_stock_item_date_scope_key
                DO UPDATE SET quantity = EXCLUDED.quantity,
                              notes = EXCLUDED.notes,
                              updated_at = NOW()
                "#,
            )
            .bind(row.item_id)
            .bind(row.organization_id)
            .bind(row.branch_id)
            .bind(row.date)
            .bind(row.quantity)
            .bind(&row.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn item_has_history(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM sales WHERE item_id = $1 AND organization_id = $2)
                OR EXISTS(SELECT 1 FROM opening_stock WHERE item_id = $1 AND organization_id = $2)
                OR EXISTS(SELECT 1 FROM closing_stock WHERE item_id = $1 AND organization_id = $2)
            "#,
        )
        .bind(item_id)
        .bind(organization_id)
        .fetch_one(&self.db)
        .await?;

        Ok(referenced)
    }

    async fn delete_item(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND organization_id = $2")
            .bind(item_id)
            .bind(organization_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
