//! Budget Repository
//!
//! Writes imported budgets to PostgreSQL. One import is one transaction:
//! either the whole graph lands or nothing does.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};

use ofitec_models::{ImportResult, Item, Resource};

use crate::writer::{persist_budget, BudgetWriter};

/// [`BudgetWriter`] bound to an open transaction.
pub struct PgBudgetWriter {
    tx: Transaction<'static, Postgres>,
}

impl PgBudgetWriter {
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await.context("Failed to begin transaction")?;
        Ok(Self { tx })
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit budget transaction")
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.context("Failed to roll back budget transaction")
    }
}

#[async_trait]
impl BudgetWriter for PgBudgetWriter {
    async fn create_project(&mut self, name: &str, currency: &str) -> Result<i64> {
        let row = sqlx::query("INSERT INTO projects (name, currency) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(currency)
            .fetch_one(&mut *self.tx)
            .await
            .context("Failed to insert project")?;
        Ok(row.try_get("id")?)
    }

    async fn create_chapter(&mut self, project_id: i64, code: &str, name: &str) -> Result<i64> {
        let row = sqlx::query("INSERT INTO chapters (project_id, code, name) VALUES ($1, $2, $3) RETURNING id")
            .bind(project_id)
            .bind(code)
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .context("Failed to insert chapter")?;
        Ok(row.try_get("id")?)
    }

    async fn create_resource(&mut self, resource: &Resource) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO resources (type, code, name, unit, unit_cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&resource.resource_type)
        .bind(&resource.code)
        .bind(&resource.name)
        .bind(&resource.unit)
        .bind(resource.unit_cost)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to insert resource")?;
        Ok(row.try_get("id")?)
    }

    async fn create_item(&mut self, chapter_id: i64, item: &Item) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO items (chapter_id, code, name, unit, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(chapter_id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(&item.unit)
        .bind(item.quantity)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to insert item")?;
        Ok(row.try_get("id")?)
    }

    async fn create_breakdown_line(&mut self, item_id: i64, resource_id: i64, coeff: Decimal) -> Result<i64> {
        let row = sqlx::query("INSERT INTO apus (item_id, resource_id, coeff) VALUES ($1, $2, $3) RETURNING id")
            .bind(item_id)
            .bind(resource_id)
            .bind(coeff)
            .fetch_one(&mut *self.tx)
            .await
            .context("Failed to insert breakdown line")?;
        Ok(row.try_get("id")?)
    }

    async fn set_item_price(&mut self, item_id: i64, price: Decimal) -> Result<()> {
        sqlx::query("UPDATE items SET price = $2 WHERE id = $1")
            .bind(item_id)
            .bind(price)
            .execute(&mut *self.tx)
            .await
            .context("Failed to update item price")?;
        Ok(())
    }
}

pub struct BudgetRepository {
    pool: PgPool,
}

impl BudgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist an import as a new project and return its id. Nothing is
    /// committed unless every write succeeds.
    pub async fn save_import(&self, project_name: &str, currency: &str, result: &ImportResult) -> Result<i64> {
        let mut writer = PgBudgetWriter::begin(&self.pool).await?;
        match persist_budget(&mut writer, project_name, currency, result).await {
            Ok(project_id) => {
                writer.commit().await?;
                Ok(project_id)
            }
            Err(e) => {
                tracing::error!(error = %e, import_id = %result.id, "Budget persistence failed, rolling back");
                writer.rollback().await?;
                Err(e)
            }
        }
    }

    /// Item count and priced total of a stored project.
    pub async fn project_totals(&self, project_id: i64) -> Result<(i64, Decimal)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(i.id) AS items, COALESCE(SUM(i.quantity * i.price), 0) AS total
            FROM chapters c
            LEFT JOIN items i ON i.chapter_id = c.id
            WHERE c.project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch project totals")?;

        Ok((row.try_get("items")?, row.try_get("total")?))
    }
}
