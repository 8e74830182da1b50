use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::models::{MultiplierValuation, SellerForm};

/// SQLX-based store for seller questionnaire records.
#[derive(Clone)]
pub struct SellerFormStore {
    pool: SqlitePool,
}

impl SellerFormStore {
    /// Open the forms database, creating the file and schema if missing.
    pub async fn new(database_path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        // WAL keeps concurrent recomputation requests from blocking readers
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous = NORMAL").execute(&pool).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seller_forms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                activity_description TEXT,
                products_services TEXT,
                financial_results TEXT,
                balance_indicators TEXT,
                data_json TEXT,
                submitted_at TEXT,
                updated_at TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Load a specific form, scoped to its owner.
    pub async fn form_by_id(&self, form_id: i64, user_id: i64) -> Result<Option<SellerForm>> {
        let row = sqlx::query(
            "SELECT id, activity_description, products_services,
                    financial_results, balance_indicators, data_json
             FROM seller_forms
             WHERE id = ? AND user_id = ?",
        )
        .bind(form_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::form_from_row(&r)))
    }

    /// The user's most recently submitted form, if any.
    pub async fn latest_submitted_form(&self, user_id: i64) -> Result<Option<SellerForm>> {
        let row = sqlx::query(
            "SELECT id, activity_description, products_services,
                    financial_results, balance_indicators, data_json
             FROM seller_forms
             WHERE user_id = ? AND status IN ('submitted', 'review', 'approved')
             ORDER BY submitted_at DESC, updated_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::form_from_row(&r)))
    }

    /// Write the valuation snapshot into `data_json.multiplier_valuation`,
    /// replacing any prior value. One UPDATE carries the whole document;
    /// concurrent recomputations are last-write-wins.
    pub async fn save_valuation(
        &self,
        form: &SellerForm,
        valuation: &MultiplierValuation,
    ) -> Result<()> {
        let mut data: serde_json::Value = form
            .data_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        if !data.is_object() {
            data = serde_json::json!({});
        }
        data["multiplier_valuation"] = serde_json::to_value(valuation)?;

        sqlx::query(
            "UPDATE seller_forms
             SET data_json = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(data.to_string())
        .bind(form.id)
        .execute(&self.pool)
        .await?;

        info!("Saved multiplier valuation for form {}", form.id);
        Ok(())
    }

    /// Insert a form record; used by tests and seed tooling.
    pub async fn insert_form(&self, user_id: i64, status: &str, form: &SellerForm) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO seller_forms
                 (user_id, status, activity_description, products_services,
                  financial_results, balance_indicators, data_json,
                  submitted_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))",
        )
        .bind(user_id)
        .bind(status)
        .bind(&form.activity_description)
        .bind(&form.products_services)
        .bind(&form.financial_results)
        .bind(&form.balance_indicators)
        .bind(&form.data_json)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    fn form_from_row(row: &SqliteRow) -> SellerForm {
        SellerForm {
            id: row.get("id"),
            activity_description: row.get("activity_description"),
            products_services: row.get("products_services"),
            financial_results: row.get("financial_results"),
            balance_indicators: row.get("balance_indicators"),
            data_json: row.get("data_json"),
        }
    }
}
