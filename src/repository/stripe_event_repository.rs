use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, Result},
    repository::StripeEventRepository,
};

pub struct SqliteStripeEventRepository {
    pool: SqlitePool,
}

impl SqliteStripeEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StripeEventRepository for SqliteStripeEventRepository {
    async fn record(&self, event_id: &str, event_type: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stripe_events (id, event_type, received_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
