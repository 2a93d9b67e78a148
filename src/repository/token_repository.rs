use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::SiteSelectionToken,
    error::{AppError, Result},
    repository::SiteSelectionTokenRepository,
};

#[derive(FromRow)]
struct TokenRow {
    id: String,
    election: String,
    voter_id: String,
    token: String,
    claimed_by_reservation_id: Option<String>,
    claimed_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

pub struct SqliteSiteSelectionTokenRepository {
    pool: SqlitePool,
}

impl SqliteSiteSelectionTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_token(row: TokenRow) -> Result<SiteSelectionToken> {
        Ok(SiteSelectionToken {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            election: row.election,
            voter_id: row.voter_id,
            token: row.token,
            claimed_by_reservation_id: row
                .claimed_by_reservation_id
                .map(|id| Uuid::parse_str(&id).map_err(|e| AppError::Database(e.to_string())))
                .transpose()?,
            claimed_at: row
                .claimed_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl SiteSelectionTokenRepository for SqliteSiteSelectionTokenRepository {
    async fn create(&self, token: SiteSelectionToken) -> Result<SiteSelectionToken> {
        sqlx::query(
            r#"
            INSERT INTO site_selection_tokens (
                id, election, voter_id, token, claimed_by_reservation_id, claimed_at, created_at
            ) VALUES (?, ?, ?, ?, NULL, NULL, ?)
            "#,
        )
        .bind(token.id.to_string())
        .bind(&token.election)
        .bind(&token.voter_id)
        .bind(&token.token)
        .bind(token.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(token)
    }

    async fn claim_for_voter(
        &self,
        voter_id: &str,
        reservation_id: Uuid,
    ) -> Result<SiteSelectionToken> {
        // Claim inside one transaction so two concurrent claims for the same
        // voter serialize and the second one sees the token already taken.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, election, voter_id, token, claimed_by_reservation_id, claimed_at, created_at
            FROM site_selection_tokens
            WHERE voter_id = ? AND claimed_by_reservation_id IS NULL
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(voter_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let row = row.ok_or_else(|| {
            AppError::NotFound(format!(
                "No unclaimed site selection token for member #{}",
                voter_id
            ))
        })?;

        let claimed_at = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE site_selection_tokens
            SET claimed_by_reservation_id = ?, claimed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reservation_id.to_string())
        .bind(claimed_at)
        .bind(&row.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut token = Self::row_to_token(row)?;
        token.claimed_by_reservation_id = Some(reservation_id);
        token.claimed_at = Some(DateTime::from_naive_utc_and_offset(claimed_at, Utc));
        Ok(token)
    }

    async fn find_by_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<SiteSelectionToken>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, election, voter_id, token, claimed_by_reservation_id, claimed_at, created_at
            FROM site_selection_tokens
            WHERE claimed_by_reservation_id = ?
            "#,
        )
        .bind(reservation_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_token(r)?)),
            None => Ok(None),
        }
    }
}
