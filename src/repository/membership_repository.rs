use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Membership,
    error::{AppError, Result},
    repository::MembershipRepository,
};

#[derive(FromRow)]
pub(crate) struct MembershipRow {
    id: String,
    name: String,
    price_cents: i64,
    active_from: NaiveDateTime,
    active_to: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub(crate) fn row_to_membership(row: MembershipRow) -> Result<Membership> {
    Ok(Membership {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        name: row.name,
        price_cents: row.price_cents,
        active_from: DateTime::from_naive_utc_and_offset(row.active_from, Utc),
        active_to: row
            .active_to
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    async fn create(&self, membership: Membership) -> Result<Membership> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO memberships (id, name, price_cents, active_from, active_to, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(membership.id.to_string())
        .bind(&membership.name)
        .bind(membership.price_cents)
        .bind(membership.active_from.naive_utc())
        .bind(membership.active_to.map(|dt| dt.naive_utc()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(membership.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created membership".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, name, price_cents, active_from, active_to, created_at, updated_at
            FROM memberships
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_membership(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, name, price_cents, active_from, active_to, created_at, updated_at
            FROM memberships
            WHERE name = ?
            ORDER BY active_from DESC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_membership(r)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self, at: DateTime<Utc>) -> Result<Vec<Membership>> {
        let at_naive = at.naive_utc();
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, name, price_cents, active_from, active_to, created_at, updated_at
            FROM memberships
            WHERE active_from <= ? AND (active_to IS NULL OR active_to > ?)
            ORDER BY price_cents DESC
            "#,
        )
        .bind(at_naive)
        .bind(at_naive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_membership).collect()
    }
}
