use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Reservation, ReservationState},
    error::{AppError, Result},
    repository::ReservationRepository,
};

#[derive(FromRow)]
pub(crate) struct ReservationRow {
    id: String,
    membership_number: i64,
    membership_id: String,
    user_id: String,
    state: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub(crate) fn row_to_reservation(row: ReservationRow) -> Result<Reservation> {
    Ok(Reservation {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        membership_number: row.membership_number,
        membership_id: Uuid::parse_str(&row.membership_id)
            .map_err(|e| AppError::Database(e.to_string()))?,
        user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
        state: parse_reservation_state(&row.state)?,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub struct SqliteReservationRepository {
    pool: SqlitePool,
}

impl SqliteReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_reservation_state(s: &str) -> Result<ReservationState> {
    match s {
        "new" => Ok(ReservationState::New),
        "installment" => Ok(ReservationState::Installment),
        "paid" => Ok(ReservationState::Paid),
        "disabled" => Ok(ReservationState::Disabled),
        _ => Err(AppError::Database(format!(
            "Invalid reservation state: {}",
            s
        ))),
    }
}

pub(crate) fn reservation_state_to_str(state: ReservationState) -> &'static str {
    match state {
        ReservationState::New => "new",
        ReservationState::Installment => "installment",
        ReservationState::Paid => "paid",
        ReservationState::Disabled => "disabled",
    }
}

#[async_trait]
impl ReservationRepository for SqliteReservationRepository {
    async fn create(
        &self,
        user_id: Uuid,
        membership_id: Uuid,
        state: ReservationState,
    ) -> Result<Reservation> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        // The membership number is allocated inside the insert so two
        // concurrent claims cannot take the same number.
        sqlx::query(
            r#"
            INSERT INTO reservations (id, membership_number, membership_id, user_id, state, created_at, updated_at)
            SELECT ?, COALESCE(MAX(membership_number), 0) + 1, ?, ?, ?, ?, ?
            FROM reservations
            "#,
        )
        .bind(id.to_string())
        .bind(membership_id.to_string())
        .bind(user_id.to_string())
        .bind(reservation_state_to_str(state))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created reservation".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, membership_number, membership_id, user_id, state, created_at, updated_at
            FROM reservations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_reservation(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_membership_number(&self, number: i64) -> Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, membership_number, membership_id, user_id, state, created_at, updated_at
            FROM reservations
            WHERE membership_number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_reservation(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, membership_number, membership_id, user_id, state, created_at, updated_at
            FROM reservations
            WHERE user_id = ?
            ORDER BY membership_number ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_reservation).collect()
    }

    async fn update_state(&self, id: Uuid, state: ReservationState) -> Result<Reservation> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE reservations
            SET state = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reservation_state_to_str(state))
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
    }
}
