use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Cart, CartItem, CartStatus},
    error::{AppError, Result},
    repository::CartRepository,
};

#[derive(FromRow)]
pub(crate) struct CartRow {
    id: String,
    user_id: String,
    status: String,
    active_to: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
pub(crate) struct CartItemRow {
    id: String,
    cart_id: String,
    membership_id: String,
    reservation_id: Option<String>,
    display_name: String,
    beneficiary_name: String,
    price_cents: i64,
    created_at: NaiveDateTime,
}

pub(crate) fn row_to_cart(row: CartRow) -> Result<Cart> {
    Ok(Cart {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
        status: parse_cart_status(&row.status)?,
        active_to: row
            .active_to
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub(crate) fn row_to_cart_item(row: CartItemRow) -> Result<CartItem> {
    Ok(CartItem {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        cart_id: Uuid::parse_str(&row.cart_id).map_err(|e| AppError::Database(e.to_string()))?,
        membership_id: Uuid::parse_str(&row.membership_id)
            .map_err(|e| AppError::Database(e.to_string()))?,
        reservation_id: row
            .reservation_id
            .map(|id| Uuid::parse_str(&id).map_err(|e| AppError::Database(e.to_string())))
            .transpose()?,
        display_name: row.display_name,
        beneficiary_name: row.beneficiary_name,
        price_cents: row.price_cents,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
    })
}

pub struct SqliteCartRepository {
    pool: SqlitePool,
}

impl SqliteCartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

}

pub(crate) fn parse_cart_status(s: &str) -> Result<CartStatus> {
    match s {
        "for_now" => Ok(CartStatus::ForNow),
        "for_later" => Ok(CartStatus::ForLater),
        "awaiting_cheque" => Ok(CartStatus::AwaitingCheque),
        "paid" => Ok(CartStatus::Paid),
        _ => Err(AppError::Database(format!("Invalid cart status: {}", s))),
    }
}

pub(crate) fn cart_status_to_str(status: CartStatus) -> &'static str {
    match status {
        CartStatus::ForNow => "for_now",
        CartStatus::ForLater => "for_later",
        CartStatus::AwaitingCheque => "awaiting_cheque",
        CartStatus::Paid => "paid",
    }
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn create(&self, user_id: Uuid, status: CartStatus) -> Result<Cart> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, status, active_to, created_at, updated_at)
            VALUES (?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(cart_status_to_str(status))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created cart".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, status, active_to, created_at, updated_at
            FROM carts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_cart(r)?)),
            None => Ok(None),
        }
    }

    async fn find_open_for_user(
        &self,
        user_id: Uuid,
        status: CartStatus,
    ) -> Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, status, active_to, created_at, updated_at
            FROM carts
            WHERE user_id = ? AND status = ? AND active_to IS NULL
            "#,
        )
        .bind(user_id.to_string())
        .bind(cart_status_to_str(status))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_cart(r)?)),
            None => Ok(None),
        }
    }

    async fn add_item(&self, item: CartItem) -> Result<CartItem> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, membership_id, reservation_id, display_name, beneficiary_name, price_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.cart_id.to_string())
        .bind(item.membership_id.to_string())
        .bind(item.reservation_id.map(|id| id.to_string()))
        .bind(&item.display_name)
        .bind(&item.beneficiary_name)
        .bind(item.price_cents)
        .bind(item.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(item)
    }

    async fn items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r#"
            SELECT id, cart_id, membership_id, reservation_id, display_name, beneficiary_name, price_cents, created_at
            FROM cart_items
            WHERE cart_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(cart_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_cart_item).collect()
    }

    async fn update_status(&self, id: Uuid, status: CartStatus) -> Result<Cart> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE carts
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(cart_status_to_str(status))
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))
    }
}
