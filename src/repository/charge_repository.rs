use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{BuyableKind, BuyableRef, Charge, ChargeOrigin, ChargeState},
    error::{AppError, Result},
    repository::ChargeRepository,
};

#[derive(FromRow)]
pub(crate) struct ChargeRow {
    id: String,
    user_id: String,
    buyable_type: String,
    buyable_id: String,
    state: String,
    origin: String,
    amount_cents: i64,
    currency: String,
    provider_ref: Option<String>,
    provider_response: Option<String>,
    comment: String,
    site: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub(crate) const CHARGE_COLUMNS: &str = "id, user_id, buyable_type, buyable_id, state, origin, \
     amount_cents, currency, provider_ref, provider_response, comment, site, created_at, updated_at";

pub(crate) fn row_to_charge(row: ChargeRow) -> Result<Charge> {
    let response = row
        .provider_response
        .map(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| AppError::Database(format!("Invalid provider response blob: {}", e)))
        })
        .transpose()?;

    Ok(Charge {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
        buyable: BuyableRef {
            kind: parse_buyable_kind(&row.buyable_type)?,
            id: Uuid::parse_str(&row.buyable_id).map_err(|e| AppError::Database(e.to_string()))?,
        },
        state: parse_charge_state(&row.state)?,
        origin: parse_charge_origin(&row.origin)?,
        amount_cents: row.amount_cents,
        currency: row.currency,
        provider_ref: row.provider_ref,
        provider_response: response,
        comment: row.comment,
        site: row.site,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

pub(crate) fn parse_buyable_kind(s: &str) -> Result<BuyableKind> {
    match s {
        "reservation" => Ok(BuyableKind::Reservation),
        "cart" => Ok(BuyableKind::Cart),
        _ => Err(AppError::Database(format!("Invalid buyable type: {}", s))),
    }
}

pub(crate) fn buyable_kind_to_str(kind: BuyableKind) -> &'static str {
    match kind {
        BuyableKind::Reservation => "reservation",
        BuyableKind::Cart => "cart",
    }
}

pub(crate) fn parse_charge_state(s: &str) -> Result<ChargeState> {
    match s {
        "pending" => Ok(ChargeState::Pending),
        "successful" => Ok(ChargeState::Successful),
        "failed" => Ok(ChargeState::Failed),
        _ => Err(AppError::Database(format!("Invalid charge state: {}", s))),
    }
}

pub(crate) fn charge_state_to_str(state: ChargeState) -> &'static str {
    match state {
        ChargeState::Pending => "pending",
        ChargeState::Successful => "successful",
        ChargeState::Failed => "failed",
    }
}

pub(crate) fn parse_charge_origin(s: &str) -> Result<ChargeOrigin> {
    match s {
        "cash" => Ok(ChargeOrigin::Cash),
        "stripe_direct" => Ok(ChargeOrigin::StripeDirect),
        "stripe_checkout" => Ok(ChargeOrigin::StripeCheckout),
        _ => Err(AppError::Database(format!("Invalid charge origin: {}", s))),
    }
}

pub(crate) fn charge_origin_to_str(origin: ChargeOrigin) -> &'static str {
    match origin {
        ChargeOrigin::Cash => "cash",
        ChargeOrigin::StripeDirect => "stripe_direct",
        ChargeOrigin::StripeCheckout => "stripe_checkout",
    }
}

pub struct SqliteChargeRepository {
    pool: SqlitePool,
}

impl SqliteChargeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChargeRepository for SqliteChargeRepository {
    async fn create(&self, charge: Charge) -> Result<Charge> {
        let response_json = charge
            .provider_response
            .as_ref()
            .map(|v| v.to_string());

        sqlx::query(
            r#"
            INSERT INTO charges (
                id, user_id, buyable_type, buyable_id, state, origin,
                amount_cents, currency, provider_ref, provider_response,
                comment, site, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(charge.id.to_string())
        .bind(charge.user_id.to_string())
        .bind(buyable_kind_to_str(charge.buyable.kind))
        .bind(charge.buyable.id.to_string())
        .bind(charge_state_to_str(charge.state))
        .bind(charge_origin_to_str(charge.origin))
        .bind(charge.amount_cents)
        .bind(&charge.currency)
        .bind(&charge.provider_ref)
        .bind(response_json)
        .bind(&charge.comment)
        .bind(charge.site)
        .bind(charge.created_at.naive_utc())
        .bind(charge.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(charge.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created charge".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Charge>> {
        let row = sqlx::query_as::<_, ChargeRow>(&format!(
            "SELECT {} FROM charges WHERE id = ?",
            CHARGE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_charge(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_provider_ref(&self, provider_ref: &str) -> Result<Option<Charge>> {
        let row = sqlx::query_as::<_, ChargeRow>(&format!(
            "SELECT {} FROM charges WHERE provider_ref = ?",
            CHARGE_COLUMNS
        ))
        .bind(provider_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_charge(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_buyable(&self, buyable: &BuyableRef) -> Result<Vec<Charge>> {
        let rows = sqlx::query_as::<_, ChargeRow>(&format!(
            "SELECT {} FROM charges WHERE buyable_type = ? AND buyable_id = ? ORDER BY created_at ASC",
            CHARGE_COLUMNS
        ))
        .bind(buyable_kind_to_str(buyable.kind))
        .bind(buyable.id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_charge).collect()
    }

    async fn update(&self, charge: &Charge) -> Result<Charge> {
        let now = Utc::now().naive_utc();
        let response_json = charge
            .provider_response
            .as_ref()
            .map(|v| v.to_string());

        sqlx::query(
            r#"
            UPDATE charges
            SET state = ?,
                amount_cents = ?,
                provider_ref = ?,
                provider_response = ?,
                comment = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(charge_state_to_str(charge.state))
        .bind(charge.amount_cents)
        .bind(&charge.provider_ref)
        .bind(response_json)
        .bind(&charge.comment)
        .bind(now)
        .bind(charge.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(charge.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Charge not found".to_string()))
    }

    async fn list_stale_pending(
        &self,
        origin: ChargeOrigin,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Charge>> {
        let rows = sqlx::query_as::<_, ChargeRow>(&format!(
            "SELECT {} FROM charges WHERE state = 'pending' AND origin = ? AND created_at < ? ORDER BY created_at ASC",
            CHARGE_COLUMNS
        ))
        .bind(charge_origin_to_str(origin))
        .bind(created_before.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_charge).collect()
    }
}
