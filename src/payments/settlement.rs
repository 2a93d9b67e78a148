//! Transactional finalization shared by the direct-charge path, the checkout
//! success handler, and cash charge recording.
//!
//! The settle step writes the charge's terminal state and recomputes the
//! buyable's paid/installment state from the full successful-charge set in a
//! single database transaction. Concurrent settlements against the same
//! buyable serialize on the row writes, and because each one re-derives state
//! from the committed charge sum, replays and races cannot double-count.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    domain::{Buyable, BuyableKind, BuyableRef, Charge, ReservationState},
    error::{AppError, Result},
    payments::charge_description::ChargeDescription,
    repository::{
        cart_repository::{row_to_cart, row_to_cart_item, CartItemRow, CartRow},
        charge_repository::{buyable_kind_to_str, charge_state_to_str},
        membership_repository::{row_to_membership, MembershipRow},
        reservation_repository::{reservation_state_to_str, row_to_reservation, ReservationRow},
    },
};

/// What a settlement left behind.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub charge: Charge,
    /// True when the buyable is fully covered by successful charges after
    /// this settlement.
    pub fully_paid: bool,
    /// Remaining balance, floored at zero for notification text.
    pub outstanding_cents: i64,
}

pub struct SettleCharge {
    pool: SqlitePool,
}

impl SettleCharge {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists the charge's decided state and advances the buyable. The
    /// caller has already decided `charge.state`; this step never talks to
    /// the provider.
    pub async fn call(&self, charge: &Charge) -> Result<Settlement> {
        self.call_inner(charge, true).await
    }

    /// Same settlement, but the charge keeps the comment the caller wrote
    /// (staff notes on cash charges) instead of the generated description.
    pub async fn call_keeping_comment(&self, charge: &Charge) -> Result<Settlement> {
        self.call_inner(charge, false).await
    }

    async fn call_inner(&self, charge: &Charge, describe: bool) -> Result<Settlement> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let buyable = load_buyable(&mut *tx, &charge.buyable).await?;

        let now = Utc::now().naive_utc();
        let response_json = charge.provider_response.as_ref().map(|v| v.to_string());
        sqlx::query(
            r#"
            UPDATE charges
            SET state = ?, amount_cents = ?, provider_ref = ?, provider_response = ?, comment = ?, updated_at = ?
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
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        // Recompute from the charge set as committed inside this
        // transaction, which now includes the row written above.
        let paid_so_far: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM charges
            WHERE buyable_type = ? AND buyable_id = ? AND state = 'successful' AND site = 0
            "#,
        )
        .bind(buyable_kind_to_str(charge.buyable.kind))
        .bind(charge.buyable.id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut updated = charge.clone();

        // A successful charge gets its history-aware description; failed
        // charges keep the error text the command recorded.
        if describe && updated.successful() {
            updated.comment =
                ChargeDescription::new(&updated, &buyable, paid_so_far).for_users();
            sqlx::query("UPDATE charges SET comment = ? WHERE id = ?")
                .bind(&updated.comment)
                .bind(updated.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        let price = buyable.price_cents();
        let fully_paid = paid_so_far >= price && paid_so_far > 0;

        if updated.successful() {
            apply_paid_state(&mut tx, &buyable, paid_so_far, fully_paid).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Settlement {
            charge: updated,
            fully_paid,
            outstanding_cents: (price - paid_so_far).max(0),
        })
    }
}

async fn apply_paid_state(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    buyable: &Buyable,
    paid_so_far: i64,
    fully_paid: bool,
) -> Result<()> {
    let now = Utc::now().naive_utc();
    match buyable {
        Buyable::Reservation { reservation, .. } => {
            // Staff-disabled reservations keep their state; re-enabling
            // recomputes it from the charge sum.
            if reservation.disabled() {
                return Ok(());
            }
            let state = if fully_paid {
                ReservationState::Paid
            } else if paid_so_far > 0 {
                ReservationState::Installment
            } else {
                return Ok(());
            };
            sqlx::query("UPDATE reservations SET state = ?, updated_at = ? WHERE id = ?")
                .bind(reservation_state_to_str(state))
                .bind(now)
                .bind(reservation.id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Buyable::Cart { cart, items } => {
            if !fully_paid {
                return Ok(());
            }
            // The cart closes and every reservation it holds is paid off
            // with it.
            sqlx::query(
                "UPDATE carts SET status = 'paid', active_to = ?, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(now)
            .bind(cart.id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

            for item in items {
                if let Some(reservation_id) = item.reservation_id {
                    sqlx::query(
                        "UPDATE reservations SET state = 'paid', updated_at = ? WHERE id = ? AND state != 'disabled'",
                    )
                    .bind(now)
                    .bind(reservation_id.to_string())
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                }
            }
        }
    }
    Ok(())
}

/// Loads a buyable with everything needed to price and describe it.
pub async fn load_buyable(
    conn: &mut SqliteConnection,
    reference: &BuyableRef,
) -> Result<Buyable> {
    match reference.kind {
        BuyableKind::Reservation => {
            let row = sqlx::query_as::<_, ReservationRow>(
                r#"
                SELECT id, membership_number, membership_id, user_id, state, created_at, updated_at
                FROM reservations
                WHERE id = ?
                "#,
            )
            .bind(reference.id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;
            let reservation = row_to_reservation(row)?;

            let membership_row = sqlx::query_as::<_, MembershipRow>(
                r#"
                SELECT id, name, price_cents, active_from, active_to, created_at, updated_at
                FROM memberships
                WHERE id = ?
                "#,
            )
            .bind(reservation.membership_id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

            Ok(Buyable::Reservation {
                reservation,
                membership: row_to_membership(membership_row)?,
            })
        }
        BuyableKind::Cart => {
            let row = sqlx::query_as::<_, CartRow>(
                r#"
                SELECT id, user_id, status, active_to, created_at, updated_at
                FROM carts
                WHERE id = ?
                "#,
            )
            .bind(reference.id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))?;
            let cart = row_to_cart(row)?;

            let item_rows = sqlx::query_as::<_, CartItemRow>(
                r#"
                SELECT id, cart_id, membership_id, reservation_id, display_name, beneficiary_name, price_cents, created_at
                FROM cart_items
                WHERE cart_id = ?
                ORDER BY created_at ASC
                "#,
            )
            .bind(reference.id.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

            let items = item_rows
                .into_iter()
                .map(row_to_cart_item)
                .collect::<Result<Vec<_>>>()?;

            Ok(Buyable::Cart { cart, items })
        }
    }
}

/// Pool-backed convenience wrapper for handlers that need a buyable outside
/// any transaction.
pub struct BuyableLoader {
    pool: SqlitePool,
}

impl BuyableLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load(&self, reference: &BuyableRef) -> Result<Buyable> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        load_buyable(&mut *conn, reference).await
    }
}
