use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Cart is a collection of CartItems paid for atomically. A user has at
/// most one open `ForNow` cart and one `ForLater` cart; paid carts are kept
/// forever as part of the payment audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: CartStatus,
    /// Set when the cart closes (reaches `Paid`). An open cart has no
    /// `active_to`.
    pub active_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum CartStatus {
    ForNow,
    ForLater,
    AwaitingCheque,
    Paid,
}

/// One line in a cart. Price and display name are locked at add time so
/// later price-list changes never alter what an open cart owes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub membership_id: Uuid,
    /// The reservation created for this item. Present once the item has been
    /// through checkout preparation; transitions to paid with the cart.
    pub reservation_id: Option<Uuid>,
    pub display_name: String,
    pub beneficiary_name: String,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn paid(&self) -> bool {
        self.status == CartStatus::Paid
    }

    pub fn open(&self) -> bool {
        self.active_to.is_none()
    }
}
