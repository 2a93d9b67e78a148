use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Cart, CartItem, Membership, Reservation};

/// Anything that can owe money and accumulate charges: a reservation for a
/// single membership, or a cart of items paid atomically. Charges carry a
/// `BuyableRef` as their polymorphic owner reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum BuyableKind {
    Reservation,
    Cart,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyableRef {
    pub kind: BuyableKind,
    pub id: Uuid,
}

impl BuyableRef {
    pub fn reservation(id: Uuid) -> Self {
        Self {
            kind: BuyableKind::Reservation,
            id,
        }
    }

    pub fn cart(id: Uuid) -> Self {
        Self {
            kind: BuyableKind::Cart,
            id,
        }
    }
}

/// A buyable loaded together with everything needed to price it.
#[derive(Debug, Clone)]
pub enum Buyable {
    Reservation {
        reservation: Reservation,
        membership: Membership,
    },
    Cart {
        cart: Cart,
        items: Vec<CartItem>,
    },
}

impl Buyable {
    pub fn reference(&self) -> BuyableRef {
        match self {
            Buyable::Reservation { reservation, .. } => BuyableRef::reservation(reservation.id),
            Buyable::Cart { cart, .. } => BuyableRef::cart(cart.id),
        }
    }

    /// Full price owed for the entity, before any charges are counted.
    pub fn price_cents(&self) -> i64 {
        match self {
            Buyable::Reservation { membership, .. } => membership.price_cents,
            Buyable::Cart { items, .. } => items.iter().map(|i| i.price_cents).sum(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            Buyable::Reservation { reservation, .. } => reservation.user_id,
            Buyable::Cart { cart, .. } => cart.user_id,
        }
    }
}
