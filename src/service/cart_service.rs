use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    payments::amount_owed,
    repository::{CartRepository, ChargeRepository, MembershipRepository, ReservationRepository},
};

pub struct CartService {
    cart_repo: Arc<dyn CartRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    charge_repo: Arc<dyn ChargeRepository>,
}

impl CartService {
    pub fn new(
        cart_repo: Arc<dyn CartRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        charge_repo: Arc<dyn ChargeRepository>,
    ) -> Self {
        Self {
            cart_repo,
            membership_repo,
            reservation_repo,
            charge_repo,
        }
    }

    /// The user's open cart, created on first use.
    pub async fn open_cart(&self, user: &User) -> Result<Cart> {
        if let Some(cart) = self
            .cart_repo
            .find_open_for_user(user.id, CartStatus::ForNow)
            .await?
        {
            return Ok(cart);
        }
        self.cart_repo.create(user.id, CartStatus::ForNow).await
    }

    /// Adds a membership for a named beneficiary. The reservation is created
    /// up front (unpaid) and the item locks in today's price and name, so a
    /// later price-list change cannot alter what this cart owes.
    pub async fn add_membership_item(
        &self,
        cart: &Cart,
        user: &User,
        membership_id: Uuid,
        beneficiary_name: &str,
    ) -> Result<CartItem> {
        if !cart.open() || cart.paid() {
            return Err(AppError::BadRequest("Cart is closed".to_string()));
        }

        let membership = self
            .membership_repo
            .find_by_id(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        if !membership.active_at(Utc::now()) {
            return Err(AppError::BadRequest(format!(
                "{} memberships are no longer available",
                membership.name
            )));
        }

        let reservation = self
            .reservation_repo
            .create(user.id, membership.id, ReservationState::New)
            .await?;

        let item = CartItem {
            id: Uuid::new_v4(),
            cart_id: cart.id,
            membership_id: membership.id,
            reservation_id: Some(reservation.id),
            display_name: membership.name.clone(),
            beneficiary_name: beneficiary_name.to_string(),
            price_cents: membership.price_cents,
            created_at: Utc::now(),
        };

        self.cart_repo.add_item(item).await
    }

    /// Outstanding balance for a cart, with the loaded pieces the payment
    /// handlers need alongside it.
    pub async fn amount_owed(&self, cart: &Cart) -> Result<(Buyable, Vec<Charge>, i64)> {
        let items = self.cart_repo.items(cart.id).await?;
        let buyable = Buyable::Cart {
            cart: cart.clone(),
            items,
        };
        let charges = self.charge_repo.list_for_buyable(&buyable.reference()).await?;
        let owed = amount_owed::amount_owed_cents(&buyable, &charges);

        Ok((buyable, charges, owed))
    }
}
