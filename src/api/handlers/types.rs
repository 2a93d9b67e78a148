use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Charge, Membership, Reservation};

#[derive(Debug, Serialize, ToSchema)]
pub struct MembershipView {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
}

impl From<Membership> for MembershipView {
    fn from(membership: Membership) -> Self {
        Self {
            id: membership.id,
            name: membership.name,
            price_cents: membership.price_cents,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationView {
    pub id: Uuid,
    pub membership_number: i64,
    pub membership: String,
    pub state: String,
    pub price_cents: i64,
    pub owed_cents: i64,
    /// Charge amounts the payment form should offer.
    pub payment_options: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChargeView {
    pub id: Uuid,
    pub state: String,
    pub origin: String,
    pub amount_cents: i64,
    pub currency: String,
    pub comment: String,
    pub site: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Charge> for ChargeView {
    fn from(charge: Charge) -> Self {
        Self {
            id: charge.id,
            state: format!("{:?}", charge.state).to_lowercase(),
            origin: match charge.origin {
                crate::domain::ChargeOrigin::Cash => "cash".to_string(),
                crate::domain::ChargeOrigin::StripeDirect => "stripe_direct".to_string(),
                crate::domain::ChargeOrigin::StripeCheckout => "stripe_checkout".to_string(),
            },
            amount_cents: charge.amount_cents,
            currency: charge.currency,
            comment: charge.comment,
            site: charge.site,
            created_at: charge.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChargeResult {
    pub success: bool,
    pub errors: Vec<String>,
    pub charge: ChargeView,
    pub fully_paid: bool,
    pub outstanding_cents: i64,
}

pub fn reservation_state_label(reservation: &Reservation) -> String {
    format!("{:?}", reservation.state).to_lowercase()
}
