use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::BuyableRef;

/// Auto-generated charge comments are truncated to fit the column.
pub const MAX_COMMENT_LENGTH: usize = 255;

/// One attempted or completed payment against a buyable entity.
///
/// A charge is created pending (or directly terminal for cash records and
/// synchronous direct charges) and settled exactly once by the command that
/// owns it. Once successful, amount and provider reference never change, and
/// charges are never deleted. Failed rows are kept as the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub buyable: BuyableRef,
    pub state: ChargeState,
    pub origin: ChargeOrigin,
    pub amount_cents: i64,
    pub currency: String,
    /// Stripe charge or checkout-session id. For checkout charges this is
    /// the correlation key the webhook uses to find us again.
    pub provider_ref: Option<String>,
    /// Raw provider response, kept for audit only. Never drives control flow
    /// after initial parsing.
    pub provider_response: Option<serde_json::Value>,
    pub comment: String,
    /// Distinguishes site-selection payments from membership payments.
    pub site: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum ChargeState {
    Pending,
    Successful,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum ChargeOrigin {
    Cash,
    StripeDirect,
    StripeCheckout,
}

impl Charge {
    pub fn new_pending(
        user_id: Uuid,
        buyable: BuyableRef,
        origin: ChargeOrigin,
        amount_cents: i64,
        currency: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            buyable,
            state: ChargeState::Pending,
            origin,
            amount_cents,
            currency: currency.into(),
            provider_ref: None,
            provider_response: None,
            comment: comment.into(),
            site: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn successful(&self) -> bool {
        self.state == ChargeState::Successful
    }

    pub fn pending(&self) -> bool {
        self.state == ChargeState::Pending
    }

    pub fn failed(&self) -> bool {
        self.state == ChargeState::Failed
    }
}

/// Clamp an auto-generated comment to the column limit.
pub fn clamp_comment(comment: &str) -> String {
    if comment.len() <= MAX_COMMENT_LENGTH {
        return comment.to_string();
    }
    let mut end = MAX_COMMENT_LENGTH;
    while !comment.is_char_boundary(end) {
        end -= 1;
    }
    comment[..end].to_string()
}
