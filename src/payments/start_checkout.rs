//! StartStripeCheckout sets a member up to pay through Stripe's hosted
//! checkout. A truthy `checkout_url` means the member can be redirected;
//! otherwise the error list says why not.
//!
//! Unlike the direct-charge path, the Charge row is written once at the end:
//! pending with the session id as its provider reference, or failed with the
//! aggregated errors. A failure before session creation therefore leaves no
//! audit row, which is accepted behavior for abandoned checkout attempts.

use std::sync::Arc;

use crate::{
    domain::{clamp_comment, BuyableRef, Charge, ChargeOrigin, ChargeState, Membership,
        Reservation, User},
    error::Result,
    payments::{
        check_charge_amount,
        gateway::{CheckoutSessionRequest, GatewayCheckoutSession, PaymentGateway},
    },
    repository::{ChargeRepository, UserRepository},
};

#[derive(Debug)]
pub struct CheckoutStart {
    pub checkout_url: Option<String>,
    pub errors: Vec<String>,
    pub charge: Charge,
}

impl CheckoutStart {
    pub fn started(&self) -> bool {
        self.checkout_url.is_some()
    }

    pub fn error_message(&self) -> String {
        self.errors.join(", ")
    }
}

pub struct StartStripeCheckout {
    gateway: Arc<dyn PaymentGateway>,
    charge_repo: Arc<dyn ChargeRepository>,
    user_repo: Arc<dyn UserRepository>,
    currency: String,
}

impl StartStripeCheckout {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        charge_repo: Arc<dyn ChargeRepository>,
        user_repo: Arc<dyn UserRepository>,
        currency: String,
    ) -> Self {
        Self {
            gateway,
            charge_repo,
            user_repo,
            currency,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn call(
        &self,
        reservation: &Reservation,
        membership: &Membership,
        user: &User,
        amount_owed_cents: i64,
        charge_amount_cents: Option<i64>,
        site: bool,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutStart> {
        let charge_amount = charge_amount_cents.unwrap_or(amount_owed_cents);
        let mut errors = Vec::new();

        let customer_id = self.setup_stripe_customer(user, &mut errors).await?;

        if errors.is_empty() {
            errors = check_charge_amount(Some(charge_amount), amount_owed_cents);
        }

        let mut session: Option<GatewayCheckoutSession> = None;
        let mut provider_response = None;
        if errors.is_empty() {
            let line_item_name = if site {
                "Site Selection".to_string()
            } else {
                membership.name.clone()
            };

            match self
                .gateway
                .create_checkout_session(CheckoutSessionRequest {
                    customer_id: customer_id.unwrap_or_default(),
                    line_item_name,
                    amount_cents: charge_amount,
                    currency: self.currency.clone(),
                    success_url: success_url.to_string(),
                    cancel_url: cancel_url.to_string(),
                })
                .await
            {
                Ok(created) => session = Some(created),
                Err(e) => {
                    errors.push(e.message.clone());
                    provider_response = e.response;
                }
            }
        }

        let mut charge = Charge::new_pending(
            user.id,
            BuyableRef::reservation(reservation.id),
            ChargeOrigin::StripeCheckout,
            charge_amount,
            &self.currency,
            "Pending payment",
        );
        charge.site = site;
        if let Some(session) = &session {
            // The session id is how the webhook finds this charge again.
            charge.provider_ref = Some(session.id.clone());
        }
        if !errors.is_empty() {
            charge.state = ChargeState::Failed;
            charge.comment = clamp_comment(&errors.join(", "));
            charge.provider_response = provider_response;
        }
        let charge = self.charge_repo.create(charge).await?;

        Ok(CheckoutStart {
            checkout_url: session.and_then(|s| s.url),
            errors,
            charge,
        })
    }

    async fn setup_stripe_customer(
        &self,
        user: &User,
        errors: &mut Vec<String>,
    ) -> Result<Option<String>> {
        if let Some(id) = &user.stripe_customer_id {
            return Ok(Some(id.clone()));
        }

        match self.gateway.create_customer(&user.email).await {
            Ok(customer) => {
                self.user_repo
                    .set_stripe_customer_id(user.id, &customer.id)
                    .await?;
                Ok(Some(customer.id))
            }
            Err(e) => {
                errors.push(format!("Failed to set up customer - {}", e.message));
                Ok(None)
            }
        }
    }
}
