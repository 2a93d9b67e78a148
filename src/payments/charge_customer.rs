//! ChargeCustomer submits an immediate card payment and records the outcome.
//! A truthy `success` means the charge went through; otherwise the outcome's
//! error list says why. Expected failures (bad amounts, declines, provider
//! errors) never surface as `Err` — those are reserved for bugs and broken
//! infrastructure.

use std::sync::Arc;

use crate::{
    domain::{clamp_comment, Buyable, Charge, ChargeOrigin, ChargeState, User},
    error::Result,
    payments::{
        charge_description::ChargeDescription,
        check_charge_amount,
        gateway::{DirectChargeRequest, GatewayCharge, PaymentGateway},
        settlement::SettleCharge,
    },
    repository::{ChargeRepository, UserRepository},
};

#[derive(Debug)]
pub struct ChargeOutcome {
    pub success: bool,
    pub errors: Vec<String>,
    pub charge: Charge,
    pub fully_paid: bool,
    pub outstanding_cents: i64,
}

impl ChargeOutcome {
    pub fn error_message(&self) -> String {
        self.errors.join(", ")
    }
}

pub struct ChargeCustomer {
    gateway: Arc<dyn PaymentGateway>,
    charge_repo: Arc<dyn ChargeRepository>,
    user_repo: Arc<dyn UserRepository>,
    settle: SettleCharge,
    currency: String,
}

impl ChargeCustomer {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        charge_repo: Arc<dyn ChargeRepository>,
        user_repo: Arc<dyn UserRepository>,
        settle: SettleCharge,
        currency: String,
    ) -> Self {
        Self {
            gateway,
            charge_repo,
            user_repo,
            settle,
            currency,
        }
    }

    pub async fn call(
        &self,
        buyable: &Buyable,
        user: &User,
        token: &str,
        amount_owed_cents: i64,
        charge_amount_cents: Option<i64>,
    ) -> Result<ChargeOutcome> {
        let charge_amount = charge_amount_cents.unwrap_or(amount_owed_cents);

        // The pending row goes in before anything can fail so there is an
        // audit trail even if we crash mid-flight.
        let mut charge = Charge::new_pending(
            user.id,
            buyable.reference(),
            ChargeOrigin::StripeDirect,
            charge_amount,
            &self.currency,
            "Pending payment",
        );
        charge.provider_ref = Some(token.to_string());
        let mut charge = self.charge_repo.create(charge).await?;

        let mut errors = check_charge_amount(Some(charge_amount), amount_owed_cents);

        let mut card = None;
        if errors.is_empty() {
            card = self
                .setup_stripe_customer(user, token, &mut charge, &mut errors)
                .await?;
        }

        let mut provider_charge: Option<GatewayCharge> = None;
        if errors.is_empty() {
            if let Some((customer_id, card_id)) = card {
                let paid_before = buyable.price_cents() - amount_owed_cents;
                let description =
                    ChargeDescription::new(&charge, buyable, paid_before + charge_amount)
                        .for_accounts();

                match self
                    .gateway
                    .create_charge(DirectChargeRequest {
                        customer_id,
                        card_id,
                        amount_cents: charge_amount,
                        currency: self.currency.clone(),
                        description,
                    })
                    .await
                {
                    Ok(result) => provider_charge = Some(result),
                    Err(e) => {
                        errors.push(e.message.clone());
                        charge.provider_response = e.response;
                        charge.comment =
                            clamp_comment(&format!("Failed to create charge - {}", e.message));
                    }
                }
            }
        }

        if !errors.is_empty() {
            charge.state = ChargeState::Failed;
            charge.comment = clamp_comment(&errors.join(", "));
        } else if let Some(result) = &provider_charge {
            charge.state = if result.paid {
                ChargeState::Successful
            } else {
                ChargeState::Failed
            };
        }

        // Whatever the provider told us goes on the record, success or not.
        if let Some(result) = &provider_charge {
            charge.provider_ref = Some(result.id.clone());
            charge.amount_cents = result.amount_cents;
            charge.provider_response = Some(result.raw.clone());
            if !result.paid {
                charge.comment = clamp_comment(
                    result
                        .description
                        .as_deref()
                        .unwrap_or("Charge declined by provider"),
                );
            }
        }

        let settlement = self.settle.call(&charge).await?;

        Ok(ChargeOutcome {
            success: settlement.charge.successful(),
            errors,
            charge: settlement.charge,
            fully_paid: settlement.fully_paid,
            outstanding_cents: settlement.outstanding_cents,
        })
    }

    /// First-use customer creation is idempotent: an existing provider id is
    /// reused, never replaced. The card token is attached either way.
    /// Returns (customer id, card id) or records the provider error and
    /// returns None.
    async fn setup_stripe_customer(
        &self,
        user: &User,
        token: &str,
        charge: &mut Charge,
        errors: &mut Vec<String>,
    ) -> Result<Option<(String, String)>> {
        let customer_id = match &user.stripe_customer_id {
            Some(id) => id.clone(),
            None => match self.gateway.create_customer(&user.email).await {
                Ok(customer) => {
                    self.user_repo
                        .set_stripe_customer_id(user.id, &customer.id)
                        .await?;
                    customer.id
                }
                Err(e) => {
                    errors.push(e.message.clone());
                    charge.provider_response = e.response;
                    charge.comment =
                        clamp_comment(&format!("Failed to set up customer - {}", e.message));
                    return Ok(None);
                }
            },
        };

        match self.gateway.attach_card(&customer_id, token).await {
            Ok(card) => Ok(Some((customer_id, card.id))),
            Err(e) => {
                errors.push(e.message.clone());
                charge.provider_response = e.response;
                charge.comment =
                    clamp_comment(&format!("Failed to set up customer - {}", e.message));
                Ok(None)
            }
        }
    }
}
