//! Webhook-driven finalizers for hosted checkout sessions. The webhook
//! handler looks the Charge up by its checkout-session id and hands it here
//! together with the raw session payload.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    domain::{Buyable, Charge, ChargeState},
    error::{AppError, Result},
    notifications::{NotifierManager, PaymentEvent},
    payments::settlement::{BuyableLoader, SettleCharge, Settlement},
    repository::{ChargeRepository, SiteSelectionTokenRepository, UserRepository},
};

/// Marks the charge successful, recomputes the reservation's paid state, and
/// queues the member's payment notification. For site-selection payments it
/// additionally claims the member's pre-generated voting token; a missing
/// token is a data-integrity failure and aborts the invocation loudly.
pub struct StripeCheckoutSucceeded {
    charge_repo: Arc<dyn ChargeRepository>,
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn SiteSelectionTokenRepository>,
    settle: SettleCharge,
    loader: BuyableLoader,
    notifier: Arc<NotifierManager>,
}

impl StripeCheckoutSucceeded {
    pub fn new(
        charge_repo: Arc<dyn ChargeRepository>,
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn SiteSelectionTokenRepository>,
        settle: SettleCharge,
        loader: BuyableLoader,
        notifier: Arc<NotifierManager>,
    ) -> Self {
        Self {
            charge_repo,
            user_repo,
            token_repo,
            settle,
            loader,
            notifier,
        }
    }

    pub async fn call(&self, charge: &Charge, session_payload: Value) -> Result<Settlement> {
        // Event-id dedup catches provider retries before they reach us; this
        // guard catches the webhook racing the reconciliation sweep.
        if !charge.pending() {
            tracing::info!(charge_id = %charge.id, "Charge already finalized, skipping");
            return self.settled_view(charge).await;
        }

        let mut updated = charge.clone();
        updated.state = ChargeState::Successful;
        updated.provider_response = Some(session_payload);

        let settlement = self.settle.call(&updated).await?;

        let user = self
            .user_repo
            .find_by_id(settlement.charge.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Charge owner not found".to_string()))?;

        if settlement.charge.site {
            let buyable = self.loader.load(&settlement.charge.buyable).await?;
            let reservation = match &buyable {
                Buyable::Reservation { reservation, .. } => reservation.clone(),
                Buyable::Cart { .. } => {
                    return Err(AppError::Internal(
                        "Site selection charge attached to a cart".to_string(),
                    ))
                }
            };

            // Tokens are minted ahead of time per membership number. Not
            // finding one means the pre-generation step was skipped, and
            // that has to surface, not be papered over.
            let token = self
                .token_repo
                .claim_for_voter(
                    &reservation.membership_number.to_string(),
                    reservation.id,
                )
                .await?;

            self.notifier.dispatch(PaymentEvent::SiteSelectionPaid {
                user,
                charge: settlement.charge.clone(),
                token,
            });
        } else if settlement.fully_paid {
            self.notifier.dispatch(PaymentEvent::FullyPaid {
                user,
                charge: settlement.charge.clone(),
            });
        } else {
            self.notifier.dispatch(PaymentEvent::InstallmentReceived {
                user,
                charge: settlement.charge.clone(),
                outstanding_cents: settlement.outstanding_cents,
            });
        }

        Ok(settlement)
    }

    /// Settlement view of an already-finalized charge, without re-applying
    /// any side effects.
    async fn settled_view(&self, charge: &Charge) -> Result<Settlement> {
        let buyable = self.loader.load(&charge.buyable).await?;
        let charges = self.charge_repo.list_for_buyable(&charge.buyable).await?;
        let paid = crate::payments::amount_owed::paid_cents(&charges);
        let price = buyable.price_cents();
        Ok(Settlement {
            charge: charge.clone(),
            fully_paid: paid >= price && paid > 0,
            outstanding_cents: (price - paid).max(0),
        })
    }
}

/// Marks the charge failed and stores the session payload. Reservation state
/// is untouched; no money changed hands.
pub struct StripeCheckoutFailed {
    charge_repo: Arc<dyn ChargeRepository>,
}

impl StripeCheckoutFailed {
    pub fn new(charge_repo: Arc<dyn ChargeRepository>) -> Self {
        Self { charge_repo }
    }

    pub async fn call(&self, charge: &Charge, session_payload: Value) -> Result<Charge> {
        if !charge.pending() {
            tracing::info!(charge_id = %charge.id, "Charge already finalized, skipping");
            return Ok(charge.clone());
        }

        let mut updated = charge.clone();
        updated.state = ChargeState::Failed;
        updated.provider_response = Some(session_payload);
        updated.comment = "Stripe checkout failed.".to_string();

        self.charge_repo.update(&updated).await
    }
}
