//! Background sweep for checkout charges stuck in `pending`. A webhook that
//! never arrives (delivery failure, endpoint downtime) would otherwise leave
//! a charge pending forever; the sweep asks the provider directly and
//! finalizes through the same handlers the webhook uses.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::{
    domain::ChargeOrigin,
    error::Result,
    payments::{
        checkout_outcome::{StripeCheckoutFailed, StripeCheckoutSucceeded},
        gateway::{CheckoutSessionStatus, PaymentGateway},
    },
    repository::ChargeRepository,
};

#[derive(Debug, Default)]
pub struct SweepSummary {
    pub examined: usize,
    pub settled: usize,
    pub expired: usize,
}

pub struct PendingCheckoutSweep {
    gateway: Arc<dyn PaymentGateway>,
    charge_repo: Arc<dyn ChargeRepository>,
    succeeded: Arc<StripeCheckoutSucceeded>,
    failed: Arc<StripeCheckoutFailed>,
    max_age: chrono::Duration,
}

impl PendingCheckoutSweep {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        charge_repo: Arc<dyn ChargeRepository>,
        succeeded: Arc<StripeCheckoutSucceeded>,
        failed: Arc<StripeCheckoutFailed>,
        max_age: chrono::Duration,
    ) -> Self {
        Self {
            gateway,
            charge_repo,
            succeeded,
            failed,
            max_age,
        }
    }

    pub async fn run_once(&self) -> Result<SweepSummary> {
        let cutoff = Utc::now() - self.max_age;
        let stale = self
            .charge_repo
            .list_stale_pending(ChargeOrigin::StripeCheckout, cutoff)
            .await?;

        let mut summary = SweepSummary {
            examined: stale.len(),
            ..Default::default()
        };

        for charge in stale {
            let session_id = match &charge.provider_ref {
                Some(id) => id.clone(),
                None => continue,
            };

            let session = match self.gateway.retrieve_checkout_session(&session_id).await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(
                        charge_id = %charge.id,
                        session_id = %session_id,
                        "Failed to query provider for pending charge: {}",
                        e
                    );
                    continue;
                }
            };

            if session.paid {
                self.succeeded.call(&charge, session.raw).await?;
                summary.settled += 1;
            } else if session.status == CheckoutSessionStatus::Expired {
                self.failed.call(&charge, session.raw).await?;
                summary.expired += 1;
            }
            // Still open and unpaid: leave it for the next pass
        }

        if summary.settled > 0 || summary.expired > 0 {
            tracing::info!(
                examined = summary.examined,
                settled = summary.settled,
                expired = summary.expired,
                "Pending checkout sweep finished"
            );
        }

        Ok(summary)
    }

    /// Runs forever on an interval; spawned from main.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::error!("Pending checkout sweep failed: {:?}", e);
            }
        }
    }
}
