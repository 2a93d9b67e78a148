//! Staff-recorded out-of-band payments (cash box, cheque cleared, comped).
//! The charge is created directly in a terminal state, but it goes through
//! the same amount validation and the same settlement recomputation as a
//! card payment, so the no-overpayment rule holds across every origin.

use std::sync::Arc;

use crate::{
    domain::{clamp_comment, Buyable, Charge, ChargeOrigin, ChargeState, User},
    error::Result,
    payments::{
        amount_owed, charge_customer::ChargeOutcome, check_charge_amount,
        settlement::SettleCharge,
    },
    repository::ChargeRepository,
};

pub struct RecordCashCharge {
    charge_repo: Arc<dyn ChargeRepository>,
    settle: SettleCharge,
    currency: String,
}

impl RecordCashCharge {
    pub fn new(charge_repo: Arc<dyn ChargeRepository>, settle: SettleCharge, currency: String) -> Self {
        Self {
            charge_repo,
            settle,
            currency,
        }
    }

    pub async fn call(
        &self,
        buyable: &Buyable,
        user: &User,
        amount_cents: i64,
        note: Option<&str>,
    ) -> Result<ChargeOutcome> {
        let charges = self.charge_repo.list_for_buyable(&buyable.reference()).await?;
        let amount_owed_cents = amount_owed::amount_owed_cents(buyable, &charges);

        let errors = check_charge_amount(Some(amount_cents), amount_owed_cents);

        let mut charge = Charge::new_pending(
            user.id,
            buyable.reference(),
            ChargeOrigin::Cash,
            amount_cents,
            &self.currency,
            note.unwrap_or("Cash payment"),
        );
        if errors.is_empty() {
            charge.state = ChargeState::Successful;
        } else {
            charge.state = ChargeState::Failed;
            charge.comment = clamp_comment(&errors.join(", "));
        }
        let charge = self.charge_repo.create(charge).await?;

        let settlement = self.settle.call_keeping_comment(&charge).await?;

        Ok(ChargeOutcome {
            success: settlement.charge.successful(),
            errors,
            charge: settlement.charge,
            fully_paid: settlement.fully_paid,
            outstanding_cents: settlement.outstanding_cents,
        })
    }
}
