/// Installment amounts offered against an outstanding balance: the minimum
/// payment, then fixed steps up from it, always ending exactly on the amount
/// owed so the final installment clears the balance.
pub struct PaymentAmountOptions {
    min_payment_cents: i64,
    payment_step_cents: i64,
}

impl PaymentAmountOptions {
    pub fn new(min_payment_cents: i64, payment_step_cents: i64) -> Self {
        Self {
            min_payment_cents,
            payment_step_cents,
        }
    }

    pub fn amounts(&self, amount_owed_cents: i64) -> Vec<i64> {
        let minimum = amount_owed_cents.min(self.min_payment_cents);
        if minimum <= 0 {
            return Vec::new();
        }

        let mut amounts: Vec<i64> = (minimum..amount_owed_cents)
            .step_by(self.payment_step_cents as usize)
            .collect();
        amounts.push(amount_owed_cents);
        amounts.dedup();
        amounts
    }
}
