//! Outstanding balance for a buyable, derived from its charge history.
//!
//! State is always recomputed from the full set of successful charges rather
//! than kept in a counter; these functions are the single place that sum is
//! defined, shared by the direct-charge path, both checkout outcome handlers,
//! and the settlement step.

use crate::domain::{Buyable, Charge};

/// Sum of successful, non-site charges. Site-selection payments never count
/// toward the membership price.
pub fn paid_cents(charges: &[Charge]) -> i64 {
    charges
        .iter()
        .filter(|c| c.successful() && !c.site)
        .map(|c| c.amount_cents)
        .sum()
}

/// `price - paid`. Can go negative when an overpayment is already on record;
/// callers must treat anything <= 0 as fully paid, never as a balance to
/// charge.
pub fn amount_owed_cents(buyable: &Buyable, charges: &[Charge]) -> i64 {
    buyable.price_cents() - paid_cents(charges)
}

pub fn fully_paid(buyable: &Buyable, charges: &[Charge]) -> bool {
    amount_owed_cents(buyable, charges) <= 0
}
