//! Human-readable text for a charge, built retrospectively from the charge,
//! its buyable, and how much had been paid once it settled. Payment history
//! pages and accounting exports both read these strings, so they are written
//! at settlement time when the final state is known.

use crate::domain::{clamp_comment, Buyable, Charge};

pub struct ChargeDescription<'a> {
    charge: &'a Charge,
    buyable: &'a Buyable,
    /// Successful non-site cents against the buyable, including this charge
    /// when it settled successfully.
    paid_so_far_cents: i64,
}

impl<'a> ChargeDescription<'a> {
    pub fn new(charge: &'a Charge, buyable: &'a Buyable, paid_so_far_cents: i64) -> Self {
        Self {
            charge,
            buyable,
            paid_so_far_cents,
        }
    }

    /// Payer-facing text, e.g. on receipts and the payment history page:
    /// "$75.00 USD Installment for Adult member #42".
    pub fn for_users(&self) -> String {
        let description = format!(
            "{} {} for {}",
            self.format_amount(),
            self.charge_action(),
            self.buyable_description()
        );
        clamp_comment(&description)
    }

    /// Internal accounting text; adds the charge origin so reports can be
    /// reconciled against provider exports without joining tables.
    pub fn for_accounts(&self) -> String {
        let description = format!(
            "{} {} ({:?}) for {}",
            self.format_amount(),
            self.charge_action(),
            self.charge.origin,
            self.buyable_description()
        );
        clamp_comment(&description)
    }

    fn charge_action(&self) -> &'static str {
        if self.charge.site {
            return "Site Selection";
        }
        if self.paid_so_far_cents < self.buyable.price_cents() {
            "Installment"
        } else {
            "Paid"
        }
    }

    fn format_amount(&self) -> String {
        format_cents(self.charge.amount_cents, &self.charge.currency)
    }

    fn buyable_description(&self) -> String {
        match self.buyable {
            Buyable::Reservation {
                reservation,
                membership,
            } => format!(
                "{} member #{}",
                membership.name, reservation.membership_number
            ),
            Buyable::Cart { items, .. } => describe_cart_items(items),
        }
    }
}

pub fn format_cents(cents: i64, currency: &str) -> String {
    format!(
        "${}.{:02} {}",
        cents / 100,
        (cents % 100).abs(),
        currency.to_uppercase()
    )
}

/// "Adult for Ada Lovelace, Supporting for Tim Berners-Lee and 2 other
/// item(s)" with enough items elided to stay inside the comment column.
fn describe_cart_items(items: &[crate::domain::CartItem]) -> String {
    const ROOM_FOR_TAIL: usize = 30;
    let limit = crate::domain::MAX_COMMENT_LENGTH - ROOM_FOR_TAIL;

    let mut described = Vec::new();
    let mut used = 0usize;
    for (index, item) in items.iter().enumerate() {
        let fragment = format!("{} for {}", item.display_name, item.beneficiary_name);
        if used + fragment.len() > limit {
            let remaining = items.len() - index;
            described.push(format!("and {} other item(s)", remaining));
            return format!("cart: {}", described.join(", "));
        }
        used += fragment.len();
        described.push(fragment);
    }

    match described.len() {
        0 => "empty cart".to_string(),
        _ => format!("cart: {}", described.join(", ")),
    }
}
