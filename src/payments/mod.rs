pub mod amount_owed;
pub mod cash_charge;
pub mod charge_customer;
pub mod charge_description;
pub mod checkout_outcome;
pub mod gateway;
pub mod payment_amounts;
pub mod reconciliation;
pub mod settlement;
pub mod start_checkout;
pub mod stripe_client;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use cash_charge::RecordCashCharge;
pub use charge_customer::{ChargeCustomer, ChargeOutcome};
pub use checkout_outcome::{StripeCheckoutFailed, StripeCheckoutSucceeded};
pub use gateway::{CheckoutSessionStatus, GatewayError, PaymentGateway};
pub use payment_amounts::PaymentAmountOptions;
pub use reconciliation::PendingCheckoutSweep;
pub use settlement::{BuyableLoader, SettleCharge, Settlement};
pub use start_checkout::{CheckoutStart, StartStripeCheckout};
pub use stripe_client::StripeClient;

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakeStripeGateway;

/// The Stripe-backed money commands, bundled for handler wiring. Built in
/// main only when Stripe is configured.
pub struct MoneyCommands {
    pub charge_customer: ChargeCustomer,
    pub start_checkout: StartStripeCheckout,
    pub checkout_succeeded: std::sync::Arc<StripeCheckoutSucceeded>,
    pub checkout_failed: std::sync::Arc<StripeCheckoutFailed>,
}

/// The three amount rules every charge attempt passes, regardless of origin.
/// Failures are user-facing strings, accumulated rather than raised.
pub fn check_charge_amount(charge_amount_cents: Option<i64>, amount_owed_cents: i64) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(amount) = charge_amount_cents else {
        errors.push("charge amount is missing".to_string());
        return errors;
    };
    if amount <= 0 {
        errors.push("amount must be more than 0 cents".to_string());
    }
    if amount > amount_owed_cents {
        errors.push("refusing to overpay".to_string());
    }

    errors
}
