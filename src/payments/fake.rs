//! Scriptable in-memory stand-in for the Stripe API, exposed through the
//! `test-utils` feature so integration tests can exercise the money commands
//! without network access.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::payments::gateway::{
    CheckoutSessionRequest, CheckoutSessionStatus, DirectChargeRequest, GatewayCard,
    GatewayCharge, GatewayCheckoutSession, GatewayCustomer, GatewayError, GatewayResult,
    PaymentGateway,
};

#[derive(Default)]
struct FakeState {
    fail_customer_setup: Option<String>,
    decline_charges: Option<String>,
    fail_sessions: Option<String>,
    charges: Vec<DirectChargeRequest>,
    sessions: Vec<CheckoutSessionRequest>,
    session_outcomes: std::collections::HashMap<String, (CheckoutSessionStatus, bool)>,
}

pub struct FakeStripeGateway {
    state: Mutex<FakeState>,
    customers_created: AtomicU64,
    sequence: AtomicU64,
}

impl Default for FakeStripeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStripeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            customers_created: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// All customer creation calls fail with the given message.
    pub fn fail_customer_setup(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_customer_setup = Some(message.to_string());
        self
    }

    /// Charges go through to the provider but come back declined.
    pub fn decline_charges(self, message: &str) -> Self {
        self.state.lock().unwrap().decline_charges = Some(message.to_string());
        self
    }

    /// Checkout session creation fails with the given message.
    pub fn fail_sessions(self, message: &str) -> Self {
        self.state.lock().unwrap().fail_sessions = Some(message.to_string());
        self
    }

    pub fn customers_created(&self) -> u64 {
        self.customers_created.load(Ordering::SeqCst)
    }

    pub fn charge_requests(&self) -> Vec<DirectChargeRequest> {
        self.state.lock().unwrap().charges.clone()
    }

    pub fn session_requests(&self) -> Vec<CheckoutSessionRequest> {
        self.state.lock().unwrap().sessions.clone()
    }

    /// Script what `retrieve_checkout_session` reports for a session id.
    /// Unscripted sessions come back expired, which is what the sweep sees
    /// for checkouts the member walked away from.
    pub fn set_session_outcome(&self, session_id: &str, status: CheckoutSessionStatus, paid: bool) {
        self.state
            .lock()
            .unwrap()
            .session_outcomes
            .insert(session_id.to_string(), (status, paid));
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{}_fake_{:06}", prefix, n)
    }
}

#[async_trait]
impl PaymentGateway for FakeStripeGateway {
    async fn create_customer(&self, email: &str) -> GatewayResult<GatewayCustomer> {
        if let Some(message) = self.state.lock().unwrap().fail_customer_setup.clone() {
            return Err(GatewayError::with_response(
                message.clone(),
                json!({"error": {"message": message}}),
            ));
        }
        self.customers_created.fetch_add(1, Ordering::SeqCst);
        let _ = email;
        Ok(GatewayCustomer {
            id: self.next_id("cus"),
        })
    }

    async fn attach_card(&self, _customer_id: &str, token: &str) -> GatewayResult<GatewayCard> {
        Ok(GatewayCard {
            id: format!("card_for_{}", token),
        })
    }

    async fn create_charge(&self, request: DirectChargeRequest) -> GatewayResult<GatewayCharge> {
        let declined = {
            let mut state = self.state.lock().unwrap();
            state.charges.push(request.clone());
            state.decline_charges.clone()
        };

        let id = self.next_id("ch");
        if let Some(message) = declined {
            // Stripe reports declines as an unpaid charge object, not as an
            // API error.
            return Ok(GatewayCharge {
                id: id.clone(),
                amount_cents: request.amount_cents,
                paid: false,
                description: Some(request.description),
                raw: json!({"id": id, "paid": false, "failure_message": message}),
            });
        }

        Ok(GatewayCharge {
            id: id.clone(),
            amount_cents: request.amount_cents,
            paid: true,
            description: Some(request.description),
            raw: json!({"id": id, "paid": true}),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> GatewayResult<GatewayCheckoutSession> {
        let failure = {
            let mut state = self.state.lock().unwrap();
            state.sessions.push(request.clone());
            state.fail_sessions.clone()
        };

        if let Some(message) = failure {
            return Err(GatewayError::with_response(
                message.clone(),
                json!({"error": {"message": message}}),
            ));
        }

        let id = self.next_id("cs");
        Ok(GatewayCheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.stripe.test/pay/{}", id)),
            status: CheckoutSessionStatus::Open,
            paid: false,
            raw: json!({"id": id, "status": "open"}),
        })
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> GatewayResult<GatewayCheckoutSession> {
        let (status, paid) = self
            .state
            .lock()
            .unwrap()
            .session_outcomes
            .get(session_id)
            .copied()
            .unwrap_or((CheckoutSessionStatus::Expired, false));

        Ok(GatewayCheckoutSession {
            id: session_id.to_string(),
            url: None,
            status,
            paid,
            raw: json!({"id": session_id, "paid": paid}),
        })
    }
}
