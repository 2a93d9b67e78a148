use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error returned by the payment provider. Carries the raw response body
/// when one was received so the owning command can store it on the Charge
/// for audit.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    pub response: Option<Value>,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(message: impl Into<String>, response: Value) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Clone)]
pub struct GatewayCustomer {
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct GatewayCard {
    pub id: String,
}

/// Result of a direct (synchronous) charge submission.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    pub id: String,
    pub amount_cents: i64,
    pub paid: bool,
    pub description: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutSessionStatus {
    Open,
    Complete,
    Expired,
}

/// A hosted checkout session as the provider reports it, either freshly
/// created or re-fetched by the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct GatewayCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub status: CheckoutSessionStatus,
    pub paid: bool,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct DirectChargeRequest {
    pub customer_id: String,
    pub card_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub customer_id: String,
    pub line_item_name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Everything the money commands need from Stripe. The production
/// implementation is `StripeClient`; tests use `FakeStripeGateway` from the
/// `test-utils` feature.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, email: &str) -> GatewayResult<GatewayCustomer>;
    async fn attach_card(&self, customer_id: &str, token: &str) -> GatewayResult<GatewayCard>;
    async fn create_charge(&self, request: DirectChargeRequest) -> GatewayResult<GatewayCharge>;
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> GatewayResult<GatewayCheckoutSession>;
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> GatewayResult<GatewayCheckoutSession>;
}
