use stripe::{
    CheckoutSession, CheckoutSessionId, CheckoutSessionMode, CheckoutSessionPaymentStatus,
    CheckoutSessionStatus as StripeCheckoutSessionStatus, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionPaymentMethodOptions,
    CreateCheckoutSessionPaymentMethodOptionsWechatPay,
    CreateCheckoutSessionPaymentMethodOptionsWechatPayClient,
    CreateCheckoutSessionPaymentMethodTypes, CreateCharge, CreateCustomer, Currency, Customer,
    PaymentSource, PaymentSourceParams, StripeError,
};

use async_trait::async_trait;

use crate::payments::gateway::{
    CheckoutSessionRequest, CheckoutSessionStatus, DirectChargeRequest, GatewayCard,
    GatewayCharge, GatewayCheckoutSession, GatewayCustomer, GatewayError, GatewayResult,
    PaymentGateway,
};

pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(api_key),
        }
    }
}

fn parse_currency(code: &str) -> GatewayResult<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_lowercase()))
        .map_err(|_| GatewayError::new(format!("Unknown currency code: {}", code)))
}

fn gateway_error(err: StripeError) -> GatewayError {
    // Keep whatever the provider told us; it ends up on the Charge's
    // stripe_response for later staff review.
    let response = match &err {
        StripeError::Stripe(request_error) => Some(serde_json::json!({
            "status": request_error.http_status,
            "message": request_error.message,
            "code": request_error.code.as_ref().map(|c| c.to_string()),
            "decline_code": request_error.decline_code,
        })),
        _ => None,
    };
    GatewayError {
        message: err.to_string(),
        response,
    }
}

fn map_session(session: CheckoutSession) -> GatewayCheckoutSession {
    let status = match session.status {
        Some(StripeCheckoutSessionStatus::Expired) => CheckoutSessionStatus::Expired,
        Some(StripeCheckoutSessionStatus::Complete) => CheckoutSessionStatus::Complete,
        _ => CheckoutSessionStatus::Open,
    };
    let paid = matches!(
        session.payment_status,
        CheckoutSessionPaymentStatus::Paid | CheckoutSessionPaymentStatus::NoPaymentRequired
    );
    let raw = serde_json::to_value(&session).unwrap_or_default();

    GatewayCheckoutSession {
        id: session.id.to_string(),
        url: session.url,
        status,
        paid,
        raw,
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, email: &str) -> GatewayResult<GatewayCustomer> {
        let mut params = CreateCustomer::new();
        params.email = Some(email);

        let customer = Customer::create(&self.client, params)
            .await
            .map_err(gateway_error)?;

        Ok(GatewayCustomer {
            id: customer.id.to_string(),
        })
    }

    async fn attach_card(&self, customer_id: &str, token: &str) -> GatewayResult<GatewayCard> {
        let customer_id = customer_id
            .parse()
            .map_err(|_| GatewayError::new(format!("Invalid customer id: {}", customer_id)))?;
        let token_id = token
            .parse()
            .map_err(|_| GatewayError::new(format!("Invalid card token: {}", token)))?;

        // A customer's first attached source becomes their default source,
        // which create_charge relies on.
        let source = Customer::attach_source(
            &self.client,
            &customer_id,
            PaymentSourceParams::Token(token_id),
        )
        .await
        .map_err(gateway_error)?;

        match source {
            PaymentSource::Card(card) => Ok(GatewayCard {
                id: card.id.to_string(),
            }),
            other => Err(GatewayError {
                message: "Token did not resolve to a card".to_string(),
                response: serde_json::to_value(&other).ok(),
            }),
        }
    }

    async fn create_charge(&self, request: DirectChargeRequest) -> GatewayResult<GatewayCharge> {
        let customer_id = request
            .customer_id
            .parse()
            .map_err(|_| GatewayError::new(format!("Invalid customer id: {}", request.customer_id)))?;

        // The card attached in attach_card is the customer's default source,
        // so the charge is bound to the customer rather than a raw token.
        let mut params = CreateCharge::new();
        params.amount = Some(request.amount_cents);
        params.currency = Some(parse_currency(&request.currency)?);
        params.customer = Some(customer_id);
        params.description = Some(&request.description);

        let charge = stripe::Charge::create(&self.client, params)
            .await
            .map_err(gateway_error)?;

        let raw = serde_json::to_value(&charge).unwrap_or_default();
        Ok(GatewayCharge {
            id: charge.id.to_string(),
            amount_cents: charge.amount,
            paid: charge.paid,
            description: charge.description,
            raw,
        })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> GatewayResult<GatewayCheckoutSession> {
        let currency = parse_currency(&request.currency)?;
        let customer_id = request
            .customer_id
            .parse()
            .map_err(|_| GatewayError::new(format!("Invalid customer id: {}", request.customer_id)))?;

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.customer = Some(customer_id);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);

        // One line item with inline price data; no pre-registered Stripe
        // product catalog to keep in sync.
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price_data: Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                currency,
                unit_amount: Some(request.amount_cents),
                product_data: Some(
                    stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                        name: request.line_item_name.clone(),
                        ..Default::default()
                    },
                ),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }]);

        // Card everywhere, plus WeChat Pay for members paying from regions
        // where cards are uncommon.
        params.payment_method_types = Some(vec![
            CreateCheckoutSessionPaymentMethodTypes::Card,
            CreateCheckoutSessionPaymentMethodTypes::WechatPay,
        ]);
        params.payment_method_options = Some(CreateCheckoutSessionPaymentMethodOptions {
            wechat_pay: Some(CreateCheckoutSessionPaymentMethodOptionsWechatPay {
                client: CreateCheckoutSessionPaymentMethodOptionsWechatPayClient::Web,
                ..Default::default()
            }),
            ..Default::default()
        });

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(gateway_error)?;

        Ok(map_session(session))
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> GatewayResult<GatewayCheckoutSession> {
        let id: CheckoutSessionId = session_id
            .parse()
            .map_err(|_| GatewayError::new(format!("Invalid checkout session id: {}", session_id)))?;

        let session = CheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(gateway_error)?;

        Ok(map_session(session))
    }
}
