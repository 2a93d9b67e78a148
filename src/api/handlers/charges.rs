use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::handlers::{reservations::lookup_reservation, types::ChargeResult},
    api::state::AppState,
    domain::User,
    error::{AppError, Result},
    notifications::PaymentEvent,
    payments::{ChargeOutcome, MoneyCommands, PaymentAmountOptions},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DirectChargeBody {
    /// Card token from the payment form.
    pub token: String,
    /// Defaults to the full amount owed.
    #[validate(range(min = 1))]
    pub amount_cents: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CashChargeBody {
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    pub note: Option<String>,
}

/// Immediate card charge against a reservation. Failures come back as a 200
/// with `success: false` and the error list; the member resubmits.
#[utoipa::path(
    post,
    path = "/api/reservations/{id}/charges",
    request_body = DirectChargeBody,
    responses((status = 200, body = ChargeResult), (status = 404), (status = 422))
)]
pub async fn create_for_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DirectChargeBody>,
) -> Result<Json<ChargeResult>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let money = require_money(&state)?;

    let reservation = lookup_reservation(&state, id).await?;
    let user = charge_owner(&state, reservation.user_id).await?;
    let (buyable, _charges, owed) = state
        .service_context
        .reservation_service
        .amount_owed(&reservation)
        .await?;

    // Only the amounts the payment form offered are accepted, so a stale or
    // tampered form cannot pick an arbitrary installment.
    if let Some(amount) = body.amount_cents {
        let options = PaymentAmountOptions::new(
            state.settings.payments.min_payment_cents,
            state.settings.payments.payment_step_cents,
        );
        if !options.amounts(owed.max(0)).contains(&amount) {
            return Err(AppError::Validation(
                "Amount must be one of the provided payment amounts".to_string(),
            ));
        }
    }

    let outcome = money
        .charge_customer
        .call(&buyable, &user, &body.token, owed, body.amount_cents)
        .await?;

    notify_direct_charge(&state, &user, &outcome);
    Ok(Json(to_result(outcome)))
}

/// Immediate card charge against a cart; the cart closes when the full total
/// is covered.
#[utoipa::path(
    post,
    path = "/api/carts/{id}/charges",
    request_body = DirectChargeBody,
    responses((status = 200, body = ChargeResult), (status = 404), (status = 422))
)]
pub async fn create_for_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DirectChargeBody>,
) -> Result<Json<ChargeResult>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let money = require_money(&state)?;

    let cart = state
        .service_context
        .cart_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))?;
    let user = charge_owner(&state, cart.user_id).await?;
    let (buyable, _charges, owed) = state.service_context.cart_service.amount_owed(&cart).await?;

    let outcome = money
        .charge_customer
        .call(&buyable, &user, &body.token, owed, body.amount_cents)
        .await?;

    notify_direct_charge(&state, &user, &outcome);
    Ok(Json(to_result(outcome)))
}

/// Staff record of an out-of-band payment (cash box, cleared cheque).
#[utoipa::path(
    post,
    path = "/api/reservations/{id}/cash-charges",
    request_body = CashChargeBody,
    responses((status = 200, body = ChargeResult), (status = 404))
)]
pub async fn create_cash(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CashChargeBody>,
) -> Result<Json<ChargeResult>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reservation = lookup_reservation(&state, id).await?;
    let user = charge_owner(&state, reservation.user_id).await?;
    let (buyable, _charges, _owed) = state
        .service_context
        .reservation_service
        .amount_owed(&reservation)
        .await?;

    let outcome = state
        .cash
        .call(&buyable, &user, body.amount_cents, body.note.as_deref())
        .await?;

    Ok(Json(to_result(outcome)))
}

fn require_money(state: &AppState) -> Result<&MoneyCommands> {
    state
        .money
        .as_deref()
        .ok_or_else(|| AppError::Payment("Stripe payments are not configured".to_string()))
}

async fn charge_owner(state: &AppState, user_id: Uuid) -> Result<User> {
    state
        .service_context
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Direct charges notify from the request path; the checkout flow notifies
/// from its webhook handler instead.
fn notify_direct_charge(state: &AppState, user: &User, outcome: &ChargeOutcome) {
    if !outcome.success {
        return;
    }
    let event = if outcome.fully_paid {
        PaymentEvent::FullyPaid {
            user: user.clone(),
            charge: outcome.charge.clone(),
        }
    } else {
        PaymentEvent::InstallmentReceived {
            user: user.clone(),
            charge: outcome.charge.clone(),
            outstanding_cents: outcome.outstanding_cents,
        }
    };
    state.service_context.notifier_manager.dispatch(event);
}

fn to_result(outcome: ChargeOutcome) -> ChargeResult {
    ChargeResult {
        success: outcome.success,
        errors: outcome.errors,
        charge: outcome.charge.into(),
        fully_paid: outcome.fully_paid,
        outstanding_cents: outcome.outstanding_cents,
    }
}
