use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::handlers::reservations::lookup_reservation,
    api::state::AppState,
    domain::Buyable,
    error::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartCheckoutBody {
    /// Defaults to the full amount owed.
    #[validate(range(min = 1))]
    pub amount_cents: Option<i64>,
    /// Site-selection fee rather than a membership payment.
    #[serde(default)]
    pub site: bool,
    #[validate(url)]
    pub success_url: String,
    #[validate(url)]
    pub cancel_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartCheckoutResponse {
    pub started: bool,
    pub checkout_url: Option<String>,
    pub errors: Vec<String>,
}

/// Creates a hosted checkout session and returns the redirect URL. The
/// charge stays pending until Stripe's webhook reports the outcome.
#[utoipa::path(
    post,
    path = "/api/reservations/{id}/checkout",
    request_body = StartCheckoutBody,
    responses((status = 200, body = StartCheckoutResponse), (status = 404), (status = 422))
)]
pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<StartCheckoutBody>,
) -> Result<Json<StartCheckoutResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let money = state
        .money
        .as_deref()
        .ok_or_else(|| AppError::Payment("Stripe payments are not configured".to_string()))?;

    let reservation = lookup_reservation(&state, id).await?;
    let user = state
        .service_context
        .user_repo
        .find_by_id(reservation.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let (buyable, _charges, owed) = state
        .service_context
        .reservation_service
        .amount_owed(&reservation)
        .await?;
    let membership = match &buyable {
        Buyable::Reservation { membership, .. } => membership.clone(),
        _ => unreachable!("reservation buyable"),
    };

    // A site-selection fee is owed on top of the membership price, so it
    // does not validate against the membership balance.
    let (amount_owed, charge_amount) = if body.site {
        let amount = body
            .amount_cents
            .ok_or_else(|| AppError::Validation("Site selection amount is required".to_string()))?;
        (amount, Some(amount))
    } else {
        (owed, body.amount_cents)
    };

    let start = money
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            amount_owed,
            charge_amount,
            body.site,
            &body.success_url,
            &body.cancel_url,
        )
        .await?;

    Ok(Json(StartCheckoutResponse {
        started: start.started(),
        checkout_url: start.checkout_url,
        errors: start.errors,
    }))
}
