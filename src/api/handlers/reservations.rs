use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::handlers::types::{reservation_state_label, ChargeView, MembershipView, ReservationView},
    api::state::AppState,
    domain::Reservation,
    error::{AppError, Result},
    payments::PaymentAmountOptions,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    pub user_id: Uuid,
    pub membership_id: Uuid,
}

/// Membership price list, as offered to the registration form.
#[utoipa::path(
    get,
    path = "/api/memberships",
    responses((status = 200, body = Vec<MembershipView>))
)]
pub async fn list_memberships(State(state): State<AppState>) -> Result<Json<Vec<MembershipView>>> {
    let memberships = state
        .service_context
        .membership_repo
        .list_active(chrono::Utc::now())
        .await?;
    Ok(Json(memberships.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationRequest,
    responses((status = 201, body = ReservationView))
)]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationView>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .service_context
        .user_repo
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let reservation = state
        .service_context
        .reservation_service
        .claim_membership(&user, request.membership_id)
        .await?;

    let view = reservation_view(&state, reservation).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    responses((status = 200, body = ReservationView), (status = 404))
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>> {
    let reservation = lookup_reservation(&state, id).await?;
    Ok(Json(reservation_view(&state, reservation).await?))
}

/// Payment history for a reservation: successful and failed attempts, with
/// their descriptions.
#[utoipa::path(
    get,
    path = "/api/reservations/{id}/charges",
    responses((status = 200, body = Vec<ChargeView>), (status = 404))
)]
pub async fn charges(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChargeView>>> {
    let reservation = lookup_reservation(&state, id).await?;
    let charges = state
        .service_context
        .charge_repo
        .list_for_buyable(&crate::domain::BuyableRef::reservation(reservation.id))
        .await?;
    Ok(Json(charges.into_iter().map(Into::into).collect()))
}

pub async fn disable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>> {
    let reservation = state
        .service_context
        .reservation_service
        .disable(id)
        .await?;
    Ok(Json(reservation_view(&state, reservation).await?))
}

pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationView>> {
    let reservation = state.service_context.reservation_service.enable(id).await?;
    Ok(Json(reservation_view(&state, reservation).await?))
}

pub(crate) async fn lookup_reservation(state: &AppState, id: Uuid) -> Result<Reservation> {
    state
        .service_context
        .reservation_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
}

pub(crate) async fn reservation_view(
    state: &AppState,
    reservation: Reservation,
) -> Result<ReservationView> {
    let (buyable, _charges, owed) = state
        .service_context
        .reservation_service
        .amount_owed(&reservation)
        .await?;

    let membership_name = match &buyable {
        crate::domain::Buyable::Reservation { membership, .. } => membership.name.clone(),
        _ => unreachable!("reservation buyable"),
    };

    let options = PaymentAmountOptions::new(
        state.settings.payments.min_payment_cents,
        state.settings.payments.payment_step_cents,
    );

    Ok(ReservationView {
        id: reservation.id,
        membership_number: reservation.membership_number,
        membership: membership_name,
        state: reservation_state_label(&reservation),
        price_cents: buyable.price_cents(),
        owed_cents: owed.max(0),
        payment_options: options.amounts(owed.max(0)),
    })
}
