//! Stripe webhook receiver. Stripe cannot present a session cookie or CSRF
//! token, so authenticity comes from the signed `Stripe-Signature` header
//! verified against the endpoint secret.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use stripe::{EventObject, EventType, Webhook};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
};

pub async fn receive_stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode> {
    let secret = state
        .settings
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| {
            AppError::Internal("Stripe webhook secret is not configured".to_string())
        })?;

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    let event = Webhook::construct_event(&body, signature, secret)
        .map_err(|_| AppError::BadRequest("Invalid webhook signature".to_string()))?;

    // Stripe retries deliveries; anything already recorded is acknowledged
    // without reprocessing so side effects cannot double-apply.
    let fresh = state
        .service_context
        .stripe_event_repo
        .record(&event.id.to_string(), &format!("{:?}", event.type_))
        .await?;
    if !fresh {
        tracing::info!(event_id = %event.id, "Duplicate webhook delivery, skipping");
        return Ok(StatusCode::OK);
    }

    match event.type_ {
        EventType::CheckoutSessionCompleted | EventType::CheckoutSessionAsyncPaymentSucceeded => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                checkout_session_completed(&state, session).await?;
            }
        }
        EventType::CheckoutSessionExpired | EventType::CheckoutSessionAsyncPaymentFailed => {
            if let EventObject::CheckoutSession(session) = event.data.object {
                checkout_session_failed(&state, session).await?;
            }
        }
        other => {
            tracing::debug!("Unhandled webhook event type: {:?}", other);
        }
    }

    Ok(StatusCode::OK)
}

async fn checkout_session_completed(
    state: &AppState,
    session: stripe::CheckoutSession,
) -> Result<()> {
    let money = state
        .money
        .as_deref()
        .ok_or_else(|| AppError::Internal("Stripe payments are not configured".to_string()))?;

    let session_id = session.id.to_string();
    let charge = state
        .service_context
        .charge_repo
        .find_by_provider_ref(&session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No charge for checkout session {}", session_id))
        })?;

    let payload = serde_json::to_value(&session)
        .map_err(|e| AppError::Internal(format!("Unserializable session payload: {}", e)))?;

    money.checkout_succeeded.call(&charge, payload).await?;
    Ok(())
}

async fn checkout_session_failed(
    state: &AppState,
    session: stripe::CheckoutSession,
) -> Result<()> {
    let money = state
        .money
        .as_deref()
        .ok_or_else(|| AppError::Internal("Stripe payments are not configured".to_string()))?;

    let session_id = session.id.to_string();
    let charge = state
        .service_context
        .charge_repo
        .find_by_provider_ref(&session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No charge for checkout session {}", session_id))
        })?;

    let payload = serde_json::to_value(&session)
        .map_err(|e| AppError::Internal(format!("Unserializable session payload: {}", e)))?;

    money.checkout_failed.call(&charge, payload).await?;
    Ok(())
}
