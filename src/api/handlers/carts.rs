use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::{Cart, CartItem},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenCartRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub membership_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub beneficiary_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub status: String,
    pub total_cents: i64,
    pub owed_cents: i64,
    pub items: Vec<CartItemView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemView {
    pub id: Uuid,
    pub display_name: String,
    pub beneficiary_name: String,
    pub price_cents: i64,
}

impl From<CartItem> for CartItemView {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id,
            display_name: item.display_name,
            beneficiary_name: item.beneficiary_name,
            price_cents: item.price_cents,
        }
    }
}

pub async fn open(
    State(state): State<AppState>,
    Json(request): Json<OpenCartRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let user = state
        .service_context
        .user_repo
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let cart = state.service_context.cart_service.open_cart(&user).await?;
    let view = cart_view(&state, cart).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<CartView>> {
    let cart = lookup_cart(&state, id).await?;
    Ok(Json(cart_view(&state, cart).await?))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let cart = lookup_cart(&state, id).await?;
    let user = state
        .service_context
        .user_repo
        .find_by_id(cart.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    state
        .service_context
        .cart_service
        .add_membership_item(&cart, &user, request.membership_id, &request.beneficiary_name)
        .await?;

    Ok(Json(cart_view(&state, cart).await?))
}

async fn lookup_cart(state: &AppState, id: Uuid) -> Result<Cart> {
    state
        .service_context
        .cart_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))
}

async fn cart_view(state: &AppState, cart: Cart) -> Result<CartView> {
    let (buyable, _charges, owed) = state.service_context.cart_service.amount_owed(&cart).await?;
    let items = match buyable {
        crate::domain::Buyable::Cart { items, .. } => items,
        _ => unreachable!("cart buyable"),
    };

    Ok(CartView {
        id: cart.id,
        status: crate::repository::cart_repository::cart_status_to_str(cart.status).to_string(),
        total_cents: items.iter().map(|i| i.price_cents).sum(),
        owed_cents: owed.max(0),
        items: items.into_iter().map(Into::into).collect(),
    })
}
