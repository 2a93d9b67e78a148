pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Settings,
    payments::{MoneyCommands, RecordCashCharge},
    service::ServiceContext,
};
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::reservations::list_memberships,
        handlers::reservations::create,
        handlers::reservations::get,
        handlers::reservations::charges,
        handlers::charges::create_for_reservation,
        handlers::charges::create_for_cart,
        handlers::charges::create_cash,
        handlers::checkout::start,
    ),
    components(schemas(
        handlers::types::MembershipView,
        handlers::types::ReservationView,
        handlers::types::ChargeView,
        handlers::types::ChargeResult,
        handlers::reservations::CreateReservationRequest,
        handlers::charges::DirectChargeBody,
        handlers::charges::CashChargeBody,
        handlers::checkout::StartCheckoutBody,
        handlers::checkout::StartCheckoutResponse,
    ))
)]
struct ApiDoc;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    money: Option<Arc<MoneyCommands>>,
    cash: Arc<RecordCashCharge>,
    settings: Arc<Settings>,
) -> Router {
    let app_state = AppState::new(service_context, money, cash, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // API routes
        .nest("/api", api_routes())
        // OpenAPI docs
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        // Add state to the router
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/memberships", get(handlers::reservations::list_memberships))
        .route("/reservations", post(handlers::reservations::create))
        .route("/reservations/:id", get(handlers::reservations::get))
        .route(
            "/reservations/:id/charges",
            get(handlers::reservations::charges).post(handlers::charges::create_for_reservation),
        )
        .route(
            "/reservations/:id/cash-charges",
            post(handlers::charges::create_cash),
        )
        .route(
            "/reservations/:id/checkout",
            post(handlers::checkout::start),
        )
        .route(
            "/reservations/:id/disable",
            post(handlers::reservations::disable),
        )
        .route(
            "/reservations/:id/enable",
            post(handlers::reservations::enable),
        )
        .route("/carts", post(handlers::carts::open))
        .route("/carts/:id", get(handlers::carts::get))
        .route("/carts/:id/items", post(handlers::carts::add_item))
        .route("/carts/:id/charges", post(handlers::charges::create_for_cart))
        // Stripe webhooks carry their own signature; no session auth
        .route("/payments/webhook/stripe", post(handlers::webhooks::receive_stripe))
}
