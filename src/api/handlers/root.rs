use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Conclave API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Convention membership registration and payments",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "api": "/api",
            "docs": "/api/docs"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
