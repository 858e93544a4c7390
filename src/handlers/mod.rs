mod checkout;
mod webhook;

pub use checkout::*;
pub use webhook::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/checkout", post(initiate_checkout))
        .route("/checkout/status", get(checkout_status))
        // Browser lands here after the hosted payment page
        .route("/checkout/finish", get(checkout_finish))
        .route("/webhook/midtrans", post(handle_midtrans_webhook))
}
