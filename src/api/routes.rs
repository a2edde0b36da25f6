//! Route configuration.

use crate::api::{controls, handlers};
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post, put};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Symbols and prices
        .route("/api/v1/symbols", get(handlers::list_symbols))
        .route("/api/v1/prices", get(handlers::get_prices))
        .route("/api/v1/prices/{symbol}", get(handlers::get_price))
        .route(
            "/api/v1/prices/{symbol}/history",
            get(handlers::get_price_history),
        )
        .route("/api/v1/prices/{symbol}/quote", get(handlers::get_quote))
        // Trades
        .route("/api/v1/trades/buy", post(handlers::buy))
        .route("/api/v1/trades/sell", post(handlers::sell))
        // Portfolio
        .route(
            "/api/v1/users/{user_id}/portfolio",
            get(handlers::get_portfolio),
        )
        .route(
            "/api/v1/users/{user_id}/account",
            get(handlers::get_account),
        )
        // Controls
        .route("/api/v1/controls", get(controls::get_controls))
        .route("/api/v1/controls/{symbol}", put(controls::update_control))
        .with_state(state)
}
