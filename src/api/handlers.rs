//! API request handlers for prices, trades and portfolios.

use crate::error::{ApiError, ErrorResponse, MarketError};
use crate::ledger::{Account, AccountService, Portfolio, TradeSettlement, UserId, validate_user};
use crate::market::{
    ExecutionQuote, PriceHistory, PriceSnapshot, TradeSide, parse_hours, parse_timestamp,
};
use crate::models::{
    HealthResponse, HistoryQuery, PricesQuery, PricesResponse, QuoteQuery, SymbolsListResponse,
    TimeQuery, TradeRequest,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// Window used when the history request names none.
pub const DEFAULT_HISTORY_HOURS: i64 = 168;

/// Parses the optional `at` query parameter.
fn parse_at(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, MarketError> {
    raw.map(parse_timestamp).transpose()
}

/// Parses a user id taken from the path. Negative and non-numeric ids are invalid.
fn parse_user_id(raw: &str) -> Result<UserId, MarketError> {
    let user_id = raw
        .trim()
        .parse::<UserId>()
        .map_err(|_| MarketError::InvalidUser(raw.to_string()))?;
    validate_user(user_id)
}

/// Parses a quantity taken from the query string.
fn parse_quantity(raw: &str) -> Result<f64, MarketError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| MarketError::InvalidQuantity(raw.to_string()))
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Symbols and Prices
// ============================================================================

/// List supported commodities.
#[utoipa::path(
    get,
    path = "/api/v1/symbols",
    responses(
        (status = 200, description = "Supported commodities", body = SymbolsListResponse)
    ),
    tag = "Prices"
)]
pub async fn list_symbols(State(state): State<Arc<AppState>>) -> Json<SymbolsListResponse> {
    Json(SymbolsListResponse {
        symbols: state.service.list_symbols(),
    })
}

/// Get prices for several commodities with a one-unit quote each.
#[utoipa::path(
    get,
    path = "/api/v1/prices",
    params(
        ("symbols" = Option<String>, Query, description = "Comma-separated symbols, default all"),
        ("at" = Option<String>, Query, description = "RFC 3339 time or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Current prices", body = PricesResponse),
        (status = 400, description = "Invalid symbol or time", body = ErrorResponse)
    ),
    tag = "Prices"
)]
pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<PricesResponse>, ApiError> {
    let at = parse_at(query.at.as_deref())?;
    let symbols = query.symbol_list();
    let prices = state.service.get_current_prices(symbols.as_deref(), at)?;
    Ok(Json(PricesResponse { prices }))
}

/// Get the price of one commodity.
#[utoipa::path(
    get,
    path = "/api/v1/prices/{symbol}",
    params(
        ("symbol" = String, Path, description = "Commodity symbol"),
        ("at" = Option<String>, Query, description = "RFC 3339 time or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Price snapshot", body = PriceSnapshot),
        (status = 400, description = "Invalid symbol or time", body = ErrorResponse)
    ),
    tag = "Prices"
)]
pub async fn get_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<TimeQuery>,
) -> Result<Json<PriceSnapshot>, ApiError> {
    let at = parse_at(query.at.as_deref())?;
    Ok(Json(state.service.get_current_price(&symbol, at)?))
}

/// Get hourly price history of one commodity.
#[utoipa::path(
    get,
    path = "/api/v1/prices/{symbol}/history",
    params(
        ("symbol" = String, Path, description = "Commodity symbol"),
        ("hours" = Option<String>, Query, description = "Window in hours, 12 to 720 (default 168)"),
        ("at" = Option<String>, Query, description = "RFC 3339 time or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Price history, oldest first", body = PriceHistory),
        (status = 400, description = "Invalid symbol, window or time", body = ErrorResponse)
    ),
    tag = "Prices"
)]
pub async fn get_price_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PriceHistory>, ApiError> {
    let hours = match query.hours.as_deref() {
        Some(raw) => parse_hours(raw)?,
        None => DEFAULT_HISTORY_HOURS,
    };
    let at = parse_at(query.at.as_deref())?;
    Ok(Json(state.service.get_price_history(&symbol, hours, at)?))
}

/// Quote an order without executing it.
#[utoipa::path(
    get,
    path = "/api/v1/prices/{symbol}/quote",
    params(
        ("symbol" = String, Path, description = "Commodity symbol"),
        ("side" = String, Query, description = "buy or sell"),
        ("quantity" = String, Query, description = "Order quantity"),
        ("at" = Option<String>, Query, description = "RFC 3339 time or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Execution quote", body = ExecutionQuote),
        (status = 400, description = "Invalid symbol, side, quantity or time", body = ErrorResponse)
    ),
    tag = "Prices"
)]
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    query: Result<Query<QuoteQuery>, QueryRejection>,
) -> Result<Json<ExecutionQuote>, ApiError> {
    let Query(query) = query?;
    let side: TradeSide = query.side.parse()?;
    let quantity = parse_quantity(&query.quantity)?;
    let at = parse_at(query.at.as_deref())?;
    Ok(Json(state.service.get_quote(&symbol, side, quantity, at)?))
}

// ============================================================================
// Trades
// ============================================================================

/// Buy a commodity at the current hour's price.
#[utoipa::path(
    post,
    path = "/api/v1/trades/buy",
    request_body = TradeRequest,
    responses(
        (status = 200, description = "Trade settled", body = TradeSettlement),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Trading disabled", body = ErrorResponse),
        (status = 409, description = "Trade rejected", body = ErrorResponse),
        (status = 502, description = "Account service failure", body = ErrorResponse),
        (status = 503, description = "Holdings store failure", body = ErrorResponse)
    ),
    tag = "Trades"
)]
pub async fn buy(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<TradeSettlement>, ApiError> {
    let Json(body) = body?;
    let settlement = state
        .service
        .buy(body.user_id, &body.symbol, body.quantity)
        .await?;
    Ok(Json(settlement))
}

/// Sell a commodity at the current hour's price.
#[utoipa::path(
    post,
    path = "/api/v1/trades/sell",
    request_body = TradeRequest,
    responses(
        (status = 200, description = "Trade settled", body = TradeSettlement),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Trading disabled", body = ErrorResponse),
        (status = 409, description = "Trade rejected", body = ErrorResponse),
        (status = 502, description = "Account service failure", body = ErrorResponse),
        (status = 503, description = "Holdings store failure", body = ErrorResponse)
    ),
    tag = "Trades"
)]
pub async fn sell(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<TradeSettlement>, ApiError> {
    let Json(body) = body?;
    let settlement = state
        .service
        .sell(body.user_id, &body.symbol, body.quantity)
        .await?;
    Ok(Json(settlement))
}

// ============================================================================
// Portfolio
// ============================================================================

/// Get a user's holdings valued at the current hour.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/portfolio",
    params(
        ("user_id" = u64, Path, description = "User id"),
        ("at" = Option<String>, Query, description = "RFC 3339 time or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Portfolio", body = Portfolio),
        (status = 400, description = "Invalid user or time", body = ErrorResponse),
        (status = 503, description = "Holdings store failure", body = ErrorResponse)
    ),
    tag = "Portfolio"
)]
pub async fn get_portfolio(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<TimeQuery>,
) -> Result<Json<Portfolio>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let at = parse_at(query.at.as_deref())?;
    Ok(Json(state.service.get_portfolio(user_id, at).await?))
}

/// Get a user's cash account from the built-in account service.
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/account",
    params(
        ("user_id" = u64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Cash account", body = Account),
        (status = 400, description = "Invalid user", body = ErrorResponse),
        (status = 502, description = "Account service failure", body = ErrorResponse)
    ),
    tag = "Portfolio"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let account = state
        .accounts
        .get_account(user_id)
        .await
        .map_err(MarketError::from)?;
    Ok(Json(account))
}
