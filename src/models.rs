//! Request and response models for the REST API.

use crate::controls::SymbolControl;
use crate::ledger::UserId;
use crate::market::{Commodity, HourBucket};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// A supported commodity with its listing details and trading status.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SymbolInfo {
    /// Commodity symbol.
    pub symbol: Commodity,
    /// Human-readable name.
    pub name: String,
    /// Unit the price is quoted in.
    pub unit: String,
    /// Price the market oscillates around.
    pub base_price: f64,
    /// Lowest possible price.
    pub floor_price: f64,
    /// Whether trading is enabled.
    pub trading_enabled: bool,
    /// Largest accepted order, if limited.
    pub max_order_quantity: Option<f64>,
}

/// Response for listing symbols.
#[derive(Debug, Serialize, ToSchema)]
pub struct SymbolsListResponse {
    /// Supported commodities.
    pub symbols: Vec<SymbolInfo>,
}

/// Current price of a commodity with a one-unit quote on both sides.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarketPrice {
    /// Commodity symbol.
    pub symbol: Commodity,
    /// Hour bucket index.
    #[schema(value_type = i64)]
    pub hour_bucket: HourBucket,
    /// Start of the hour, ISO-8601 UTC.
    pub hour_start_utc: String,
    /// Oracle mid price.
    pub price: f64,
    /// Price paid when buying one unit.
    pub buy_price: f64,
    /// Price received when selling one unit.
    pub sell_price: f64,
    /// Full spread in percent.
    pub spread_pct: f64,
    /// Trailing realized volatility in percent.
    pub volatility_pct: f64,
}

/// Response for the multi-symbol price endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct PricesResponse {
    /// One entry per requested symbol, in request order.
    pub prices: Vec<MarketPrice>,
}

/// Optional evaluation time shared by the read endpoints.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TimeQuery {
    /// RFC 3339 timestamp or epoch milliseconds. Defaults to now.
    #[serde(default)]
    pub at: Option<String>,
}

/// Query parameters for the multi-symbol price endpoint.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PricesQuery {
    /// Comma-separated symbols. Defaults to every supported symbol.
    #[serde(default)]
    pub symbols: Option<String>,
    /// RFC 3339 timestamp or epoch milliseconds. Defaults to now.
    #[serde(default)]
    pub at: Option<String>,
}

impl PricesQuery {
    /// Requested symbols, or `None` when the parameter is absent or blank.
    #[must_use]
    pub fn symbol_list(&self) -> Option<Vec<String>> {
        let symbols: Vec<String> = self
            .symbols
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if symbols.is_empty() { None } else { Some(symbols) }
    }
}

/// Query parameters for the history endpoint.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct HistoryQuery {
    /// Window size in hours, 12 to 720. Defaults to 168.
    #[serde(default)]
    pub hours: Option<String>,
    /// RFC 3339 timestamp or epoch milliseconds. Defaults to now.
    #[serde(default)]
    pub at: Option<String>,
}

/// Query parameters for the quote endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteQuery {
    /// `buy` or `sell`.
    pub side: String,
    /// Order quantity, parsed by the handler so bad input gets a JSON error.
    pub quantity: String,
    /// RFC 3339 timestamp or epoch milliseconds. Defaults to now.
    #[serde(default)]
    pub at: Option<String>,
}

/// Request to buy or sell a commodity.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TradeRequest {
    /// Trading user.
    pub user_id: UserId,
    /// Commodity symbol (case-insensitive).
    pub symbol: String,
    /// Quantity, at most 4 decimals.
    pub quantity: f64,
}

/// Trading control of one symbol.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ControlEntry {
    /// Commodity symbol.
    pub symbol: Commodity,
    /// Whether trading is enabled.
    pub enabled: bool,
    /// Largest accepted order, if limited.
    pub max_order_quantity: Option<f64>,
}

impl ControlEntry {
    /// Pairs a symbol with its control.
    #[must_use]
    pub fn new(symbol: Commodity, control: SymbolControl) -> Self {
        Self {
            symbol,
            enabled: control.enabled,
            max_order_quantity: control.max_order_quantity,
        }
    }
}

/// Response listing every trading control.
#[derive(Debug, Serialize, ToSchema)]
pub struct ControlsResponse {
    /// One entry per supported symbol.
    pub controls: Vec<ControlEntry>,
}

/// Replacement control for one symbol.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateControlRequest {
    /// Whether trading is enabled.
    pub enabled: bool,
    /// Largest accepted order; omit for no limit.
    #[serde(default)]
    pub max_order_quantity: Option<f64>,
}
