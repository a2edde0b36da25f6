//! Execution quotes: spread and liquidity impact around the oracle mid price.

use crate::error::MarketError;
use crate::market::oracle::{HourBucket, price_for_bucket, round_to};
use crate::market::symbols::Commodity;
use crate::market::volatility::volatility_ratio;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use utoipa::ToSchema;

/// Lowest price a sell quote can reach.
const MIN_SELL_PRICE: f64 = 0.0001;

/// Trade direction from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// User buys from the market.
    Buy,
    /// User sells to the market.
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeSide {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(MarketError::InvalidSide(other.to_string())),
        }
    }
}

/// Prices at which a given order would fill in a given hour.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExecutionQuote {
    /// Commodity symbol.
    pub symbol: Commodity,
    /// Side the execution price refers to.
    pub side: TradeSide,
    /// Quantity the impact was computed for.
    pub quantity: f64,
    /// Hour bucket index.
    #[schema(value_type = i64)]
    pub hour_bucket: HourBucket,
    /// Start of the hour, ISO-8601 UTC.
    pub hour_start_utc: String,
    /// Oracle mid price.
    pub mid_price: f64,
    /// Price paid when buying.
    pub buy_price: f64,
    /// Price received when selling.
    pub sell_price: f64,
    /// Full spread in percent.
    pub spread_pct: f64,
    /// Liquidity impact in percent, applied on each side.
    pub liquidity_impact_pct: f64,
    /// Trailing realized volatility in percent.
    pub volatility_pct: f64,
    /// `buy_price` or `sell_price`, depending on `side`.
    pub execution_price: f64,
}

/// Spread and impact parameters. Fields left out of a config section keep
/// their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuoteModel {
    /// Spread charged at zero volatility (fraction of mid).
    pub base_spread: f64,
    /// Extra spread per unit of volatility ratio.
    pub volatility_spread_factor: f64,
    /// Upper bound on the full spread.
    pub max_spread: f64,
    /// Impact per unit of `ln(1 + notional / impact_notional_scale)`.
    pub impact_scale: f64,
    /// Notional size at which impact starts to matter.
    pub impact_notional_scale: f64,
    /// Upper bound on impact.
    pub max_impact: f64,
}

impl Default for QuoteModel {
    fn default() -> Self {
        Self {
            base_spread: 0.0035,
            volatility_spread_factor: 1.8,
            max_spread: 0.03,
            impact_scale: 0.0012,
            impact_notional_scale: 500.0,
            max_impact: 0.04,
        }
    }
}

impl QuoteModel {
    /// Full spread for a volatility ratio. Never narrower for higher volatility.
    #[must_use]
    pub fn spread(&self, volatility: f64) -> f64 {
        (self.base_spread + self.volatility_spread_factor * volatility.max(0.0))
            .min(self.max_spread)
    }

    /// Impact for a notional amount. Never smaller for larger notionals.
    #[must_use]
    pub fn impact(&self, notional: f64) -> f64 {
        (self.impact_scale * (notional.max(0.0) / self.impact_notional_scale).ln_1p())
            .min(self.max_impact)
    }

    /// Quotes an order for the hour containing `at`.
    ///
    /// # Errors
    /// Returns `InvalidQuantity` unless `quantity` is finite and positive.
    pub fn quote(
        &self,
        commodity: Commodity,
        side: TradeSide,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> Result<ExecutionQuote, MarketError> {
        self.quote_bucket(commodity, side, quantity, HourBucket::from_datetime(at))
    }

    /// Quotes an order for a specific hour bucket.
    ///
    /// # Errors
    /// Returns `InvalidQuantity` unless `quantity` is finite and positive.
    pub fn quote_bucket(
        &self,
        commodity: Commodity,
        side: TradeSide,
        quantity: f64,
        bucket: HourBucket,
    ) -> Result<ExecutionQuote, MarketError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(MarketError::InvalidQuantity(quantity.to_string()));
        }

        let mid = price_for_bucket(commodity, bucket);
        let volatility = volatility_ratio(commodity, bucket);
        let spread = self.spread(volatility);
        let half_spread = spread / 2.0;
        let impact = self.impact(mid * quantity);

        // Round outward so rounding can never cross the mid price.
        let buy_price = ceil_to(mid * (1.0 + half_spread + impact), 4);
        let sell_price = floor_to(mid * (1.0 - half_spread - impact), 4).max(MIN_SELL_PRICE);

        let execution_price = match side {
            TradeSide::Buy => buy_price,
            TradeSide::Sell => sell_price,
        };

        debug!(
            "Quote {} {} x{}: mid={} buy={} sell={}",
            side, commodity, quantity, mid, buy_price, sell_price
        );

        Ok(ExecutionQuote {
            symbol: commodity,
            side,
            quantity,
            hour_bucket: bucket,
            hour_start_utc: bucket.start_iso()?,
            mid_price: mid,
            buy_price,
            sell_price,
            spread_pct: round_to(spread * 100.0, 4),
            liquidity_impact_pct: round_to(impact * 100.0, 4),
            volatility_pct: round_to(volatility * 100.0, 4),
            execution_price,
        })
    }
}

fn ceil_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).ceil() / factor
}

fn floor_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).floor() / factor
}
