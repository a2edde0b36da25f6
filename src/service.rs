//! Market operations exposed to callers: prices, history, quotes, trades and portfolios.

use crate::controls::TradingControls;
use crate::error::MarketError;
use crate::ledger::{
    HoldingsLedger, Portfolio, TradeSettlement, UserId, validate_quantity, validate_user,
};
use crate::market::{
    Commodity, ExecutionQuote, HourBucket, PriceHistory, PriceSnapshot, TradeSide, history,
};
use crate::models::{MarketPrice, SymbolInfo};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Facade over the oracle, the quote model, the trading controls and the ledger.
///
/// Every read accepts an optional evaluation time and falls back to now.
/// Trades always execute at the current time.
pub struct MarketService {
    ledger: HoldingsLedger,
    controls: Arc<TradingControls>,
}

impl MarketService {
    /// Creates the service.
    #[must_use]
    pub fn new(ledger: HoldingsLedger, controls: Arc<TradingControls>) -> Self {
        Self { ledger, controls }
    }

    /// Underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &HoldingsLedger {
        &self.ledger
    }

    /// Trading controls consulted before every trade.
    #[must_use]
    pub fn controls(&self) -> &TradingControls {
        &self.controls
    }

    /// Every supported commodity with its listing details.
    #[must_use]
    pub fn list_symbols(&self) -> Vec<SymbolInfo> {
        self.controls
            .all()
            .into_iter()
            .map(|(symbol, control)| {
                let cfg = symbol.config();
                SymbolInfo {
                    symbol,
                    name: cfg.name.to_string(),
                    unit: cfg.unit.to_string(),
                    base_price: cfg.base_price,
                    floor_price: cfg.floor_price,
                    trading_enabled: control.enabled,
                    max_order_quantity: control.max_order_quantity,
                }
            })
            .collect()
    }

    /// Oracle price of one symbol.
    ///
    /// # Errors
    /// `InvalidSymbol` for unsupported symbols.
    pub fn get_current_price(
        &self,
        symbol: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<PriceSnapshot, MarketError> {
        let commodity: Commodity = symbol.parse()?;
        PriceSnapshot::at_bucket(commodity, bucket_for(at))
    }

    /// Prices of several symbols, each with a one-unit buy/sell quote.
    /// `None` means every supported symbol.
    ///
    /// # Errors
    /// `InvalidSymbol` if any requested symbol is unsupported.
    pub fn get_current_prices(
        &self,
        symbols: Option<&[String]>,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<MarketPrice>, MarketError> {
        let commodities = match symbols {
            Some(symbols) => symbols
                .iter()
                .map(|s| s.parse::<Commodity>())
                .collect::<Result<Vec<_>, _>>()?,
            None => Commodity::ALL.to_vec(),
        };

        let bucket = bucket_for(at);
        let model = self.ledger.quote_model();

        commodities
            .into_iter()
            .map(|commodity| {
                let quote = model.quote_bucket(commodity, TradeSide::Buy, 1.0, bucket)?;
                Ok(MarketPrice {
                    symbol: commodity,
                    hour_bucket: bucket,
                    hour_start_utc: quote.hour_start_utc,
                    price: quote.mid_price,
                    buy_price: quote.buy_price,
                    sell_price: quote.sell_price,
                    spread_pct: quote.spread_pct,
                    volatility_pct: quote.volatility_pct,
                })
            })
            .collect()
    }

    /// Hourly history ending at the hour of `at`.
    ///
    /// # Errors
    /// `InvalidSymbol` or `InvalidWindow`.
    pub fn get_price_history(
        &self,
        symbol: &str,
        hours: i64,
        at: Option<DateTime<Utc>>,
    ) -> Result<PriceHistory, MarketError> {
        let commodity: Commodity = symbol.parse()?;
        history(commodity, hours, at.unwrap_or_else(Utc::now))
    }

    /// Execution quote for an order, without trading.
    ///
    /// # Errors
    /// `InvalidSymbol` or `InvalidQuantity`.
    pub fn get_quote(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<ExecutionQuote, MarketError> {
        let commodity: Commodity = symbol.parse()?;
        self.ledger
            .quote_model()
            .quote_bucket(commodity, side, quantity, bucket_for(at))
    }

    /// Buys at the current hour's price.
    ///
    /// # Errors
    /// Validation, control, rejection, or collaborator errors.
    pub async fn buy(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: f64,
    ) -> Result<TradeSettlement, MarketError> {
        self.buy_at(user_id, symbol, quantity, Utc::now()).await
    }

    /// Buys at the price of the hour containing `at`.
    ///
    /// # Errors
    /// Validation, control, rejection, or collaborator errors.
    pub async fn buy_at(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> Result<TradeSettlement, MarketError> {
        self.admit(user_id, symbol, quantity)?;
        self.ledger.buy(user_id, symbol, quantity, at).await
    }

    /// Sells at the current hour's price.
    ///
    /// # Errors
    /// Validation, control, rejection, or collaborator errors.
    pub async fn sell(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: f64,
    ) -> Result<TradeSettlement, MarketError> {
        self.sell_at(user_id, symbol, quantity, Utc::now()).await
    }

    /// Sells at the price of the hour containing `at`.
    ///
    /// # Errors
    /// Validation, control, rejection, or collaborator errors.
    pub async fn sell_at(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> Result<TradeSettlement, MarketError> {
        self.admit(user_id, symbol, quantity)?;
        self.ledger.sell(user_id, symbol, quantity, at).await
    }

    /// Holdings of a user valued at the hour of `at`.
    ///
    /// # Errors
    /// `InvalidUser` or a persistence failure.
    pub async fn get_portfolio(
        &self,
        user_id: UserId,
        at: Option<DateTime<Utc>>,
    ) -> Result<Portfolio, MarketError> {
        self.ledger
            .portfolio(user_id, at.unwrap_or_else(Utc::now))
            .await
    }

    /// Input validation followed by the control check.
    fn admit(&self, user_id: UserId, symbol: &str, quantity: f64) -> Result<(), MarketError> {
        validate_user(user_id)?;
        let commodity: Commodity = symbol.parse()?;
        let quantity = validate_quantity(quantity)?;
        self.controls.check(commodity, quantity)?;
        debug!("Admitted order for user {}: {} x{}", user_id, commodity, quantity);
        Ok(())
    }
}

fn bucket_for(at: Option<DateTime<Utc>>) -> HourBucket {
    HourBucket::from_datetime(at.unwrap_or_else(Utc::now))
}
