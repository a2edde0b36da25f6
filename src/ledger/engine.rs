//! Trade settlement against the holdings store.

use crate::error::MarketError;
use crate::ledger::accounts::{
    AccountService, TRADE_CATEGORY, TransactionRecord, TransactionRequest, TransactionType,
};
use crate::ledger::store::{HoldingView, HoldingsRepository, HoldingsStore, UserId};
use crate::market::{
    Commodity, ExecutionQuote, HourBucket, QuoteModel, TradeSide, price_for_bucket, round_to,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Quantities are limited to this many decimals.
pub const QUANTITY_DECIMALS: i32 = 4;

/// Result of a settled buy or sell.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TradeSettlement {
    /// Trade direction.
    pub side: TradeSide,
    /// Commodity traded.
    pub symbol: Commodity,
    /// Quantity traded.
    pub quantity: f64,
    /// Price per unit paid or received.
    pub execution_price: f64,
    /// Oracle mid price at execution.
    pub mid_price: f64,
    /// Spread in percent.
    pub spread_pct: f64,
    /// Liquidity impact in percent.
    pub liquidity_impact_pct: f64,
    /// Total cost (buy) or proceeds (sell).
    pub total: f64,
    /// Hour bucket of the execution.
    #[schema(value_type = i64)]
    pub hour_bucket: HourBucket,
    /// Start of the execution hour.
    pub hour_start_utc: String,
    /// Cost basis released by a sell.
    pub cost_basis: Option<f64>,
    /// Proceeds minus released cost basis, for sells.
    pub realized_pnl: Option<f64>,
    /// Holding after the trade; `None` when a sell closed the position.
    pub holding: Option<HoldingView>,
    /// Cash transaction posted for the trade.
    pub transaction_id: Uuid,
    /// Reference attached to the cash transaction.
    pub reference_id: String,
    /// Account balance after the cash transaction.
    pub balance_after: f64,
}

/// One line of a portfolio valuation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PortfolioPosition {
    /// Commodity held.
    pub symbol: Commodity,
    /// Quantity held.
    pub quantity: f64,
    /// Cost basis.
    pub total_invested: f64,
    /// Average price paid.
    pub avg_buy_price: f64,
    /// Current oracle mid price.
    pub current_price: f64,
    /// `quantity * current_price`.
    pub current_value: f64,
    /// `current_value - total_invested`.
    pub unrealized_pnl: f64,
    /// Unrealized P/L relative to cost basis, in percent.
    pub unrealized_pnl_pct: f64,
    /// Last change to the holding.
    pub updated_at: DateTime<Utc>,
}

/// Totals across every position.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PortfolioSummary {
    /// Sum of cost bases.
    pub total_invested: f64,
    /// Sum of current values.
    pub current_value: f64,
    /// `current_value - total_invested`.
    pub total_pnl: f64,
    /// Total P/L relative to cost basis, in percent.
    pub total_pnl_pct: f64,
    /// Number of positions.
    pub position_count: usize,
}

/// A user's holdings valued at the current hour.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Portfolio {
    /// Owner.
    pub user_id: UserId,
    /// Hour bucket used for valuation.
    #[schema(value_type = i64)]
    pub hour_bucket: HourBucket,
    /// Positions, ordered by symbol.
    pub positions: Vec<PortfolioPosition>,
    /// Totals.
    pub summary: PortfolioSummary,
}

/// Checks that a user id is a positive integer.
///
/// # Errors
/// Returns `InvalidUser` for 0.
pub fn validate_user(user_id: UserId) -> Result<UserId, MarketError> {
    if user_id == 0 {
        return Err(MarketError::InvalidUser(user_id.to_string()));
    }
    Ok(user_id)
}

/// Checks that a quantity is positive, finite and has at most 4 decimals.
/// Returns the quantity rounded to exactly 4 decimals.
///
/// # Errors
/// Returns `InvalidQuantity` otherwise.
pub fn validate_quantity(quantity: f64) -> Result<f64, MarketError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(MarketError::InvalidQuantity(quantity.to_string()));
    }

    // Tolerance covers f64 representation error only, never a fifth decimal.
    let scaled = quantity * 10f64.powi(QUANTITY_DECIMALS);
    if (scaled - scaled.round()).abs() > scaled.abs().max(1.0) * 4.0 * f64::EPSILON {
        return Err(MarketError::InvalidQuantity(quantity.to_string()));
    }

    Ok(round_to(quantity, QUANTITY_DECIMALS))
}

/// Holdings ledger. Every mutation of the store runs under one lock, so
/// concurrent trades never overwrite each other's writes.
///
/// Both sides follow the same order inside the lock: read the store, apply the
/// trade, write the store, post the cash transaction. If the posting fails the
/// store is restored from the snapshot taken at the start of the same locked
/// section.
pub struct HoldingsLedger {
    repository: Arc<dyn HoldingsRepository>,
    accounts: Arc<dyn AccountService>,
    quote_model: QuoteModel,
    write_lock: Mutex<()>,
}

impl HoldingsLedger {
    /// Creates a ledger over the given collaborators.
    #[must_use]
    pub fn new(repository: Arc<dyn HoldingsRepository>, accounts: Arc<dyn AccountService>) -> Self {
        Self {
            repository,
            accounts,
            quote_model: QuoteModel::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Replaces the spread/impact model.
    #[must_use]
    pub fn with_quote_model(mut self, quote_model: QuoteModel) -> Self {
        self.quote_model = quote_model;
        self
    }

    /// Quote model used to price fills.
    #[must_use]
    pub fn quote_model(&self) -> &QuoteModel {
        &self.quote_model
    }

    /// Buys `quantity` of `symbol` at the price of the hour containing `at`.
    ///
    /// # Errors
    /// Validation errors, `InsufficientFunds`, or collaborator failures.
    pub async fn buy(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> Result<TradeSettlement, MarketError> {
        let user_id = validate_user(user_id)?;
        let commodity: Commodity = symbol.parse()?;
        let quantity = validate_quantity(quantity)?;

        let quote = self
            .quote_model
            .quote(commodity, TradeSide::Buy, quantity, at)?;
        let total_cost = round_to(quote.execution_price * quantity, 2);

        let _guard = self.write_lock.lock().await;

        let account = self.accounts.get_account(user_id).await?;
        if account.balance < total_cost {
            return Err(MarketError::InsufficientFunds {
                required: total_cost,
                available: account.balance,
            });
        }

        let snapshot = self.load().await?;
        let mut store = snapshot.clone();
        let holding = store.record_purchase(user_id, commodity, quantity, total_cost, at);
        self.save(&mut store, at).await?;

        let request = trade_transaction(&quote, TransactionType::Expense, total_cost);
        let record = self.post(user_id, request, snapshot, at).await?;

        info!(
            "User {} bought {} {} @ {} (total {:.2})",
            user_id, quantity, commodity, quote.execution_price, total_cost
        );

        Ok(settlement(
            &quote,
            total_cost,
            None,
            None,
            Some(holding.view()),
            record,
        ))
    }

    /// Sells `quantity` of `symbol` at the price of the hour containing `at`.
    ///
    /// # Errors
    /// Validation errors, `NoHoldings`, `InsufficientQuantity`, or collaborator failures.
    pub async fn sell(
        &self,
        user_id: UserId,
        symbol: &str,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> Result<TradeSettlement, MarketError> {
        let user_id = validate_user(user_id)?;
        let commodity: Commodity = symbol.parse()?;
        let quantity = validate_quantity(quantity)?;

        let quote = self
            .quote_model
            .quote(commodity, TradeSide::Sell, quantity, at)?;

        let _guard = self.write_lock.lock().await;

        let snapshot = self.load().await?;
        let held = snapshot
            .find(user_id, commodity)
            .cloned()
            .ok_or_else(|| MarketError::NoHoldings(commodity.to_string()))?;
        if quantity > held.quantity {
            return Err(MarketError::InsufficientQuantity {
                requested: quantity,
                held: held.quantity,
            });
        }

        let proceeds = round_to(quote.execution_price * quantity, 2);
        let cost_basis = round_to(held.total_invested * (quantity / held.quantity), 2);
        let realized_pnl = round_to(proceeds - cost_basis, 2);

        let mut store = snapshot.clone();
        let remaining = store.record_sale(user_id, commodity, quantity, cost_basis, at);
        self.save(&mut store, at).await?;

        let request = trade_transaction(&quote, TransactionType::Income, proceeds);
        let record = self.post(user_id, request, snapshot, at).await?;

        info!(
            "User {} sold {} {} @ {} (proceeds {:.2}, realized {:.2})",
            user_id, quantity, commodity, quote.execution_price, proceeds, realized_pnl
        );

        Ok(settlement(
            &quote,
            proceeds,
            Some(cost_basis),
            Some(realized_pnl),
            remaining.map(|h| h.view()),
            record,
        ))
    }

    /// Values every holding of a user at the hour containing `at`.
    ///
    /// # Errors
    /// `InvalidUser` or a persistence failure.
    pub async fn portfolio(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Portfolio, MarketError> {
        let user_id = validate_user(user_id)?;
        let store = self.load().await?;
        let bucket = HourBucket::from_datetime(at);

        let mut positions: Vec<PortfolioPosition> = store
            .for_user(user_id)
            .map(|holding| {
                let current_price = price_for_bucket(holding.symbol, bucket);
                let current_value = round_to(holding.quantity * current_price, 2);
                let unrealized_pnl = round_to(current_value - holding.total_invested, 2);
                PortfolioPosition {
                    symbol: holding.symbol,
                    quantity: holding.quantity,
                    total_invested: holding.total_invested,
                    avg_buy_price: holding.avg_buy_price(),
                    current_price,
                    current_value,
                    unrealized_pnl,
                    unrealized_pnl_pct: percent_of(unrealized_pnl, holding.total_invested),
                    updated_at: holding.updated_at,
                }
            })
            .collect();
        positions.sort_by_key(|p| p.symbol);

        let total_invested = round_to(positions.iter().map(|p| p.total_invested).sum(), 2);
        let current_value = round_to(positions.iter().map(|p| p.current_value).sum(), 2);
        let total_pnl = round_to(current_value - total_invested, 2);

        Ok(Portfolio {
            user_id,
            hour_bucket: bucket,
            summary: PortfolioSummary {
                total_invested,
                current_value,
                total_pnl,
                total_pnl_pct: percent_of(total_pnl, total_invested),
                position_count: positions.len(),
            },
            positions,
        })
    }

    /// Current holding of a user in a symbol.
    ///
    /// # Errors
    /// Validation errors or a persistence failure.
    pub async fn holding(
        &self,
        user_id: UserId,
        symbol: &str,
    ) -> Result<Option<HoldingView>, MarketError> {
        let user_id = validate_user(user_id)?;
        let commodity: Commodity = symbol.parse()?;
        let store = self.load().await?;
        Ok(store.find(user_id, commodity).map(|h| h.view()))
    }

    async fn load(&self) -> Result<HoldingsStore, MarketError> {
        let document = self.repository.read_store().await?;
        Ok(HoldingsStore::from_document(document))
    }

    async fn save(&self, store: &mut HoldingsStore, at: DateTime<Utc>) -> Result<(), MarketError> {
        store.stamp(at);
        self.repository.replace_store(store.to_document()?).await?;
        debug!("Holdings store written ({} holdings)", store.holdings.len());
        Ok(())
    }

    /// Posts the cash side of a trade; restores `snapshot` if the posting fails.
    /// Must be called with the write lock held.
    async fn post(
        &self,
        user_id: UserId,
        request: TransactionRequest,
        mut snapshot: HoldingsStore,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, MarketError> {
        let reference_id = request.reference_id.clone();
        match self.accounts.record_transaction(user_id, request).await {
            Ok(record) => Ok(record),
            Err(err) => {
                warn!(
                    "Cash posting {} failed for user {}, restoring holdings: {}",
                    reference_id, user_id, err
                );
                if let Err(restore_err) = self.save(&mut snapshot, at).await {
                    error!(
                        "Failed to restore holdings after {}: {}",
                        reference_id, restore_err
                    );
                }
                Err(err.into())
            }
        }
    }
}

fn trade_transaction(
    quote: &ExecutionQuote,
    kind: TransactionType,
    amount: f64,
) -> TransactionRequest {
    let verb = match quote.side {
        TradeSide::Buy => "Bought",
        TradeSide::Sell => "Sold",
    };
    TransactionRequest {
        kind,
        amount,
        description: format!(
            "{} {} {} @ {}",
            verb, quote.quantity, quote.symbol, quote.execution_price
        ),
        category: TRADE_CATEGORY.to_string(),
        reference_id: format!("commodity-{}-{}", quote.side, Uuid::new_v4()),
    }
}

fn settlement(
    quote: &ExecutionQuote,
    total: f64,
    cost_basis: Option<f64>,
    realized_pnl: Option<f64>,
    holding: Option<HoldingView>,
    record: TransactionRecord,
) -> TradeSettlement {
    TradeSettlement {
        side: quote.side,
        symbol: quote.symbol,
        quantity: quote.quantity,
        execution_price: quote.execution_price,
        mid_price: quote.mid_price,
        spread_pct: quote.spread_pct,
        liquidity_impact_pct: quote.liquidity_impact_pct,
        total,
        hour_bucket: quote.hour_bucket,
        hour_start_utc: quote.hour_start_utc.clone(),
        cost_basis,
        realized_pnl,
        holding,
        transaction_id: record.id,
        reference_id: record.reference_id,
        balance_after: record.balance_after,
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round_to(part / whole * 100.0, 2)
    } else {
        0.0
    }
}
