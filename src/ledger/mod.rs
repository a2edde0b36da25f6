//! Holdings ledger: persistent positions, cash collaborators and trade settlement.
//!
//! - [`store`] - holdings document, repository trait and implementations
//! - [`accounts`] - balance/transaction service boundary
//! - [`engine`] - serialized buy/sell settlement and portfolio valuation

pub mod accounts;
pub mod engine;
pub mod store;

pub use accounts::{
    Account, AccountError, AccountService, InMemoryAccountService, TRADE_CATEGORY,
    TransactionRecord, TransactionRequest, TransactionType,
};
pub use engine::{
    HoldingsLedger, Portfolio, PortfolioPosition, PortfolioSummary, QUANTITY_DECIMALS,
    TradeSettlement, validate_quantity, validate_user,
};
pub use store::{
    Holding, HoldingView, HoldingsRepository, HoldingsStore, JsonFileHoldingsRepository,
    MemoryHoldingsRepository, STORE_VERSION, StoreError, StoreMetadata, UserId,
};
