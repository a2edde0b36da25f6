//! Application state management.

use crate::config::Config;
use crate::controls::TradingControls;
use crate::error::MarketError;
use crate::ledger::{
    HoldingsLedger, HoldingsRepository, InMemoryAccountService, JsonFileHoldingsRepository,
    MemoryHoldingsRepository,
};
use crate::service::MarketService;
use std::sync::Arc;
use tracing::info;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Market operations.
    pub service: Arc<MarketService>,
    /// Built-in account service backing the ledger.
    pub accounts: Arc<InMemoryAccountService>,
    /// Application configuration.
    pub config: Option<Config>,
}

impl AppState {
    /// Creates a state with in-memory holdings and default settings.
    #[must_use]
    pub fn new() -> Self {
        let config = Config::default();
        let accounts = Arc::new(InMemoryAccountService::new(
            config.accounts.opening_balance,
        ));
        let ledger = HoldingsLedger::new(
            Arc::new(MemoryHoldingsRepository::new()),
            accounts.clone(),
        );
        let service = MarketService::new(ledger, Arc::new(TradingControls::new()));

        Self {
            service: Arc::new(service),
            accounts,
            config: None,
        }
    }

    /// Creates a state from configuration.
    ///
    /// # Errors
    /// Returns `InvalidSymbol` if a control entry names an unsupported commodity.
    pub fn from_config(config: Config) -> Result<Self, MarketError> {
        let repository: Arc<dyn HoldingsRepository> = match &config.storage.holdings_path {
            Some(path) => {
                let repository = JsonFileHoldingsRepository::new(path);
                info!("Holdings stored in {}", repository.path().display());
                Arc::new(repository)
            }
            None => {
                info!("Holdings stored in memory");
                Arc::new(MemoryHoldingsRepository::new())
            }
        };

        let accounts = Arc::new(InMemoryAccountService::new(
            config.accounts.opening_balance,
        ));
        let controls = Arc::new(TradingControls::from_config(&config.controls)?);
        let ledger =
            HoldingsLedger::new(repository, accounts.clone()).with_quote_model(config.quote);

        Ok(Self {
            service: Arc::new(MarketService::new(ledger, controls)),
            accounts,
            config: Some(config),
        })
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
