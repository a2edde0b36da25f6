//! Holdings store document and the repositories that persist it.
//!
//! The store is always read and replaced as one document. Repositories only
//! move raw JSON; shaping and defaulting the document is done here so that a
//! missing or malformed document never reaches the ledger.

use crate::error::MarketError;
use crate::market::{Commodity, round_to};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// Identifier of a user in the account service.
pub type UserId = u64;

/// Current document version.
pub const STORE_VERSION: u32 = 1;

/// Storage error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Document could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Backend refused or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for MarketError {
    fn from(err: StoreError) -> Self {
        MarketError::Persistence(err.to_string())
    }
}

/// One user's position in one commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Owner.
    pub user_id: UserId,
    /// Commodity held.
    pub symbol: Commodity,
    /// Quantity held, at most 4 decimals.
    pub quantity: f64,
    /// Cost basis of the quantity held.
    pub total_invested: f64,
    /// Last time this holding changed.
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// Average price paid per unit, derived from cost basis and quantity.
    #[must_use]
    pub fn avg_buy_price(&self) -> f64 {
        if self.quantity > 0.0 {
            round_to(self.total_invested / self.quantity, 4)
        } else {
            0.0
        }
    }

    /// Public view including the derived average price.
    #[must_use]
    pub fn view(&self) -> HoldingView {
        HoldingView {
            symbol: self.symbol,
            quantity: self.quantity,
            total_invested: self.total_invested,
            avg_buy_price: self.avg_buy_price(),
            updated_at: self.updated_at,
        }
    }
}

/// A holding as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HoldingView {
    /// Commodity held.
    pub symbol: Commodity,
    /// Quantity held.
    pub quantity: f64,
    /// Cost basis.
    pub total_invested: f64,
    /// `total_invested / quantity`.
    pub avg_buy_price: f64,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Document version.
    pub version: u32,
    /// Time of the last write, `None` for a store never written.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            updated_at: None,
        }
    }
}

/// Every user's holdings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingsStore {
    /// All holdings, at most one per (user, symbol).
    pub holdings: Vec<Holding>,
    /// Document metadata.
    pub metadata: StoreMetadata,
}

impl HoldingsStore {
    /// Shapes a raw document into a store, falling back to an empty store when
    /// the document is missing or malformed. Empty positions are dropped.
    #[must_use]
    pub fn from_document(document: Option<Value>) -> Self {
        let Some(document) = document else {
            return Self::default();
        };

        match serde_json::from_value::<HoldingsStore>(document) {
            Ok(mut store) => {
                store.holdings.retain(|h| h.quantity > 0.0);
                store
            }
            Err(err) => {
                warn!("Malformed holdings store, starting empty: {}", err);
                Self::default()
            }
        }
    }

    /// Encodes the store as a JSON document.
    ///
    /// # Errors
    /// Returns a serialization error if a value cannot be encoded.
    pub fn to_document(&self) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Holding of a user in a commodity.
    #[must_use]
    pub fn find(&self, user_id: UserId, symbol: Commodity) -> Option<&Holding> {
        self.holdings
            .iter()
            .find(|h| h.user_id == user_id && h.symbol == symbol)
    }

    /// All holdings of a user.
    pub fn for_user(&self, user_id: UserId) -> impl Iterator<Item = &Holding> {
        self.holdings.iter().filter(move |h| h.user_id == user_id)
    }

    /// Adds a purchase to the user's holding, creating it if needed.
    pub fn record_purchase(
        &mut self,
        user_id: UserId,
        symbol: Commodity,
        quantity: f64,
        cost: f64,
        at: DateTime<Utc>,
    ) -> Holding {
        let index = match self.position(user_id, symbol) {
            Some(index) => index,
            None => {
                self.holdings.push(Holding {
                    user_id,
                    symbol,
                    quantity: 0.0,
                    total_invested: 0.0,
                    updated_at: at,
                });
                self.holdings.len() - 1
            }
        };

        let holding = &mut self.holdings[index];
        holding.quantity = round_to(holding.quantity + quantity, 4);
        holding.total_invested = round_to(holding.total_invested + cost, 2);
        holding.updated_at = at;
        holding.clone()
    }

    /// Removes a sold quantity and its cost basis. Returns the remaining
    /// holding, or `None` when the position was closed and removed.
    pub fn record_sale(
        &mut self,
        user_id: UserId,
        symbol: Commodity,
        quantity: f64,
        cost_basis: f64,
        at: DateTime<Utc>,
    ) -> Option<Holding> {
        let index = self.position(user_id, symbol)?;
        let holding = &mut self.holdings[index];
        holding.quantity = round_to(holding.quantity - quantity, 4);
        holding.total_invested = round_to(holding.total_invested - cost_basis, 2);
        holding.updated_at = at;

        if holding.quantity <= 0.0 {
            self.holdings.remove(index);
            None
        } else {
            Some(holding.clone())
        }
    }

    /// Marks the document as written at `at`.
    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.metadata.version = STORE_VERSION;
        self.metadata.updated_at = Some(at);
    }

    fn position(&self, user_id: UserId, symbol: Commodity) -> Option<usize> {
        self.holdings
            .iter()
            .position(|h| h.user_id == user_id && h.symbol == symbol)
    }
}

/// Whole-document persistence for the holdings store.
#[async_trait]
pub trait HoldingsRepository: Send + Sync {
    /// Reads the current document, `None` if nothing was ever written.
    async fn read_store(&self) -> Result<Option<Value>, StoreError>;

    /// Atomically replaces the document.
    async fn replace_store(&self, document: Value) -> Result<(), StoreError>;
}

/// In-process repository.
#[derive(Debug, Default)]
pub struct MemoryHoldingsRepository {
    document: RwLock<Option<Value>>,
}

impl MemoryHoldingsRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-loaded with a document.
    #[must_use]
    pub fn with_document(document: Value) -> Self {
        Self {
            document: RwLock::new(Some(document)),
        }
    }
}

#[async_trait]
impl HoldingsRepository for MemoryHoldingsRepository {
    async fn read_store(&self) -> Result<Option<Value>, StoreError> {
        Ok(self.document.read().clone())
    }

    async fn replace_store(&self, document: Value) -> Result<(), StoreError> {
        *self.document.write() = Some(document);
        Ok(())
    }
}

/// Repository backed by a single JSON file, replaced via write-then-rename.
#[derive(Debug, Clone)]
pub struct JsonFileHoldingsRepository {
    path: PathBuf,
}

impl JsonFileHoldingsRepository {
    /// Creates a repository for the given file. The file need not exist yet.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl HoldingsRepository for JsonFileHoldingsRepository {
    async fn read_store(&self) -> Result<Option<Value>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&content) {
            Ok(document) => Ok(Some(document)),
            Err(err) => {
                warn!(
                    "Unreadable holdings file {}: {}",
                    self.path.display(),
                    err
                );
                Ok(None)
            }
        }
    }

    async fn replace_store(&self, document: Value) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(&document)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!("Wrote holdings store to {}", self.path.display());
        Ok(())
    }
}
