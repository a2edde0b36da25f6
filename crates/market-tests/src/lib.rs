//! Integration test support for the commodity market engine.
//!
//! Tests drive the library in-process. The collaborators here wrap the
//! built-in implementations and can be told to fail or slow down, so the
//! ledger's locking and compensation paths can be exercised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commodity_market_backend::ledger::{
    Account, AccountError, AccountService, HoldingsLedger, HoldingsRepository,
    InMemoryAccountService, MemoryHoldingsRepository, StoreError, TransactionRecord,
    TransactionRequest, UserId,
};
use commodity_market_backend::market::parse_timestamp;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Balance every test account opens with.
pub const OPENING_BALANCE: f64 = 1_000_000.0;

/// Parses an RFC 3339 or epoch-millisecond timestamp.
///
/// # Panics
/// Panics on an unparseable timestamp.
#[must_use]
pub fn at(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|e| panic!("bad test timestamp {raw}: {e}"))
}

/// Ledger over fresh in-memory collaborators.
#[must_use]
pub fn memory_ledger(
    opening_balance: f64,
) -> (
    HoldingsLedger,
    Arc<MemoryHoldingsRepository>,
    Arc<InMemoryAccountService>,
) {
    let repository = Arc::new(MemoryHoldingsRepository::new());
    let accounts = Arc::new(InMemoryAccountService::new(opening_balance));
    let ledger = HoldingsLedger::new(repository.clone(), accounts.clone());
    (ledger, repository, accounts)
}

/// Repository that fails a configurable number of upcoming writes and can
/// delay every write to widen race windows.
#[derive(Debug, Default)]
pub struct FlakyRepository {
    inner: MemoryHoldingsRepository,
    failing_writes: AtomicUsize,
    writes: AtomicUsize,
    write_delay: Option<Duration>,
}

impl FlakyRepository {
    /// Creates a repository that never fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository that sleeps before every write.
    #[must_use]
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes the next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HoldingsRepository for FlakyRepository {
    async fn read_store(&self) -> Result<Option<Value>, StoreError> {
        self.inner.read_store().await
    }

    async fn replace_store(&self, document: Value) -> Result<(), StoreError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        self.inner.replace_store(document).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Account service that fails a configurable number of upcoming postings.
#[derive(Debug)]
pub struct FlakyAccounts {
    inner: InMemoryAccountService,
    failing_postings: AtomicUsize,
}

impl FlakyAccounts {
    /// Creates a service that opens accounts with `opening_balance`.
    #[must_use]
    pub fn new(opening_balance: f64) -> Self {
        Self {
            inner: InMemoryAccountService::new(opening_balance),
            failing_postings: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` postings fail.
    pub fn fail_next_postings(&self, count: usize) {
        self.failing_postings.store(count, Ordering::SeqCst);
    }

    /// Transactions actually posted for a user.
    #[must_use]
    pub fn transactions(&self, user_id: UserId) -> Vec<TransactionRecord> {
        self.inner.transactions(user_id)
    }
}

#[async_trait]
impl AccountService for FlakyAccounts {
    async fn get_account(&self, user_id: UserId) -> Result<Account, AccountError> {
        self.inner.get_account(user_id).await
    }

    async fn record_transaction(
        &self,
        user_id: UserId,
        request: TransactionRequest,
    ) -> Result<TransactionRecord, AccountError> {
        let failed = self
            .failing_postings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AccountError::Unavailable("injected posting failure".to_string()));
        }
        self.inner.record_transaction(user_id, request).await
    }
}
