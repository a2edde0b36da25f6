//! Cash side of a trade: the account/balance service boundary.

use crate::error::MarketError;
use crate::ledger::store::UserId;
use crate::market::round_to;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// Transaction category used for every commodity trade.
pub const TRADE_CATEGORY: &str = "commodities";

/// Account service error types.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The service refused the posting.
    #[error("transaction rejected: {0}")]
    Rejected(String),
    /// The service could not be reached.
    #[error("account service unavailable: {0}")]
    Unavailable(String),
}

impl From<AccountError> for MarketError {
    fn from(err: AccountError) -> Self {
        MarketError::AccountService(err.to_string())
    }
}

/// Cash account of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Owner.
    pub user_id: UserId,
    /// Available cash.
    pub balance: f64,
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money out.
    Expense,
    /// Money in.
    Income,
}

/// Posting request sent to the account service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Expense or income.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Positive amount.
    pub amount: f64,
    /// Free text shown to the user.
    pub description: String,
    /// Ledger category.
    pub category: String,
    /// Caller-side reference for reconciliation.
    pub reference_id: String,
}

/// A posted transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    /// Identifier assigned by the service.
    pub id: Uuid,
    /// Owner.
    pub user_id: UserId,
    /// Expense or income.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Amount moved.
    pub amount: f64,
    /// Free text.
    pub description: String,
    /// Ledger category.
    pub category: String,
    /// Caller-side reference.
    pub reference_id: String,
    /// Balance right after the posting.
    pub balance_after: f64,
    /// Posting time.
    pub created_at: DateTime<Utc>,
}

/// Balance and transaction service. Authoritative for cash.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Current account of a user.
    async fn get_account(&self, user_id: UserId) -> Result<Account, AccountError>;

    /// Posts a cash movement.
    async fn record_transaction(
        &self,
        user_id: UserId,
        request: TransactionRequest,
    ) -> Result<TransactionRecord, AccountError>;
}

#[derive(Debug, Clone)]
struct AccountEntry {
    balance: f64,
    transactions: Vec<TransactionRecord>,
}

/// In-process account service. Accounts open lazily with a fixed balance.
#[derive(Debug)]
pub struct InMemoryAccountService {
    opening_balance: f64,
    accounts: DashMap<UserId, AccountEntry>,
}

impl InMemoryAccountService {
    /// Creates a service that opens every new account with `opening_balance`.
    #[must_use]
    pub fn new(opening_balance: f64) -> Self {
        Self {
            opening_balance,
            accounts: DashMap::new(),
        }
    }

    /// Every transaction posted for a user, oldest first.
    #[must_use]
    pub fn transactions(&self, user_id: UserId) -> Vec<TransactionRecord> {
        self.accounts
            .get(&user_id)
            .map(|entry| entry.transactions.clone())
            .unwrap_or_default()
    }

    fn entry(&self, user_id: UserId) -> dashmap::mapref::one::RefMut<'_, UserId, AccountEntry> {
        self.accounts.entry(user_id).or_insert_with(|| AccountEntry {
            balance: self.opening_balance,
            transactions: Vec::new(),
        })
    }
}

#[async_trait]
impl AccountService for InMemoryAccountService {
    async fn get_account(&self, user_id: UserId) -> Result<Account, AccountError> {
        let balance = self.entry(user_id).balance;
        Ok(Account { user_id, balance })
    }

    async fn record_transaction(
        &self,
        user_id: UserId,
        request: TransactionRequest,
    ) -> Result<TransactionRecord, AccountError> {
        if !request.amount.is_finite() || request.amount < 0.0 {
            return Err(AccountError::Rejected(format!(
                "invalid amount {}",
                request.amount
            )));
        }

        let mut entry = self.entry(user_id);
        let balance_after = match request.kind {
            TransactionType::Expense => {
                if request.amount > entry.balance {
                    return Err(AccountError::Rejected(format!(
                        "expense {:.2} exceeds balance {:.2}",
                        request.amount, entry.balance
                    )));
                }
                round_to(entry.balance - request.amount, 2)
            }
            TransactionType::Income => round_to(entry.balance + request.amount, 2),
        };

        let record = TransactionRecord {
            id: Uuid::new_v4(),
            user_id,
            kind: request.kind,
            amount: request.amount,
            description: request.description,
            category: request.category,
            reference_id: request.reference_id,
            balance_after,
            created_at: Utc::now(),
        };

        entry.balance = balance_after;
        entry.transactions.push(record.clone());

        debug!(
            "Posted {:?} of {:.2} for user {}, balance {:.2}",
            record.kind, record.amount, user_id, balance_after
        );

        Ok(record)
    }
}
