//! Serialized mutation, lock release on failure, and compensation.

use commodity_market_backend::error::MarketError;
use commodity_market_backend::ledger::{
    HoldingsLedger, HoldingsRepository, HoldingsStore, InMemoryAccountService, TransactionType,
};
use commodity_market_backend::market::Commodity;
use futures::future::join_all;
use market_tests::{FlakyAccounts, FlakyRepository, OPENING_BALANCE, at};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buys_are_all_recorded() {
    let repository = Arc::new(FlakyRepository::with_write_delay(Duration::from_millis(2)));
    let accounts = Arc::new(InMemoryAccountService::new(OPENING_BALANCE));
    let ledger = Arc::new(HoldingsLedger::new(repository.clone(), accounts.clone()));
    let t = at("2026-02-27T10:10:00Z");

    const BUYS: usize = 40;
    let results = join_all((0..BUYS).map(|_| {
        let ledger = ledger.clone();
        async move { ledger.buy(1, "SILVER", 0.25, t).await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(repository.writes(), BUYS);
    assert_eq!(accounts.transactions(1).len(), BUYS);

    let holding = ledger.holding(1, "SILVER").await.unwrap().unwrap();
    assert_eq!(holding.quantity, 0.25 * BUYS as f64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sells_drain_holding_exactly() {
    let repository = Arc::new(FlakyRepository::with_write_delay(Duration::from_millis(2)));
    let accounts = Arc::new(InMemoryAccountService::new(OPENING_BALANCE));
    let ledger = Arc::new(HoldingsLedger::new(repository.clone(), accounts.clone()));
    let t = at("2026-02-27T10:10:00Z");

    const SELLS: usize = 30;
    const LOT: f64 = 1.5;
    ledger.buy(1, "WHEAT", LOT * SELLS as f64, t).await.unwrap();

    let results = join_all((0..SELLS).map(|_| {
        let ledger = ledger.clone();
        async move { ledger.sell(1, "WHEAT", LOT, t).await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    let closing = results
        .iter()
        .filter(|r| matches!(r, Ok(s) if s.holding.is_none()))
        .count();
    assert_eq!(closing, 1);
    assert!(ledger.holding(1, "WHEAT").await.unwrap().is_none());
    assert_eq!(repository.writes(), SELLS + 1);

    let incomes = accounts
        .transactions(1)
        .into_iter()
        .filter(|tx| tx.kind == TransactionType::Income)
        .count();
    assert_eq!(incomes, SELLS);

    let store = HoldingsStore::from_document(repository.read_store().await.unwrap());
    assert!(store.holdings.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buys_across_users_and_symbols() {
    let repository = Arc::new(FlakyRepository::with_write_delay(Duration::from_millis(1)));
    let accounts = Arc::new(InMemoryAccountService::new(OPENING_BALANCE));
    let ledger = Arc::new(HoldingsLedger::new(repository.clone(), accounts));
    let t = at("2026-02-27T10:10:00Z");

    let orders: Vec<(u64, Commodity)> = (1..=4)
        .flat_map(|user| Commodity::ALL.into_iter().map(move |c| (user, c)))
        .collect();

    let results = join_all(orders.iter().map(|(user, commodity)| {
        let ledger = ledger.clone();
        let (user, commodity) = (*user, *commodity);
        async move { ledger.buy(user, commodity.as_str(), 2.0, t).await }
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    let store = HoldingsStore::from_document(repository.read_store().await.unwrap());
    assert_eq!(store.holdings.len(), orders.len());
    assert!(store.holdings.iter().all(|h| h.quantity == 2.0));
}

#[tokio::test]
async fn test_failed_write_releases_lock() {
    let repository = Arc::new(FlakyRepository::new());
    let accounts = Arc::new(InMemoryAccountService::new(OPENING_BALANCE));
    let ledger = HoldingsLedger::new(repository.clone(), accounts.clone());
    let t = at("2026-02-27T10:10:00Z");

    repository.fail_next_writes(1);
    let err = ledger.buy(1, "CORN", 10.0, t).await.unwrap_err();
    assert!(matches!(err, MarketError::Persistence(_)));
    assert!(err.to_string().starts_with("infrastructure failure: "));
    assert!(accounts.transactions(1).is_empty());

    let settled = tokio::time::timeout(Duration::from_secs(5), ledger.buy(1, "CORN", 10.0, t))
        .await
        .expect("ledger lock was not released")
        .unwrap();
    assert_eq!(settled.holding.unwrap().quantity, 10.0);
}

#[tokio::test]
async fn test_failed_expense_posting_restores_holdings() {
    let repository = Arc::new(FlakyRepository::new());
    let accounts = Arc::new(FlakyAccounts::new(OPENING_BALANCE));
    let ledger = HoldingsLedger::new(repository.clone(), accounts.clone());
    let t = at("2026-02-27T10:10:00Z");

    ledger.buy(1, "COFFEE", 100.0, t).await.unwrap();
    let before = ledger.holding(1, "COFFEE").await.unwrap().unwrap();

    accounts.fail_next_postings(1);
    let err = ledger.buy(1, "COFFEE", 50.0, t).await.unwrap_err();
    assert!(matches!(err, MarketError::AccountService(_)));

    let after = ledger.holding(1, "COFFEE").await.unwrap().unwrap();
    assert_eq!(after.quantity, before.quantity);
    assert_eq!(after.total_invested, before.total_invested);
    assert_eq!(accounts.transactions(1).len(), 1);
}

#[tokio::test]
async fn test_failed_income_posting_restores_holdings() {
    let repository = Arc::new(FlakyRepository::new());
    let accounts = Arc::new(FlakyAccounts::new(OPENING_BALANCE));
    let ledger = HoldingsLedger::new(repository.clone(), accounts.clone());

    ledger
        .buy(1, "GOLD", 2.5, at("2026-02-27T10:10:00Z"))
        .await
        .unwrap();

    accounts.fail_next_postings(1);
    let err = ledger
        .sell(1, "GOLD", 2.5, at("2026-03-01T09:00:00Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::AccountService(_)));

    let holding = ledger.holding(1, "GOLD").await.unwrap().unwrap();
    assert_eq!(holding.quantity, 2.5);

    let sold = ledger
        .sell(1, "GOLD", 2.5, at("2026-03-01T09:00:00Z"))
        .await
        .unwrap();
    assert!(sold.holding.is_none());
    assert_eq!(accounts.transactions(1).len(), 2);
}
