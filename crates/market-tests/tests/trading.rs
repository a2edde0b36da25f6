//! Buy/sell settlement scenarios against in-memory collaborators.

use commodity_market_backend::controls::{SymbolControl, TradingControls};
use commodity_market_backend::error::MarketError;
use commodity_market_backend::ledger::{AccountService, HoldingsRepository, TransactionType};
use commodity_market_backend::market::{Commodity, round_to};
use commodity_market_backend::service::MarketService;
use market_tests::{OPENING_BALANCE, at, memory_ledger};
use std::sync::Arc;

#[tokio::test]
async fn test_gold_round_trip_across_hours() {
    let (ledger, repository, accounts) = memory_ledger(OPENING_BALANCE);

    let bought = ledger
        .buy(1, "GOLD", 2.5, at("2026-02-27T10:10:00Z"))
        .await
        .unwrap();
    assert_eq!(bought.total, round_to(bought.execution_price * 2.5, 2));

    let sold = ledger
        .sell(1, "gold", 2.5, at("2026-03-03T15:40:00Z"))
        .await
        .unwrap();

    assert!(sold.holding.is_none());
    assert_eq!(sold.cost_basis, Some(bought.total));
    assert_eq!(
        sold.realized_pnl,
        Some(round_to(sold.total - bought.total, 2))
    );
    assert!(ledger.portfolio(1, at("2026-03-03T16:00:00Z")).await.unwrap().positions.is_empty());

    let account = accounts.get_account(1).await.unwrap();
    assert_eq!(
        account.balance,
        round_to(round_to(OPENING_BALANCE - bought.total, 2) + sold.total, 2)
    );

    let transactions = accounts.transactions(1);
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].kind, TransactionType::Expense);
    assert_eq!(transactions[1].kind, TransactionType::Income);
    assert_ne!(transactions[0].reference_id, transactions[1].reference_id);
    assert!(transactions[0].reference_id.starts_with("commodity-buy-"));
    assert!(transactions[1].reference_id.starts_with("commodity-sell-"));

    assert!(repository.read_store().await.unwrap().is_some());
}

#[tokio::test]
async fn test_insufficient_funds_has_no_side_effects() {
    let (ledger, repository, accounts) = memory_ledger(500.0);
    let before = repository.read_store().await.unwrap();

    let err = ledger
        .buy(4, "GOLD", 1.0, at("2026-02-27T10:10:00Z"))
        .await
        .unwrap_err();

    assert!(matches!(err, MarketError::InsufficientFunds { .. }));
    assert!(err.to_string().starts_with("trade rejected: "));
    assert_eq!(repository.read_store().await.unwrap(), before);
    assert!(accounts.transactions(4).is_empty());
    assert_eq!(accounts.get_account(4).await.unwrap().balance, 500.0);
}

#[tokio::test]
async fn test_buys_accumulate_cost_basis() {
    let (ledger, _repository, _accounts) = memory_ledger(OPENING_BALANCE);
    let times = [
        "2026-02-27T10:10:00Z",
        "2026-03-01T02:00:00Z",
        "2026-03-09T18:30:00Z",
    ];
    let quantities = [1.25, 0.5, 3.0];

    let mut spent = 0.0;
    for (time, quantity) in times.iter().zip(quantities) {
        let settlement = ledger.buy(2, "COPPER", quantity, at(time)).await.unwrap();
        spent += settlement.total;
    }

    let holding = ledger.holding(2, "COPPER").await.unwrap().unwrap();
    assert_eq!(holding.quantity, 4.75);
    assert!((holding.total_invested - spent).abs() < 0.01);
    assert_eq!(
        holding.avg_buy_price,
        round_to(holding.total_invested / holding.quantity, 4)
    );
}

#[tokio::test]
async fn test_partial_sells_then_close() {
    let (ledger, _repository, _accounts) = memory_ledger(OPENING_BALANCE);
    let bought = ledger
        .buy(3, "COTTON", 1_000.0, at("2026-02-27T10:10:00Z"))
        .await
        .unwrap();

    let first = ledger
        .sell(3, "COTTON", 400.0, at("2026-03-02T10:00:00Z"))
        .await
        .unwrap();
    let remaining = first.holding.clone().unwrap();
    assert_eq!(remaining.quantity, 600.0);
    assert_eq!(first.cost_basis, Some(round_to(bought.total * 0.4, 2)));

    let second = ledger
        .sell(3, "COTTON", 600.0, at("2026-03-04T10:00:00Z"))
        .await
        .unwrap();
    assert!(second.holding.is_none());

    let released = first.cost_basis.unwrap() + second.cost_basis.unwrap();
    assert!((released - bought.total).abs() < 0.011);
}

#[tokio::test]
async fn test_portfolio_is_read_only() {
    let (ledger, repository, _accounts) = memory_ledger(OPENING_BALANCE);
    ledger
        .buy(5, "WHEAT", 20.0, at("2026-02-27T10:10:00Z"))
        .await
        .unwrap();
    let before = repository.read_store().await.unwrap();

    let portfolio = ledger.portfolio(5, at("2026-04-01T00:00:00Z")).await.unwrap();
    assert_eq!(portfolio.positions.len(), 1);
    assert_eq!(portfolio.positions[0].symbol, Commodity::Wheat);
    assert_eq!(repository.read_store().await.unwrap(), before);
}

#[tokio::test]
async fn test_controls_gate_service_trades() {
    let (ledger, _repository, accounts) = memory_ledger(OPENING_BALANCE);
    let controls = Arc::new(TradingControls::new());
    let service = MarketService::new(ledger, controls.clone());

    controls.set(
        Commodity::Soybeans,
        SymbolControl {
            enabled: true,
            max_order_quantity: Some(50.0),
        },
    );
    assert!(matches!(
        service.buy(6, "SOYBEANS", 50.0001).await,
        Err(MarketError::OrderTooLarge { .. })
    ));
    service.buy(6, "SOYBEANS", 50.0).await.unwrap();

    controls.set(
        Commodity::Soybeans,
        SymbolControl {
            enabled: false,
            max_order_quantity: None,
        },
    );
    assert!(matches!(
        service.sell(6, "SOYBEANS", 10.0).await,
        Err(MarketError::TradingDisabled(_))
    ));

    assert_eq!(accounts.transactions(6).len(), 1);
}
