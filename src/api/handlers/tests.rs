//! Unit tests for price, trade and portfolio handlers.

use super::*;
use crate::market::Commodity;
use axum::body::Body;
use axum::extract::FromRequest;
use axum::http::{Request, StatusCode, header};
use axum::response::IntoResponse;

const AT: &str = "2026-02-27T10:10:00Z";

fn state() -> Arc<AppState> {
    Arc::new(AppState::new())
}

fn time_query(at: &str) -> Query<TimeQuery> {
    Query(TimeQuery {
        at: Some(at.to_string()),
    })
}

// ============================================================================
// Time Parsing Tests
// ============================================================================

#[test]
fn test_parse_at() {
    assert!(parse_at(None).unwrap().is_none());
    assert_eq!(
        parse_at(Some("1772186400000")).unwrap(),
        parse_at(Some("2026-02-27T10:00:00Z")).unwrap()
    );
    assert!(matches!(
        parse_at(Some("yesterday")),
        Err(MarketError::InvalidTime(_))
    ));
}

// ============================================================================
// Price Handler Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let Json(response) = health_check().await;
    assert_eq!(response.status, "healthy");
    assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_list_symbols() {
    let Json(response) = list_symbols(State(state())).await;
    assert_eq!(response.symbols.len(), Commodity::ALL.len());
}

#[tokio::test]
async fn test_get_price_same_hour() {
    let state = state();
    let Json(early) = get_price(
        State(state.clone()),
        Path("GOLD".to_string()),
        time_query("2026-02-27T10:10:00Z"),
    )
    .await
    .unwrap();
    let Json(late) = get_price(
        State(state),
        Path("gold".to_string()),
        time_query("2026-02-27T10:55:00Z"),
    )
    .await
    .unwrap();

    assert_eq!(early, late);
}

#[tokio::test]
async fn test_get_price_invalid_time() {
    let result = get_price(
        State(state()),
        Path("GOLD".to_string()),
        time_query("not-a-time"),
    )
    .await;
    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::InvalidTime(_)))
    ));
}

#[tokio::test]
async fn test_get_prices_subset() {
    let Json(response) = get_prices(
        State(state()),
        Query(PricesQuery {
            symbols: Some("silver,cotton".to_string()),
            at: Some(AT.to_string()),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.prices.len(), 2);
    assert_eq!(response.prices[0].symbol, Commodity::Silver);
    assert_eq!(response.prices[1].symbol, Commodity::Cotton);
}

#[tokio::test]
async fn test_get_price_history_default_and_invalid_window() {
    let state = state();
    let Json(history) = get_price_history(
        State(state.clone()),
        Path("CORN".to_string()),
        Query(HistoryQuery {
            hours: None,
            at: Some(AT.to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(history.points.len() as i64, DEFAULT_HISTORY_HOURS);

    let result = get_price_history(
        State(state),
        Path("CORN".to_string()),
        Query(HistoryQuery {
            hours: Some("36.5".to_string()),
            at: Some(AT.to_string()),
        }),
    )
    .await;
    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::InvalidWindow(_)))
    ));
}

#[tokio::test]
async fn test_get_quote_invalid_side() {
    let result = get_quote(
        State(state()),
        Path("GOLD".to_string()),
        Ok(Query(QuoteQuery {
            side: "hold".to_string(),
            quantity: "1".to_string(),
            at: None,
        })),
    )
    .await;
    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::InvalidSide(_)))
    ));
}

#[tokio::test]
async fn test_get_quote_buy() {
    let Json(quote) = get_quote(
        State(state()),
        Path("GOLD".to_string()),
        Ok(Query(QuoteQuery {
            side: "buy".to_string(),
            quantity: "2".to_string(),
            at: Some(AT.to_string()),
        })),
    )
    .await
    .unwrap();
    assert_eq!(quote.side, TradeSide::Buy);
    assert_eq!(quote.execution_price, quote.buy_price);
}

// ============================================================================
// Trade and Portfolio Handler Tests
// ============================================================================

#[tokio::test]
async fn test_buy_sell_and_portfolio() {
    let state = state();
    let request = TradeRequest {
        user_id: 11,
        symbol: "silver".to_string(),
        quantity: 10.0,
    };

    let Json(bought) = buy(State(state.clone()), Ok(Json(request.clone())))
        .await
        .unwrap();
    assert_eq!(bought.holding.as_ref().map(|h| h.quantity), Some(10.0));

    let Json(portfolio) = get_portfolio(
        State(state.clone()),
        Path("11".to_string()),
        Query(TimeQuery::default()),
    )
    .await
    .unwrap();
    assert_eq!(portfolio.summary.position_count, 1);

    let Json(sold) = sell(State(state.clone()), Ok(Json(request)))
        .await
        .unwrap();
    assert!(sold.holding.is_none());

    let Json(portfolio) = get_portfolio(
        State(state),
        Path("11".to_string()),
        Query(TimeQuery::default()),
    )
    .await
    .unwrap();
    assert!(portfolio.positions.is_empty());
}

#[tokio::test]
async fn test_sell_without_holdings() {
    let result = sell(
        State(state()),
        Ok(Json(TradeRequest {
            user_id: 12,
            symbol: "GOLD".to_string(),
            quantity: 1.0,
        })),
    )
    .await;
    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::NoHoldings(_)))
    ));
}

// ============================================================================
// Malformed Input Tests
// ============================================================================

async fn json_rejection(body: &'static str) -> JsonRejection {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/trades/buy")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    Json::<TradeRequest>::from_request(request, &())
        .await
        .unwrap_err()
}

#[test]
fn test_parse_user_id() {
    assert_eq!(parse_user_id("42").unwrap(), 42);
    for bad in ["-1", "abc", "0", "", "1.5"] {
        assert!(
            matches!(parse_user_id(bad), Err(MarketError::InvalidUser(_))),
            "{bad}"
        );
    }
}

#[tokio::test]
async fn test_get_portfolio_invalid_user_path() {
    for raw in ["-1", "abc"] {
        let err = get_portfolio(
            State(state()),
            Path(raw.to_string()),
            Query(TimeQuery::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Market(MarketError::InvalidUser(_))));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_get_quote_non_numeric_quantity() {
    let result = get_quote(
        State(state()),
        Path("GOLD".to_string()),
        Ok(Query(QuoteQuery {
            side: "buy".to_string(),
            quantity: "lots".to_string(),
            at: None,
        })),
    )
    .await;
    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::InvalidQuantity(_)))
    ));
}

#[tokio::test]
async fn test_trade_body_with_bad_user_id_gets_json_error() {
    for body in [
        r#"{"user_id": -1, "symbol": "GOLD", "quantity": 1.0}"#,
        r#"{"user_id": "abc", "symbol": "GOLD", "quantity": 1.0}"#,
        r#"{"user_id": 3, "symbol": "GOLD", "quantity": "many"}"#,
    ] {
        let rejection = json_rejection(body).await;
        let err = buy(State(state()), Err(rejection)).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["code"], "INVALID_REQUEST");
        assert_eq!(json["category"], "invalid input");
    }
}

// ============================================================================
// Account Handler Tests
// ============================================================================

#[tokio::test]
async fn test_get_account_tracks_trades() {
    let state = state();
    let Json(opened) = get_account(State(state.clone()), Path("21".to_string()))
        .await
        .unwrap();
    assert_eq!(opened.user_id, 21);

    let request = TradeRequest {
        user_id: 21,
        symbol: "CORN".to_string(),
        quantity: 10.0,
    };
    let Json(bought) = buy(State(state.clone()), Ok(Json(request))).await.unwrap();

    let Json(account) = get_account(State(state), Path("21".to_string()))
        .await
        .unwrap();
    assert_eq!(account.balance, bought.balance_after);
    assert!(account.balance < opened.balance);
}

#[tokio::test]
async fn test_get_account_invalid_user() {
    let result = get_account(State(state()), Path("0".to_string())).await;
    assert!(matches!(
        result,
        Err(ApiError::Market(MarketError::InvalidUser(_)))
    ));
}
