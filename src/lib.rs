//! # Commodity Market Backend
//!
//! A simulated commodities market: deterministic hourly prices, execution
//! quotes with spread and liquidity impact, and a per-user holdings ledger
//! that settles trades against an external cash account service. Served over
//! [Axum](https://crates.io/crates/axum) with OpenAPI/Swagger documentation via
//! [utoipa](https://crates.io/crates/utoipa).
//!
//! ## Key Features
//!
//! - **Stateless Prices**: Every price is a pure function of symbol and hour.
//!   Nothing is stored and restarts reproduce the same market.
//!
//! - **Execution Quotes**: Buy and sell prices widen with trailing volatility
//!   and with order notional.
//!
//! - **Serialized Settlement**: All ledger mutations run one at a time under a
//!   single async mutex; a failed cash posting restores the ledger.
//!
//! - **Trading Controls**: Per-symbol kill switch and maximum order size,
//!   adjustable at runtime.
//!
//! - **OpenAPI Documentation**: Swagger UI at `/swagger-ui/`.
//!
//! ## Architecture
//!
//! ```text
//! request ──► TradingControls ──► QuoteModel ──► HoldingsLedger ──► AccountService
//!                                     ▲                │
//!                         volatility ─┤                ▼
//!                                     │          HoldingsRepository
//!                               price oracle
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`market`] | Price oracle, volatility, quotes and history |
//! | [`ledger`] | Holdings store, account service boundary, trade settlement |
//! | [`controls`] | Per-symbol trading switches and order limits |
//! | [`service`] | Operations exposed to callers |
//! | [`api`] | Route handlers and router configuration |
//! | [`config`] | TOML configuration |
//! | [`error`] | Domain and API error types |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! ### Prices
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/symbols` | Supported commodities |
//! | GET | `/api/v1/prices?symbols=&at=` | Prices with one-unit quotes |
//! | GET | `/api/v1/prices/{symbol}?at=` | Price of one commodity |
//! | GET | `/api/v1/prices/{symbol}/history?hours=&at=` | Hourly history |
//! | GET | `/api/v1/prices/{symbol}/quote?side=&quantity=&at=` | Execution quote |
//!
//! ### Trading
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/v1/trades/buy` | Buy at the current hour's price |
//! | POST | `/api/v1/trades/sell` | Sell at the current hour's price |
//! | GET | `/api/v1/users/{user_id}/portfolio` | Holdings with unrealized P/L |
//! | GET | `/api/v1/users/{user_id}/account` | Cash balance |
//!
//! ### Controls
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/v1/controls` | Controls for every commodity |
//! | PUT | `/api/v1/controls/{symbol}` | Replace one commodity's control |
//!
//! ## Example Usage
//!
//! ```bash
//! # In-memory holdings on 0.0.0.0:8080
//! cargo run
//!
//! # With a config file and custom port
//! CONFIG_PATH=market.toml PORT=3000 cargo run
//!
//! # Price of gold at a fixed time
//! curl "http://localhost:8080/api/v1/prices/GOLD?at=2026-02-27T10:10:00Z"
//!
//! # Buy 2.5 ounces of gold
//! curl -X POST http://localhost:8080/api/v1/trades/buy \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": 1, "symbol": "GOLD", "quantity": 2.5}'
//! ```
//!
//! ## Library Usage
//!
//! ```rust
//! use commodity_market_backend::market::{Commodity, HourBucket, price_for_bucket};
//!
//! let bucket = HourBucket::from_millis(1_772_187_000_000);
//! let price = price_for_bucket(Commodity::Gold, bucket);
//! assert!(price >= Commodity::Gold.config().floor_price);
//! ```

pub mod api;
pub mod config;
pub mod controls;
pub mod error;
pub mod ledger;
pub mod market;
pub mod models;
pub mod service;
pub mod state;
