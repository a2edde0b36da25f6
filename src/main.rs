//! Commodity Market Backend Server
//!
//! REST API server for the simulated commodities market.

use commodity_market_backend::api::create_router;
use commodity_market_backend::config::Config;
use commodity_market_backend::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use commodity_market_backend::controls::SymbolControl;
use commodity_market_backend::error::ErrorResponse;
use commodity_market_backend::ledger::{
    Account, HoldingView, Portfolio, PortfolioPosition, PortfolioSummary, TradeSettlement,
};
use commodity_market_backend::market::{
    Commodity, ExecutionQuote, PriceHistory, PriceSnapshot, TradeSide,
};
use commodity_market_backend::models::{
    ControlEntry, ControlsResponse, HealthResponse, MarketPrice, PricesResponse, SymbolInfo,
    SymbolsListResponse, TradeRequest, UpdateControlRequest,
};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        commodity_market_backend::api::handlers::health_check,
        commodity_market_backend::api::handlers::list_symbols,
        commodity_market_backend::api::handlers::get_prices,
        commodity_market_backend::api::handlers::get_price,
        commodity_market_backend::api::handlers::get_price_history,
        commodity_market_backend::api::handlers::get_quote,
        commodity_market_backend::api::handlers::buy,
        commodity_market_backend::api::handlers::sell,
        commodity_market_backend::api::handlers::get_portfolio,
        commodity_market_backend::api::handlers::get_account,
        commodity_market_backend::api::controls::get_controls,
        commodity_market_backend::api::controls::update_control,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            Commodity,
            TradeSide,
            SymbolInfo,
            SymbolsListResponse,
            MarketPrice,
            PricesResponse,
            PriceSnapshot,
            PriceHistory,
            ExecutionQuote,
            TradeRequest,
            TradeSettlement,
            HoldingView,
            Portfolio,
            PortfolioPosition,
            Account,
            PortfolioSummary,
            SymbolControl,
            ControlEntry,
            ControlsResponse,
            UpdateControlRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Prices", description = "Simulated commodity prices, history and quotes"),
        (name = "Trades", description = "Buy and sell against the holdings ledger"),
        (name = "Portfolio", description = "Holdings valuation"),
        (name = "Controls", description = "Per-symbol trading controls"),
    ),
    info(
        title = "Commodity Market API",
        version = "0.1.0",
        description = "REST API for the simulated commodities market",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = match std::env::var("CONFIG_PATH") {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path)?
        }
        Err(_) => Config::default(),
    };

    // Environment overrides
    if let Ok(host) = std::env::var("HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT must be a valid number: {}", e))?;
    }

    let host = config.server.host.clone();
    let port = config.server.port;

    // Create application state
    let state = Arc::new(AppState::from_config(config)?);

    info!("Starting Commodity Market Backend on {}:{}", host, port);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        host, port
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
