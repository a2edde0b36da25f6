//! Deterministic commodity pricing: oracle, volatility, quotes and history.

mod hash;
mod history;
mod oracle;
mod quote;
mod symbols;
mod volatility;

pub use hash::{ORACLE_SEED, fnv1a};
pub use history::{HISTORY_HOURS, PriceHistory, history, parse_hours};
pub use oracle::{
    HourBucket, MILLIS_PER_HOUR, PriceSnapshot, parse_timestamp, price_at, price_for_bucket,
    round_to,
};
pub use quote::{ExecutionQuote, QuoteModel, TradeSide};
pub use symbols::{Commodity, SymbolConfig};
pub use volatility::{VOLATILITY_WINDOW_HOURS, volatility_ratio};
