//! Trailing realized volatility measured on the oracle's own output.

use crate::market::oracle::{HourBucket, price_for_bucket};
use crate::market::symbols::Commodity;

/// Number of hourly buckets in the trailing window, current bucket included.
pub const VOLATILITY_WINDOW_HOURS: i64 = 24;

/// Population standard deviation of the trailing window divided by its mean.
///
/// Returns 0 when the mean is not positive.
#[must_use]
pub fn volatility_ratio(commodity: Commodity, bucket: HourBucket) -> f64 {
    let prices: Vec<f64> = (0..VOLATILITY_WINDOW_HOURS)
        .rev()
        .map(|offset| price_for_bucket(commodity, bucket.back(offset)))
        .collect();

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }

    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}
