//! Hourly price history for charts.

use crate::error::MarketError;
use crate::market::oracle::{HourBucket, PriceSnapshot};
use crate::market::symbols::Commodity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::RangeInclusive;
use utoipa::ToSchema;

/// Accepted window sizes, in hours.
pub const HISTORY_HOURS: RangeInclusive<i64> = 12..=720;

/// A contiguous run of hourly snapshots, oldest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceHistory {
    /// Commodity symbol.
    pub symbol: Commodity,
    /// Number of points.
    pub hours: i64,
    /// Snapshots, oldest first; the last one is the current hour.
    pub points: Vec<PriceSnapshot>,
}

/// Parses a window size given as text. Integral decimals such as `"48.0"` are accepted.
///
/// # Errors
/// Returns `InvalidWindow` for non-numeric, fractional, or out-of-range values.
pub fn parse_hours(raw: &str) -> Result<i64, MarketError> {
    let raw = raw.trim();
    let hours = match raw.parse::<i64>() {
        Ok(hours) => hours,
        Err(_) => {
            let value: f64 = raw
                .parse()
                .map_err(|_| MarketError::InvalidWindow(raw.to_string()))?;
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(MarketError::InvalidWindow(raw.to_string()));
            }
            value as i64
        }
    };
    validate_hours(hours)
}

fn validate_hours(hours: i64) -> Result<i64, MarketError> {
    if HISTORY_HOURS.contains(&hours) {
        Ok(hours)
    } else {
        Err(MarketError::InvalidWindow(hours.to_string()))
    }
}

/// Builds `hours` snapshots ending at the bucket containing `at`.
///
/// # Errors
/// Returns `InvalidWindow` when `hours` is outside [`HISTORY_HOURS`].
pub fn history(
    commodity: Commodity,
    hours: i64,
    at: DateTime<Utc>,
) -> Result<PriceHistory, MarketError> {
    let hours = validate_hours(hours)?;
    let current = HourBucket::from_datetime(at);

    let points = (0..hours)
        .rev()
        .map(|offset| PriceSnapshot::at_bucket(commodity, current.back(offset)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PriceHistory {
        symbol: commodity,
        hours,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::oracle::parse_timestamp;

    #[test]
    fn test_silver_ten_days() {
        let at = parse_timestamp("2026-02-27T10:10:00Z").unwrap();
        let history = history(Commodity::Silver, 240, at).unwrap();

        assert_eq!(history.points.len(), 240);
        assert_eq!(history.hours, 240);

        let prices: Vec<f64> = history.points.iter().map(|p| p.price).collect();
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(min > 0.0);
        assert!(max > min);
    }

    #[test]
    fn test_points_are_consecutive_and_end_now() {
        let at = parse_timestamp("2026-02-27T10:10:00Z").unwrap();
        let history = history(Commodity::Gold, 12, at).unwrap();

        let last = history.points.last().unwrap();
        assert_eq!(last.hour_bucket, HourBucket::from_datetime(at));
        for pair in history.points.windows(2) {
            assert_eq!(pair[1].hour_bucket.0 - pair[0].hour_bucket.0, 1);
        }
    }

    #[test]
    fn test_window_bounds() {
        let at = Utc::now();
        assert!(history(Commodity::Gold, 12, at).is_ok());
        assert_eq!(history(Commodity::Gold, 720, at).unwrap().points.len(), 720);
        for hours in [0, 11, 721, -5] {
            assert!(matches!(
                history(Commodity::Gold, hours, at),
                Err(MarketError::InvalidWindow(_))
            ));
        }
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_hours("48").unwrap(), 48);
        assert_eq!(parse_hours("48.0").unwrap(), 48);
        for raw in ["48.5", "abc", "", "NaN", "5", "1000"] {
            assert!(
                matches!(parse_hours(raw), Err(MarketError::InvalidWindow(_))),
                "{raw}"
            );
        }
    }
}
