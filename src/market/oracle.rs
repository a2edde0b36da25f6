//! Deterministic price oracle.
//!
//! A price is a pure function of `(commodity, hour bucket)`. Nothing is stored:
//! the same bucket produces the same price in every process, forever.

use crate::error::MarketError;
use crate::market::hash::{draw, draw_at};
use crate::market::symbols::{Commodity, SymbolConfig};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::f64::consts::TAU;
use utoipa::ToSchema;

/// Milliseconds in one hour bucket.
pub const MILLIS_PER_HOUR: i64 = 3_600_000;

const HOURS_PER_DAY: f64 = 24.0;
const MIN_LOG_RETURN: f64 = -0.85;
const MAX_LOG_RETURN: f64 = 1.2;

const EVENT_SLOT_HOURS: f64 = 216.0;
const EVENT_MAX_AMPLITUDE: f64 = 0.14;
const REBOUND_DELAY_HOURS: f64 = 10.0;
const REBOUND_FRACTION: f64 = 0.45;

/// Index of a one-hour window since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct HourBucket(pub i64);

impl HourBucket {
    /// Bucket containing the given epoch milliseconds (floored, also for negative values).
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        Self(ms.div_euclid(MILLIS_PER_HOUR))
    }

    /// Bucket containing the given instant.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_millis(at.timestamp_millis())
    }

    /// The bucket `hours` before this one.
    #[must_use]
    pub fn back(self, hours: i64) -> Self {
        Self(self.0 - hours)
    }

    /// UTC instant at which the bucket starts.
    ///
    /// # Errors
    /// Returns `InvalidTime` if the bucket lies outside the representable calendar.
    pub fn start(&self) -> Result<DateTime<Utc>, MarketError> {
        self.0
            .checked_mul(MILLIS_PER_HOUR)
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| MarketError::InvalidTime(format!("hour bucket {}", self.0)))
    }

    /// ISO-8601 start of the bucket, millisecond precision with a `Z` suffix.
    ///
    /// # Errors
    /// See [`HourBucket::start`].
    pub fn start_iso(&self) -> Result<String, MarketError> {
        Ok(self.start()?.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Parses a caller-supplied time: RFC 3339 or integer epoch milliseconds.
///
/// # Errors
/// Returns `InvalidTime` when neither form matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MarketError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| MarketError::InvalidTime(raw.to_string()))
}

/// The oracle's view of one commodity in one hour.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PriceSnapshot {
    /// Commodity symbol.
    pub symbol: Commodity,
    /// Hour bucket index.
    #[schema(value_type = i64)]
    pub hour_bucket: HourBucket,
    /// Start of the hour, ISO-8601 UTC.
    pub hour_start_utc: String,
    /// Mid price.
    pub price: f64,
}

impl PriceSnapshot {
    /// Builds the snapshot for a bucket.
    ///
    /// # Errors
    /// Returns `InvalidTime` if the bucket start is not representable.
    pub fn at_bucket(commodity: Commodity, bucket: HourBucket) -> Result<Self, MarketError> {
        Ok(Self {
            symbol: commodity,
            hour_bucket: bucket,
            hour_start_utc: bucket.start_iso()?,
            price: price_for_bucket(commodity, bucket),
        })
    }
}

/// Price of a symbol at a wall-clock time.
///
/// # Errors
/// Returns `InvalidSymbol` for unsupported symbols.
pub fn price_at(symbol: &str, at: DateTime<Utc>) -> Result<f64, MarketError> {
    let commodity: Commodity = symbol.parse()?;
    Ok(price_for_bucket(commodity, HourBucket::from_datetime(at)))
}

/// Price of a commodity for an hour bucket, rounded to cents and never below the floor.
#[must_use]
pub fn price_for_bucket(commodity: Commodity, bucket: HourBucket) -> f64 {
    let cfg = commodity.config();
    let log_return =
        log_return(commodity.as_str(), cfg, bucket.0).clamp(MIN_LOG_RETURN, MAX_LOG_RETURN);
    let raw = (cfg.base_price * log_return.exp()).max(cfg.floor_price);
    round_to(raw, 2)
}

/// Rounds half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn log_return(symbol: &str, cfg: &SymbolConfig, bucket: i64) -> f64 {
    let t = bucket as f64;
    let wave = |label: &str, period_days: f64| {
        (TAU * t / (period_days * HOURS_PER_DAY) + TAU * draw(symbol, label)).sin()
    };

    let medium = cfg.medium_amplitude * wave("medium-cycle", 14.0);
    let long = cfg.long_amplitude * wave("long-cycle", 120.0);
    let trend = 0.6 * cfg.long_amplitude * wave("trend-cycle", 95.0);
    let momentum = 0.45 * cfg.medium_amplitude * wave("momentum-cycle", 35.0);
    // tanh keeps regime shifts bounded however the cycles line up.
    let regime = 0.16 * (1.8 * wave("regime", 180.0)).tanh();
    let clustering =
        cfg.noise_amplitude * (1.6 + wave("vol-envelope", 11.0)) * wave("vol-carrier", 3.0);
    let events = event_term(symbol, t);
    let noise = cfg.noise_amplitude * (2.0 * draw_at(symbol, "noise", bucket) - 1.0);
    let jitter =
        1.75 * cfg.noise_amplitude * (2.0 * draw_at(symbol, "micro-jitter", bucket) - 1.0);

    medium + long + trend + momentum + regime + clustering + events + noise + jitter
}

/// Shock pulses with a delayed partial rebound, summed over the slots around `t`.
fn event_term(symbol: &str, t: f64) -> f64 {
    let slot = (t / EVENT_SLOT_HOURS).floor() as i64;

    (slot - 1..=slot + 1)
        .map(|s| {
            let center = s as f64 * EVENT_SLOT_HOURS
                + draw_at(symbol, "event-center", s) * EVENT_SLOT_HOURS;
            let amplitude =
                (2.0 * draw_at(symbol, "event-amplitude", s) - 1.0) * EVENT_MAX_AMPLITUDE;
            let width = 6.0 + 18.0 * draw_at(symbol, "event-width", s);

            let shock = amplitude * gaussian(t - center, width);
            let rebound = -REBOUND_FRACTION
                * amplitude
                * gaussian(t - center - REBOUND_DELAY_HOURS, 1.5 * width);
            shock + rebound
        })
        .sum()
}

fn gaussian(offset: f64, width: f64) -> f64 {
    (-(offset * offset) / (2.0 * width * width)).exp()
}
