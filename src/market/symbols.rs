//! Supported commodities and their static pricing parameters.

use crate::error::MarketError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Static pricing parameters for one commodity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolConfig {
    /// Human-readable name.
    pub name: &'static str,
    /// Unit the price is quoted in.
    pub unit: &'static str,
    /// Price around which the simulated market oscillates.
    pub base_price: f64,
    /// Amplitude of the ~14 day cycle (log-return units).
    pub medium_amplitude: f64,
    /// Amplitude of the ~120 day cycle (log-return units).
    pub long_amplitude: f64,
    /// Amplitude of per-hour noise (log-return units).
    pub noise_amplitude: f64,
    /// The simulated price never goes below this value.
    pub floor_price: f64,
}

/// A tradable commodity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Commodity {
    /// Gold.
    Gold,
    /// Silver.
    Silver,
    /// Copper.
    Copper,
    /// Wheat.
    Wheat,
    /// Corn.
    Corn,
    /// Soybeans.
    Soybeans,
    /// Coffee.
    Coffee,
    /// Cotton.
    Cotton,
}

impl Commodity {
    /// Every supported commodity, in listing order.
    pub const ALL: [Commodity; 8] = [
        Commodity::Gold,
        Commodity::Silver,
        Commodity::Copper,
        Commodity::Wheat,
        Commodity::Corn,
        Commodity::Soybeans,
        Commodity::Coffee,
        Commodity::Cotton,
    ];

    /// Canonical upper-case symbol. Also the symbol component of oracle hash keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gold => "GOLD",
            Self::Silver => "SILVER",
            Self::Copper => "COPPER",
            Self::Wheat => "WHEAT",
            Self::Corn => "CORN",
            Self::Soybeans => "SOYBEANS",
            Self::Coffee => "COFFEE",
            Self::Cotton => "COTTON",
        }
    }

    /// Static pricing parameters for this commodity.
    #[must_use]
    pub fn config(&self) -> &'static SymbolConfig {
        match self {
            Self::Gold => &GOLD,
            Self::Silver => &SILVER,
            Self::Copper => &COPPER,
            Self::Wheat => &WHEAT,
            Self::Corn => &CORN,
            Self::Soybeans => &SOYBEANS,
            Self::Coffee => &COFFEE,
            Self::Cotton => &COTTON,
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commodity {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MarketError::InvalidSymbol(s.to_string()))
    }
}

const GOLD: SymbolConfig = SymbolConfig {
    name: "Gold",
    unit: "troy oz",
    base_price: 2050.0,
    medium_amplitude: 0.035,
    long_amplitude: 0.08,
    noise_amplitude: 0.004,
    floor_price: 900.0,
};

const SILVER: SymbolConfig = SymbolConfig {
    name: "Silver",
    unit: "troy oz",
    base_price: 24.5,
    medium_amplitude: 0.05,
    long_amplitude: 0.11,
    noise_amplitude: 0.007,
    floor_price: 9.0,
};

const COPPER: SymbolConfig = SymbolConfig {
    name: "Copper",
    unit: "lb",
    base_price: 3.9,
    medium_amplitude: 0.045,
    long_amplitude: 0.10,
    noise_amplitude: 0.006,
    floor_price: 1.5,
};

const WHEAT: SymbolConfig = SymbolConfig {
    name: "Wheat",
    unit: "bushel",
    base_price: 6.2,
    medium_amplitude: 0.06,
    long_amplitude: 0.13,
    noise_amplitude: 0.009,
    floor_price: 2.5,
};

const CORN: SymbolConfig = SymbolConfig {
    name: "Corn",
    unit: "bushel",
    base_price: 4.7,
    medium_amplitude: 0.055,
    long_amplitude: 0.12,
    noise_amplitude: 0.008,
    floor_price: 2.0,
};

const SOYBEANS: SymbolConfig = SymbolConfig {
    name: "Soybeans",
    unit: "bushel",
    base_price: 12.4,
    medium_amplitude: 0.05,
    long_amplitude: 0.11,
    noise_amplitude: 0.008,
    floor_price: 5.5,
};

const COFFEE: SymbolConfig = SymbolConfig {
    name: "Coffee",
    unit: "lb",
    base_price: 1.85,
    medium_amplitude: 0.07,
    long_amplitude: 0.15,
    noise_amplitude: 0.011,
    floor_price: 0.7,
};

const COTTON: SymbolConfig = SymbolConfig {
    name: "Cotton",
    unit: "lb",
    base_price: 0.82,
    medium_amplitude: 0.06,
    long_amplitude: 0.12,
    noise_amplitude: 0.009,
    floor_price: 0.35,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("gold".parse::<Commodity>().unwrap(), Commodity::Gold);
        assert_eq!("Silver".parse::<Commodity>().unwrap(), Commodity::Silver);
        assert_eq!(" CORN ".parse::<Commodity>().unwrap(), Commodity::Corn);
    }

    #[test]
    fn test_parse_unknown_symbol() {
        let err = "PLATINUM".parse::<Commodity>().unwrap_err();
        assert!(matches!(err, MarketError::InvalidSymbol(ref s) if s == "PLATINUM"));
    }

    #[test]
    fn test_configs_are_sane() {
        for commodity in Commodity::ALL {
            let cfg = commodity.config();
            assert!(cfg.base_price > 0.0, "{commodity}");
            assert!(cfg.floor_price > 0.0 && cfg.floor_price < cfg.base_price);
            assert!(cfg.noise_amplitude > 0.0);
        }
    }

    #[test]
    fn test_serde_uses_symbol() {
        let json = serde_json::to_string(&Commodity::Soybeans).unwrap();
        assert_eq!(json, "\"SOYBEANS\"");
    }
}
