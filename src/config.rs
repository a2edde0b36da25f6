//! Configuration module for loading and parsing TOML configuration files.

use crate::market::{Commodity, QuoteModel};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Holdings storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Built-in account service configuration.
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Spread and liquidity impact parameters.
    #[serde(default)]
    pub quote: QuoteModel,
    /// Initial trading controls.
    #[serde(default)]
    pub controls: Vec<ControlConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Holdings storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the store. Holdings live in memory when unset.
    pub holdings_path: Option<PathBuf>,
}

/// Built-in account service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Balance every new account starts with.
    pub opening_balance: f64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            opening_balance: 100_000.0,
        }
    }
}

/// Initial control entry for one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Commodity symbol (case-insensitive).
    pub symbol: String,
    /// Whether trading starts enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Largest quantity accepted in a single order.
    #[serde(default)]
    pub max_order_quantity: Option<f64>,
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "server host cannot be empty".to_string(),
            ));
        }

        if !self.accounts.opening_balance.is_finite() || self.accounts.opening_balance < 0.0 {
            return Err(ConfigError::InvalidValue(
                "accounts opening_balance must be a non-negative number".to_string(),
            ));
        }

        let quote = &self.quote;
        let non_negative = [
            quote.base_spread,
            quote.volatility_spread_factor,
            quote.max_spread,
            quote.impact_scale,
            quote.max_impact,
        ];
        if non_negative.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::InvalidValue(
                "quote parameters must be non-negative numbers".to_string(),
            ));
        }
        if !quote.impact_notional_scale.is_finite() || quote.impact_notional_scale <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "quote impact_notional_scale must be positive".to_string(),
            ));
        }

        for control in &self.controls {
            if control.symbol.parse::<Commodity>().is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "unsupported control symbol {}",
                    control.symbol
                )));
            }
            if let Some(max) = control.max_order_quantity {
                if !max.is_finite() || max <= 0.0 {
                    return Err(ConfigError::InvalidValue(format!(
                        "control {} max_order_quantity must be positive",
                        control.symbol
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 3000

[storage]
holdings_path = "data/holdings.json"

[accounts]
opening_balance = 2500.0

[quote]
base_spread = 0.005
max_spread = 0.02

[[controls]]
symbol = "GOLD"
max_order_quantity = 50.0

[[controls]]
symbol = "cotton"
enabled = false
"#;

        let config = Config::parse(toml_content).expect("should parse");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.storage.holdings_path,
            Some(PathBuf::from("data/holdings.json"))
        );
        assert_eq!(config.accounts.opening_balance, 2500.0);
        assert_eq!(config.quote.base_spread, 0.005);
        assert_eq!(config.quote.max_spread, 0.02);
        assert_eq!(
            config.quote.impact_scale,
            QuoteModel::default().impact_scale
        );
        assert_eq!(config.controls.len(), 2);
        assert!(config.controls[0].enabled);
        assert_eq!(config.controls[0].max_order_quantity, Some(50.0));
        assert!(!config.controls[1].enabled);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").expect("should parse");
        assert_eq!(config.server.port, 8080);
        assert!(config.storage.holdings_path.is_none());
        assert_eq!(config.accounts.opening_balance, 100_000.0);
        assert!(config.controls.is_empty());
        assert_eq!(config.quote, QuoteModel::default());
    }

    #[test]
    fn test_validation_quote_parameters() {
        let result = Config::parse("[quote]\nbase_spread = -0.01\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = Config::parse("[quote]\nimpact_notional_scale = 0.0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validation_unknown_control_symbol() {
        let result = Config::parse("[[controls]]\nsymbol = \"PLATINUM\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validation_negative_max_order() {
        let result = Config::parse("[[controls]]\nsymbol = \"GOLD\"\nmax_order_quantity = -1.0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validation_negative_opening_balance() {
        let config = Config {
            accounts: AccountsConfig {
                opening_balance: -5.0,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/commodity-market.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
