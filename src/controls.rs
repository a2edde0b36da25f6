//! Per-symbol trading switches and order size limits.

use crate::config::ControlConfig;
use crate::error::MarketError;
use crate::market::Commodity;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use utoipa::ToSchema;

/// Control settings for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SymbolControl {
    /// Whether trading is allowed.
    pub enabled: bool,
    /// Largest quantity accepted in a single order, if limited.
    pub max_order_quantity: Option<f64>,
}

impl Default for SymbolControl {
    fn default() -> Self {
        Self {
            enabled: true,
            max_order_quantity: None,
        }
    }
}

/// Runtime-adjustable trading controls. Symbols without an entry are enabled
/// and unlimited.
#[derive(Debug, Default)]
pub struct TradingControls {
    controls: RwLock<HashMap<Commodity, SymbolControl>>,
}

impl TradingControls {
    /// Creates controls with every symbol enabled and unlimited.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates controls from configuration entries.
    ///
    /// # Errors
    /// Returns `InvalidSymbol` if an entry names an unsupported commodity.
    pub fn from_config(entries: &[ControlConfig]) -> Result<Self, MarketError> {
        let mut controls = HashMap::new();
        for entry in entries {
            let commodity: Commodity = entry.symbol.parse()?;
            controls.insert(
                commodity,
                SymbolControl {
                    enabled: entry.enabled,
                    max_order_quantity: entry.max_order_quantity,
                },
            );
        }

        Ok(Self {
            controls: RwLock::new(controls),
        })
    }

    /// Current control for a symbol.
    #[must_use]
    pub fn get(&self, commodity: Commodity) -> SymbolControl {
        self.controls
            .read()
            .get(&commodity)
            .copied()
            .unwrap_or_default()
    }

    /// Replaces the control for a symbol.
    pub fn set(&self, commodity: Commodity, control: SymbolControl) {
        self.controls.write().insert(commodity, control);

        info!(
            "Trading {} for {} (max order {:?})",
            if control.enabled { "enabled" } else { "disabled" },
            commodity,
            control.max_order_quantity
        );
    }

    /// Controls for every supported symbol, in listing order.
    #[must_use]
    pub fn all(&self) -> Vec<(Commodity, SymbolControl)> {
        let controls = self.controls.read();
        Commodity::ALL
            .iter()
            .map(|c| (*c, controls.get(c).copied().unwrap_or_default()))
            .collect()
    }

    /// Checks whether an order may proceed.
    ///
    /// # Errors
    /// `TradingDisabled` if the symbol is switched off, `OrderTooLarge` if the
    /// quantity exceeds the configured maximum.
    pub fn check(&self, commodity: Commodity, quantity: f64) -> Result<(), MarketError> {
        let control = self.get(commodity);
        if !control.enabled {
            return Err(MarketError::TradingDisabled(commodity.to_string()));
        }

        match control.max_order_quantity {
            Some(max) if quantity > max => Err(MarketError::OrderTooLarge {
                symbol: commodity.to_string(),
                requested: quantity,
                max,
            }),
            _ => Ok(()),
        }
    }
}
