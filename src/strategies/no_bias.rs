//! NO Bias Strategy
//!
//! Most binary markets resolve NO (78.4% historically). Markets get created by
//! people hoping YES happens, which inflates YES prices. Buy NO when it
//! trades below the historical resolution rate.

use super::{Signal, Strategy};
use crate::types::{Market, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct NoBiasConfig {
    /// Share of binary markets that resolved NO
    pub historical_no_rate: Decimal,
    /// Minimum edge (rate - NO price) worth trading
    pub min_edge: Decimal,
    /// YES must be inside this band, otherwise the market is already decided
    pub min_yes_price: Decimal,
    pub max_yes_price: Decimal,
    /// Shares per signal
    pub order_size: Decimal,
}

impl Default for NoBiasConfig {
    fn default() -> Self {
        Self {
            historical_no_rate: dec!(0.784),
            min_edge: dec!(0.10),
            min_yes_price: dec!(0.20),
            max_yes_price: dec!(0.80),
            order_size: dec!(10),
        }
    }
}

pub struct NoBiasStrategy {
    config: NoBiasConfig,
}

impl NoBiasStrategy {
    pub fn new(config: NoBiasConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NoBiasConfig {
        &self.config
    }
}

impl Strategy for NoBiasStrategy {
    fn name(&self) -> &'static str {
        "NO Bias"
    }

    fn evaluate(&self, market: &Market) -> Option<Signal> {
        let yes = market.yes_token()?;
        let no = market.no_token()?;

        if yes.price < self.config.min_yes_price || yes.price > self.config.max_yes_price {
            return None;
        }
        if no.price <= Decimal::ZERO {
            return None;
        }

        let edge = self.config.historical_no_rate - no.price;
        if edge < self.config.min_edge {
            return None;
        }

        let recommendation = format!(
            "BUY NO at {:.0}c | {:.1}% edge vs {:.1}% base rate",
            no.price * dec!(100),
            edge * dec!(100),
            self.config.historical_no_rate * dec!(100),
        );

        Some(Signal {
            token_id: no.token_id.clone(),
            outcome: no.outcome.clone(),
            side: Side::Buy,
            price: no.price,
            size: self.config.order_size,
            edge,
            recommendation,
        })
    }
}
