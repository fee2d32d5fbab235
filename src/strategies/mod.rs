//! Trading strategies for Polymarket

pub mod no_bias;

pub use no_bias::{NoBiasConfig, NoBiasStrategy};

use crate::error::Result;
use crate::trading::{OrderApi, OrderManager};
use crate::types::{Market, OrderRequest, OrderResponse, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// A trade a strategy would like to make in one market
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub token_id: String,
    pub outcome: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Expected advantage over the market price, as a probability
    pub edge: Decimal,
    /// Human-readable summary
    pub recommendation: String,
}

impl Signal {
    pub fn order_request(&self) -> OrderRequest {
        OrderRequest::limit(self.token_id.clone(), self.side, self.price, self.size)
    }
}

/// Trait for trading strategies
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Strategy name for display
    fn name(&self) -> &'static str;

    /// Look at one market; no I/O
    fn evaluate(&self, market: &Market) -> Option<Signal>;

    /// Act on a signal through the normal validate/place/log pipeline
    async fn execute<A: OrderApi>(
        &self,
        orders: &OrderManager<A>,
        market: &Market,
        signal: &Signal,
    ) -> Result<OrderResponse> {
        orders
            .place(
                &signal.order_request(),
                &market.tick_size_str(),
                Some(market.neg_risk),
            )
            .await
    }

    /// Evaluate every open market, best edge first
    fn scan<'a>(&self, markets: &'a [Market]) -> Vec<(&'a Market, Signal)> {
        let mut found: Vec<_> = markets
            .iter()
            .filter(|m| m.active && !m.closed)
            .filter_map(|m| self.evaluate(m).map(|s| (m, s)))
            .collect();
        found.sort_by(|a, b| b.1.edge.cmp(&a.1.edge));
        found
    }
}
