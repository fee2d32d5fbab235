//! Order validation, placement and logging

use crate::error::{Error, Result};
use crate::trading::trade_log::{fixed, TradeLedger};
use crate::types::{OpenOrder, OrderBook, OrderRequest, OrderResponse, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

pub const PRICE_MIN: Decimal = dec!(0.01);
pub const PRICE_MAX: Decimal = dec!(0.99);

/// Tick size used when the caller doesn't know the market's own
pub const DEFAULT_TICK_SIZE: &str = "0.01";

/// Remote order API. Implemented by the CLOB client; faked in tests.
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn place_limit_order(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
        tick_size: &str,
        neg_risk: Option<bool>,
    ) -> Result<OrderResponse>;

    async fn open_orders(&self, market: Option<&str>, asset_id: Option<&str>) -> Result<Vec<OpenOrder>>;

    async fn cancel(&self, order_id: &str) -> Result<bool>;

    async fn cancel_all(&self) -> Result<bool>;

    async fn order_book(&self, token_id: &str) -> Result<OrderBook>;

    async fn price(&self, token_id: &str, side: Side) -> Result<Decimal>;

    async fn midpoint(&self, token_id: &str) -> Result<Decimal>;
}

/// Check price range, size and notional, in that order.
///
/// Pure: no I/O, callable before any network client exists.
pub fn validate_order(request: &OrderRequest, max_order_size_usdc: Decimal) -> Result<()> {
    if request.price < PRICE_MIN || request.price > PRICE_MAX {
        return Err(Error::OrderValidation(format!(
            "Price {} out of range [{}, {}]",
            request.price, PRICE_MIN, PRICE_MAX
        )));
    }

    if request.size <= Decimal::ZERO {
        return Err(Error::OrderValidation(format!(
            "Size must be positive, got {}",
            request.size
        )));
    }

    let cost = request.cost();
    if cost > max_order_size_usdc {
        return Err(Error::OrderValidation(format!(
            "Order cost ${} exceeds max ${}",
            fixed(cost, 2),
            fixed(max_order_size_usdc, 2)
        )));
    }

    Ok(())
}

/// Validate -> place -> log pipeline around an [`OrderApi`]
pub struct OrderManager<A> {
    api: A,
    ledger: TradeLedger,
    max_order_size_usdc: Decimal,
}

impl<A: OrderApi> OrderManager<A> {
    pub fn new(api: A, ledger: TradeLedger, max_order_size_usdc: Decimal) -> Self {
        Self {
            api,
            ledger,
            max_order_size_usdc,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn validate(&self, request: &OrderRequest) -> Result<()> {
        validate_order(request, self.max_order_size_usdc)
    }

    /// Validate, submit and record an order.
    ///
    /// A response with `success == false` and a non-empty status is a
    /// rejection and is not logged. `success == false` with an empty status
    /// passes through as if accepted.
    pub async fn place(
        &self,
        request: &OrderRequest,
        tick_size: &str,
        neg_risk: Option<bool>,
    ) -> Result<OrderResponse> {
        self.validate(request)?;

        info!(
            "Placing {} {} shares of {} @ {}",
            request.side, request.size, request.token_id, request.price
        );

        let response = self
            .api
            .place_limit_order(
                &request.token_id,
                request.side,
                request.price,
                request.size,
                tick_size,
                neg_risk,
            )
            .await?;

        if !response.success && !response.status.is_empty() {
            warn!("Order rejected by exchange: {}", response.status);
            return Err(Error::OrderPlacement(response.status));
        }

        self.ledger.append(request, &response)?;

        info!(
            "Order {} accepted: status={}",
            response.display_id(),
            response.status
        );
        Ok(response)
    }

    pub async fn buy(
        &self,
        token_id: &str,
        price: Decimal,
        size: Decimal,
        tick_size: &str,
        neg_risk: Option<bool>,
    ) -> Result<OrderResponse> {
        let request = OrderRequest::limit(token_id, Side::Buy, price, size);
        self.place(&request, tick_size, neg_risk).await
    }

    pub async fn sell(
        &self,
        token_id: &str,
        price: Decimal,
        size: Decimal,
        tick_size: &str,
        neg_risk: Option<bool>,
    ) -> Result<OrderResponse> {
        let request = OrderRequest::limit(token_id, Side::Sell, price, size);
        self.place(&request, tick_size, neg_risk).await
    }

    pub async fn open_orders(&self, market: Option<&str>, asset_id: Option<&str>) -> Result<Vec<OpenOrder>> {
        self.api.open_orders(market, asset_id).await
    }

    pub async fn cancel(&self, order_id: &str) -> Result<bool> {
        self.api.cancel(order_id).await
    }

    pub async fn cancel_all(&self) -> Result<bool> {
        self.api.cancel_all().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records placement calls and answers with a canned response
    #[derive(Default)]
    pub(crate) struct FakeOrderApi {
        pub response: OrderResponse,
        pub placed: Mutex<Vec<(String, Side, Decimal, Decimal, String, Option<bool>)>>,
    }

    impl FakeOrderApi {
        pub fn answering(order_id: &str, status: &str, success: bool) -> Self {
            Self {
                response: OrderResponse {
                    order_id: order_id.to_string(),
                    status: status.to_string(),
                    success,
                    transact_order_id: String::new(),
                },
                placed: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.placed.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderApi for FakeOrderApi {
        async fn place_limit_order(
            &self,
            token_id: &str,
            side: Side,
            price: Decimal,
            size: Decimal,
            tick_size: &str,
            neg_risk: Option<bool>,
        ) -> Result<OrderResponse> {
            self.placed.lock().unwrap().push((
                token_id.to_string(),
                side,
                price,
                size,
                tick_size.to_string(),
                neg_risk,
            ));
            Ok(self.response.clone())
        }

        async fn open_orders(&self, _market: Option<&str>, _asset_id: Option<&str>) -> Result<Vec<OpenOrder>> {
            Ok(Vec::new())
        }

        async fn cancel(&self, _order_id: &str) -> Result<bool> {
            Ok(true)
        }

        async fn cancel_all(&self) -> Result<bool> {
            Err(Error::clob("Failed to cancel all orders: 401 Unauthorized"))
        }

        async fn order_book(&self, token_id: &str) -> Result<OrderBook> {
            Ok(OrderBook {
                token_id: token_id.to_string(),
                ..Default::default()
            })
        }

        async fn price(&self, _token_id: &str, _side: Side) -> Result<Decimal> {
            Ok(dec!(0.5))
        }

        async fn midpoint(&self, _token_id: &str) -> Result<Decimal> {
            Ok(dec!(0.5))
        }
    }

    fn temp_ledger() -> (TempDir, TradeLedger) {
        let dir = TempDir::new().unwrap();
        let ledger = TradeLedger::new(dir.path().join("trades.csv"));
        (dir, ledger)
    }

    fn validation_message(result: Result<()>) -> String {
        match result {
            Err(Error::OrderValidation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_price_bounds_inclusive() {
        let max = dec!(50);
        let at = |p| OrderRequest::limit("tok", Side::Buy, p, dec!(1));

        assert!(validate_order(&at(dec!(0.01)), max).is_ok());
        assert!(validate_order(&at(dec!(0.99)), max).is_ok());

        let msg = validation_message(validate_order(&at(dec!(0.001)), max));
        assert!(msg.contains("out of range"));
        let msg = validation_message(validate_order(&at(dec!(1.0)), max));
        assert_eq!(msg, "Price 1.0 out of range [0.01, 0.99]");
    }

    #[test]
    fn test_size_must_be_positive() {
        let req = OrderRequest::limit("tok", Side::Buy, dec!(0.5), dec!(0));
        let msg = validation_message(validate_order(&req, dec!(50)));
        assert_eq!(msg, "Size must be positive, got 0");

        let req = OrderRequest::limit("tok", Side::Sell, dec!(0.5), dec!(-3));
        assert!(validate_order(&req, dec!(50)).is_err());
    }

    #[test]
    fn test_notional_limit() {
        let req = OrderRequest::limit("tok", Side::Buy, dec!(0.50), dec!(30));
        let msg = validation_message(validate_order(&req, dec!(10)));
        assert!(msg.contains("exceeds max"));
        assert_eq!(msg, "Order cost $15.00 exceeds max $10.00");

        let req = OrderRequest::limit("tok", Side::Buy, dec!(0.50), dec!(10));
        assert!(validate_order(&req, dec!(10)).is_ok());

        // 0.91 * 11 = 10.01, just over the limit
        let req = OrderRequest::limit("tok", Side::Buy, dec!(0.91), dec!(11));
        let msg = validation_message(validate_order(&req, dec!(10)));
        assert_eq!(msg, "Order cost $10.01 exceeds max $10.00");

        // 0.99 * 10.11 = 10.0089 rounds up for display
        let req = OrderRequest::limit("tok", Side::Buy, dec!(0.99), dec!(10.11));
        let msg = validation_message(validate_order(&req, dec!(10)));
        assert_eq!(msg, "Order cost $10.01 exceeds max $10.00");
    }

    #[test]
    fn test_price_checked_before_size() {
        let req = OrderRequest::limit("tok", Side::Buy, dec!(2), dec!(0));
        let msg = validation_message(validate_order(&req, dec!(50)));
        assert!(msg.starts_with("Price"));
    }

    #[tokio::test]
    async fn test_buy_places_and_logs() {
        let api = FakeOrderApi::answering("ord1", "matched", true);
        let (_dir, ledger) = temp_ledger();
        let manager = OrderManager::new(api, ledger, dec!(50));

        let resp = manager
            .buy("tok1", dec!(0.45), dec!(20.0), DEFAULT_TICK_SIZE, None)
            .await
            .unwrap();
        assert_eq!(resp.order_id, "ord1");

        let placed = manager.api().placed.lock().unwrap().clone();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].0, "tok1");
        assert_eq!(placed[0].1, Side::Buy);
        assert_eq!(placed[0].4, "0.01");
        assert_eq!(placed[0].5, None);

        let rows = manager.ledger().read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, "0.4500");
        assert_eq!(rows[0].size, "20.00");
        assert_eq!(rows[0].status, "matched");
        assert_eq!(rows[0].side, "BUY");
    }

    #[tokio::test]
    async fn test_invalid_order_never_reaches_exchange() {
        let api = FakeOrderApi::answering("ord1", "matched", true);
        let (_dir, ledger) = temp_ledger();
        let manager = OrderManager::new(api, ledger, dec!(10));

        let err = manager
            .buy("tok1", dec!(0.50), dec!(30), DEFAULT_TICK_SIZE, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OrderValidation(_)));
        assert_eq!(manager.api().calls(), 0);
        assert!(manager.ledger().read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_with_status_is_not_logged() {
        let api = FakeOrderApi::answering("", "not enough balance", false);
        let (_dir, ledger) = temp_ledger();
        let manager = OrderManager::new(api, ledger, dec!(50));

        let err = manager
            .sell("tok1", dec!(0.60), dec!(5), DEFAULT_TICK_SIZE, Some(true))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Order rejected: not enough balance");
        assert!(manager.ledger().read_all().unwrap().is_empty());

        let placed = manager.api().placed.lock().unwrap().clone();
        assert_eq!(placed[0].5, Some(true));
    }

    #[tokio::test]
    async fn test_unsuccessful_without_status_passes_through() {
        let api = FakeOrderApi::answering("ord9", "", false);
        let (_dir, ledger) = temp_ledger();
        let manager = OrderManager::new(api, ledger, dec!(50));

        let resp = manager
            .buy("tok1", dec!(0.30), dec!(10), "0.001", None)
            .await
            .unwrap();
        assert!(!resp.success);

        let rows = manager.ledger().read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].success, "False");
    }

    #[tokio::test]
    async fn test_passthrough_errors_keep_clob_label() {
        let api = FakeOrderApi::answering("ord1", "live", true);
        let (_dir, ledger) = temp_ledger();
        let manager = OrderManager::new(api, ledger, dec!(50));

        assert!(manager.cancel("ord1").await.unwrap());
        let err = manager.cancel_all().await.unwrap_err();
        assert!(matches!(err, Error::ClobApi { .. }));
        assert!(manager.open_orders(None, None).await.unwrap().is_empty());
    }
}
