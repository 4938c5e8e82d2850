//! Mock exchange client for testing.
//!
//! Records every call, returns scripted prices/positions, and can fail
//! orders on demand. With position tracking enabled, accepted orders are
//! applied to the held position so signal sequences can be replayed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use sigbridge_core::{OrderRequest, OrderResult, OrderSide, Position, PositionSide, Price, Symbol};

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{GatewayError, GatewayResult};

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    GetPrice(Symbol),
    GetPosition(Symbol),
    SubmitOrder(OrderRequest),
}

#[derive(Debug)]
pub struct MockExchangeClient {
    calls: Mutex<Vec<MockCall>>,
    price: Mutex<Result<Price, String>>,
    position: Mutex<Result<Position, String>>,
    /// Scripted order outcomes, consumed front to back. Empty = accept.
    order_script: Mutex<VecDeque<Option<String>>>,
    latency: Mutex<Option<Duration>>,
    track_position: AtomicBool,
    next_order_id: AtomicU64,
}

impl Default for MockExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchangeClient {
    /// Flat account, price 2000, every order accepted.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            price: Mutex::new(Ok(Price::new(Decimal::from(2000)))),
            position: Mutex::new(Ok(Position::flat())),
            order_script: Mutex::new(VecDeque::new()),
            latency: Mutex::new(None),
            track_position: AtomicBool::new(false),
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Apply accepted orders to the held position.
    pub fn with_position_tracking(self) -> Self {
        self.track_position.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_price(&self, price: Price) {
        *self.price.lock() = Ok(price);
    }

    pub fn fail_price(&self, reason: &str) {
        *self.price.lock() = Err(reason.to_string());
    }

    pub fn set_position(&self, position: Position) {
        *self.position.lock() = Ok(position);
    }

    pub fn fail_position(&self, reason: &str) {
        *self.position.lock() = Err(reason.to_string());
    }

    /// Position as the mock currently sees it (ignores scripted failures).
    pub fn held_position(&self) -> Option<Position> {
        self.position.lock().as_ref().ok().copied()
    }

    /// Queue an accepted order outcome.
    pub fn push_order_success(&self) {
        self.order_script.lock().push_back(None);
    }

    /// Queue a rejected order outcome.
    pub fn push_order_failure(&self, reason: &str) {
        self.order_script.lock().push_back(Some(reason.to_string()));
    }

    /// Delay every call (used for timeout tests).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                MockCall::SubmitOrder(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn apply_fill(&self, order: &OrderRequest) {
        let mut guard = self.position.lock();
        let current = match guard.as_ref() {
            Ok(p) => *p,
            Err(_) => return,
        };
        let signed = match current.side() {
            PositionSide::Long => current.size().inner(),
            PositionSide::Short => -current.size().inner(),
            PositionSide::Flat => Decimal::ZERO,
        };
        let delta = match order.side {
            OrderSide::Buy => order.quantity.inner(),
            OrderSide::Sell => -order.quantity.inner(),
        };
        let mut next = signed + delta;
        // Reduce-only never flips through zero.
        if order.reduce_only && (signed.is_sign_positive() != next.is_sign_positive()) {
            next = Decimal::ZERO;
        }
        *guard = Ok(Position::from_signed(next));
    }
}

impl ExchangeClient for MockExchangeClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn get_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, GatewayResult<Price>> {
        Box::pin(async move {
            self.calls.lock().push(MockCall::GetPrice(symbol.clone()));
            self.delay().await;
            let scripted = self.price.lock().clone();
            scripted.map_err(GatewayError::HttpClient)
        })
    }

    fn get_position<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, GatewayResult<Position>> {
        Box::pin(async move {
            self.calls.lock().push(MockCall::GetPosition(symbol.clone()));
            self.delay().await;
            let scripted = self.position.lock().clone();
            scripted.map_err(GatewayError::HttpClient)
        })
    }

    fn submit_order<'a>(
        &'a self,
        order: &'a OrderRequest,
    ) -> BoxFuture<'a, GatewayResult<OrderResult>> {
        Box::pin(async move {
            self.calls.lock().push(MockCall::SubmitOrder(order.clone()));
            self.delay().await;

            let scripted = self.order_script.lock().pop_front().flatten();
            if let Some(reason) = scripted {
                return Err(GatewayError::Rejected {
                    code: "51000".to_string(),
                    msg: reason,
                });
            }

            if self.track_position.load(Ordering::SeqCst) {
                self.apply_fill(order);
            }

            let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
            Ok(OrderResult::Submitted {
                order_id: format!("mock-{id}"),
                client_order_id: order.client_order_id.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sigbridge_core::{MarginMode, Size};

    fn eth() -> Symbol {
        Symbol::new("ETH-USDT-SWAP").unwrap()
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockExchangeClient::new();
        mock.get_price(&eth()).await.unwrap();
        mock.get_position(&eth()).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![MockCall::GetPrice(eth()), MockCall::GetPosition(eth())]
        );
    }

    #[tokio::test]
    async fn test_mock_scripted_failure_then_success() {
        let mock = MockExchangeClient::new();
        mock.push_order_failure("rejected");
        let order = OrderRequest::open(eth(), OrderSide::Buy, Size::new(dec!(1)), 10, MarginMode::Cross);

        assert!(mock.submit_order(&order).await.is_err());
        assert!(mock.submit_order(&order).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_tracks_fills() {
        let mock = MockExchangeClient::new().with_position_tracking();
        let open = OrderRequest::open(eth(), OrderSide::Sell, Size::new(dec!(0.5)), 10, MarginMode::Cross);
        mock.submit_order(&open).await.unwrap();
        assert_eq!(mock.held_position().unwrap(), Position::from_signed(dec!(-0.5)));

        let close = OrderRequest::close(eth(), OrderSide::Buy, Size::new(dec!(0.7)), 10, MarginMode::Cross);
        mock.submit_order(&close).await.unwrap();
        assert!(mock.held_position().unwrap().is_flat());
    }
}
