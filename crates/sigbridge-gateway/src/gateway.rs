//! Exchange gateway: the narrow adapter the reconciler depends on.
//!
//! Wraps a [`DynExchangeClient`] and adds:
//! - a bounded timeout on every call (timeout = gateway failure)
//! - the fail-flat position policy for [`ExchangeGateway::get_position`]
//! - reduce-only closing sized to the whole position
//! - leverage and margin mode on every order
//!
//! Created once at startup and shared read-only by all reconciliations.

use std::future::Future;
use std::time::{Duration, Instant};

use sigbridge_core::{MarginMode, OrderRequest, OrderResult, OrderSide, Position, Price, Size, Symbol};
use sigbridge_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::client::DynExchangeClient;
use crate::error::{GatewayError, GatewayResult};

/// Default bound on a single exchange call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Order parameters attached by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    pub leverage: u32,
    pub margin_mode: MarginMode,
    pub timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            leverage: 10,
            margin_mode: MarginMode::Cross,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

pub struct ExchangeGateway {
    client: DynExchangeClient,
    settings: GatewaySettings,
}

impl ExchangeGateway {
    #[must_use]
    pub fn new(client: DynExchangeClient, settings: GatewaySettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Current mark price. Must be strictly positive.
    pub async fn get_price(&self, symbol: &Symbol) -> GatewayResult<Price> {
        let price = self
            .bounded("get_price", self.client.get_price(symbol))
            .await
            .map_err(|e| market_data(symbol, e))?;

        if !price.is_positive() {
            return Err(GatewayError::MarketData {
                symbol: symbol.clone(),
                reason: format!("non-positive price {price}"),
            });
        }

        debug!(symbol = %symbol, price = %price, "Fetched mark price");
        Ok(price)
    }

    /// Current position, propagating query failures.
    pub async fn try_get_position(&self, symbol: &Symbol) -> GatewayResult<Position> {
        let position = self
            .bounded("get_position", self.client.get_position(symbol))
            .await
            .map_err(|e| market_data(symbol, e))?;

        info!(symbol = %symbol, side = %position.side(), size = %position.size(), "Current position");
        Ok(position)
    }

    /// Current position with the fail-flat policy: any failure is logged and
    /// reported as FLAT.
    pub async fn get_position(&self, symbol: &Symbol) -> Position {
        match self.try_get_position(symbol).await {
            Ok(position) => position,
            Err(e) => {
                Metrics::position_query_failed(symbol.as_str());
                warn!(
                    symbol = %symbol,
                    error = %e,
                    "Position query failed, treating position as FLAT"
                );
                Position::flat()
            }
        }
    }

    /// Flatten `position` with one reduce-only market order for its full size.
    ///
    /// Returns [`OrderResult::NoOp`] without touching the exchange when the
    /// position is already flat.
    pub async fn close_position(
        &self,
        symbol: &Symbol,
        position: &Position,
    ) -> GatewayResult<OrderResult> {
        let Some(side) = position.side().closing_side() else {
            info!(symbol = %symbol, "No position to close");
            return Ok(OrderResult::NoOp);
        };
        if position.size().is_zero() {
            info!(symbol = %symbol, "No position to close");
            return Ok(OrderResult::NoOp);
        }

        info!(
            symbol = %symbol,
            held = %position.side(),
            side = %side,
            quantity = %position.size(),
            "Closing position"
        );

        let request = OrderRequest::close(
            symbol.clone(),
            side,
            position.size(),
            self.settings.leverage,
            self.settings.margin_mode,
        );
        self.submit("close", request).await
    }

    /// Open (or add to) a position with a non-reduce-only market order.
    pub async fn open_position(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Size,
    ) -> GatewayResult<OrderResult> {
        info!(
            symbol = %symbol,
            side = %side,
            quantity = %quantity,
            leverage = self.settings.leverage,
            margin_mode = %self.settings.margin_mode,
            "Opening position"
        );

        let request = OrderRequest::open(
            symbol.clone(),
            side,
            quantity,
            self.settings.leverage,
            self.settings.margin_mode,
        );
        self.submit("open", request).await
    }

    async fn submit(&self, kind: &'static str, request: OrderRequest) -> GatewayResult<OrderResult> {
        let outcome = self
            .bounded("submit_order", self.client.submit_order(&request))
            .await;

        match outcome {
            Ok(result) => {
                Metrics::order_submitted(kind, "ok");
                info!(
                    kind,
                    symbol = %request.symbol,
                    side = %request.side,
                    quantity = %request.quantity,
                    client_order_id = %request.client_order_id,
                    order_id = result.order_id().unwrap_or("-"),
                    "Order accepted"
                );
                Ok(result)
            }
            Err(e) => {
                Metrics::order_submitted(kind, "error");
                Err(GatewayError::Order {
                    symbol: request.symbol,
                    side: request.side,
                    quantity: request.quantity,
                    reduce_only: request.reduce_only,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Run one exchange call under the configured timeout.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = GatewayResult<T>>,
    ) -> GatewayResult<T> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.settings.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                op,
                timeout: self.settings.timeout,
            }),
        };
        Metrics::gateway_latency(op, started.elapsed().as_secs_f64() * 1000.0);
        result
    }
}

fn market_data(symbol: &Symbol, e: GatewayError) -> GatewayError {
    match e {
        already @ GatewayError::MarketData { .. } => already,
        other => GatewayError::MarketData {
            symbol: symbol.clone(),
            reason: other.to_string(),
        },
    }
}
