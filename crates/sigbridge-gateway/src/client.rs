//! Exchange client trait.
//!
//! Abstracts the vendor REST API behind three operations, allowing for:
//! - Dependency injection for testing
//! - One adapter per exchange without touching the reconciler

use std::pin::Pin;
use std::sync::Arc;

use sigbridge_core::{OrderRequest, OrderResult, Position, Price, Symbol};

use crate::error::GatewayResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Vendor capability required by the gateway.
pub trait ExchangeClient: Send + Sync {
    /// Short vendor name for logs.
    fn name(&self) -> &'static str;

    /// Current mark price.
    fn get_price<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, GatewayResult<Price>>;

    /// Current net position. Errors are returned as-is; policy lives in the gateway.
    fn get_position<'a>(&'a self, symbol: &'a Symbol) -> BoxFuture<'a, GatewayResult<Position>>;

    /// Submit a single market order.
    fn submit_order<'a>(
        &'a self,
        order: &'a OrderRequest,
    ) -> BoxFuture<'a, GatewayResult<OrderResult>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
