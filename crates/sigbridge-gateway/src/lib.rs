//! Exchange connectivity for sigbridge.
//!
//! Two layers:
//! - [`ExchangeClient`]: vendor capability (price, position, raw order
//!   submission). One implementation per exchange ([`OkxClient`]) plus
//!   [`MockExchangeClient`] for tests.
//! - [`ExchangeGateway`]: the narrow adapter the reconciler talks to. Adds
//!   per-call timeouts, the fail-flat position policy, reduce-only closing
//!   and leverage/margin settings. No business logic.

pub mod client;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod okx;

pub use client::{BoxFuture, DynExchangeClient, ExchangeClient};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{ExchangeGateway, GatewaySettings};
pub use mock::{MockCall, MockExchangeClient};
pub use okx::{OkxClient, OkxConfig, OkxCredentials};
