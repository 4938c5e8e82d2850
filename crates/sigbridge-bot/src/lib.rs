//! sigbridge: TradingView-style webhook signals → OKX perpetual positions.
//!
//! Wires the components together:
//! - Configuration (TOML file + environment secrets)
//! - OKX exchange client behind the exchange gateway
//! - Signal reconciler
//! - Webhook HTTP server with graceful shutdown

pub mod app;
pub mod config;
pub mod error;

pub use app::{shutdown_signal, Application};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
