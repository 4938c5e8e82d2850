//! sigbridge-webhook - HTTP entry point for trading signals.
//!
//! ```text
//!  TradingView alert ──POST /webhook──▶ auth ─▶ parse ─▶ Reconciler
//!                                        │        │
//!                                       403      400
//!  GET /health   → {"status":"ok","symbol":…,"version":…}
//!  GET /metrics  → Prometheus text
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sigbridge_webhook::{run_server, AppState, WebhookConfig};
//!
//! let state = AppState::new(reconciler.clone(), config.clone());
//! run_server(state, shutdown_signal()).await?;
//! ```

mod config;
mod error;
mod server;

pub use config::{DispatchMode, WebhookConfig};
pub use error::{WebhookError, WebhookResult};
pub use server::{create_router, run_server, AppState, WebhookPayload};
