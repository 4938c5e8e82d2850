//! Prometheus metrics and structured logging for sigbridge.
//!
//! - Structured logging with tracing (console, optionally mirrored to a file)
//! - Prometheus counters for signals, orders and reconciliation outcomes

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{render_metrics, Metrics};
