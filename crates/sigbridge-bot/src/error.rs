//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] sigbridge_core::CoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] sigbridge_gateway::GatewayError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] sigbridge_webhook::WebhookError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] sigbridge_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
