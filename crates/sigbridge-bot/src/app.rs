//! Application wiring and lifecycle.

use std::future::Future;
use std::sync::Arc;

use sigbridge_gateway::{DynExchangeClient, ExchangeGateway, OkxClient};
use sigbridge_reconciler::Reconciler;
use sigbridge_webhook::{run_server, AppState};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    reconciler: Arc<Reconciler>,
}

impl Application {
    /// Build the OKX client, gateway and reconciler from validated config.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = OkxClient::new(config.okx_config(), config.okx_credentials()?)?;
        Self::with_client(config, Arc::new(client))
    }

    /// Build around an existing exchange client.
    pub fn with_client(config: AppConfig, client: DynExchangeClient) -> AppResult<Self> {
        info!(
            exchange = client.name(),
            symbol = %config.trading.symbol,
            position_size_usdt = %config.trading.position_size_usdt,
            leverage = config.trading.leverage,
            margin_mode = %config.trading.margin_mode,
            testnet = config.exchange.testnet,
            "Initializing trading bridge"
        );

        let gateway = Arc::new(ExchangeGateway::new(client, config.gateway_settings()));
        let reconciler = Arc::new(Reconciler::new(gateway, config.reconciler_config()?));

        Ok(Self { config, reconciler })
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Serve webhooks until Ctrl-C or SIGTERM.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve webhooks until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = AppState::new(self.reconciler.clone(), self.config.webhook.clone());
        run_server(state, shutdown).await?;
        info!("Application stopped");
        Ok(())
    }
}

/// Resolve on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl-C, shutting down"),
        _ = terminate => warn!("Received SIGTERM, shutting down"),
    }
}
