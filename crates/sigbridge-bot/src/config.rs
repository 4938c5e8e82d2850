//! Application configuration.
//!
//! Non-secret settings come from a TOML file; every field has a default so a
//! missing or partial file still works. Credentials and the webhook secret
//! are only ever read from the environment (after `.env` is loaded).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sigbridge_core::{MarginMode, SizeRounding, Symbol};
use sigbridge_gateway::okx::DEFAULT_BASE_URL;
use sigbridge_gateway::{GatewaySettings, OkxConfig, OkxCredentials};
use sigbridge_reconciler::{PositionQueryPolicy, ReconcilerConfig};
use sigbridge_telemetry::LoggingConfig;
use sigbridge_webhook::WebhookConfig;
use zeroize::Zeroizing;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Exchange-side leverage limit.
const MAX_LEVERAGE: u32 = 125;

/// Upper bound on the close → open pause.
const MAX_SETTLEMENT_DELAY_MS: u64 = 5_000;

const MAX_SIZE_DECIMALS: u32 = 8;

/// Trading configuration (`[trading]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// OKX instrument id of the perpetual swap.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Notional of each new position in USDT.
    #[serde(default = "default_position_size_usdt")]
    pub position_size_usdt: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default)]
    pub margin_mode: MarginMode,
    /// Decimal places of order quantities.
    #[serde(default = "default_size_decimals")]
    pub size_decimals: u32,
    #[serde(default)]
    pub size_rounding: SizeRounding,
    /// Pause after a close before opening the opposite side (ms).
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
    /// Bound on each exchange call (ms).
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,
    #[serde(default)]
    pub position_query_failure: PositionQueryPolicy,
}

fn default_symbol() -> String {
    "ETH-USDT-SWAP".to_string()
}

fn default_position_size_usdt() -> Decimal {
    Decimal::from(50)
}

fn default_leverage() -> u32 {
    10
}

fn default_size_decimals() -> u32 {
    4
}

fn default_settlement_delay_ms() -> u64 {
    500
}

fn default_gateway_timeout_ms() -> u64 {
    10_000
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            position_size_usdt: default_position_size_usdt(),
            leverage: default_leverage(),
            margin_mode: MarginMode::default(),
            size_decimals: default_size_decimals(),
            size_rounding: SizeRounding::default(),
            settlement_delay_ms: default_settlement_delay_ms(),
            gateway_timeout_ms: default_gateway_timeout_ms(),
            position_query_failure: PositionQueryPolicy::default(),
        }
    }
}

/// API credentials loaded from the environment.
#[derive(Clone)]
pub struct ExchangeSecrets {
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
    pub passphrase: Zeroizing<String>,
}

impl fmt::Debug for ExchangeSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExchangeSecrets([REDACTED])")
    }
}

/// Exchange configuration (`[exchange]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Demo trading. Overridden by `OKX_TESTNET`.
    #[serde(default)]
    pub testnet: bool,
    #[serde(skip)]
    pub secrets: Option<ExchangeSecrets>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            testnet: false,
            secrets: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply secrets and overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply secrets and overrides from `lookup`.
    ///
    /// - `OKX_API_KEY`, `OKX_API_SECRET`, `OKX_API_PASSWORD`: credentials
    /// - `OKX_TESTNET`: demo trading when `true`/`1`/`yes`
    /// - `WEBHOOK_SECRET`: shared secret expected in webhook payloads
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let (Some(api_key), Some(api_secret), Some(passphrase)) = (
            non_empty("OKX_API_KEY"),
            non_empty("OKX_API_SECRET"),
            non_empty("OKX_API_PASSWORD"),
        ) {
            self.exchange.secrets = Some(ExchangeSecrets {
                api_key,
                api_secret: Zeroizing::new(api_secret),
                passphrase: Zeroizing::new(passphrase),
            });
        }

        if let Some(testnet) = lookup("OKX_TESTNET") {
            self.exchange.testnet = matches!(
                testnet.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            );
        }

        if let Some(secret) = non_empty("WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret);
        }
    }

    /// Reject settings that cannot be served. Called once before startup.
    pub fn validate(&self) -> AppResult<()> {
        let trading = &self.trading;

        Symbol::new(&trading.symbol)
            .map_err(|e| AppError::Config(format!("trading.symbol: {e}")))?;

        if trading.position_size_usdt <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "trading.position_size_usdt must be positive, got {}",
                trading.position_size_usdt
            )));
        }
        if trading.leverage == 0 || trading.leverage > MAX_LEVERAGE {
            return Err(AppError::Config(format!(
                "trading.leverage must be 1..={MAX_LEVERAGE}, got {}",
                trading.leverage
            )));
        }
        if trading.size_decimals > MAX_SIZE_DECIMALS {
            return Err(AppError::Config(format!(
                "trading.size_decimals must be at most {MAX_SIZE_DECIMALS}, got {}",
                trading.size_decimals
            )));
        }
        if trading.settlement_delay_ms > MAX_SETTLEMENT_DELAY_MS {
            return Err(AppError::Config(format!(
                "trading.settlement_delay_ms must be at most {MAX_SETTLEMENT_DELAY_MS}, got {}",
                trading.settlement_delay_ms
            )));
        }
        if trading.gateway_timeout_ms == 0 {
            return Err(AppError::Config(
                "trading.gateway_timeout_ms must be positive".to_string(),
            ));
        }
        if !self.webhook.path.starts_with('/') {
            return Err(AppError::Config(format!(
                "webhook.path must start with '/', got {:?}",
                self.webhook.path
            )));
        }
        if self.exchange.secrets.is_none() {
            return Err(AppError::Config(
                "OKX_API_KEY, OKX_API_SECRET and OKX_API_PASSWORD must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn symbol(&self) -> AppResult<Symbol> {
        Ok(Symbol::new(&self.trading.symbol)?)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.trading.gateway_timeout_ms)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            leverage: self.trading.leverage,
            margin_mode: self.trading.margin_mode,
            timeout: self.gateway_timeout(),
        }
    }

    pub fn reconciler_config(&self) -> AppResult<ReconcilerConfig> {
        Ok(ReconcilerConfig {
            symbol: self.symbol()?,
            position_size_usdt: self.trading.position_size_usdt,
            size_decimals: self.trading.size_decimals,
            size_rounding: self.trading.size_rounding,
            settlement_delay: Duration::from_millis(self.trading.settlement_delay_ms),
            position_policy: self.trading.position_query_failure,
        })
    }

    pub fn okx_config(&self) -> OkxConfig {
        OkxConfig {
            base_url: self.exchange.base_url.clone(),
            simulated: self.exchange.testnet,
            http_timeout: self.gateway_timeout(),
        }
    }

    pub fn okx_credentials(&self) -> AppResult<OkxCredentials> {
        let secrets = self
            .exchange
            .secrets
            .as_ref()
            .ok_or_else(|| AppError::Config("exchange credentials not loaded".to_string()))?;
        Ok(OkxCredentials::new(
            secrets.api_key.clone(),
            secrets.api_secret.as_str().to_owned(),
            secrets.passphrase.as_str().to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![
            ("OKX_API_KEY", "key"),
            ("OKX_API_SECRET", "secret"),
            ("OKX_API_PASSWORD", "pass"),
        ]
    }

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&credentials()));
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.trading.symbol, "ETH-USDT-SWAP");
        assert_eq!(config.trading.position_size_usdt, dec!(50));
        assert_eq!(config.trading.leverage, 10);
        assert_eq!(config.trading.margin_mode, MarginMode::Cross);
        assert_eq!(config.trading.settlement_delay_ms, 500);
        assert_eq!(config.webhook.port, 5000);
        assert!(!config.exchange.testnet);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [trading]
            position_size_usdt = "75.5"
            margin_mode = "isolated"
            size_rounding = "truncate"
            position_query_failure = "abort"

            [webhook]
            port = 8080
            dispatch = "background"
            "#,
        )
        .unwrap();

        assert_eq!(config.trading.position_size_usdt, dec!(75.5));
        assert_eq!(config.trading.margin_mode, MarginMode::Isolated);
        assert_eq!(config.trading.size_rounding, SizeRounding::Truncate);
        assert_eq!(config.trading.position_query_failure, PositionQueryPolicy::Abort);
        assert_eq!(config.trading.leverage, 10);
        assert_eq!(config.webhook.port, 8080);
        assert_eq!(config.webhook.path, "/webhook");
    }

    #[test]
    fn test_secret_in_toml_is_ignored() {
        let config: AppConfig = toml::from_str("[webhook]\nsecret = \"leaked\"").unwrap();
        assert!(config.webhook.secret.is_none());
    }

    #[test]
    fn test_apply_env() {
        let mut pairs = credentials();
        pairs.push(("OKX_TESTNET", "True"));
        pairs.push(("WEBHOOK_SECRET", "hook"));
        let mut config = AppConfig::default();
        config.apply_env_with(env(&pairs));

        assert!(config.exchange.secrets.is_some());
        assert!(config.exchange.testnet);
        assert!(config.okx_config().simulated);
        assert_eq!(config.webhook.secret.as_deref(), Some("hook"));
    }

    #[test]
    fn test_testnet_false_overrides_file() {
        let mut config = AppConfig::default();
        config.exchange.testnet = true;
        config.apply_env_with(env(&[("OKX_TESTNET", "false")]));
        assert!(!config.exchange.testnet);
    }

    #[test]
    fn test_partial_credentials_are_missing() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[("OKX_API_KEY", "key"), ("OKX_API_SECRET", "")]));
        assert!(config.exchange.secrets.is_none());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OKX_API_KEY"));
    }

    #[test]
    fn test_validate_accepts_defaults_with_credentials() {
        valid().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = valid();
        config.trading.position_size_usdt = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.trading.leverage = 0;
        assert!(config.validate().is_err());
        config.trading.leverage = 126;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.trading.settlement_delay_ms = 10_000;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.trading.gateway_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.trading.symbol = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.webhook.path = "webhook".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_component_settings() {
        let mut config = valid();
        config.trading.leverage = 20;
        config.trading.settlement_delay_ms = 250;

        let gateway = config.gateway_settings();
        assert_eq!(gateway.leverage, 20);
        assert_eq!(gateway.timeout, Duration::from_secs(10));

        let reconciler = config.reconciler_config().unwrap();
        assert_eq!(reconciler.symbol.as_str(), "ETH-USDT-SWAP");
        assert_eq!(reconciler.settlement_delay, Duration::from_millis(250));
        assert_eq!(reconciler.size_decimals, 4);
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let mut config = AppConfig::from_file(path).unwrap();
        config.apply_env_with(env(&credentials()));

        config.validate().unwrap();
        assert_eq!(config.trading.position_size_usdt, dec!(50));
        assert_eq!(config.webhook.path, "/webhook");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.trading.symbol, "ETH-USDT-SWAP");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigbridge.toml");
        std::fs::write(&path, "[trading]\nleverage = 3\n").unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.trading.leverage, 3);

        std::fs::write(&path, "[trading\n").unwrap();
        assert!(matches!(
            AppConfig::from_file(path.to_str().unwrap()),
            Err(AppError::Config(_))
        ));
    }
}
