//! Webhook server configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How an accepted signal is handed to the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Wait for the reconciliation and include its outcome in the response.
    #[default]
    Inline,
    /// Acknowledge immediately; reconcile in a background task.
    Background,
}

/// Webhook server configuration (`[webhook]` section).
#[derive(Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route receiving signals.
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub dispatch: DispatchMode,
    /// Upper bound on a single HTTP request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long shutdown waits for in-flight reconciliations.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    /// Shared secret expected in the payload (`None` = accept all).
    /// Loaded from `WEBHOOK_SECRET`, never from the file.
    #[serde(skip)]
    pub secret: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_path() -> String {
    "/webhook".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_drain_timeout_ms() -> u64 {
    30_000
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            dispatch: DispatchMode::default(),
            request_timeout_ms: default_request_timeout_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            secret: None,
        }
    }
}

impl WebhookConfig {
    /// Check if secret authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("dispatch", &self.dispatch)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("drain_timeout_ms", &self.drain_timeout_ms)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
