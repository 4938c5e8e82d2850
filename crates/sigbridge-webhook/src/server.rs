//! HTTP server implementation using axum.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use sigbridge_reconciler::Reconciler;
use sigbridge_telemetry::{render_metrics, Metrics};
use tower_http::timeout::TimeoutLayer;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{DispatchMode, WebhookConfig};
use crate::error::{WebhookError, WebhookResult};

/// Inbound webhook body.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub signal: Option<String>,
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    reconciler: Arc<Reconciler>,
    config: Arc<WebhookConfig>,
    /// Reconciliations spawned by the webhook; drained on shutdown.
    tasks: TaskTracker,
}

impl AppState {
    pub fn new(reconciler: Arc<Reconciler>, config: WebhookConfig) -> Self {
        Self {
            reconciler,
            config: Arc::new(config),
            tasks: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();
    Router::new()
        .route(&state.config.path, post(handle_webhook))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

/// Receive a signal, authenticate it and hand it to the reconciler.
async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let response = process_webhook(&state, &body).await;
    Metrics::webhook_request(response.status().as_u16());
    response
}

async fn process_webhook(state: &AppState, body: &[u8]) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejected webhook with invalid JSON body");
            return error_response(StatusCode::BAD_REQUEST, "invalid JSON body", None);
        }
    };

    if let Some(expected) = state.config.secret.as_deref().filter(|s| !s.is_empty()) {
        let provided = payload.secret.as_deref().unwrap_or_default();
        if !secrets_match(provided, expected) {
            warn!("Rejected webhook with invalid secret");
            return error_response(StatusCode::FORBIDDEN, "invalid secret", None);
        }
    }

    let Some(raw) = payload.signal else {
        warn!("Rejected webhook without signal field");
        return error_response(StatusCode::BAD_REQUEST, "no signal field", None);
    };

    info!(received_signal = %raw, "Webhook received");

    let signal = match state.reconciler.normalize(&raw) {
        Ok(signal) => signal,
        Err(_) => {
            Metrics::signal_received("unrecognized");
            return error_response(StatusCode::BAD_REQUEST, "unrecognized signal", Some(&raw));
        }
    };
    Metrics::signal_received(signal.as_str());

    // Spawned so a dropped request never cancels a sequence mid-flight.
    // Tracked so shutdown waits for it.
    let reconciler = state.reconciler.clone();
    let task = state
        .tasks
        .spawn(async move { reconciler.reconcile(signal).await });

    match state.config.dispatch {
        DispatchMode::Background => Json(json!({
            "status": "ok",
            "received_signal": raw,
            "dispatch": "background",
        }))
        .into_response(),
        DispatchMode::Inline => match task.await {
            Ok(outcome) => Json(json!({
                "status": "ok",
                "received_signal": raw,
                "outcome": outcome,
            }))
            .into_response(),
            Err(e) => {
                error!(error = %e, "Reconciliation task failed");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "reconciliation failed",
                    Some(&raw),
                )
            }
        },
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "symbol": state.reconciler.symbol(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics() -> Response {
    match render_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn error_response(status: StatusCode, message: &str, received_signal: Option<&str>) -> Response {
    let mut body = json!({
        "status": "error",
        "message": message,
    });
    if let Some(raw) = received_signal {
        body["received_signal"] = Value::from(raw);
    }
    (status, Json(body)).into_response()
}

/// Compare without short-circuiting on the first differing byte.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Run the webhook HTTP server until `shutdown` resolves.
pub async fn run_server<F>(state: AppState, shutdown: F) -> WebhookResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.bind_addr();
    if !state.config.auth_enabled() {
        warn!("WEBHOOK_SECRET is not set, accepting signals from any caller");
    }

    let path = state.config.path.clone();
    let dispatch = state.config.dispatch;
    let tasks = state.tasks.clone();
    let drain_timeout = state.config.drain_timeout();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| WebhookError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(addr = %addr, path = %path, dispatch = ?dispatch, "Starting webhook server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    drain(&tasks, drain_timeout).await;
    info!("Webhook server stopped");
    Ok(())
}

/// Wait for spawned reconciliations so none is cut between close and open.
async fn drain(tasks: &TaskTracker, deadline: Duration) -> bool {
    tasks.close();
    if tasks.is_empty() {
        return true;
    }

    info!(pending = tasks.len(), "Waiting for in-flight reconciliations");
    match tokio::time::timeout(deadline, tasks.wait()).await {
        Ok(()) => {
            info!("In-flight reconciliations finished");
            true
        }
        Err(_) => {
            error!(
                pending = tasks.len(),
                timeout_ms = deadline.as_millis() as u64,
                "Shutting down with reconciliations still in flight"
            );
            false
        }
    }
}
