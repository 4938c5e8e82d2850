//! Signal reconciler.
//!
//! Each call re-reads the position from the exchange, looks up the
//! [`Plan`] and executes it through the [`ExchangeGateway`]. Nothing is kept
//! between calls except the per-symbol locks that keep two signals for the
//! same symbol from interleaving.
//!
//! Exchange failures never escape as errors: they end the sequence and are
//! reported as [`ReconcileOutcome::Aborted`]. Only an unrecognized signal is
//! returned as an error, before any exchange call.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use sigbridge_core::{OrderResult, OrderSide, Position, PositionSide, Signal, Size, Symbol};
use sigbridge_gateway::ExchangeGateway;
use sigbridge_telemetry::Metrics;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{PositionQueryPolicy, ReconcilerConfig};
use crate::error::{ReconcileError, ReconcileResult, Stage};
use crate::plan::{plan, Plan};
use crate::sizing::order_quantity;

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Already on the signalled side; no orders submitted.
    Aligned { signal: Signal, side: PositionSide },
    /// The signalled position was opened, after closing the opposite one
    /// when it was held.
    Completed {
        signal: Signal,
        /// Size of the position that was closed first, if any.
        closed: Option<Size>,
        close_order: Option<OrderResult>,
        side: OrderSide,
        quantity: Size,
        open_order: OrderResult,
    },
    /// Stopped at `stage`; later steps were not attempted.
    Aborted {
        signal: Signal,
        stage: Stage,
        reason: String,
    },
}

impl ReconcileOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Aligned { .. } => "noop",
            Self::Completed { .. } => "completed",
            Self::Aborted { .. } => "aborted",
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

pub struct Reconciler {
    gateway: Arc<ExchangeGateway>,
    config: ReconcilerConfig,
    locks: DashMap<Symbol, Arc<Mutex<()>>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(gateway: Arc<ExchangeGateway>, config: ReconcilerConfig) -> Self {
        Self {
            gateway,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn symbol(&self) -> &Symbol {
        &self.config.symbol
    }

    /// Normalize a raw signal and reconcile it.
    ///
    /// Returns [`ReconcileError::UnrecognizedSignal`] without touching the
    /// exchange when `raw` is not BUY or SELL (after trimming, any case).
    pub async fn handle(&self, raw: &str) -> ReconcileResult<ReconcileOutcome> {
        let signal = self.normalize(raw)?;
        Ok(self.reconcile(signal).await)
    }

    /// Parse a raw signal, counting rejections as `rejected` outcomes.
    pub fn normalize(&self, raw: &str) -> ReconcileResult<Signal> {
        raw.parse().map_err(|_| {
            warn!(symbol = %self.config.symbol, raw = %raw, "Unrecognized signal, ignoring");
            Metrics::reconcile_outcome("rejected");
            ReconcileError::UnrecognizedSignal(raw.trim().to_string())
        })
    }

    /// Reconcile the configured symbol to `signal`.
    ///
    /// Waits for any reconciliation of the same symbol already in flight.
    pub async fn reconcile(&self, signal: Signal) -> ReconcileOutcome {
        let symbol = self.config.symbol.clone();
        let lock = self.lock_for(&symbol);
        let _guard = lock.lock().await;

        info!(symbol = %symbol, signal = %signal, "Reconciling signal");

        let outcome = match self.execute(&symbol, signal).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    symbol = %symbol,
                    signal = %signal,
                    stage = ?e.stage(),
                    error = %e,
                    "Reconciliation aborted"
                );
                ReconcileOutcome::Aborted {
                    signal,
                    stage: e.stage(),
                    reason: e.to_string(),
                }
            }
        };

        Metrics::reconcile_outcome(outcome.label());
        outcome
    }

    async fn execute(&self, symbol: &Symbol, signal: Signal) -> ReconcileResult<ReconcileOutcome> {
        let position = self.current_position(symbol).await?;

        let action = plan(position.side(), signal);
        let open_side = match action {
            Plan::Hold => {
                info!(
                    symbol = %symbol,
                    side = %position.side(),
                    size = %position.size(),
                    "Already positioned, no action"
                );
                return Ok(ReconcileOutcome::Aligned {
                    signal,
                    side: position.side(),
                });
            }
            Plan::Open { side } | Plan::Flip { open: side, .. } => side,
        };

        // Sized before closing so a price failure leaves the position untouched.
        let price = self
            .gateway
            .get_price(symbol)
            .await
            .map_err(ReconcileError::Price)?;
        let quantity = order_quantity(
            self.config.position_size_usdt,
            price,
            self.config.size_decimals,
            self.config.size_rounding,
        )?;
        info!(
            symbol = %symbol,
            notional_usdt = %self.config.position_size_usdt,
            price = %price,
            quantity = %quantity,
            "Computed order quantity"
        );

        let (closed, close_order) = match action {
            Plan::Flip { .. } => {
                let result = self
                    .gateway
                    .close_position(symbol, &position)
                    .await
                    .map_err(ReconcileError::Close)?;
                if !result.is_noop() {
                    tokio::time::sleep(self.config.settlement_delay).await;
                }
                (Some(position.size()), Some(result))
            }
            _ => (None, None),
        };

        let open_order = self
            .gateway
            .open_position(symbol, open_side, quantity)
            .await
            .map_err(ReconcileError::Open)?;

        info!(
            symbol = %symbol,
            signal = %signal,
            side = %open_side,
            quantity = %quantity,
            flipped = closed.is_some(),
            "Reconciliation completed"
        );

        Ok(ReconcileOutcome::Completed {
            signal,
            closed,
            close_order,
            side: open_side,
            quantity,
            open_order,
        })
    }

    async fn current_position(&self, symbol: &Symbol) -> ReconcileResult<Position> {
        match self.config.position_policy {
            PositionQueryPolicy::FailFlat => Ok(self.gateway.get_position(symbol).await),
            PositionQueryPolicy::Abort => self
                .gateway
                .try_get_position(symbol)
                .await
                .map_err(ReconcileError::Position),
        }
    }

    fn lock_for(&self, symbol: &Symbol) -> Arc<Mutex<()>> {
        self.locks.entry(symbol.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sigbridge_core::Price;
    use sigbridge_gateway::{GatewaySettings, MockCall, MockExchangeClient};
    use std::time::Duration;

    fn eth() -> Symbol {
        Symbol::new("ETH-USDT-SWAP").unwrap()
    }

    fn reconciler(mock: &Arc<MockExchangeClient>) -> Reconciler {
        reconciler_with(mock, ReconcilerConfig::new(eth()))
    }

    fn reconciler_with(mock: &Arc<MockExchangeClient>, config: ReconcilerConfig) -> Reconciler {
        let gateway = ExchangeGateway::new(mock.clone(), GatewaySettings::default());
        Reconciler::new(Arc::new(gateway), config)
    }

    #[tokio::test]
    async fn test_unrecognized_signal_makes_no_calls() {
        let mock = Arc::new(MockExchangeClient::new());

        let err = reconciler(&mock).handle("HOLD").await.unwrap_err();
        assert!(matches!(err, ReconcileError::UnrecognizedSignal(ref s) if s == "HOLD"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_normalize_counts_rejections() {
        let mock = Arc::new(MockExchangeClient::new());
        let reconciler = reconciler(&mock);
        let rejected = || {
            sigbridge_telemetry::metrics::RECONCILE_TOTAL
                .with_label_values(&["rejected"])
                .get()
        };

        let before = rejected();
        assert_eq!(reconciler.normalize(" Sell ").unwrap(), Signal::Sell);
        let err = reconciler.normalize(" hold ").unwrap_err();
        assert!(matches!(err, ReconcileError::UnrecognizedSignal(ref s) if s == "hold"));
        assert!(rejected() - before >= 1.0);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_signal_is_normalized() {
        let mock = Arc::new(MockExchangeClient::new());

        let outcome = reconciler(&mock).handle("  buy\n").await.unwrap();
        assert_eq!(outcome.label(), "completed");
        assert_eq!(mock.submitted_orders()[0].side, OrderSide::Buy);
    }

    #[tokio::test]
    async fn test_aligned_signal_reads_position_only() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_position(Position::from_signed(dec!(0.5)));

        let outcome = reconciler(&mock).reconcile(Signal::Buy).await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Aligned {
                signal: Signal::Buy,
                side: PositionSide::Long,
            }
        );
        assert_eq!(mock.calls(), vec![MockCall::GetPosition(eth())]);
    }

    #[tokio::test]
    async fn test_flat_entry_opens_once() {
        let mock = Arc::new(MockExchangeClient::new());

        let outcome = reconciler(&mock).reconcile(Signal::Buy).await;

        let orders = mock.submitted_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert!(!orders[0].reduce_only);
        assert_eq!(orders[0].quantity.inner(), dec!(0.0250));
        match outcome {
            ReconcileOutcome::Completed { closed, quantity, .. } => {
                assert_eq!(closed, None);
                assert_eq!(quantity.inner(), dec!(0.025));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flip_closes_full_size_first() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_position(Position::from_signed(dec!(1.3)));

        reconciler(&mock).reconcile(Signal::Sell).await;

        let orders = mock.submitted_orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert!(orders[0].reduce_only);
        assert_eq!(orders[0].quantity.inner(), dec!(1.3));
        assert_eq!(orders[1].side, OrderSide::Sell);
        assert!(!orders[1].reduce_only);
        assert_eq!(orders[1].quantity.inner(), dec!(0.025));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_delay_between_close_and_open() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_position(Position::from_signed(dec!(-2)));

        let started = tokio::time::Instant::now();
        reconciler(&mock).reconcile(Signal::Buy).await;

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(mock.submitted_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_close_failure_skips_open() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_position(Position::from_signed(dec!(-0.4)));
        mock.push_order_failure("reduce-only rejected");

        let outcome = reconciler(&mock).reconcile(Signal::Buy).await;

        match outcome {
            ReconcileOutcome::Aborted { stage, reason, .. } => {
                assert_eq!(stage, Stage::Close);
                assert!(reason.contains("reduce-only rejected"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(mock.submitted_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_price_failure_submits_nothing() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_position(Position::from_signed(dec!(1)));
        mock.fail_price("ticker unavailable");

        let outcome = reconciler(&mock).reconcile(Signal::Sell).await;

        assert!(matches!(outcome, ReconcileOutcome::Aborted { stage: Stage::Price, .. }));
        assert!(mock.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_zero_quantity_aborts() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_price(Price::new(dec!(1000000)));
        let mut config = ReconcilerConfig::new(eth());
        config.position_size_usdt = dec!(1);

        let outcome = reconciler_with(&mock, config).reconcile(Signal::Buy).await;

        assert!(matches!(outcome, ReconcileOutcome::Aborted { stage: Stage::Sizing, .. }));
        assert!(mock.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_position_failure_fails_flat() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.fail_position("timeout");

        let outcome = reconciler(&mock).reconcile(Signal::Sell).await;

        assert_eq!(outcome.label(), "completed");
        let orders = mock.submitted_orders();
        assert_eq!(orders.len(), 1);
        assert!(!orders[0].reduce_only);
    }

    #[tokio::test]
    async fn test_position_failure_with_abort_policy() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.fail_position("timeout");
        let mut config = ReconcilerConfig::new(eth());
        config.position_policy = PositionQueryPolicy::Abort;

        let outcome = reconciler_with(&mock, config).reconcile(Signal::Sell).await;

        assert!(matches!(outcome, ReconcileOutcome::Aborted { stage: Stage::Position, .. }));
        assert!(mock.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_outcome_serializes_for_webhook() {
        let mock = Arc::new(MockExchangeClient::new());
        mock.set_position(Position::from_signed(dec!(-1)));

        let outcome = reconciler(&mock).reconcile(Signal::Sell).await;
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["outcome"], "aligned");
        assert_eq!(json["signal"], "SELL");
        assert_eq!(json["side"], "SHORT");
    }
}
