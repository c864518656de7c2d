//! Threshold evaluation and alert deduplication.
//!
//! `evaluate` is a pure function from one pair of snapshots to the list
//! of triggered conditions. The surrounding [`Analyzer`] reloads the
//! thresholds from disk each cycle, joins the conditions into a single
//! alert body and lets the [`AlertDeduplicator`] decide whether that
//! body goes out through the [`AlertSink`].
//!
//! ## Deduplication state machine
//!
//! One slot holding the last dispatched body:
//!
//! ```text
//! idle,     trigger         → dispatch, slot := body
//! alerting, same body       → suppress
//! alerting, different body  → dispatch, slot := body
//! alerting, no conditions   → slot := empty (next recurrence re-alerts)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, instrument, warn};

use crate::config::{ASSET_BITCOIN, Thresholds, read_settings_file};
use crate::{HostMetrics, PriceSnapshot};

/// Outbound push capability.
///
/// Implementations are best effort: failures are logged and dropped,
/// never surfaced to the analyzer.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn push_alert(&self, text: &str);
}

/// Sink used when no notification credentials are configured.
pub struct NullSink;

#[async_trait]
impl AlertSink for NullSink {
    async fn push_alert(&self, text: &str) {
        debug!("notifications disabled, dropping alert: {text}");
    }
}

/// Evaluate one pair of snapshots against the thresholds.
///
/// Conditions are independent and additive, returned in fixed order
/// (thermal before market). The thermal rule is gated on GPU presence so
/// the zeroed defaults of GPU-less hosts are never read as a real
/// temperature; the market rule only fires on a known, positive price.
pub fn evaluate(
    metrics: &HostMetrics,
    prices: &PriceSnapshot,
    thresholds: &Thresholds,
) -> Vec<String> {
    let mut alerts = vec![];

    if metrics.has_gpu() && metrics.gpu_temp > thresholds.gpu_max_temp {
        alerts.push(format!(
            "🔥 **Critical thermal event**: GPU at {}°C (limit: {}°C)",
            metrics.gpu_temp, thresholds.gpu_max_temp
        ));
    }

    if let Some(&price) = prices.get(ASSET_BITCOIN)
        && price > 0.0
        && price < thresholds.btc_min_price
    {
        alerts.push(format!(
            "📉 **Market dip detected**: BTC at ${price} (target: ${})",
            thresholds.btc_min_price
        ));
    }

    alerts
}

/// Single-slot dedup state keyed on the exact alert body text.
#[derive(Debug, Clone, Default)]
pub struct AlertDeduplicator {
    last_signature: Option<String>,
}

impl AlertDeduplicator {
    /// A body goes out only when it differs from the last dispatched one.
    pub fn should_dispatch(&self, signature: &str) -> bool {
        self.last_signature.as_deref() != Some(signature)
    }

    pub fn record_dispatch(&mut self, signature: impl ToString) {
        self.last_signature = Some(signature.to_string());
    }

    /// Clear the slot when a cycle produced no conditions, so a later
    /// recurrence of the same condition alerts again.
    pub fn reset(&mut self) {
        self.last_signature = None;
    }

    pub fn is_idle(&self) -> bool {
        self.last_signature.is_none()
    }
}

/// Per-cycle analysis driver owned by the monitor loop.
pub struct Analyzer {
    settings_file: PathBuf,
    dedup: AlertDeduplicator,
    sink: Arc<dyn AlertSink>,
}

impl Analyzer {
    pub fn new(settings_file: PathBuf, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            settings_file,
            dedup: AlertDeduplicator::default(),
            sink,
        }
    }

    /// Run one evaluation cycle.
    ///
    /// The settings file is reloaded on every call. A load failure skips
    /// the cycle entirely: no alert, no dedup state change.
    #[instrument(skip_all)]
    pub async fn run_cycle(&mut self, metrics: &HostMetrics, prices: &PriceSnapshot) {
        let settings = match read_settings_file(&self.settings_file) {
            Ok(settings) => settings,
            Err(e) => {
                error!("settings load failed, skipping analysis cycle: {e}");
                return;
            }
        };

        let alerts = evaluate(metrics, prices, &settings.thresholds);

        if alerts.is_empty() {
            if !self.dedup.is_idle() {
                debug!("conditions cleared, resetting alert state");
            }
            self.dedup.reset();
            return;
        }

        let signature = alerts.join("\n");

        if !self.dedup.should_dispatch(&signature) {
            debug!("alert body unchanged, suppressing dispatch");
            return;
        }

        warn!("triggering alert: {signature}");
        self.sink
            .push_alert(&format!("⚠️ *System alert*\n\n{signature}"))
            .await;
        self.dedup.record_dispatch(&signature);
    }
}
