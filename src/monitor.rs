//! Fixed-cadence monitoring orchestrator.
//!
//! One tick = sample hardware → sample market prices → log a status
//! line → run the threshold analyzer → persist the combined record →
//! sleep. The loop is the system's availability boundary: every
//! collaborator failure is absorbed here and the loop never returns.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, instrument};

use crate::analyzer::{AlertSink, Analyzer};
use crate::collectors::{HardwareSampler, MarketClient};
use crate::config::{ASSET_BITCOIN, Config, DatabaseConfig, SCAN_INTERVAL, TICK_RECOVERY_DELAY, TRACKED_ASSETS};
use crate::storage::{MetricSample, MetricsStore};
use crate::{HostMetrics, PriceSnapshot};

pub struct MonitorLoop {
    sampler: Arc<HardwareSampler>,
    market: MarketClient,
    analyzer: Analyzer,
    sink: Arc<dyn AlertSink>,
    db_config: DatabaseConfig,
    scan_interval: Duration,
}

impl MonitorLoop {
    pub fn new(
        config: &Config,
        sampler: Arc<HardwareSampler>,
        market: MarketClient,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            sampler,
            market,
            analyzer: Analyzer::new(config.settings_file.clone(), sink.clone()),
            sink,
            db_config: config.database.clone(),
            scan_interval: SCAN_INTERVAL,
        }
    }

    /// Run forever.
    ///
    /// A failed initial database connection leaves the loop in degraded
    /// mode: sampling, analysis and alerting keep running, only the
    /// persistence step is skipped. Tick failures are logged and the
    /// loop resumes after a short recovery delay.
    #[instrument(skip_all)]
    pub async fn run(mut self) {
        let mut store = match MetricsStore::connect(&self.db_config).await {
            Ok(mut store) => {
                if let Err(e) = store.init_schema().await {
                    error!("schema initialization failed: {e}");
                }
                Some(store)
            }
            Err(e) => {
                error!("database unavailable, running without persistence: {e}");
                None
            }
        };

        info!(
            "monitor loop initialized, polling every {}s",
            self.scan_interval.as_secs()
        );

        self.sink
            .push_alert("🚀 **System Online**\nMonitoring active. Send `/status` for metrics.")
            .await;

        loop {
            match self.tick(&mut store).await {
                Ok(()) => tokio::time::sleep(self.scan_interval).await,
                Err(e) => {
                    error!("monitor tick failed: {:#}", e);
                    tokio::time::sleep(TICK_RECOVERY_DELAY).await;
                }
            }
        }
    }

    /// One sampling/analysis/persistence cycle.
    async fn tick(&mut self, store: &mut Option<MetricsStore>) -> anyhow::Result<()> {
        // The CPU sample blocks for its measurement window, so it runs
        // on the blocking pool instead of stalling the runtime.
        let sampler = self.sampler.clone();
        let metrics = tokio::task::spawn_blocking(move || sampler.sample())
            .await
            .context("hardware sampling task failed")?;

        let prices = self.market.fetch_prices(&TRACKED_ASSETS).await;

        log_status_line(&metrics, &prices);

        self.analyzer.run_cycle(&metrics, &prices).await;

        if let Some(active) = store {
            let sample = MetricSample::from_readings(&metrics, &prices);
            if let Err(e) = active.save(&sample).await {
                error!("failed to persist sample: {e}");
            }
        }

        Ok(())
    }
}

/// One-line per-tick summary; GPU hosts lead with the GPU reading.
fn log_status_line(metrics: &HostMetrics, prices: &PriceSnapshot) {
    let btc = prices
        .get(ASSET_BITCOIN)
        .map(|price| format!("${price}"))
        .unwrap_or_else(|| "n/a".to_string());

    if metrics.has_gpu() {
        info!("STATUS | GPU: {}°C | BTC: {btc}", metrics.gpu_temp);
    } else {
        info!("STATUS | CPU: {:.1}% | BTC: {btc}", metrics.cpu_usage);
    }
}
