//! Inbound command front end.
//!
//! Long-polls the Telegram API and serves synchronous queries: a live
//! status report, a historical GPU-temperature chart and the active
//! thresholds. Queries sample fresh data and open their own query-local
//! database connection; they never touch the monitor loop's state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, instrument};

use crate::chart;
use crate::collectors::{HardwareSampler, MarketClient};
use crate::config::{ASSET_BITCOIN, ASSET_ETHEREUM, DatabaseConfig, TRACKED_ASSETS, read_settings_file};
use crate::storage::MetricsStore;
use crate::telegram::TelegramClient;

/// Window of records for the history chart: ~24h at the default
/// one-minute cadence (actual coverage depends on the scan interval).
pub const HISTORY_WINDOW: i64 = 1440;

/// Backoff after a failed update poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct CommandBot {
    telegram: TelegramClient,
    sampler: Arc<HardwareSampler>,
    market: MarketClient,
    db_config: DatabaseConfig,
    settings_file: PathBuf,
}

impl CommandBot {
    pub fn new(
        telegram: TelegramClient,
        sampler: Arc<HardwareSampler>,
        market: MarketClient,
        db_config: DatabaseConfig,
        settings_file: PathBuf,
    ) -> Self {
        Self {
            telegram,
            sampler,
            market,
            db_config,
            settings_file,
        }
    }

    /// Poll for commands until the process terminates. Poll failures
    /// back off briefly and the loop carries on.
    pub async fn run(self) {
        info!("command polling started");

        let mut offset = 0i64;
        loop {
            let updates = match self.telegram.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!("update poll failed: {e}");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else {
                    continue;
                };
                let Some(text) = message.text else {
                    continue;
                };

                self.handle_command(message.chat.id, text.trim()).await;
            }
        }
    }

    #[instrument(skip(self))]
    async fn handle_command(&self, chat_id: i64, text: &str) {
        let command = text.split_whitespace().next().unwrap_or_default();
        // Group chats may address us as /status@botname.
        let command = command.split('@').next().unwrap_or(command);

        match command {
            "/start" | "/help" => self.send_welcome(chat_id).await,
            "/status" => self.handle_status(chat_id).await,
            "/graph" => self.handle_graph(chat_id).await,
            "/config" => self.handle_config(chat_id).await,
            _ => debug!("ignoring unrecognized command: {text}"),
        }
    }

    async fn send_welcome(&self, chat_id: i64) {
        let welcome_text = "🤖 **CryptoStation Commander**\n\n\
            System is online. Available commands:\n\
            📊 `/status` - Live system metrics & asset prices\n\
            📈 `/graph` - Generate 24h GPU thermal chart\n\
            ⚙️ `/config` - Show active thresholds";

        self.telegram
            .send_message(&chat_id.to_string(), welcome_text)
            .await;
    }

    /// Fresh hardware and market samples, formatted as a text report.
    async fn handle_status(&self, chat_id: i64) {
        self.telegram.send_chat_action(chat_id, "typing").await;

        let sampler = self.sampler.clone();
        let metrics = match tokio::task::spawn_blocking(move || sampler.sample()).await {
            Ok(metrics) => metrics,
            Err(e) => {
                error!("hardware sampling task failed: {e}");
                self.telegram
                    .send_message(&chat_id.to_string(), "❌ Error reading system metrics.")
                    .await;
                return;
            }
        };

        let prices = self.market.fetch_prices(&TRACKED_ASSETS).await;

        let gpu_info = if metrics.has_gpu() {
            format!("{}°C", metrics.gpu_temp)
        } else {
            "N/A".to_string()
        };

        let report = format!(
            "📊 **Live System Status**\n\
             --------------------------------\n\
             🖥 **CPU:** {:.1}% | **RAM:** {:.1}%\n\
             🎮 **GPU:** {}\n\
             --------------------------------\n\
             💰 **BTC:** {}\n\
             💎 **ETH:** {}",
            metrics.cpu_usage,
            metrics.ram_usage,
            gpu_info,
            format_usd(prices.get(ASSET_BITCOIN).copied()),
            format_usd(prices.get(ASSET_ETHEREUM).copied()),
        );

        self.telegram.send_message(&chat_id.to_string(), &report).await;
    }

    /// Render and upload the GPU thermal history.
    ///
    /// Opens a query-local store connection; it is closed after the
    /// request whatever the outcome.
    async fn handle_graph(&self, chat_id: i64) {
        self.telegram.send_chat_action(chat_id, "upload_photo").await;

        let mut store = match MetricsStore::connect(&self.db_config).await {
            Ok(store) => store,
            Err(e) => {
                error!("query-path database connection failed: {e}");
                self.telegram
                    .send_message(&chat_id.to_string(), "❌ Database connection failed.")
                    .await;
                return;
            }
        };

        let result = self.reply_with_graph(&mut store, chat_id).await;

        if let Err(e) = store.close().await {
            debug!("closing query connection failed: {e}");
        }

        if let Err(e) = result {
            error!("graph generation error: {e}");
            self.telegram
                .send_message(&chat_id.to_string(), "❌ Error generating graph.")
                .await;
        }
    }

    async fn reply_with_graph(&self, store: &mut MetricsStore, chat_id: i64) -> anyhow::Result<()> {
        let records = store.recent_records(HISTORY_WINDOW).await?;

        if records.is_empty() {
            self.telegram
                .send_message(&chat_id.to_string(), "⚠️ No historical data available yet.")
                .await;
            return Ok(());
        }

        let path = std::env::temp_dir().join(format!("cstm-gpu-history-{chat_id}.png"));
        let render_path = path.clone();
        tokio::task::spawn_blocking(move || chart::render_gpu_history(&records, &render_path))
            .await
            .context("chart rendering task failed")??;

        let png = tokio::fs::read(&path).await.context("failed to read rendered chart")?;
        let _ = tokio::fs::remove_file(&path).await;

        self.telegram
            .send_photo(chat_id, png, "📈 **24h Thermal Analysis**")
            .await;
        Ok(())
    }

    /// Show the thresholds currently on disk.
    async fn handle_config(&self, chat_id: i64) {
        let reply = match read_settings_file(&self.settings_file) {
            Ok(settings) => format!(
                "⚙️ **Active Thresholds**\n\
                 🌡 GPU max temp: {}°C\n\
                 📉 BTC support level: ${}",
                settings.thresholds.gpu_max_temp, settings.thresholds.btc_min_price
            ),
            Err(e) => {
                error!("settings load failed for /config: {e}");
                "❌ Threshold configuration unavailable.".to_string()
            }
        };

        self.telegram.send_message(&chat_id.to_string(), &reply).await;
    }
}

fn format_usd(price: Option<f64>) -> String {
    match price {
        Some(price) => format!("${price}"),
        None => "n/a".to_string(),
    }
}
