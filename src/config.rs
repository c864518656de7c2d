use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::trace;

/// Batch price endpoint of the CoinGecko simple-price API.
pub const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// Polling cadence of the monitor loop. 60 seconds keeps us under the
/// market API's rate limit; shorter intervals risk HTTP 429.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Pause after a failed tick before the loop resumes.
pub const TICK_RECOVERY_DELAY: Duration = Duration::from_secs(5);

/// Assets sampled on every tick.
pub const TRACKED_ASSETS: [&str; 2] = ["bitcoin", "ethereum"];

pub const ASSET_BITCOIN: &str = "bitcoin";
pub const ASSET_ETHEREUM: &str = "ethereum";

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent token means degraded mode: sampling, logging and
    /// persistence keep running without any chat surface.
    pub telegram: Option<TelegramConfig>,

    pub database: DatabaseConfig,

    /// Path to the JSON document holding the alert thresholds
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,

    /// Destination chat for pushed alerts. Inbound commands are answered
    /// in their originating chat and do not need this.
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Config {
    pub fn from_env() -> Config {
        let telegram = std::env::var("TELEGRAM_TOKEN")
            .ok()
            .map(|token| TelegramConfig {
                token,
                chat_id: std::env::var("CHAT_ID").ok(),
            });

        Config {
            telegram,
            database: DatabaseConfig {
                host: env_or("POSTGRES_HOST", "localhost"),
                port: std::env::var("POSTGRES_PORT")
                    .map_or(5432, |port| port.parse().unwrap_or(5432)),
                user: env_or("POSTGRES_USER", "postgres"),
                password: env_or("POSTGRES_PASSWORD", "password"),
                database: env_or("POSTGRES_DB", "cstm_db"),
            },
            settings_file: PathBuf::from(env_or("SETTINGS_FILE", "config/settings.json")),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Operational settings reloaded from disk on every analysis cycle, so
/// external edits take effect on the next tick.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Thresholds {
    /// GPU temperature ceiling in degrees Celsius
    #[serde(default = "default_gpu_max_temp")]
    pub gpu_max_temp: i32,

    /// Bitcoin support level in USD; 0 disables the lower-bound check
    #[serde(default)]
    pub btc_min_price: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            gpu_max_temp: default_gpu_max_temp(),
            btc_min_price: 0.0,
        }
    }
}

fn default_gpu_max_temp() -> i32 {
    80
}

pub fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid settings file provided!"))
        .inspect(|settings| trace!("loaded settings: {settings:?}"))
}
