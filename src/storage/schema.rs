//! Telemetry table row definitions.
//!
//! The table is append-only: rows are created by the monitor loop's
//! persistence step and only ever read back (newest first) by the chart
//! query. `id` and `timestamp` are assigned by the database, so the
//! insert payload and the read row are separate types.

use chrono::{DateTime, Utc};

use crate::config::{ASSET_BITCOIN, ASSET_ETHEREUM};
use crate::{HostMetrics, PriceSnapshot};

/// Insert payload for one tick's combined readings.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub gpu_temp: i32,

    /// `None` when the market snapshot did not cover the asset; stored
    /// as NULL, never as zero.
    pub btc_price: Option<f64>,
    pub eth_price: Option<f64>,
}

impl MetricSample {
    pub fn from_readings(metrics: &HostMetrics, prices: &PriceSnapshot) -> Self {
        Self {
            cpu_usage: metrics.cpu_usage as f64,
            ram_usage: metrics.ram_usage as f64,
            gpu_temp: metrics.gpu_temp,
            btc_price: prices.get(ASSET_BITCOIN).copied(),
            eth_price: prices.get(ASSET_ETHEREUM).copied(),
        }
    }
}

/// One persisted row, as read back from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricRecord {
    pub id: i32,

    /// Write time, assigned by the database (always UTC)
    pub timestamp: DateTime<Utc>,

    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub gpu_temp: i32,
    pub btc_price: Option<f64>,
    pub eth_price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_sample_from_full_readings() {
        let metrics = HostMetrics {
            cpu_usage: 42.5,
            ram_usage: 61.0,
            gpu_name: Some("GeForce RTX 3080".to_string()),
            gpu_temp: 67,
            gpu_load: 80.0,
        };
        let prices = PriceSnapshot::from([
            ("bitcoin".to_string(), 50000.0),
            ("ethereum".to_string(), 3000.0),
        ]);

        let sample = MetricSample::from_readings(&metrics, &prices);

        assert_eq!(sample.cpu_usage, 42.5);
        assert_eq!(sample.ram_usage, 61.0);
        assert_eq!(sample.gpu_temp, 67);
        assert_eq!(sample.btc_price, Some(50000.0));
        assert_eq!(sample.eth_price, Some(3000.0));
    }

    #[test]
    fn test_missing_prices_become_null_not_zero() {
        let sample = MetricSample::from_readings(&HostMetrics::default(), &PriceSnapshot::new());

        assert_eq!(sample.btc_price, None);
        assert_eq!(sample.eth_price, None);
    }
}
