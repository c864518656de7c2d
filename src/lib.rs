pub mod analyzer;
pub mod bot;
pub mod chart;
pub mod collectors;
pub mod config;
pub mod monitor;
pub mod storage;
pub mod telegram;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One point-in-time reading of the host's hardware sensors.
///
/// The GPU fields stay at their zero defaults when `gpu_name` is `None`;
/// consumers must treat them as "no GPU detected", not as real readings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostMetrics {
    /// Average CPU usage across all cores (percentage 0-100)
    pub cpu_usage: f32,

    /// RAM usage (percentage 0-100)
    pub ram_usage: f32,

    /// Marketing name of the first detected GPU, if any
    pub gpu_name: Option<String>,

    /// GPU core temperature in degrees Celsius
    pub gpu_temp: i32,

    /// GPU utilization (percentage 0-100)
    pub gpu_load: f32,
}

impl HostMetrics {
    pub fn has_gpu(&self) -> bool {
        self.gpu_name.is_some()
    }
}

/// Latest USD price per asset identifier.
///
/// A missing key means the source did not report that asset (rate limit,
/// partial response) -- unknown, never zero.
pub type PriceSnapshot = HashMap<String, f64>;
