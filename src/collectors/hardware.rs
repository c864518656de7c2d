//! Host hardware sampling (CPU, RAM, GPU).
//!
//! NVML initialisation is gracefully optional: a host without NVIDIA
//! drivers reports no GPU instead of failing, and the GPU fields of the
//! snapshot keep their zero defaults.

use nvml_wrapper::Nvml;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use sysinfo::System;
use tracing::{instrument, warn};

use crate::HostMetrics;

pub struct HardwareSampler {
    /// `None` when NVML could not be initialised (no drivers / no GPU)
    nvml: Option<Nvml>,
}

impl HardwareSampler {
    pub fn new() -> Self {
        let nvml = match Nvml::init() {
            Ok(nvml) => Some(nvml),
            Err(e) => {
                warn!("NVML unavailable, GPU telemetry disabled: {e}");
                None
            }
        };

        Self { nvml }
    }

    /// Take one snapshot of the host.
    ///
    /// Blocks for the CPU sampling window; call via `spawn_blocking`
    /// from async contexts. Sensor failures degrade to the zero
    /// defaults, never to an error.
    #[instrument(skip_all)]
    pub fn sample(&self) -> HostMetrics {
        let mut metrics = HostMetrics::default();

        let mut sys = System::new_all();
        sys.refresh_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_all();

        let cpus = sys.cpus();
        if !cpus.is_empty() {
            let cpu_usage_sum = cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>();
            metrics.cpu_usage = cpu_usage_sum / cpus.len() as f32;
        }

        let total_memory = sys.total_memory();
        if total_memory > 0 {
            metrics.ram_usage = sys.used_memory() as f32 / total_memory as f32 * 100.0;
        }

        if let Some(nvml) = &self.nvml {
            match Self::sample_gpu(nvml) {
                Ok((name, temp, load)) => {
                    metrics.gpu_name = Some(name);
                    metrics.gpu_temp = temp;
                    metrics.gpu_load = load;
                }
                Err(e) => {
                    warn!("GPU sensor read failed, reporting no GPU: {e}");
                }
            }
        }

        metrics
    }

    /// Read name, core temperature and utilization of the first GPU.
    fn sample_gpu(nvml: &Nvml) -> Result<(String, i32, f32), nvml_wrapper::error::NvmlError> {
        let device = nvml.device_by_index(0)?;

        let name = device.name()?;
        let temperature = device.temperature(TemperatureSensor::Gpu)?;
        let utilization = device.utilization_rates()?;

        Ok((name, temperature as i32, utilization.gpu as f32))
    }
}

impl Default for HardwareSampler {
    fn default() -> Self {
        Self::new()
    }
}
