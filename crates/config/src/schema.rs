use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tegra_core::Device;

/// Root configuration structure parsed from `tegraview.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TegraConfig {
    /// How the sampling utility is launched.
    pub sampler: SamplerConfig,
    /// Rolling statistics settings.
    pub stats: StatsConfig,
    /// Console dashboard settings.
    pub dashboard: DashboardConfig,
}

/// Sampling utility invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Executable to launch.
    pub path: PathBuf,
    /// Sampling interval passed as `--interval <ms>`.
    pub interval_ms: u64,
    /// Extra arguments placed before `--interval`.
    pub args: Vec<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/usr/bin/tegrastats"),
            interval_ms: 100,
            args: Vec::new(),
        }
    }
}

/// Rolling statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Number of samples in the moving-average window.
    pub window: usize,
    /// Report usage relative to the first reading instead of absolute values.
    pub baseline: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window: 40,
            baseline: false,
        }
    }
}

/// Console dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// How often the snapshot is polled and a summary printed.
    pub refresh_ms: u64,
    /// How long to wait for the first complete sample after launch.
    pub startup_timeout_ms: u64,
    /// Warn when no new line has arrived for this long.
    pub stale_after_ms: u64,
    /// Devices shown, in display order.
    pub devices: Vec<Device>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_ms:         250,
            startup_timeout_ms: 5000,
            stale_after_ms:     2000,
            devices:            vec![Device::Cpu, Device::Gpu, Device::Ram],
        }
    }
}
