use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TegraError;

/// The device classes reported by one tegrastats line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Device {
    Ram,
    Cpu,
    Gpu,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Ram, Device::Cpu, Device::Gpu];

    pub fn label(self) -> &'static str {
        match self {
            Device::Ram => "RAM",
            Device::Cpu => "CPU",
            Device::Gpu => "GPU",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single device's utilization from one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Current utilization (MB for RAM as printed by tegrastats, percent otherwise).
    pub used: f64,
    /// Capacity ceiling; always 100 for CPU and GPU.
    pub max: f64,
}

impl Reading {
    pub fn new(used: f64, max: f64) -> Self {
        Self { used, max }
    }

    /// Percent reading with the fixed 100 ceiling.
    pub fn percent(used: f64) -> Self {
        Self { used, max: 100.0 }
    }
}

/// Latest reading per device class.
///
/// A slot is `None` until a line carrying that device has been parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub ram: Option<Reading>,
    pub cpu: Option<Reading>,
    pub gpu: Option<Reading>,
    /// Arrival time of the last line that updated any slot.
    pub updated_at: Option<DateTime<Local>>,
}

impl Snapshot {
    pub fn get(&self, device: Device) -> Option<Reading> {
        match device {
            Device::Ram => self.ram,
            Device::Cpu => self.cpu,
            Device::Gpu => self.gpu,
        }
    }

    /// `true` once every device class has reported at least once.
    pub fn is_complete(&self) -> bool {
        self.ram.is_some() && self.cpu.is_some() && self.gpu.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ram.is_none() && self.cpu.is_none() && self.gpu.is_none()
    }

    /// Overwrite each slot that `other` carries, leaving the rest untouched.
    ///
    /// Returns `true` if any slot was replaced.
    pub fn merge(&mut self, other: &Snapshot) -> bool {
        let mut changed = false;
        for (slot, incoming) in [
            (&mut self.ram, other.ram),
            (&mut self.cpu, other.cpu),
            (&mut self.gpu, other.gpu),
        ] {
            if let Some(reading) = incoming {
                *slot = Some(reading);
                changed = true;
            }
        }
        if changed && other.updated_at.is_some() {
            self.updated_at = other.updated_at;
        }
        changed
    }
}

/// Why the background reader stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// `close()` was called or the sampler was dropped.
    Closed,
    /// The subprocess closed its output; `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
    /// The reader hit an error it could not continue past.
    Failed(TegraError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Closed => f.write_str("closed"),
            StopReason::Exited { code: Some(code) } => write!(f, "exited with status {code}"),
            StopReason::Exited { code: None } => f.write_str("terminated by signal"),
            StopReason::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Lifecycle of a sampler subprocess.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SamplerState {
    #[default]
    NotStarted,
    Running { pid: Option<u32> },
    Stopped(StopReason),
}

impl SamplerState {
    pub fn is_running(&self) -> bool {
        matches!(self, SamplerState::Running { .. })
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SamplerState::Stopped(_))
    }
}
