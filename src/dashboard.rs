use chrono::{DateTime, Local};
use std::time::Duration;
use tegra_config::{DashboardConfig, StatsConfig};
use tegra_core::{Device, Snapshot};
use tegra_stats::RollingStat;
use tracing::{info, warn};

/// Console stand-in for the graph view: one [`RollingStat`] per device, fed
/// from the sampler's snapshot on every refresh.
#[derive(Debug)]
pub struct Dashboard {
    views:       Vec<DeviceView>,
    stale_after: Duration,
    stale:       bool,
}

#[derive(Debug)]
struct DeviceView {
    device: Device,
    stat:   RollingStat,
}

impl Dashboard {
    /// Build the per-device stats from the first complete snapshot.
    ///
    /// Each device's ceiling comes from its first reading; in baseline mode
    /// that reading's usage becomes the baseline. Devices missing from `first`
    /// are skipped.
    pub fn new(first: &Snapshot, stats: &StatsConfig, config: &DashboardConfig) -> Self {
        let views = config
            .devices
            .iter()
            .filter_map(|&device| {
                let reading = first.get(device)?;
                let mut stat = RollingStat::new(stats.window, reading.max, stats.baseline);
                stat.set_baseline(reading.used);
                Some(DeviceView { device, stat })
            })
            .collect();

        Self {
            views,
            stale_after: Duration::from_millis(config.stale_after_ms),
            stale: false,
        }
    }

    /// Feed the latest readings into the stats.
    ///
    /// The current value is pushed even if it has not changed since the last
    /// tick, so the window advances at the refresh rate.
    pub fn tick(&mut self, snapshot: &Snapshot, now: DateTime<Local>) {
        for view in &mut self.views {
            if let Some(reading) = snapshot.get(view.device) {
                view.stat.put(reading.used);
            }
        }
        self.update_staleness(snapshot, now);
    }

    fn update_staleness(&mut self, snapshot: &Snapshot, now: DateTime<Local>) {
        let age = snapshot
            .updated_at
            .and_then(|at| (now - at).to_std().ok())
            .unwrap_or_default();
        let stale = age > self.stale_after;

        if stale && !self.stale {
            warn!("No new samples for {} ms", age.as_millis());
        } else if !stale && self.stale {
            info!("Samples resumed");
        }
        self.stale = stale;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn stat(&self, device: Device) -> Option<&RollingStat> {
        self.views
            .iter()
            .find(|v| v.device == device)
            .map(|v| &v.stat)
    }

    /// One line per refresh, devices in configured order.
    pub fn render(&self) -> String {
        self.views
            .iter()
            .map(|v| {
                format!(
                    "{} {:.1}/{:.0} ({})",
                    v.device,
                    v.stat.current(),
                    v.stat.max_range(),
                    v.stat.summary()
                )
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}
