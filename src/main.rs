//! tegraview — live RAM / CPU / GPU usage statistics from `tegrastats`.
//!
//! Run with:  `RUST_LOG=info tegraview [config.toml]`

mod dashboard;

use anyhow::Result;
use chrono::Local;
use dashboard::Dashboard;
use std::path::PathBuf;
use std::time::Duration;
use tegra_core::StopReason;
use tegra_sampler::SamplerProcess;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging — RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("tegraview v{} starting", env!("CARGO_PKG_VERSION"));

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(tegra_config::default_path);
    let config = tegra_config::load(&path)?;

    let mut sampler = SamplerProcess::new(config.sampler.clone());
    sampler.open()?;

    let startup = Duration::from_millis(config.dashboard.startup_timeout_ms);
    let first = match sampler.wait_ready(startup).await {
        Ok(first) => first,
        Err(e) => {
            let _ = sampler.close();
            return Err(e.into());
        }
    };

    let mut dashboard = Dashboard::new(&first, &config.stats, &config.dashboard);
    let mut ticker = tokio::time::interval(Duration::from_millis(config.dashboard.refresh_ms));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let failure = loop {
        tokio::select! {
            _ = ticker.tick() => {
                dashboard.tick(&sampler.snapshot(), Local::now());
                info!("{}", dashboard.render());
            }
            reason = sampler.stopped() => {
                warn!("Sampler stopped ({reason}); last values: {}", dashboard.render());
                match reason {
                    StopReason::Failed(e) => break Some(e),
                    _ => break None,
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted; shutting down");
                break None;
            }
        }
    };

    // Already stopped on its own is fine here.
    let _ = sampler.close();
    sampler.join().await;

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
