pub mod schema;

pub use schema::{DashboardConfig, SamplerConfig, StatsConfig, TegraConfig};

use std::path::{Path, PathBuf};
use tegra_core::{Result, TegraError};

/// Load configuration from a TOML file.  Returns `TegraConfig::default()` if
/// the file doesn't exist so the dashboard always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<TegraConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(TegraConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| TegraError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<TegraConfig> {
    let config: TegraConfig =
        toml::from_str(raw).map_err(|e| TegraError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Reject values the sampler or dashboard cannot run with.
pub fn validate(config: &TegraConfig) -> Result<()> {
    if config.sampler.path.as_os_str().is_empty() {
        return Err(TegraError::Config("sampler.path must not be empty".into()));
    }
    if config.sampler.interval_ms == 0 {
        return Err(TegraError::Config("sampler.interval_ms must be positive".into()));
    }
    if config.stats.window == 0 {
        return Err(TegraError::Config("stats.window must be positive".into()));
    }
    if config.dashboard.refresh_ms == 0 {
        return Err(TegraError::Config("dashboard.refresh_ms must be positive".into()));
    }
    Ok(())
}

/// Return the default config path, honouring `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("tegraview").join("tegraview.toml")
}
