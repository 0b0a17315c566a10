//! Harness configuration

use anyhow::{Context, Result};
use lending_assertions::AssertionConfig;

pub const CONFIG_ENV: &str = "ASSERTIONS_CONFIG";
pub const DEFAULT_PATH: &str = "assertions.toml";

/// Load engine tolerances from TOML
///
/// An explicit path must load. Otherwise `ASSERTIONS_CONFIG` or
/// `assertions.toml` is tried and the built-in defaults are used when that
/// file is absent or unreadable.
pub fn load(explicit: Option<&str>) -> Result<AssertionConfig> {
    if let Some(path) = explicit {
        return read(path);
    }

    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_PATH.to_string());
    Ok(read(&path).unwrap_or_else(|e| {
        log::warn!("{:#}, using default tolerances", e);
        AssertionConfig::default()
    }))
}

fn read(path: &str) -> Result<AssertionConfig> {
    let expanded = shellexpand::tilde(path);
    let config_str = std::fs::read_to_string(expanded.as_ref())
        .context(format!("Failed to read config file: {}", path))?;

    let config: AssertionConfig = toml::from_str(&config_str).context("Failed to parse config TOML")?;
    log::debug!("loaded config from {}", path);
    Ok(config)
}

/// Write the default configuration to `path`
pub fn write_default(path: &str) -> Result<()> {
    let toml_str = toml::to_string_pretty(&AssertionConfig::default()).context("Failed to serialize config")?;

    let expanded = shellexpand::tilde(path);
    std::fs::write(expanded.as_ref(), toml_str).context(format!("Failed to write config to {}", path))?;

    log::info!("Created default config at {}", path);
    Ok(())
}
