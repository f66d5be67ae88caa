use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::leads::LeadSyncConfig;

/// Environment variable that overrides `sourceUrl`.
pub const SOURCE_URL_ENV: &str = "LEADBOARD_SOURCE_URL";

/// ~/.leadboard/config.json
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    Ok(home.join(".leadboard").join("config.json"))
}

/// Load config from `path`. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<LeadSyncConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(LeadSyncConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: LeadSyncConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Apply `LEADBOARD_SOURCE_URL` (via `lookup`) on top of a loaded config.
/// A blank value is ignored.
pub fn apply_env_overrides(
    mut config: LeadSyncConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> LeadSyncConfig {
    if let Some(url) = lookup(SOURCE_URL_ENV).filter(|u| !u.trim().is_empty()) {
        log::info!("Source URL overridden by {}", SOURCE_URL_ENV);
        config.source_url = url.trim().to_string();
    }
    config
}

/// Load, apply environment overrides, validate.
pub fn load_config() -> Result<LeadSyncConfig, ConfigError> {
    let config = load_config_from(&config_path()?)?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Write config as pretty JSON, creating the parent directory.
pub fn save_config_to(path: &Path, config: &LeadSyncConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
