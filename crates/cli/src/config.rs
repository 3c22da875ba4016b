use anyhow::{Context, Result};
use sessdiag_core::config::{CONFIG_FILE_NAME, DiagConfig};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SESSDIAG_CONFIG";

/// Get the config directory path (~/.config/sessdiag/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("sessdiag"))
}

/// Config file to read: `--config`, then `$SESSDIAG_CONFIG`, then the
/// default location.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            Ok(PathBuf::from(shellexpand::tilde(path.trim()).as_ref()))
        }
        _ => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Load config; a missing file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<DiagConfig> {
    let path = config_path(explicit)?;
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(DiagConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config = DiagConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(config)
}
