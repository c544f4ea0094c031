//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProbeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Names the config file; unset means built-in defaults.
pub const CONFIG_PATH_VAR: &str = "PROBE_CONFIG";
/// Overrides `server.port`.
pub const PORT_VAR: &str = "PORT";
/// Comma-separated list overriding `probes.tags`.
pub const TAGS_VAR: &str = "PROBE_TAGS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProbeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProbeConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `PROBE_CONFIG` (or defaults), apply env overrides, then validate.
pub fn load_from_env() -> Result<ProbeConfig, ConfigError> {
    let lookup = |name: &str| std::env::var(name).ok();

    let mut config = match lookup(CONFIG_PATH_VAR).filter(|p| !p.is_empty()) {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        None => ProbeConfig::default(),
    };

    apply_env_overrides(&mut config, lookup).map_err(ConfigError::Validation)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `PORT` and `PROBE_TAGS` from `lookup`.
pub fn apply_env_overrides<F>(config: &mut ProbeConfig, lookup: F) -> Result<(), Vec<ValidationError>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    if let Some(raw) = lookup(PORT_VAR).filter(|v| !v.trim().is_empty()) {
        match raw.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => errors.push(ValidationError::InvalidOverride {
                var: PORT_VAR,
                value: raw,
            }),
        }
    }

    if let Some(raw) = lookup(TAGS_VAR) {
        config.probes.tags = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
