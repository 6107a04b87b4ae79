// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchrunError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.batch, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_scheduling(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn validate_scheduling(cfg: &RawConfigFile) -> Result<()> {
    // The strategy itself is strongly typed and validated during
    // deserialization, so only value ranges are checked here.

    if cfg.config.max_queue_size == 0 {
        return Err(WatchrunError::ConfigError(
            "[config].max_queue_size must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.debounce_ms == 0 {
        return Err(WatchrunError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.execution_timeout_ms == 0 {
        return Err(WatchrunError::ConfigError(
            "[config].execution_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.batch.window_ms == 0 {
        return Err(WatchrunError::ConfigError(
            "[batch].window_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    for pattern in cfg.watch.include.iter().chain(cfg.watch.exclude.iter()) {
        if let Err(err) = Glob::new(pattern) {
            return Err(WatchrunError::ConfigError(format!(
                "invalid glob pattern '{pattern}' in [watch]: {err}"
            )));
        }
    }

    for ext in cfg.watch.source_extensions.iter() {
        if ext.starts_with('.') || ext.contains('/') {
            return Err(WatchrunError::ConfigError(format!(
                "[watch].source_extensions entries must be bare extensions \
                 like \"ts\" (got '{ext}')"
            )));
        }
    }

    Ok(())
}
