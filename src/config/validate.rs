// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BarlimanError, Result};
use crate::types::TEST_SLOT_COUNT;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BarlimanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.interpreter, raw.document))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_interpreter(cfg)?;
    validate_document(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(BarlimanError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.task_timeout_ms == 0 {
        return Err(BarlimanError::ConfigError(
            "[config].task_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_interpreter(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.interpreter;

    if section.path.is_none() && section.candidates.iter().all(|c| c.trim().is_empty()) {
        return Err(BarlimanError::ConfigError(
            "[interpreter] needs either `path` or at least one non-empty entry in `candidates`"
                .to_string(),
        ));
    }

    for (key, path) in [
        ("mk_vicare", &section.mk_vicare),
        ("mk", &section.mk),
        ("interp", &section.interp),
    ] {
        if path.as_os_str().is_empty() {
            return Err(BarlimanError::ConfigError(format!(
                "[interpreter].{key} must not be empty"
            )));
        }
    }

    Ok(())
}

fn validate_document(cfg: &RawConfigFile) -> Result<()> {
    let count = cfg.document.test.len();
    if count > TEST_SLOT_COUNT {
        return Err(BarlimanError::ConfigError(format!(
            "[document] has {count} [[document.test]] entries; at most {TEST_SLOT_COUNT} are allowed"
        )));
    }
    Ok(())
}
