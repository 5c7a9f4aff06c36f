// src/logging.rs

//! `tracing` subscriber for the binary.
//!
//! The filter comes from, in order:
//! 1. `--log-level`, applied to every target
//! 2. `BARLIMAN_LOG`, a full `EnvFilter` directive string
//!    (e.g. `barliman::engine=debug,notify=warn`)
//! 3. `info`
//!
//! Everything goes to stderr. Stdout belongs to the slot renderer.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "BARLIMAN_LOG";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(level.as_directive()));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {LOG_ENV_VAR} value {directives:?}")),
        None => Ok(EnvFilter::new("info")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_beats_environment() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error")).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn environment_accepts_per_target_directives() {
        let filter = build_filter(None, Some("barliman::engine=trace,warn")).unwrap();
        let text = filter.to_string();
        assert!(text.contains("barliman::engine=trace"));
        assert!(text.contains("warn"));
    }

    #[test]
    fn blank_environment_falls_back_to_info() {
        let filter = build_filter(None, Some("  ")).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn garbage_in_environment_is_an_error() {
        assert!(build_filter(None, Some("barliman=loudest")).is_err());
    }
}
