// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::exec::SpawnError;
use crate::query::BuildError;

#[derive(Error, Debug)]
pub enum BarlimanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Query build error: {0}")]
    Build(#[from] BuildError),

    #[error("Spawn error: {0}")]
    Spawn(#[from] SpawnError),

    #[error("No usable interpreter binary found (tried: {candidates})")]
    InterpreterNotFound { candidates: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BarlimanError>;
