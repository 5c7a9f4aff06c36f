// src/cli.rs

//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Live example-driven synthesis for Scheme definitions.
///
/// The `[document]` section of the config file is the document: edit and save
/// it, and every query is re-run against the new content.
#[derive(Debug, Clone, Parser)]
#[command(name = "barliman", version, long_about = None)]
pub struct CliArgs {
    /// Config file (TOML) holding the interpreter setup and the document.
    #[arg(long, value_name = "PATH", default_value = "Barliman.toml")]
    pub config: PathBuf,

    /// Run a single query cycle on the document as saved, then exit.
    #[arg(long)]
    pub once: bool,

    /// Print every query script the document produces and exit without
    /// starting the interpreter.
    #[arg(long)]
    pub dry_run: bool,

    /// Log verbosity for every target. Overrides `BARLIMAN_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// As an `EnvFilter` directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
