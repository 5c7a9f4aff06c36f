// src/query/preamble.rs

//! The constant head of every query script: two library loads plus the
//! relational interpreter source.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::model::InterpreterSection;
use crate::errors::{BarlimanError, Result};

/// Loaded once at startup and never re-read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    load_directives: [String; 2],
    interpreter_text: String,
}

impl Preamble {
    pub fn new(
        first_library: impl AsRef<Path>,
        second_library: impl AsRef<Path>,
        interpreter_text: impl Into<String>,
    ) -> Self {
        Self {
            load_directives: [
                load_directive(first_library.as_ref()),
                load_directive(second_library.as_ref()),
            ],
            interpreter_text: interpreter_text.into(),
        }
    }

    /// Read the interpreter program named by the config.
    ///
    /// The two libraries are only referenced by path (the interpreter loads
    /// them itself), but they must exist, otherwise every query would fail the
    /// same confusing way.
    pub fn load(section: &InterpreterSection) -> Result<Self> {
        for lib in [&section.mk_vicare, &section.mk] {
            if !lib.is_file() {
                return Err(BarlimanError::ConfigError(format!(
                    "[interpreter] library file not found: {}",
                    lib.display()
                )));
            }
        }

        let interpreter_text = fs::read_to_string(&section.interp).map_err(|e| {
            BarlimanError::ConfigError(format!(
                "[interpreter] could not read interpreter program {}: {e}",
                section.interp.display()
            ))
        })?;

        info!(
            interp = %section.interp.display(),
            bytes = interpreter_text.len(),
            "loaded interpreter program"
        );

        Ok(Self::new(&section.mk_vicare, &section.mk, interpreter_text))
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.interpreter_text.len() + 256);
        for directive in &self.load_directives {
            out.push_str(directive);
            out.push('\n');
        }
        out.push_str(&self.interpreter_text);
        if !self.interpreter_text.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

fn load_directive(path: &Path) -> String {
    format!("(load \"{}\")", scheme_string_escape(&path.to_string_lossy()))
}

fn scheme_string_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
