// src/exec/interpreter.rs

//! Locating the interpreter binary, once, at startup.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{BarlimanError, Result};

/// Resolve the interpreter binary.
///
/// - An explicit `path` wins. If it has no directory part it is looked up on
///   `PATH` like a candidate; otherwise the file must exist.
/// - Otherwise each candidate name is probed across `PATH`, in order.
///
/// Not finding one is fatal; there is no retry.
pub fn resolve_interpreter(explicit: Option<&Path>, candidates: &[String]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let found = if path.components().count() > 1 {
            path.is_file().then(|| path.to_path_buf())
        } else {
            find_executable_in_path(&path.to_string_lossy())
        };
        return match found {
            Some(p) => {
                info!(interpreter = %p.display(), "using configured interpreter");
                Ok(p)
            }
            None => Err(BarlimanError::InterpreterNotFound {
                candidates: path.display().to_string(),
            }),
        };
    }

    for name in candidates.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        match find_executable_in_path(name) {
            Some(p) => {
                info!(candidate = name, interpreter = %p.display(), "resolved interpreter");
                return Ok(p);
            }
            None => debug!(candidate = name, "interpreter candidate not on PATH"),
        }
    }

    Err(BarlimanError::InterpreterNotFound {
        candidates: candidates.join(", "),
    })
}

fn find_executable_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|base| base.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-scheme");
        let err = resolve_interpreter(Some(&missing), &[]).unwrap_err();
        assert!(matches!(err, BarlimanError::InterpreterNotFound { .. }));

        let present = dir.path().join("scheme");
        std::fs::write(&present, "").unwrap();
        assert_eq!(resolve_interpreter(Some(&present), &[]).unwrap(), present);
    }

    #[test]
    fn unknown_candidates_are_fatal() {
        let candidates = vec!["barliman-no-such-binary-1".to_string(), "  ".to_string()];
        let err = resolve_interpreter(None, &candidates).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("barliman-no-such-binary-1"), "{text}");
    }

    #[cfg(unix)]
    #[test]
    fn candidates_are_probed_on_path() {
        // `sh` is on PATH on every unix we run tests on.
        let candidates = vec!["barliman-no-such-binary-2".to_string(), "sh".to_string()];
        let found = resolve_interpreter(None, &candidates).unwrap();
        assert!(found.ends_with("sh"));
    }
}
