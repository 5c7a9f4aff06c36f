// src/exec/scratch.rs

//! Per-kind scratch files holding query scripts.

use std::path::{Path, PathBuf};

use crate::exec::SpawnError;
use crate::types::QueryKind;

/// `barliman-query-simple.scm`, `barliman-query-test-3.scm`, ...
pub fn scratch_file_name(kind: QueryKind) -> String {
    format!("barliman-query-{}.scm", kind.label())
}

/// Directory holding one script file per query kind.
///
/// Writing a kind's file replaces the previous one; the executor makes sure
/// the process reading it has been reaped first.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    dir: PathBuf,
}

impl ScratchDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: QueryKind) -> PathBuf {
        self.dir.join(scratch_file_name(kind))
    }

    pub async fn write(&self, kind: QueryKind, script: &str) -> Result<PathBuf, SpawnError> {
        let path = self.path_for(kind);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SpawnError::ScratchWrite {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, script)
            .await
            .map_err(|source| SpawnError::ScratchWrite {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
