// src/exec/process.rs

//! Process runner: one interpreter process per query script.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::scratch::ScratchDir;
use crate::types::QueryKind;

/// How long the pipes may stay open after the interpreter exits. A
/// background descendant can hold them open indefinitely.
pub const OUTPUT_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("could not write query script {}: {source}", path.display())]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not launch interpreter {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything a finished process produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was ended by a signal.
    pub exit_code: i32,
    pub elapsed: Duration,
}

/// Spawns `<program> --script <scratch file>`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    scratch: ScratchDir,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, scratch: ScratchDir) -> Self {
        Self {
            program: program.into(),
            scratch,
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Persist `script` to the kind's scratch file and start the interpreter
    /// on it.
    pub async fn spawn(&self, kind: QueryKind, script: &str) -> Result<ProcessHandle, SpawnError> {
        let script_path = self.scratch.write(kind, script).await?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("--script")
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SpawnError::Launch {
            program: self.program.clone(),
            source,
        })?;

        info!(
            kind = %kind,
            pid = child.id(),
            script = %script_path.display(),
            "interpreter process started"
        );

        // Drain both pipes from the start so a chatty process can't block on a
        // full buffer.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        Ok(ProcessHandle {
            kind,
            child,
            started: Instant::now(),
            stdout,
            stderr,
            exit_code: None,
        })
    }
}

fn spawn_reader<R>(mut pipe: R) -> PipeReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);
    let handle = tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(e) => {
                    debug!(error = %e, "error reading child pipe");
                    break;
                }
            }
        }
    });
    PipeReader { buf, handle }
}

/// Background drain of one child pipe. What was read so far stays available
/// after the drain is aborted.
#[derive(Debug)]
struct PipeReader {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl PipeReader {
    /// Wait for end of file. Cancel safe.
    async fn closed(&mut self) {
        if self.handle.is_finished() {
            return;
        }
        let _ = (&mut self.handle).await;
    }

    fn abort(&self) {
        self.handle.abort();
    }

    /// Stop reading and return everything read so far.
    fn into_text(self) -> String {
        self.abort();
        let bytes = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A running (or finished) interpreter process.
#[derive(Debug)]
pub struct ProcessHandle {
    kind: QueryKind,
    child: Child,
    started: Instant,
    stdout: Option<PipeReader>,
    stderr: Option<PipeReader>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.exit_code.is_some()
    }

    /// Wait for the process to exit. Cancel safe; calling again after exit
    /// returns the recorded code.
    pub async fn wait(&mut self) -> io::Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let status = self.child.wait().await?;
        let code = status.code().unwrap_or(-1);
        self.exit_code = Some(code);
        Ok(code)
    }

    /// Kill and reap the process.
    ///
    /// A no-op on a process that already exited, and safe to call any number
    /// of times.
    pub async fn kill(&mut self) {
        if self.exit_code.is_some() {
            return;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(kind = %self.kind, "process already exited before kill");
                self.exit_code = Some(status.code().unwrap_or(-1));
            }
            Ok(None) => {
                if let Err(e) = self.child.kill().await {
                    warn!(kind = %self.kind, error = %e, "failed to kill interpreter process");
                }
                self.exit_code = Some(-1);
                debug!(kind = %self.kind, "interpreter process killed");
            }
            Err(e) => {
                warn!(kind = %self.kind, error = %e, "could not query process state before kill");
                self.exit_code = Some(-1);
            }
        }

        // Readers may be held open by grandchildren; don't wait on them.
        for reader in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            reader.abort();
        }
    }

    /// Wait for exit, then collect everything the process printed.
    ///
    /// Pipes still open [`OUTPUT_GRACE`] after exit are abandoned with what
    /// they delivered so far. Cancel safe: dropping the future stops the
    /// readers.
    pub async fn wait_with_output(mut self) -> io::Result<ProcessOutput> {
        let exit_code = self.wait().await?;
        let elapsed = self.started.elapsed();

        let mut stdout = self.stdout.take();
        let mut stderr = self.stderr.take();
        let drained = tokio::time::timeout(OUTPUT_GRACE, async {
            for reader in [stdout.as_mut(), stderr.as_mut()].into_iter().flatten() {
                reader.closed().await;
            }
        })
        .await;
        if drained.is_err() {
            debug!(
                kind = %self.kind,
                grace_ms = OUTPUT_GRACE.as_millis() as u64,
                "pipes still open after exit; keeping partial output"
            );
        }

        Ok(ProcessOutput {
            stdout: stdout.map(PipeReader::into_text).unwrap_or_default(),
            stderr: stderr.map(PipeReader::into_text).unwrap_or_default(),
            exit_code,
            elapsed,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_interpreter(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join("fake-scheme");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn runs_script_and_collects_output() {
        let tmp = tempfile::tempdir().unwrap();
        // Echo back the script file given after `--script`.
        let program = fake_interpreter(tmp.path(), "[ \"$1\" = --script ] || exit 3\ncat \"$2\"");
        let runner = ProcessRunner::new(program, ScratchDir::new(tmp.path().join("scratch")));

        let handle = runner.spawn(QueryKind::Simple, "(+ 1 2)").await.unwrap();
        let output = handle.wait_with_output().await.unwrap();

        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "(+ 1 2)");
        assert!(tmp.path().join("scratch/barliman-query-simple.scm").is_file());
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let program = fake_interpreter(tmp.path(), "echo oops >&2\nexit 2");
        let runner = ProcessRunner::new(program, ScratchDir::new(tmp.path()));

        let output = runner
            .spawn(QueryKind::AllTests, "")
            .await
            .unwrap()
            .wait_with_output()
            .await
            .unwrap();
        assert_eq!(output.exit_code, 2);
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn kill_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let program = fake_interpreter(tmp.path(), "exec sleep 30");
        let runner = ProcessRunner::new(program, ScratchDir::new(tmp.path()));

        let mut handle = runner.spawn(QueryKind::Simple, "").await.unwrap();
        handle.kill().await;
        assert!(handle.is_finished());
        handle.kill().await;
        assert_eq!(handle.wait().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn kill_after_exit_keeps_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let program = fake_interpreter(tmp.path(), "exit 0");
        let runner = ProcessRunner::new(program, ScratchDir::new(tmp.path()));

        let mut handle = runner.spawn(QueryKind::Simple, "").await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), 0);
        handle.kill().await;
        assert_eq!(handle.wait().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn output_is_kept_when_a_descendant_holds_the_pipe() {
        let tmp = tempfile::tempdir().unwrap();
        let program = fake_interpreter(tmp.path(), "sleep 5 &\necho '(ok)'");
        let runner = ProcessRunner::new(program, ScratchDir::new(tmp.path()));

        let started = Instant::now();
        let output = runner
            .spawn(QueryKind::Simple, "")
            .await
            .unwrap()
            .wait_with_output()
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "(ok)");
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(tmp.path().join("nope"), ScratchDir::new(tmp.path()));
        let err = runner.spawn(QueryKind::Simple, "").await.unwrap_err();
        assert!(matches!(err, SpawnError::Launch { .. }));
    }
}
