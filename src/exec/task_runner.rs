// src/exec/task_runner.rs

//! Individual query runner.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::engine::{RuntimeEvent, ScheduledQuery};
use crate::exec::process::{ProcessRunner, SpawnError};

/// Run a single query process and report how it ended.
///
/// - Normal exit: a `TaskFinished` event with the full output.
/// - Script write or launch failure: a `TaskSpawnFailed` event.
/// - Waiting on or reading from a started process failed: a `TaskFailed`
///   event.
/// - If the cancel channel fires, the process is killed and reaped and
///   **no** event is sent; the orchestrator already marked the task.
pub async fn run_query(
    runner: Arc<ProcessRunner>,
    query: ScheduledQuery,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let task = query.task;
    if let Err(err) = run_query_inner(&runner, query, &runtime_tx, cancel_rx).await {
        let message = format!("{err:#}");
        error!(
            task_id = %task.id,
            kind = %task.kind,
            error = %message,
            "query execution error"
        );
        let event = if err.is::<SpawnError>() {
            RuntimeEvent::TaskSpawnFailed {
                task,
                error: message,
            }
        } else {
            RuntimeEvent::TaskFailed {
                task,
                error: message,
            }
        };
        let _ = runtime_tx.send(event).await;
    }
}

async fn run_query_inner(
    runner: &ProcessRunner,
    query: ScheduledQuery,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    let task = query.task;

    let mut process = tokio::select! {
        spawned = runner.spawn(task.kind, &query.script) => spawned?,
        _ = &mut cancel_rx => {
            debug!(task_id = %task.id, kind = %task.kind, "cancelled before the process started");
            return Ok(());
        }
    };

    // Either the process exits on its own (normal case), or we receive a
    // cancellation request (staleness, cross-task rule, timeout, shutdown).
    tokio::select! {
        status = process.wait() => {
            status.with_context(|| format!("waiting for interpreter process of {}", task.kind))?;
        }
        _ = &mut cancel_rx => {
            info!(
                task_id = %task.id,
                kind = %task.kind,
                "cancellation requested; killing interpreter process"
            );
            process.kill().await;
            // Do NOT send TaskFinished for this cancelled instance.
            return Ok(());
        }
    }

    // The process has exited, but a descendant may still hold its pipes.
    let output = tokio::select! {
        output = process.wait_with_output() => {
            output.with_context(|| format!("collecting output of {}", task.kind))?
        }
        _ = &mut cancel_rx => {
            info!(
                task_id = %task.id,
                kind = %task.kind,
                "cancellation requested while collecting output"
            );
            return Ok(());
        }
    };

    info!(
        task_id = %task.id,
        kind = %task.kind,
        exit_code = output.exit_code,
        elapsed_ms = output.elapsed.as_millis() as u64,
        "interpreter process exited"
    );

    runtime_tx
        .send(RuntimeEvent::TaskFinished { task, output })
        .await
        .with_context(|| format!("sending TaskFinished for {} to runtime", task.kind))?;

    Ok(())
}
