// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production executor in [`RealExecutorBackend`].
//!
//! - `RealExecutorBackend` runs each query through the [`ProcessRunner`] in
//!   its own Tokio task, keeping at most one per query kind.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which queries were scheduled and directly emits `TaskFinished` events.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::{RuntimeEvent, ScheduledQuery};
use crate::errors::Result;
use crate::exec::process::ProcessRunner;
use crate::exec::task_runner::run_query;
use crate::types::{QueryKind, TaskRef};

/// Trait abstracting how scheduled queries are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    /// Start the given queries.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate completion and emit `RuntimeEvent`s (tests)
    fn spawn_queries(
        &mut self,
        queries: Vec<ScheduledQuery>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Kill the given tasks and wait until their processes are gone.
    ///
    /// Unknown or already-finished tasks are ignored.
    fn cancel_tasks(
        &mut self,
        tasks: Vec<TaskRef>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Internal handle for a currently-running query.
///
/// - `cancel` asks the runner to kill its process.
/// - `handle` is the Tokio task driving the process; it completes only after
///   the process has been reaped.
struct ActiveTask {
    task: TaskRef,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runner: Arc<ProcessRunner>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    /// At most one ActiveTask per query kind.
    active: HashMap<QueryKind, ActiveTask>,
}

impl RealExecutorBackend {
    pub fn new(runner: ProcessRunner, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runner: Arc::new(runner),
            runtime_tx,
            active: HashMap::new(),
        }
    }

    async fn start(&mut self, query: ScheduledQuery) {
        let kind = query.task.kind;

        // The kind's scratch file is about to be rewritten; whatever still
        // reads it must be gone first.
        if let Some(existing) = self.active.remove(&kind) {
            if !existing.handle.is_finished() {
                debug!(
                    kind = %kind,
                    previous = %existing.task.id,
                    next = %query.task.id,
                    "previous task of this kind still active; stopping it first"
                );
            }
            stop(existing).await;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let runner = Arc::clone(&self.runner);
        let rt_tx = self.runtime_tx.clone();
        let task = query.task;

        let handle = tokio::spawn(async move {
            run_query(runner, query, rt_tx, cancel_rx).await;
            debug!(task_id = %task.id, kind = %task.kind, "query runner finished");
        });

        self.active.insert(
            kind,
            ActiveTask {
                task,
                cancel: Some(cancel_tx),
                handle,
            },
        );
    }

    async fn cancel(&mut self, task: TaskRef) {
        match self.active.get(&task.kind) {
            Some(existing) if existing.task.id == task.id => {}
            _ => {
                debug!(task_id = %task.id, kind = %task.kind, "cancel for inactive task; nothing to do");
                return;
            }
        }
        if let Some(existing) = self.active.remove(&task.kind) {
            info!(task_id = %task.id, kind = %task.kind, "cancelling query");
            stop(existing).await;
        }
    }
}

/// Signal cancellation and wait for the runner (and so the process) to end.
async fn stop(mut existing: ActiveTask) {
    if let Some(cancel) = existing.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(task_id = %existing.task.id, "runner already finished while cancelling");
        }
    }
    if let Err(e) = existing.handle.await {
        debug!(task_id = %existing.task.id, error = %e, "query runner ended abnormally");
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_queries(
        &mut self,
        queries: Vec<ScheduledQuery>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for query in queries {
                self.start(query).await;
            }
            Ok(())
        })
    }

    fn cancel_tasks(
        &mut self,
        tasks: Vec<TaskRef>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                self.cancel(task).await;
            }
            Ok(())
        })
    }
}
