// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::document::DocumentSnapshot;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::types::{Generation, TaskId, TaskRef};

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, UiEvent};

/// Drives the orchestrator core in response to `RuntimeEvent`s and document
/// snapshots, and delegates process handling to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, running timers, dispatching work to the executor and
/// forwarding UI events.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    doc_rx: Option<mpsc::UnboundedReceiver<DocumentSnapshot>>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    executor: E,
    debounce: Option<JoinHandle<()>>,
    timeouts: HashMap<TaskId, JoinHandle<()>>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("timeouts", &self.timeouts.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    /// `event_tx` must be the sending half of `event_rx`; timers report
    /// through it.
    pub fn new(
        core: CoreRuntime,
        event_tx: mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        doc_rx: mpsc::UnboundedReceiver<DocumentSnapshot>,
        ui_tx: mpsc::UnboundedSender<UiEvent>,
        executor: E,
    ) -> Self {
        Self {
            core,
            event_tx,
            event_rx,
            doc_rx: Some(doc_rx),
            ui_tx,
            executor,
            debounce: None,
            timeouts: HashMap::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes document snapshots and `RuntimeEvent`s.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (cancel, spawn, timers, exit).
    pub async fn run(mut self) -> Result<()> {
        info!("barliman runtime started");

        loop {
            let event = tokio::select! {
                biased;

                maybe = self.event_rx.recv() => match maybe {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },

                maybe = recv_document(&mut self.doc_rx) => match maybe {
                    Some(snapshot) => RuntimeEvent::DocumentChanged(snapshot),
                    None => {
                        debug!("document channel closed; no further edits");
                        self.doc_rx = None;
                        continue;
                    }
                },
            };

            debug!(?event, "runtime received event");
            self.forget_timer_for(&event);

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.disarm_all();
        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::ArmDebounce { generation, delay } => {
                self.arm_debounce(generation, delay);
            }
            CoreCommand::Cancel(tasks) => {
                for task in &tasks {
                    if let Some(timer) = self.timeouts.remove(&task.id) {
                        timer.abort();
                    }
                }
                debug!(count = tasks.len(), "cancelling tasks");
                self.executor.cancel_tasks(tasks).await?;
            }
            CoreCommand::Spawn(queries) => {
                let kinds: Vec<String> = queries.iter().map(|q| q.task.kind.label()).collect();
                debug!(?kinds, "spawning queries");
                self.executor.spawn_queries(queries).await?;
            }
            CoreCommand::ArmTimeout { task, after } => {
                self.arm_timeout(task, after);
            }
            CoreCommand::Publish(event) => {
                if self.ui_tx.send(event).is_err() {
                    debug!("ui receiver dropped; status update discarded");
                }
            }
            CoreCommand::RequestExit => {
                // keep_running is already false in this step; this is only
                // here so the exit is visible in logs.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    fn arm_debounce(&mut self, generation: Generation, delay: Duration) {
        if let Some(previous) = self.debounce.take() {
            previous.abort();
        }
        let tx = self.event_tx.clone();
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(RuntimeEvent::DebounceElapsed { generation }).await;
        }));
    }

    fn arm_timeout(&mut self, task: TaskRef, after: Duration) {
        let tx = self.event_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(RuntimeEvent::TaskTimedOut { task }).await;
        });
        if let Some(previous) = self.timeouts.insert(task.id, timer) {
            previous.abort();
        }
    }

    /// A task that ended on its own no longer needs its timeout.
    fn forget_timer_for(&mut self, event: &RuntimeEvent) {
        let id = match event {
            RuntimeEvent::TaskFinished { task, .. }
            | RuntimeEvent::TaskSpawnFailed { task, .. }
            | RuntimeEvent::TaskFailed { task, .. }
            | RuntimeEvent::TaskTimedOut { task } => task.id,
            _ => return,
        };
        if let Some(timer) = self.timeouts.remove(&id) {
            timer.abort();
        }
    }

    fn disarm_all(&mut self) {
        if let Some(timer) = self.debounce.take() {
            timer.abort();
        }
        for (_, timer) in self.timeouts.drain() {
            timer.abort();
        }
    }
}

/// Pending forever once the document side has gone away.
async fn recv_document(
    rx: &mut Option<mpsc::UnboundedReceiver<DocumentSnapshot>>,
) -> Option<DocumentSnapshot> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
