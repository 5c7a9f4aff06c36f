// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.
//!
//! All scheduling decisions and cross-task rules live here, in one place.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::classify::{status_message, TaskResult};
use crate::document::DocumentSnapshot;
use crate::engine::core::CoreRuntime;
use crate::engine::task_table::TaskState;
use crate::engine::{ScheduledQuery, SlotStatus, StatusUpdate, UiEvent};
use crate::exec::ProcessOutput;
use crate::types::{Generation, QueryKind, SlotIndex, TaskRef, TaskStatus};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// (Re)start the single debounce timer. Replaces any armed one.
    ArmDebounce {
        generation: Generation,
        delay: Duration,
    },
    /// Kill these tasks and reap their processes. Always precedes any
    /// `Spawn` in the same step.
    Cancel(Vec<TaskRef>),
    /// Start these queries.
    Spawn(Vec<ScheduledQuery>),
    /// Report `TaskTimedOut` for `task` after `after`, unless it ends first.
    ArmTimeout { task: TaskRef, after: Duration },
    /// Forward to the UI collaborator.
    Publish(UiEvent),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreRuntime {
    /// Steps 1-3 of an edit: bump the generation, cancel everything older,
    /// restart the debounce window.
    pub(super) fn handle_document_changed(&mut self, snapshot: DocumentSnapshot) -> CoreStep {
        let mut commands = Vec::new();

        self.generation += 1;
        self.snapshot = snapshot;
        debug!(generation = self.generation, "document changed");

        let stale: Vec<TaskRef> = self.tasks.running().collect();
        self.cancel_tasks(stale, "stale generation", &mut commands);
        self.tasks.prune_before(self.generation);

        self.debounce_pending = true;
        commands.push(CoreCommand::ArmDebounce {
            generation: self.generation,
            delay: self.settings.debounce,
        });

        CoreStep {
            commands,
            keep_running: true,
        }
    }

    /// Step 4: schedule one `Simple`, one `PerTest` per complete slot, and
    /// `AllTests` if any slot is complete.
    pub(super) fn handle_debounce_elapsed(&mut self, generation: Generation) -> CoreStep {
        let mut commands = Vec::new();

        if generation != self.generation || !self.debounce_pending {
            debug!(
                generation,
                current = self.generation,
                "ignoring superseded debounce timer"
            );
            return CoreStep {
                commands,
                keep_running: true,
            };
        }

        self.debounce_pending = false;
        self.cycles_started += 1;

        let snapshot = self.snapshot.clone();
        let kinds = kinds_to_schedule(&snapshot);

        // At most one running task per kind, whatever its generation.
        let conflicting: Vec<TaskRef> = kinds
            .iter()
            .flat_map(|kind| self.tasks.running_of_kind(*kind))
            .collect();
        self.cancel_tasks(conflicting, "superseded by new task of same kind", &mut commands);

        let mut queries = Vec::with_capacity(kinds.len());
        for kind in kinds.iter().copied() {
            match self.builder.build(&snapshot, kind) {
                Ok(script) => {
                    let task = self.tasks.create(kind, generation);
                    queries.push(ScheduledQuery { task, script });
                }
                Err(e) => {
                    error!(kind = %kind, generation, error = %e, "query could not be built");
                    debug_assert!(false, "scheduled an unbuildable query: {e}");
                }
            }
        }

        info!(
            generation,
            tasks = queries.len(),
            complete_tests = snapshot.complete_slots().len(),
            "starting query cycle"
        );

        let scheduled: Vec<TaskRef> = queries.iter().map(|q| q.task).collect();
        if !queries.is_empty() {
            commands.push(CoreCommand::Spawn(queries));
        }
        for task in &scheduled {
            commands.push(CoreCommand::ArmTimeout {
                task: *task,
                after: self.settings.task_timeout,
            });
        }

        for kind in QueryKind::all() {
            if scheduled.iter().any(|t| t.kind == kind) {
                self.publish_status(kind, SlotStatus::Thinking, "???".to_string(), None, &mut commands);
            } else {
                self.publish_status(kind, SlotStatus::Idle, String::new(), None, &mut commands);
            }
        }
        self.publish_best_guess(None, &mut commands);

        let keep_running = self.exit_if_idle(&mut commands);
        CoreStep {
            commands,
            keep_running,
        }
    }

    pub(super) fn handle_task_finished(&mut self, task: TaskRef, output: ProcessOutput) -> CoreStep {
        let mut commands = Vec::new();

        let result = TaskResult::new(task.kind, &output.stdout, output.exit_code, output.elapsed);
        if !self.tasks.finish(task.id, TaskState::Finished(result.status)) {
            debug!(task_id = %task.id, kind = %task.kind, "ignoring completion of a task that already ended");
            let keep_running = self.exit_if_idle(&mut commands);
            return CoreStep {
                commands,
                keep_running,
            };
        }

        info!(
            task_id = %task.id,
            kind = %task.kind,
            generation = task.generation,
            exit_code = output.exit_code,
            status = ?result.status,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "task finished"
        );
        if !output.stderr.trim().is_empty() {
            debug!(kind = %task.kind, stderr = %output.stderr.trim(), "interpreter stderr");
        }

        self.publish_status(
            task.kind,
            SlotStatus::Done(result.status),
            result.message(),
            Some(result.elapsed),
            &mut commands,
        );
        self.apply_cross_task_rules(task, &result, &mut commands);

        let keep_running = self.exit_if_idle(&mut commands);
        CoreStep {
            commands,
            keep_running,
        }
    }

    /// Rules are checked against the live table, so the order in which
    /// sibling completions arrive does not matter.
    fn apply_cross_task_rules(
        &mut self,
        task: TaskRef,
        result: &TaskResult,
        commands: &mut Vec<CoreCommand>,
    ) {
        match task.kind {
            QueryKind::Simple if result.status.invalidates_definition() => {
                let doomed: Vec<TaskRef> = self
                    .tasks
                    .running_in_generation(task.generation)
                    .into_iter()
                    .filter(|t| t.kind != QueryKind::Simple)
                    .collect();
                self.cancel_tasks(doomed, "definition is invalid", commands);
            }
            QueryKind::Simple => {}
            QueryKind::AllTests if result.status == TaskStatus::Success => {
                self.publish_best_guess(Some(result.raw_output.clone()), commands);
                let answered = self.tasks.running_in_generation(task.generation);
                self.cancel_tasks(answered, "synthesis succeeded", commands);
            }
            QueryKind::AllTests => self.publish_best_guess(None, commands),
            // Per-test verdicts are independent diagnostics.
            QueryKind::PerTest(_) => {}
        }
    }

    pub(super) fn handle_spawn_failed(&mut self, task: TaskRef, error: String) -> CoreStep {
        warn!(task_id = %task.id, kind = %task.kind, error = %error, "task could not be started");
        self.handle_run_error(
            task,
            SlotStatus::SpawnFailed,
            format!("Could not start interpreter: {error}"),
        )
    }

    pub(super) fn handle_task_failed(&mut self, task: TaskRef, error: String) -> CoreStep {
        warn!(task_id = %task.id, kind = %task.kind, error = %error, "lost track of running task");
        self.handle_run_error(
            task,
            SlotStatus::RunFailed,
            format!("Interpreter run failed: {error}"),
        )
    }

    /// The task produced no verdict. Siblings are left alone.
    fn handle_run_error(&mut self, task: TaskRef, status: SlotStatus, message: String) -> CoreStep {
        let mut commands = Vec::new();

        if self.tasks.finish(task.id, TaskState::Finished(TaskStatus::Failed)) {
            self.publish_status(task.kind, status, message, None, &mut commands);
            if task.kind == QueryKind::AllTests {
                self.publish_best_guess(None, &mut commands);
            }
        }

        let keep_running = self.exit_if_idle(&mut commands);
        CoreStep {
            commands,
            keep_running,
        }
    }

    pub(super) fn handle_timed_out(&mut self, task: TaskRef) -> CoreStep {
        let mut commands = Vec::new();

        if self.tasks.finish(task.id, TaskState::TimedOut) {
            let after = self.settings.task_timeout;
            info!(
                task_id = %task.id,
                kind = %task.kind,
                timeout_ms = after.as_millis() as u64,
                "task timed out; killing"
            );
            commands.push(CoreCommand::Cancel(vec![task]));
            self.publish_status(
                task.kind,
                SlotStatus::TimedOut,
                format!("Timed out ({:.2} s)", after.as_secs_f64()),
                Some(after),
                &mut commands,
            );
            if task.kind == QueryKind::AllTests {
                self.publish_best_guess(None, &mut commands);
            }
        }

        let keep_running = self.exit_if_idle(&mut commands);
        CoreStep {
            commands,
            keep_running,
        }
    }

    pub(super) fn handle_shutdown(&mut self) -> CoreStep {
        let mut commands = Vec::new();
        let live: Vec<TaskRef> = self.tasks.running().collect();
        self.cancel_tasks(live, "shutdown", &mut commands);
        self.debounce_pending = false;
        info!("shutdown requested");
        CoreStep {
            commands,
            keep_running: false,
        }
    }

    /// Mark running tasks `Cancelled` and emit one `Cancel` for them.
    /// Tasks that already ended are skipped.
    fn cancel_tasks(&mut self, tasks: Vec<TaskRef>, reason: &str, commands: &mut Vec<CoreCommand>) {
        let cancelled: Vec<TaskRef> = tasks
            .into_iter()
            .filter(|t| self.tasks.finish(t.id, TaskState::Cancelled))
            .collect();
        if cancelled.is_empty() {
            return;
        }

        debug!(count = cancelled.len(), reason, "cancelling tasks");
        commands.push(CoreCommand::Cancel(cancelled.clone()));
        for task in cancelled {
            self.publish_status(
                task.kind,
                SlotStatus::Cancelled,
                status_message(task.kind, TaskStatus::Terminated, Duration::ZERO),
                None,
                commands,
            );
        }
    }

    fn publish_status(
        &mut self,
        kind: QueryKind,
        status: SlotStatus,
        message: String,
        elapsed: Option<Duration>,
        commands: &mut Vec<CoreCommand>,
    ) {
        let key = (status, message);
        if self.published.get(&kind) == Some(&key) {
            return;
        }
        let (status, message) = key.clone();
        self.published.insert(kind, key);
        commands.push(CoreCommand::Publish(UiEvent::Status(StatusUpdate {
            kind,
            generation: self.generation,
            status,
            message,
            elapsed,
        })));
    }

    fn publish_best_guess(&mut self, text: Option<String>, commands: &mut Vec<CoreCommand>) {
        if self.best_guess.as_ref() == Some(&text) {
            return;
        }
        self.best_guess = Some(text.clone());
        commands.push(CoreCommand::Publish(UiEvent::BestGuess {
            generation: self.generation,
            text,
        }));
    }

    /// In `--once` mode, exit once a cycle has run and everything settled.
    fn exit_if_idle(&self, commands: &mut Vec<CoreCommand>) -> bool {
        if self.options.exit_when_idle && self.cycles_started > 0 && self.is_idle() {
            commands.push(CoreCommand::RequestExit);
            return false;
        }
        true
    }
}

fn kinds_to_schedule(snapshot: &DocumentSnapshot) -> Vec<QueryKind> {
    let complete: Vec<SlotIndex> = snapshot.complete_slots();
    let mut kinds = Vec::with_capacity(complete.len() + 2);
    kinds.push(QueryKind::Simple);
    kinds.extend(complete.iter().copied().map(QueryKind::PerTest));
    if !complete.is_empty() {
        kinds.push(QueryKind::AllTests);
    }
    kinds
}
