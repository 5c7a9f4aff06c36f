// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! Timers are events here (`DebounceElapsed`, `TaskTimedOut`), so the core
//! never looks at a clock. The async shell (`engine::runtime::Runtime`) is
//! responsible for:
//! - reading events from channels
//! - arming timers
//! - sending `ScheduledQuery`s to the executor and killing cancelled tasks
//! - forwarding UI events
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::collections::HashMap;

use crate::document::DocumentSnapshot;
use crate::engine::event_handlers::CoreStep;
use crate::engine::task_table::TaskTable;
use crate::engine::{OrchestratorSettings, RuntimeEvent, RuntimeOptions, SlotStatus};
use crate::query::QueryBuilder;
use crate::types::{Generation, QueryKind};

/// Pure core runtime state.
///
/// This owns:
/// - the generation counter and the latest document snapshot
/// - whether a debounce window is open
/// - the task table
/// - the last status published per slot (to suppress repeats)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    pub(super) builder: QueryBuilder,
    pub(super) settings: OrchestratorSettings,
    pub(super) options: RuntimeOptions,
    pub(super) generation: Generation,
    pub(super) snapshot: DocumentSnapshot,
    pub(super) debounce_pending: bool,
    pub(super) cycles_started: u64,
    pub(super) tasks: TaskTable,
    pub(super) published: HashMap<QueryKind, (SlotStatus, String)>,
    pub(super) best_guess: Option<Option<String>>,
}

impl CoreRuntime {
    pub fn new(
        builder: QueryBuilder,
        settings: OrchestratorSettings,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            builder,
            settings,
            options,
            generation: 0,
            snapshot: DocumentSnapshot::default(),
            debounce_pending: false,
            cycles_started: 0,
            tasks: TaskTable::new(),
            published: HashMap::new(),
            best_guess: None,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// No debounce window open and no task running.
    pub fn is_idle(&self) -> bool {
        !self.debounce_pending && !self.tasks.has_running()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::DocumentChanged(snapshot) => self.handle_document_changed(snapshot),
            RuntimeEvent::DebounceElapsed { generation } => self.handle_debounce_elapsed(generation),
            RuntimeEvent::TaskFinished { task, output } => self.handle_task_finished(task, output),
            RuntimeEvent::TaskSpawnFailed { task, error } => self.handle_spawn_failed(task, error),
            RuntimeEvent::TaskFailed { task, error } => self.handle_task_failed(task, error),
            RuntimeEvent::TaskTimedOut { task } => self.handle_timed_out(task),
            RuntimeEvent::ShutdownRequested => self.handle_shutdown(),
        }
    }
}
