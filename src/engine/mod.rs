// src/engine/mod.rs

//! Task orchestration for barliman.
//!
//! This module ties together:
//! - the generation counter and debounce window
//! - the task table (at most one live task per query kind)
//! - the cross-task cancellation rules
//! - the main runtime event loop that reacts to:
//!   - document edits
//!   - timer expiry (debounce, per-task timeout)
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`] and [`event_handlers`]; the
//! async/IO shell is implemented in [`runtime`].

use std::time::Duration;

use crate::document::DocumentSnapshot;
use crate::exec::ProcessOutput;
use crate::types::{Generation, QueryKind, TaskRef, TaskStatus};

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit once the first query cycle has fully settled (used for
    /// `--once`).
    pub exit_when_idle: bool,
}

/// Timing knobs from `[config]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub debounce: Duration,
    pub task_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(750),
            task_timeout: Duration::from_secs(30),
        }
    }
}

/// Events flowing into the runtime from the document, timers and executors.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The document changed; carries the new snapshot.
    DocumentChanged(DocumentSnapshot),
    /// The debounce window armed for `generation` elapsed.
    DebounceElapsed { generation: Generation },
    /// A task process exited on its own.
    TaskFinished { task: TaskRef, output: ProcessOutput },
    /// Writing the script or launching the interpreter failed.
    TaskSpawnFailed { task: TaskRef, error: String },
    /// The process started, but waiting on it or reading its output failed.
    TaskFailed { task: TaskRef, error: String },
    /// A task ran past its timeout.
    TaskTimedOut { task: TaskRef },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// A task ready for the executor: its identity plus the full script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledQuery {
    pub task: TaskRef,
    pub script: String,
}

/// What a slot in the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Nothing scheduled for this slot in the current cycle.
    Idle,
    /// A task is running.
    Thinking,
    /// The classifier's verdict.
    Done(TaskStatus),
    /// Killed by the orchestrator: staleness, or a cross-task rule.
    Cancelled,
    TimedOut,
    SpawnFailed,
    /// Lost track of a started process; no verdict.
    RunFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub kind: QueryKind,
    pub generation: Generation,
    pub status: SlotStatus,
    pub message: String,
    pub elapsed: Option<Duration>,
}

/// Events for the UI collaborator. Display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Status(StatusUpdate),
    /// Synthesized definition from a successful `AllTests` run; `None` clears.
    BestGuess {
        generation: Generation,
        text: Option<String>,
    },
    /// Startup could not complete.
    Fatal(String),
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod task_table;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
pub use task_table::{TaskState, TaskTable};
