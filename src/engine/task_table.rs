// src/engine/task_table.rs

//! Bookkeeping for every task the orchestrator has created.

use std::collections::BTreeMap;

use crate::types::{Generation, QueryKind, TaskId, TaskRef, TaskStatus};

/// Lifecycle of one task. Every state but `Running` is terminal and final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Finished(TaskStatus),
    Cancelled,
    TimedOut,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEntry {
    pub task: TaskRef,
    pub state: TaskState,
}

/// All tasks of the current and recent generations, keyed by id.
///
/// Ids come from a counter and are never reused.
#[derive(Debug, Default)]
pub struct TaskTable {
    next_id: u64,
    entries: BTreeMap<TaskId, TaskEntry>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a brand-new `Running` task.
    pub fn create(&mut self, kind: QueryKind, generation: Generation) -> TaskRef {
        self.next_id += 1;
        let task = TaskRef {
            id: TaskId(self.next_id),
            kind,
            generation,
        };
        self.entries.insert(
            task.id,
            TaskEntry {
                task,
                state: TaskState::Running,
            },
        );
        task
    }

    pub fn state_of(&self, id: TaskId) -> Option<TaskState> {
        self.entries.get(&id).map(|e| e.state)
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.state_of(id) == Some(TaskState::Running)
    }

    /// Move a running task to a terminal state.
    ///
    /// Returns false (and changes nothing) if the task is unknown or already
    /// terminal.
    pub fn finish(&mut self, id: TaskId, state: TaskState) -> bool {
        debug_assert!(state.is_terminal());
        match self.entries.get_mut(&id) {
            Some(entry) if entry.state == TaskState::Running => {
                entry.state = state;
                true
            }
            _ => false,
        }
    }

    pub fn running(&self) -> impl Iterator<Item = TaskRef> + '_ {
        self.entries
            .values()
            .filter(|e| e.state == TaskState::Running)
            .map(|e| e.task)
    }

    pub fn running_of_kind(&self, kind: QueryKind) -> Vec<TaskRef> {
        self.running().filter(|t| t.kind == kind).collect()
    }

    pub fn running_in_generation(&self, generation: Generation) -> Vec<TaskRef> {
        self.running().filter(|t| t.generation == generation).collect()
    }

    pub fn has_running(&self) -> bool {
        self.running().next().is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = &TaskEntry> {
        self.entries.values()
    }

    /// Drop terminal entries older than `generation`. Late events for them
    /// then look unknown, which is handled the same as terminal.
    pub fn prune_before(&mut self, generation: Generation) {
        self.entries
            .retain(|_, e| e.state == TaskState::Running || e.task.generation >= generation);
    }
}
