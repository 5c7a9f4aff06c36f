// src/types.rs

//! Small shared value types: slot indices, query kinds, statuses, task ids.

use std::fmt;

/// Number of (input, expected-output) example slots in a document.
pub const TEST_SLOT_COUNT: usize = 6;

/// Monotonic edit counter tagging the snapshot a task was built from.
pub type Generation = u64;

/// Index of one of the fixed example slots (`0..TEST_SLOT_COUNT`).
///
/// Construction is checked, so an out-of-range slot can never reach the
/// document, the builder or the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(index: usize) -> Option<Self> {
        if index < TEST_SLOT_COUNT {
            Some(SlotIndex(index as u8))
        } else {
            None
        }
    }

    /// Zero-based index.
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// One-based number, as shown to the user and used in file names.
    pub fn number(self) -> usize {
        self.0 as usize + 1
    }

    /// All slots in order.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..TEST_SLOT_COUNT as u8).map(SlotIndex)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Which question a query asks the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryKind {
    /// Does the definition parse and evaluate at all?
    Simple,
    /// Does the definition satisfy one example?
    PerTest(SlotIndex),
    /// Synthesis: fill the holes so every complete example holds at once.
    AllTests,
}

impl QueryKind {
    /// Every kind, in scheduling order.
    pub fn all() -> impl Iterator<Item = QueryKind> {
        std::iter::once(QueryKind::Simple)
            .chain(SlotIndex::all().map(QueryKind::PerTest))
            .chain(std::iter::once(QueryKind::AllTests))
    }

    /// Stable short label used in logs, scratch file names and rendering.
    pub fn label(self) -> String {
        match self {
            QueryKind::Simple => "simple".to_string(),
            QueryKind::PerTest(slot) => format!("test-{}", slot.number()),
            QueryKind::AllTests => "alltests".to_string(),
        }
    }

    pub fn is_per_test(self) -> bool {
        matches!(self, QueryKind::PerTest(_))
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Status taxonomy produced by the result classifier.
///
/// `Terminated` is never produced by classification. It names a task the
/// orchestrator killed. Such a task is recorded as `TaskState::Cancelled` and
/// shown as `SlotStatus::Cancelled`, with the `Terminated` text as message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Success,
    ParseError,
    SyntaxError,
    EvaluationFailed,
    Thinking,
    Failed,
    Terminated,
}

impl TaskStatus {
    /// Whether a `Simple` result with this status proves the definition
    /// itself is unusable for this generation.
    pub fn invalidates_definition(self) -> bool {
        matches!(
            self,
            TaskStatus::ParseError
                | TaskStatus::SyntaxError
                | TaskStatus::EvaluationFailed
                | TaskStatus::Failed
        )
    }
}

/// Identifier of one scheduled execution. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything an executor needs to address a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    pub id: TaskId,
    pub kind: QueryKind,
    pub generation: Generation,
}
