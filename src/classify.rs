// src/classify.rs

//! Result classifier: raw interpreter output to a [`TaskStatus`].
//!
//! A pure table lookup on the trimmed stdout and the exit code. The only
//! kind-dependent rows are the definition-level markers, which mean a real
//! error for `Simple` and "not ready yet" for every other kind.

use std::time::Duration;

use crate::types::{QueryKind, TaskStatus};

pub const PARSE_ERROR_IN_DEFN: &str = "parse-error-in-defn";
pub const ILLEGAL_SEXP_IN_DEFN: &str = "illegal-sexp-in-defn";
pub const ILLEGAL_SEXP_IN_TEST: &str = "illegal-sexp-in-test/answer";
pub const PARSE_ERROR_IN_TEST: &str = "parse-error-in-test/answer";
pub const NO_ANSWER: &str = "()";
pub const SYNTHESIS_FAILED: &str = "fail";

/// Classifier output attached to a finished task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub kind: QueryKind,
    pub status: TaskStatus,
    pub raw_output: String,
    pub elapsed: Duration,
}

impl TaskResult {
    pub fn new(kind: QueryKind, stdout: &str, exit_code: i32, elapsed: Duration) -> Self {
        Self {
            kind,
            status: classify(stdout, exit_code, kind),
            raw_output: stdout.trim().to_string(),
            elapsed,
        }
    }

    pub fn message(&self) -> String {
        status_message(self.kind, self.status, self.elapsed)
    }
}

pub fn classify(raw_output: &str, exit_code: i32, kind: QueryKind) -> TaskStatus {
    if exit_code != 0 {
        return TaskStatus::SyntaxError;
    }

    match raw_output.trim() {
        PARSE_ERROR_IN_DEFN => match kind {
            QueryKind::Simple => TaskStatus::ParseError,
            _ => TaskStatus::Thinking,
        },
        ILLEGAL_SEXP_IN_DEFN => match kind {
            QueryKind::Simple => TaskStatus::SyntaxError,
            _ => TaskStatus::Thinking,
        },
        ILLEGAL_SEXP_IN_TEST | PARSE_ERROR_IN_TEST => TaskStatus::SyntaxError,
        NO_ANSWER => TaskStatus::EvaluationFailed,
        SYNTHESIS_FAILED if kind == QueryKind::AllTests => TaskStatus::Failed,
        // Unrecognized but clean output is the answer itself.
        _ => TaskStatus::Success,
    }
}

/// User-facing text for a classified status.
pub fn status_message(kind: QueryKind, status: TaskStatus, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    match status {
        TaskStatus::Success => format!("Succeeded ({secs:.2} s)"),
        TaskStatus::ParseError => "Syntax error".to_string(),
        TaskStatus::SyntaxError => "Illegal sexpression".to_string(),
        TaskStatus::EvaluationFailed if kind == QueryKind::Simple => {
            "Evaluation failed".to_string()
        }
        TaskStatus::EvaluationFailed | TaskStatus::Failed => format!("Failed ({secs:.2} s)"),
        TaskStatus::Thinking => "???".to_string(),
        TaskStatus::Terminated => "Cancelled".to_string(),
    }
}
