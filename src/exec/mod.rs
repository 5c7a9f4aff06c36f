// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running query scripts through the
//! interpreter, using `tokio::process::Command`, and reporting back to the
//! orchestration runtime via `RuntimeEvent`s.
//!
//! - [`interpreter`] finds the interpreter binary at startup.
//! - [`scratch`] owns the per-kind script files.
//! - [`process`] spawns, waits for and kills one interpreter process.
//! - [`task_runner`] drives one scheduled query to completion or cancellation.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod interpreter;
pub mod process;
pub mod scratch;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use interpreter::resolve_interpreter;
pub use process::{ProcessHandle, ProcessOutput, ProcessRunner, SpawnError};
pub use scratch::{scratch_file_name, ScratchDir};
