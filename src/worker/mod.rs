//! Job execution engine.
//!
//! This module handles the actual execution of admitted jobs:
//! - **Execution**: runs a task to a terminal [`JobOutcome`] — spawning an
//!   OS process for command tasks, a dedicated blocking thread for closure
//!   tasks
//! - **Failure capture**: any failure inside the task (exit status, spawn
//!   error, returned error, panic) is folded into a [`JobFailure`] payload
//!   instead of propagating
//!
//! # Components
//!
//! - [`JobRunner`]: the scheduler's execution handle for one admitted job
//! - [`executor`]: maps a task to its outcome
//!
//! # Execution Flow
//!
//! 1. The scheduler admits a job and calls [`JobRunner::start`]
//! 2. The runner spawns the task and holds the one-shot outcome channel
//! 3. On termination the task sends `Completed` or `Failed(kind, trace)`
//!    exactly once and notifies the scheduler's run loop
//! 4. The scheduler polls [`JobRunner::failure`], which reads the channel at
//!    most once and memoizes

pub mod executor;
pub mod runner;

pub use executor::{JobFailure, JobOutcome};
pub use runner::JobRunner;
