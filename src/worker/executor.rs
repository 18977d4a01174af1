use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;

use crate::scheduler::job::{Task, TaskFn};

/// Captured failure of one job: a short kind plus the formatted detail
/// (stderr for commands, error chain or panic payload for closures).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: String,
    pub trace: String,
}

impl JobFailure {
    fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push_str(&format!("\ncaused by: {}", cause));
            source = cause.source();
        }
        Self {
            kind: err.to_string(),
            trace,
        }
    }

    fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            kind: format!("panic: {}", message),
            trace: format!("job panicked: {}", message),
        }
    }
}

/// Terminal outcome of one job, sent exactly once over its one-shot channel.
#[derive(Debug)]
pub enum JobOutcome {
    Completed,
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn failure(self) -> Option<JobFailure> {
        match self {
            JobOutcome::Completed => None,
            JobOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Run one task to completion and fold every way it can go wrong into a
/// [`JobOutcome`]. Never panics and never returns an error to the caller;
/// the scheduler only ever sees the outcome payload.
pub(crate) async fn run_task(task: Task) -> JobOutcome {
    match task {
        Task::Command { program, args } => run_command(&program, &args).await,
        Task::Closure(f) => run_closure(f).await,
    }
}

async fn run_command(program: &str, args: &[String]) -> JobOutcome {
    let result = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => JobOutcome::Completed,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let kind = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            let trace = if stderr.is_empty() { kind.clone() } else { stderr };
            JobOutcome::Failed(JobFailure { kind, trace })
        }
        Err(e) => JobOutcome::Failed(JobFailure {
            kind: format!("spawn failed: {}", e),
            trace: e.to_string(),
        }),
    }
}

async fn run_closure(f: TaskFn) -> JobOutcome {
    let joined = tokio::task::spawn_blocking(move || catch_unwind(AssertUnwindSafe(f))).await;

    match joined {
        Ok(Ok(Ok(()))) => JobOutcome::Completed,
        Ok(Ok(Err(e))) => JobOutcome::Failed(JobFailure::from_error(e.as_ref())),
        Ok(Err(payload)) => JobOutcome::Failed(JobFailure::from_panic(payload)),
        Err(e) => JobOutcome::Failed(JobFailure {
            kind: "worker thread failed".to_string(),
            trace: e.to_string(),
        }),
    }
}
