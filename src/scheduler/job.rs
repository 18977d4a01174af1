use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Boxed fallible closure run as a job. Arguments are captured at creation
/// time; the scheduler invokes it with no further inputs.
pub type TaskFn =
    Box<dyn FnOnce() -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + 'static>;

/// A unit of work the scheduler can run.
pub enum Task {
    /// External command spawned as an independent OS process.
    Command { program: String, args: Vec<String> },
    /// In-process closure run on a dedicated blocking thread.
    Closure(TaskFn),
}

impl Task {
    pub fn command(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Task::Command {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn closure<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
    {
        Task::Closure(Box::new(f))
    }

    /// Short human-readable label for log lines and reports.
    pub fn describe(&self) -> String {
        match self {
            Task::Command { program, args } => {
                if args.is_empty() {
                    program.clone()
                } else {
                    format!("{} {}", program, args.join(" "))
                }
            }
            Task::Closure(_) => "closure".to_string(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Command { program, args } => f
                .debug_struct("Command")
                .field("program", program)
                .field("args", args)
                .finish(),
            Task::Closure(_) => f.write_str("Closure"),
        }
    }
}

/// Lifecycle of a tracked job. Derived from the runner, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NotStarted,
    Running,
    Finished,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::NotStarted => write!(f, "not started"),
            JobState::Running => write!(f, "running"),
            JobState::Finished => write!(f, "finished"),
        }
    }
}

/// A queued unit of work plus its identity.
#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub label: String,
    pub task: Task,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(task: Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: task.describe(),
            task,
            created_at: Utc::now(),
        }
    }
}
