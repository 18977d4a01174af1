use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{ProcmillError, Result};
use crate::scheduler::job::{Job, JobState, Task};
use crate::worker::executor::{self, JobFailure, JobOutcome};

/// Execution handle for one admitted job.
///
/// Owned exclusively by the scheduler: it is the only party that starts,
/// polls, or joins the runner. The job writes its outcome exactly once over
/// a one-shot channel; [`JobRunner::failure`] reads that channel at most once
/// and memoizes the result.
#[derive(Debug)]
pub struct JobRunner {
    id: Uuid,
    label: String,
    created_at: DateTime<Utc>,
    task: Option<Task>,
    handle: Option<JoinHandle<()>>,
    outcome_rx: Option<oneshot::Receiver<JobOutcome>>,
    failure: Option<JobFailure>,
    done: Arc<Notify>,
}

impl JobRunner {
    /// Wrap an admitted job. `done` is notified when the job terminates so
    /// the scheduler's run loop can wake without waiting out its poll
    /// interval.
    pub fn new(job: Job, done: Arc<Notify>) -> Self {
        Self {
            id: job.id,
            label: job.label,
            created_at: job.created_at,
            task: Some(job.task),
            handle: None,
            outcome_rx: None,
            failure: None,
            done,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Begin execution. Calling this a second time is a caller error.
    pub fn start(&mut self) -> Result<()> {
        let task = self
            .task
            .take()
            .ok_or(ProcmillError::AlreadyStarted(self.id))?;

        let (tx, rx) = oneshot::channel();
        let done = self.done.clone();
        let handle = tokio::spawn(async move {
            let outcome = executor::run_task(task).await;
            // The receiver may have been dropped by clear_jobs; the outcome
            // is then unobservable, which is the documented trade-off.
            let _ = tx.send(outcome);
            done.notify_one();
        });

        self.handle = Some(handle);
        self.outcome_rx = Some(rx);
        Ok(())
    }

    pub fn has_been_started(&self) -> bool {
        self.task.is_none()
    }

    pub fn is_alive(&self) -> bool {
        self.state() == JobState::Running
    }

    pub fn state(&self) -> JobState {
        if self.task.is_some() {
            JobState::NotStarted
        } else {
            match &self.handle {
                Some(handle) if !handle.is_finished() => JobState::Running,
                _ => JobState::Finished,
            }
        }
    }

    /// Wait for the job to terminate, or until `timeout` elapses. A timed-out
    /// job is left running; a never-started or already-joined runner is a
    /// no-op. The job's own failure is never surfaced here.
    pub async fn join(&mut self, timeout: Option<Duration>) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        match timeout {
            None => {
                let _ = handle.await;
                self.handle = None;
            }
            Some(limit) => {
                if tokio::time::timeout(limit, &mut *handle).await.is_ok() {
                    self.handle = None;
                }
            }
        }
    }

    /// Non-blocking failure poll. Returns the captured failure once the job
    /// has sent its termination notice, `None` while it is still running or
    /// if it completed cleanly. The one-shot channel is consumed on first
    /// receipt; subsequent calls return the cached value.
    pub fn failure(&mut self) -> Option<&JobFailure> {
        if self.failure.is_none() {
            if let Some(rx) = self.outcome_rx.as_mut() {
                if let Ok(outcome) = rx.try_recv() {
                    self.outcome_rx = None;
                    self.failure = outcome.failure();
                }
            }
        }
        self.failure.as_ref()
    }
}
