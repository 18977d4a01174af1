use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{ProcmillError, Result};
use crate::scheduler::job::{Job, JobState, Task};
use crate::scheduler::window::{JobCounts, TrackedWindow};
use crate::worker::JobRunner;

/// What a single scheduling step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A runner was started.
    Started(Uuid),
    /// The runner at the dispatch cursor had already finished; the cursor
    /// moved past it without starting anything.
    SkippedFinished(Uuid),
    /// All worker slots are occupied; nothing was dispatched.
    Throttled,
    /// The dispatch cursor is past the end of the window.
    Drained,
}

/// One captured failure, as surfaced in the final run report.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub job_id: Uuid,
    pub label: String,
    pub kind: String,
    pub trace: String,
}

/// Summary of a completed (or interrupted) run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Jobs the dispatch cursor moved past during this run.
    pub started: usize,
    pub counts: JobCounts,
    /// Failures still inspectable in the window. Failures discarded by
    /// compaction during the run are not recoverable.
    pub failures: Vec<FailureReport>,
    pub elapsed: Duration,
    /// True when a shutdown request ended the run before its range completed.
    pub interrupted: bool,
}

/// Bounded-concurrency job scheduler.
///
/// Jobs are appended to an unbounded FIFO pending queue, admitted into a
/// bounded tracked window, and started at most `num_workers` at a time. A
/// single controlling task owns the scheduler and drives it through
/// [`run_all`](JobScheduler::run_all) / [`run_range`](JobScheduler::run_range);
/// runners execute independently and report back over one-shot channels, so
/// a failing job can never take the scheduler down with it.
#[derive(Debug)]
pub struct JobScheduler {
    config: SchedulerConfig,
    pending: VecDeque<Job>,
    window: TrackedWindow,
    /// Index into `pending` of the next job to admit.
    admit_cursor: usize,
    /// Ordinal of the next job to start, for progress reporting and the run
    /// loop's termination check.
    started_count: usize,
    done: Arc<Notify>,
    shutdown: CancellationToken,
}

impl JobScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let config = config.normalize();
        tracing::info!(
            workers = config.num_workers,
            max_tracked = config.max_tracked_jobs,
            "Scheduler created"
        );
        let window = TrackedWindow::new(config.max_tracked_jobs);
        Self {
            config,
            pending: VecDeque::new(),
            window,
            admit_cursor: 0,
            started_count: 0,
            done: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Attach a shutdown token. When cancelled mid-run, the scheduler stops
    /// admitting and dispatching, joins whatever is running, and returns a
    /// report marked interrupted.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Append one task to the pending queue. No admission check happens
    /// here; the queue may grow without bound.
    pub fn add_job(&mut self, task: Task) -> Uuid {
        let job = Job::new(task);
        let id = job.id;
        tracing::debug!(id = %id, label = %job.label, "Job queued");
        self.pending.push_back(job);
        id
    }

    /// Append a batch of tasks, preserving their order.
    pub fn add_jobs(&mut self, tasks: impl IntoIterator<Item = Task>) -> Vec<Uuid> {
        tasks.into_iter().map(|task| self.add_job(task)).collect()
    }

    /// Number of jobs still in the pending queue (not yet admitted).
    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    /// Number of runners currently in the tracked window.
    pub fn tracked(&self) -> usize {
        self.window.len()
    }

    /// Current value of the logical job pointer.
    pub fn pointer(&self) -> usize {
        self.started_count
    }

    /// Force the logical pointer to an arbitrary value. No validation is
    /// performed; a bad value can cut a run short or make it walk past jobs
    /// it never started. Manual override only.
    pub fn set_pointer(&mut self, pointer: usize) {
        self.started_count = pointer;
    }

    /// Recompute the window counts by a single scan. This is the sole source
    /// of truth for scheduler state and runs before every admission decision.
    pub fn check_jobs(&mut self) -> JobCounts {
        let counts = self.window.counts();
        tracing::trace!(
            running = counts.running,
            finished = counts.finished,
            remaining = counts.remaining,
            failed = counts.failed,
            queued = self.pending.len(),
            "Checked jobs"
        );
        counts
    }

    /// One scheduling step: compact the window if it has accumulated too many
    /// finished jobs, admit pending jobs while the window has room, then start
    /// at most one runner if a worker slot is free.
    pub fn start_job(&mut self) -> Result<StepOutcome> {
        let mut counts = self.check_jobs();

        if counts.finished > self.config.max_tracked_jobs {
            let dropped = self.window.compact();
            tracing::debug!(dropped, "Compacted finished jobs out of the window");
            counts = self.check_jobs();
        }

        while counts.active() < self.config.max_tracked_jobs && self.admit_cursor < self.pending.len()
        {
            let job = self
                .pending
                .remove(self.admit_cursor)
                .expect("admit cursor checked against queue length");
            tracing::debug!(id = %job.id, label = %job.label, "Job admitted");
            self.window.admit(JobRunner::new(job, self.done.clone()));
            counts = self.check_jobs();
        }

        if counts.running >= self.config.num_workers {
            tracing::trace!(running = counts.running, "All worker slots busy");
            return Ok(StepOutcome::Throttled);
        }

        let ordinal = self.started_count;
        let outcome = match self.window.at_cursor() {
            None => return Ok(StepOutcome::Drained),
            Some(runner) => match runner.state() {
                JobState::NotStarted => {
                    runner.start()?;
                    tracing::info!(job = ordinal, id = %runner.id(), label = %runner.label(), "Job started");
                    StepOutcome::Started(runner.id())
                }
                _ => {
                    tracing::info!(job = ordinal, id = %runner.id(), "Job already finished");
                    StepOutcome::SkippedFinished(runner.id())
                }
            },
        };
        self.started_count += 1;
        self.window.advance_cursor();

        if let StepOutcome::Started(_) = outcome {
            let counts = self.check_jobs();
            tracing::debug!(
                running = counts.running,
                finished = counts.finished,
                remaining = counts.remaining,
                queued = self.pending.len(),
                "Window state"
            );
        }
        Ok(outcome)
    }

    /// Run the jobs with queue ordinals `start..end`. Queue entries before
    /// `start` are left pending, untouched. Blocks until every started job
    /// has terminated, then reports elapsed time, final counts, and every
    /// failure still inspectable in the window.
    pub async fn run_range(&mut self, start: usize, end: usize) -> Result<RunReport> {
        let queued = self.pending.len();
        if start >= end || end > queued {
            return Err(ProcmillError::InvalidRange { start, end, queued });
        }

        self.admit_cursor = start;
        self.started_count = start;
        self.window.reset_cursor();
        let run_started = Instant::now();
        tracing::info!(start, end, workers = self.config.num_workers, "Run started");

        let mut interrupted = false;
        while self.started_count < end {
            self.start_job()?;
            if self.started_count >= end {
                break;
            }
            tokio::select! {
                _ = self.done.notified() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::warn!("Shutdown requested, draining running jobs");
                    interrupted = true;
                    break;
                }
            }
        }

        self.join_all().await;

        let elapsed = run_started.elapsed();
        let counts = self.check_jobs();
        let failures = self.failures();
        tracing::info!(
            started = self.started_count - start,
            finished = counts.finished,
            failed = counts.failed,
            elapsed = ?elapsed,
            "Run complete"
        );
        for failure in &failures {
            tracing::warn!(
                id = %failure.job_id,
                label = %failure.label,
                kind = %failure.kind,
                "Job failed"
            );
        }

        Ok(RunReport {
            started: self.started_count - start,
            counts,
            failures,
            elapsed,
            interrupted,
        })
    }

    /// Run every job currently in the pending queue.
    pub async fn run_all(&mut self) -> Result<RunReport> {
        let end = self.pending.len();
        self.run_range(0, end).await
    }

    /// Join every tracked runner. Never-started runners are skipped; the
    /// pending queue is not drained.
    pub async fn join_all(&mut self) {
        for runner in self.window.iter_mut() {
            runner.join(None).await;
        }
    }

    /// Every failure still inspectable in the tracked window.
    pub fn failures(&mut self) -> Vec<FailureReport> {
        self.window
            .iter_mut()
            .filter_map(|runner| {
                let job_id = runner.id();
                let label = runner.label().to_string();
                runner.failure().cloned().map(|failure| FailureReport {
                    job_id,
                    label,
                    kind: failure.kind,
                    trace: failure.trace,
                })
            })
            .collect()
    }

    /// Reset the pending queue, the tracked window, and all cursors. Fails
    /// if any tracked runner is still alive; join or wait them out first.
    pub fn clear_jobs(&mut self) -> Result<()> {
        let counts = self.check_jobs();
        if counts.running > 0 {
            return Err(ProcmillError::JobsStillRunning(counts.running));
        }
        self.pending.clear();
        self.window.clear();
        self.admit_cursor = 0;
        self.started_count = 0;
        tracing::debug!("Cleared all jobs");
        Ok(())
    }
}

impl fmt::Display for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workers: {}, tracked: {}, queued: {}",
            self.config.num_workers,
            self.window.len(),
            self.pending.len()
        )
    }
}
