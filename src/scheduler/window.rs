use serde::Serialize;

use crate::scheduler::job::JobState;
use crate::worker::JobRunner;

/// Snapshot of the tracked window, recomputed by a single scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub running: usize,
    pub finished: usize,
    /// Admitted but not yet started.
    pub remaining: usize,
    /// Finished jobs that captured a failure.
    pub failed: usize,
}

impl JobCounts {
    /// Jobs currently occupying a window slot that is not yet done.
    pub fn active(&self) -> usize {
        self.running + self.remaining
    }
}

/// The bounded collection of runners the scheduler actively manages, together
/// with the cursor pointing at the next runner to dispatch. Keeping the cursor
/// next to the collection it indexes means compaction can never leave the two
/// out of step.
#[derive(Debug)]
pub struct TrackedWindow {
    runners: Vec<JobRunner>,
    cursor: usize,
    max_tracked: usize,
}

impl TrackedWindow {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            runners: Vec::new(),
            cursor: 0,
            max_tracked,
        }
    }

    pub fn max_tracked(&self) -> usize {
        self.max_tracked
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Scan every runner once and recompute the counts. Polls each runner's
    /// failure channel as a side effect, so finished failures are memoized
    /// even if the caller never asks for them individually.
    pub fn counts(&mut self) -> JobCounts {
        let mut counts = JobCounts::default();
        for runner in &mut self.runners {
            if runner.failure().is_some() {
                counts.failed += 1;
            }
            match runner.state() {
                JobState::Running => counts.running += 1,
                JobState::NotStarted => counts.remaining += 1,
                JobState::Finished => counts.finished += 1,
            }
        }
        counts
    }

    /// Append a runner to the window.
    pub fn admit(&mut self, runner: JobRunner) {
        self.runners.push(runner);
    }

    /// Discard every finished runner, keeping still-running runners followed
    /// by not-yet-started ones in their existing relative order, and reset
    /// the dispatch cursor to the first not-started slot. Failures captured
    /// by discarded runners are no longer inspectable afterwards.
    ///
    /// Returns the number of runners discarded.
    pub fn compact(&mut self) -> usize {
        let before = self.runners.len();
        let mut running = Vec::new();
        let mut idle = Vec::new();
        for runner in self.runners.drain(..) {
            match runner.state() {
                JobState::Running => running.push(runner),
                JobState::NotStarted => idle.push(runner),
                JobState::Finished => {}
            }
        }
        self.cursor = running.len();
        running.append(&mut idle);
        self.runners = running;
        before - self.runners.len()
    }

    /// The runner at the dispatch cursor, if any.
    pub fn at_cursor(&mut self) -> Option<&mut JobRunner> {
        let cursor = self.cursor;
        self.runners.get_mut(cursor)
    }

    pub fn advance_cursor(&mut self) {
        self.cursor += 1;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut JobRunner> + '_ {
        self.runners.iter_mut()
    }

    /// Drop every runner and reset the cursor. The caller is responsible for
    /// checking that none are still running.
    pub fn clear(&mut self) {
        self.runners.clear();
        self.cursor = 0;
    }
}
