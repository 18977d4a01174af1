use std::time::Duration;

/// Configuration for the job scheduler.
///
/// `num_workers` caps how many jobs run at the same time; `max_tracked_jobs`
/// bounds the tracked window (running + admitted-but-not-started jobs) and is
/// never allowed below `num_workers`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently running jobs. 0 = logical CPU count.
    pub num_workers: usize,
    /// Pause between dispatch attempts when no completion event arrives.
    pub poll_interval: Duration,
    /// Finished-job threshold that triggers window compaction.
    pub max_tracked_jobs: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            poll_interval: Duration::from_millis(100),
            max_tracked_jobs: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_tracked_jobs(mut self, max_tracked_jobs: usize) -> Self {
        self.max_tracked_jobs = max_tracked_jobs;
        self
    }

    /// Resolve 0-valued worker counts and raise `max_tracked_jobs` up to
    /// `num_workers` if it was set smaller.
    pub(crate) fn normalize(mut self) -> Self {
        if self.num_workers == 0 {
            self.num_workers = num_cpus::get();
        }
        if self.max_tracked_jobs < self.num_workers {
            self.max_tracked_jobs = self.num_workers;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_default() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.num_workers, num_cpus::get());
        assert_eq!(cfg.poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.max_tracked_jobs, 10);
    }

    #[test]
    fn scheduler_config_new() {
        let cfg = SchedulerConfig::new(4);
        assert_eq!(cfg.num_workers, 4);
        assert_eq!(cfg.max_tracked_jobs, 10);
    }

    #[test]
    fn scheduler_config_builders() {
        let cfg = SchedulerConfig::new(2)
            .with_poll_interval(Duration::from_millis(5))
            .with_max_tracked_jobs(32);
        assert_eq!(cfg.poll_interval, Duration::from_millis(5));
        assert_eq!(cfg.max_tracked_jobs, 32);
    }

    #[test]
    fn normalize_resolves_zero_workers() {
        let cfg = SchedulerConfig::new(0).normalize();
        assert_eq!(cfg.num_workers, num_cpus::get());
    }

    #[test]
    fn normalize_raises_max_tracked_to_worker_count() {
        let cfg = SchedulerConfig::new(16).with_max_tracked_jobs(4).normalize();
        assert_eq!(cfg.max_tracked_jobs, 16);
    }

    #[test]
    fn normalize_keeps_larger_max_tracked() {
        let cfg = SchedulerConfig::new(2).with_max_tracked_jobs(50).normalize();
        assert_eq!(cfg.max_tracked_jobs, 50);
    }
}
