use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use procmill::config::SchedulerConfig;
use procmill::error::ProcmillError;
use procmill::scheduler::{JobScheduler, Task};

/// Scheduler with a short poll interval so tests do not sit in sleeps.
fn test_scheduler(num_workers: usize) -> JobScheduler {
    JobScheduler::new(
        SchedulerConfig::new(num_workers).with_poll_interval(Duration::from_millis(5)),
    )
}

fn sleeping_job(millis: u64) -> Task {
    Task::closure(move || {
        std::thread::sleep(Duration::from_millis(millis));
        Ok(())
    })
}

#[tokio::test]
async fn add_job_queues_without_admission() {
    let mut scheduler = test_scheduler(4);

    scheduler.add_job(sleeping_job(1));
    assert_eq!(scheduler.queued(), 1);
    assert_eq!(scheduler.tracked(), 0);

    // Nothing has been admitted, so every count is zero.
    let counts = scheduler.check_jobs();
    assert_eq!(counts.running, 0);
    assert_eq!(counts.finished, 0);
    assert_eq!(counts.remaining, 0);
    assert_eq!(counts.failed, 0);
}

#[tokio::test]
async fn add_jobs_preserves_order() {
    let mut scheduler = test_scheduler(4);

    let ids = scheduler.add_jobs((0..5).map(|_| sleeping_job(1)));
    assert_eq!(ids.len(), 5);
    assert_eq!(scheduler.queued(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_all_completes_every_job() {
    // A window larger than the job count keeps every finished runner
    // inspectable; windowed discarding is exercised in the compaction suite.
    let mut scheduler = JobScheduler::new(
        SchedulerConfig::new(10)
            .with_poll_interval(Duration::from_millis(5))
            .with_max_tracked_jobs(32),
    );
    assert_eq!(scheduler.config().num_workers, 10);

    scheduler.add_jobs((0..20).map(|_| sleeping_job(10)));
    assert_eq!(scheduler.queued(), 20);

    let report = scheduler.run_all().await.unwrap();
    assert_eq!(report.started, 20);
    assert_eq!(report.counts.finished, 20);
    assert_eq!(report.counts.failed, 0);
    assert_eq!(report.counts.running, 0);
    assert_eq!(report.counts.remaining, 0);
    assert!(report.failures.is_empty());
    assert!(!report.interrupted);
    assert_eq!(scheduler.queued(), 0);

    let counts = scheduler.check_jobs();
    assert_eq!(counts.finished, 20);
    assert_eq!(counts.running, 0);
    assert_eq!(counts.remaining, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_job_is_captured_not_fatal() {
    // A roomy window keeps every failure inspectable after the run.
    let mut scheduler = JobScheduler::new(
        SchedulerConfig::new(5)
            .with_poll_interval(Duration::from_millis(5))
            .with_max_tracked_jobs(32),
    );

    for i in 1_u64..=9 {
        scheduler.add_job(Task::closure(move || {
            let _ = i / (i + 1);
            Ok(())
        }));
    }
    let zero = std::hint::black_box(0_u64);
    scheduler.add_job(Task::closure(move || {
        let _ = 10 / zero;
        Ok(())
    }));
    assert_eq!(scheduler.queued(), 10);

    let report = scheduler.run_all().await.unwrap();
    assert_eq!(report.started, 10);
    assert_eq!(report.counts.finished, 10);
    assert_eq!(report.counts.failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].trace.contains("divide by zero"));
}

#[tokio::test]
async fn invalid_range_is_rejected_before_any_start() {
    let mut scheduler = test_scheduler(2);
    scheduler.add_jobs((0..10).map(|_| sleeping_job(1)));

    // Reversed bounds.
    let err = scheduler.run_range(5, 3).await.unwrap_err();
    assert!(matches!(err, ProcmillError::InvalidRange { start: 5, end: 3, queued: 10 }));

    // End past the queue.
    let err = scheduler.run_range(0, 11).await.unwrap_err();
    assert!(matches!(err, ProcmillError::InvalidRange { end: 11, .. }));

    // Empty range.
    let err = scheduler.run_range(4, 4).await.unwrap_err();
    assert!(matches!(err, ProcmillError::InvalidRange { .. }));

    // Nothing was touched.
    assert_eq!(scheduler.queued(), 10);
    assert_eq!(scheduler.tracked(), 0);
    let counts = scheduler.check_jobs();
    assert_eq!(counts.running + counts.finished + counts.remaining, 0);
}

#[tokio::test]
async fn run_all_with_empty_queue_is_invalid_range() {
    let mut scheduler = test_scheduler(2);
    let err = scheduler.run_all().await.unwrap_err();
    assert!(matches!(
        err,
        ProcmillError::InvalidRange {
            start: 0,
            end: 0,
            queued: 0
        }
    ));
}

#[tokio::test]
async fn run_range_leaves_prefix_pending() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = test_scheduler(1);

    for i in 0..5 {
        let order = order.clone();
        scheduler.add_job(Task::closure(move || {
            order.lock().unwrap().push(i);
            Ok(())
        }));
    }

    let report = scheduler.run_range(2, 5).await.unwrap();
    assert_eq!(report.started, 3);
    assert_eq!(report.counts.finished, 3);

    // Jobs 0 and 1 were never admitted.
    assert_eq!(scheduler.queued(), 2);
    assert_eq!(*order.lock().unwrap(), vec![2, 3, 4]);
}

#[tokio::test]
async fn jobs_start_in_fifo_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = test_scheduler(1);

    for i in 0..6 {
        let order = order.clone();
        scheduler.add_job(Task::closure(move || {
            order.lock().unwrap().push(i);
            Ok(())
        }));
    }

    scheduler.run_all().await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn clear_jobs_resets_everything() {
    let executed = Arc::new(AtomicUsize::new(0));
    let mut scheduler = test_scheduler(2);

    for _ in 0..4 {
        let executed = executed.clone();
        scheduler.add_job(Task::closure(move || {
            executed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    }

    // Partial run: only the first two ordinals.
    scheduler.run_range(0, 2).await.unwrap();

    scheduler.clear_jobs().unwrap();
    assert_eq!(scheduler.queued(), 0);
    assert_eq!(scheduler.tracked(), 0);
    assert_eq!(scheduler.pointer(), 0);
    let counts = scheduler.check_jobs();
    assert_eq!(counts.running + counts.finished + counts.remaining, 0);

    // The scheduler is reusable after a clear.
    scheduler.add_jobs((0..3).map(|_| sleeping_job(1)));
    let report = scheduler.run_all().await.unwrap();
    assert_eq!(report.counts.finished, 3);
}

#[tokio::test]
async fn clear_jobs_refuses_while_running() {
    let mut scheduler = test_scheduler(2);
    scheduler.add_job(sleeping_job(300));

    // Admit and start the job by hand.
    scheduler.start_job().unwrap();
    let err = scheduler.clear_jobs().unwrap_err();
    assert!(matches!(err, ProcmillError::JobsStillRunning(1)));

    scheduler.join_all().await;
    scheduler.clear_jobs().unwrap();
    assert_eq!(scheduler.tracked(), 0);
}

#[tokio::test]
async fn set_pointer_is_an_unchecked_override() {
    let mut scheduler = test_scheduler(2);
    assert_eq!(scheduler.pointer(), 0);

    scheduler.set_pointer(7);
    assert_eq!(scheduler.pointer(), 7);
}

#[tokio::test]
async fn display_summarizes_scheduler() {
    let mut scheduler = test_scheduler(3);
    scheduler.add_jobs((0..2).map(|_| sleeping_job(1)));

    let summary = scheduler.to_string();
    assert!(summary.contains("workers: 3"));
    assert!(summary.contains("queued: 2"));
}
