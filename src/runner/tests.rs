//! Tests for the job dispatcher

use super::*;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Mock executor
// ============================================================================

/// Records how many executions overlap at any instant
#[derive(Default)]
struct CountingExecutor {
    active: AtomicUsize,
    max_active: AtomicUsize,
    executed: AtomicUsize,
    delay: Duration,
    fail_every: Option<usize>,
}

impl CountingExecutor {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    fn with_fail_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n);
        self
    }
}

#[async_trait]
impl JobExecutor for Arc<CountingExecutor> {
    async fn execute(&self, job: &Job) -> crate::Result<JobOutcome> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        let n = self.executed.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(every) = self.fail_every {
            if n % every == 0 {
                return Err(crate::Error::io(
                    &job.log_path,
                    std::io::Error::other("spawn failed"),
                ));
            }
        }

        Ok(JobOutcome {
            exit_code: Some(if job.repetition == 99 { 1 } else { 0 }),
            elapsed: self.delay,
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn jobs(n: usize) -> Vec<Job> {
    (0..n)
        .map(|i| Job {
            variant: "freertos_list".into(),
            size_class: 8,
            instance_id: i as i64,
            repetition: 0,
            command: format!("job {i}"),
            log_path: PathBuf::from(format!("log/8/set{i}-freertos_list-0.log")),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_pool_bound_is_never_exceeded() {
    let executor = Arc::new(CountingExecutor::with_delay(Duration::from_millis(20)));
    let runner = JobRunner::new(Arc::clone(&executor), 10);

    let summary = runner.run(jobs(25)).await.unwrap();

    assert_eq!(summary.total, 25);
    assert_eq!(summary.failed, 0);
    assert_eq!(executor.executed.load(Ordering::SeqCst), 25);
    assert!(executor.max_active.load(Ordering::SeqCst) <= 10);
    assert_eq!(executor.active.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_bound_on_multi_thread_runtime() {
    let executor = Arc::new(CountingExecutor::with_delay(Duration::from_millis(10)));
    let runner = JobRunner::new(Arc::clone(&executor), 3);

    runner.run(jobs(25)).await.unwrap();

    let max = executor.max_active.load(Ordering::SeqCst);
    assert!(max <= 3, "observed {max} concurrent jobs");
    assert!(max >= 1);
}

#[tokio::test]
async fn test_pool_is_saturated_when_work_is_available() {
    let executor = Arc::new(CountingExecutor::with_delay(Duration::from_millis(30)));
    let runner = JobRunner::new(Arc::clone(&executor), 4);

    runner.run(jobs(12)).await.unwrap();

    assert_eq!(executor.max_active.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_failures_do_not_abort_dispatch() {
    let executor = Arc::new(CountingExecutor::with_delay(Duration::from_millis(1)).with_fail_every(3));
    let runner = JobRunner::new(Arc::clone(&executor), 2);

    let mut batch = jobs(9);
    batch[0].repetition = 99; // exits non-zero

    let summary = runner.run(batch).await.unwrap();

    assert_eq!(executor.executed.load(Ordering::SeqCst), 9);
    assert!(summary.failed >= 3);
    assert!(summary.failed <= 4);
}

#[tokio::test]
async fn test_empty_dispatch_completes() {
    let executor = Arc::new(CountingExecutor::default());
    let runner = JobRunner::new(executor, 10);

    let summary = runner.run(Vec::new()).await.unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_zero_concurrency_is_clamped() {
    let runner = JobRunner::new(Arc::new(CountingExecutor::default()), 0);
    assert_eq!(runner.concurrency(), 1);
}
