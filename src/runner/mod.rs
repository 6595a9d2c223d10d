//! Job dispatcher
//!
//! The runner coordinates execution of benchmark jobs, managing:
//! - A bounded pool of concurrent external invocations
//! - Progress and ETA reporting
//! - Tolerance of individual job failures

mod executor;
mod job;
mod progress;

pub use executor::{JobExecutor, JobOutcome, ShellExecutor};
pub use job::{plan_jobs, CommandTemplate, Job};
pub use progress::{estimate_eta, format_duration, Progress, ProgressUpdate};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Outcome of a whole dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Jobs dispatched
    pub total: usize,
    /// Jobs that failed to spawn or exited non-zero
    pub failed: usize,
    /// Wall time of the dispatch
    pub elapsed: Duration,
}

/// Runs jobs on a bounded pool of workers
pub struct JobRunner<E: JobExecutor> {
    executor: Arc<E>,
    concurrency: usize,
    show_progress: bool,
}

impl<E: JobExecutor + 'static> JobRunner<E> {
    /// Create a runner allowing `concurrency` jobs in flight
    pub fn new(executor: E, concurrency: usize) -> Self {
        Self {
            executor: Arc::new(executor),
            concurrency: concurrency.max(1),
            show_progress: false,
        }
    }

    /// Draw a progress bar while dispatching
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Maximum number of jobs in flight
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every job and wait until all of them finished
    ///
    /// Submission blocks while all worker slots are taken. Failing jobs are
    /// logged and counted but never stop the dispatch.
    pub async fn run(&self, jobs: Vec<Job>) -> Result<DispatchSummary> {
        let start = Instant::now();
        let total = jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let progress = Arc::new(Progress::new(total, self.show_progress));
        let failed = Arc::new(AtomicUsize::new(0));

        tracing::info!(
            jobs = total,
            concurrency = self.concurrency,
            executor = self.executor.name(),
            "Starting dispatch"
        );

        let mut tasks = Vec::with_capacity(total);

        for job in jobs {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::Worker(e.to_string()))?;

            let executor = Arc::clone(&self.executor);
            let progress = Arc::clone(&progress);
            let failed = Arc::clone(&failed);

            tasks.push(tokio::spawn(async move {
                let _permit = permit;

                match executor.execute(&job).await {
                    Ok(outcome) if outcome.success() => {
                        tracing::debug!(
                            log = %job.log_path.display(),
                            elapsed_ms = outcome.elapsed.as_millis() as u64,
                            "Job finished"
                        );
                    }
                    Ok(outcome) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            command = %job.command,
                            exit_code = ?outcome.exit_code,
                            "Job exited unsuccessfully"
                        );
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(command = %job.command, error = %e, "Job failed to run");
                    }
                }

                let update = progress.record().await;
                let label = format!(
                    "{} size {} id {} run {}",
                    job.variant, job.size_class, job.instance_id, job.repetition
                );
                progress.report(&label, &update);
            }));
        }

        // Wait for all tasks to complete
        for task in tasks {
            if let Err(e) = task.await {
                failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "Job task panicked");
            }
        }

        progress.finish();
        let completed = progress.completed().await;
        if completed != total {
            tracing::warn!(completed, total, "Some jobs never reported completion");
        }

        let summary = DispatchSummary {
            total,
            failed: failed.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
        };
        tracing::info!(
            total = summary.total,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Dispatch completed"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
