//! Completion counter with ETA estimation

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Mutex;

/// Snapshot taken right after a job completed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Jobs finished so far
    pub completed: usize,
    /// Jobs planned
    pub total: usize,
    /// Wall time since dispatch started
    pub elapsed: Duration,
    /// Estimated time to completion
    pub eta: Option<Duration>,
}

impl ProgressUpdate {
    /// Completed share in percent
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// `elapsed * (total / completed - 1)`, `None` when undefined
pub fn estimate_eta(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 || completed > total {
        return None;
    }
    let factor = total as f64 / completed as f64 - 1.0;
    Duration::try_from_secs_f64(elapsed.as_secs_f64() * factor).ok()
}

/// Render a duration as `HH:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Shared progress state of one dispatch
pub struct Progress {
    completed: Mutex<usize>,
    total: usize,
    started: Instant,
    bar: ProgressBar,
}

impl Progress {
    /// Track `total` jobs, optionally drawing a progress bar
    pub fn new(total: usize, show_bar: bool) -> Self {
        let bar = if show_bar {
            let bar = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            completed: Mutex::new(0),
            total,
            started: Instant::now(),
            bar,
        }
    }

    /// Count one completion; the read-modify-write happens under one lock
    pub async fn record(&self) -> ProgressUpdate {
        let mut count = self.completed.lock().await;
        *count += 1;
        let completed = *count;
        let elapsed = self.started.elapsed();
        drop(count);

        ProgressUpdate {
            completed,
            total: self.total,
            elapsed,
            eta: estimate_eta(elapsed, completed, self.total),
        }
    }

    /// Emit the progress line for a finished job
    pub fn report(&self, label: &str, update: &ProgressUpdate) {
        let eta = update
            .eta
            .map(format_duration)
            .unwrap_or_else(|| "--:--:--".into());

        self.bar.set_position(update.completed as u64);
        self.bar.set_message(format!("eta {eta}"));
        self.bar.suspend(|| {
            tracing::info!(
                "[{}/{}] {:5.1}% {} done, elapsed {}, eta {}",
                update.completed,
                update.total,
                update.percent(),
                label,
                format_duration(update.elapsed),
                eta
            );
        });
    }

    /// Number of completions so far
    pub async fn completed(&self) -> usize {
        *self.completed.lock().await
    }

    /// Close the progress bar
    pub fn finish(&self) {
        self.bar.finish_with_message("all jobs finished");
    }
}
