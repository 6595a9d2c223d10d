//! Error types for emubench

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::metrics::StatsError;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Workload catalog error (bad size directory, header or id)
    #[error("workload error in {path}: {reason}")]
    Workload {
        /// Offending file or directory
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// IO error on a specific path
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A single run log could not be turned into statistics
    #[error("invalid run log {path}: {reason}")]
    RunLog {
        /// Log artifact
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// No repetition of an instance produced a usable log
    #[error(
        "no usable run for variant {variant}, size {size_class}, instance {instance_id} (last tried {path})"
    )]
    MissingRuns {
        /// Variant name
        variant: String,
        /// Size class
        size_class: u32,
        /// Instance id
        instance_id: i64,
        /// Last log artifact tried
        path: PathBuf,
    },

    /// Statistics could not be computed over an aggregated population
    #[error("aggregation failed for {context}: {source}")]
    Aggregation {
        /// Which aggregate and metric
        context: String,
        /// Underlying numeric failure
        #[source]
        source: StatsError,
    },

    /// Report artifact could not be written
    #[error("failed to write report {path}: {reason}")]
    Report {
        /// Target artifact
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// A worker task died before reporting back
    #[error("worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a workload catalog error
    pub fn workload(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Workload {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-run error
    pub fn run_log(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::RunLog {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a report write error
    pub fn report(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Report {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is recoverable through the repetition fallback
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RunLog { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
