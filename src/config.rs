//! Benchmark configuration types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::parser::LogEncoding;

/// Benchmark configuration
///
/// Defines which variants are exercised, how often, how wide the worker
/// pools are and which report artifacts get produced. Every key is optional
/// in the TOML file; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Variant executables, grouped by mechanism class
    pub variants: Vec<Vec<String>>,

    /// Repetitions per (variant, workload instance)
    pub repetitions: usize,

    /// Concurrent external invocations during `run`
    pub run_concurrency: usize,

    /// Concurrent size-class workers during `stats`
    pub stats_concurrency: usize,

    /// Pipe run output through gzip
    pub compress: bool,

    /// Marker that tags timer sample lines in run logs (without the colon)
    pub timer_prefix: String,

    /// Whether the executable's scheduler runs (`1`) or only overhead is timed (`0`)
    pub schedule: bool,

    /// Root of the workload tree (`<workload_dir>/<size>/<file>`)
    pub workload_dir: PathBuf,

    /// Root of the log and report tree
    pub log_dir: PathBuf,

    /// Directory holding the variant executables
    pub bin_dir: PathBuf,

    /// Invocation template; `{bin}`, `{variant}`, `{schedule}` and `{workload}` are substituted
    pub command_template: String,

    /// Which report artifacts to write
    pub reports: ReportFlags,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            variants: vec![vec!["freertos_list".into(), "freertos_boi".into()]],
            repetitions: 3,
            run_concurrency: 10,
            stats_concurrency: 4,
            compress: false,
            timer_prefix: "INSERTTIMER".into(),
            schedule: true,
            workload_dir: PathBuf::from("tasksets"),
            log_dir: PathBuf::from("log"),
            bin_dir: PathBuf::from("bin"),
            command_template: "{bin}/{variant} {schedule} {workload}".into(),
            reports: ReportFlags::default(),
        }
    }
}

/// Report artifact selection: three granularities × two modes, plus two encodings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReportFlags {
    /// Per-instance table with one row per repetition and a mean row
    pub instance_summary: bool,
    /// Per-instance table with all five statistics per metric
    pub instance_full: bool,
    /// Per-size-class table of instance representative values
    pub size_summary: bool,
    /// Per-size-class table with all five statistics
    pub size_full: bool,
    /// Overall table of size-class summary values
    pub overall_summary: bool,
    /// Overall table with all five statistics
    pub overall_full: bool,
    /// Emit semicolon-delimited `.csv` files
    pub csv: bool,
    /// Emit space-delimited `.dat` files
    pub dat: bool,
}

impl Default for ReportFlags {
    fn default() -> Self {
        Self {
            instance_summary: true,
            instance_full: false,
            size_summary: true,
            size_full: true,
            overall_summary: true,
            overall_full: true,
            csv: true,
            dat: false,
        }
    }
}

impl ReportFlags {
    /// Whether any table is requested at all
    pub fn any_table(&self) -> bool {
        self.instance_summary
            || self.instance_full
            || self.size_summary
            || self.size_full
            || self.overall_summary
            || self.overall_full
    }
}

impl BenchConfig {
    /// Load a configuration file, falling back to defaults for missing keys
    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| crate::Error::io(path, e))?;
        let config: Self =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Set the repetition count
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Set the variant list as a single mechanism class
    pub fn with_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants = vec![variants.into_iter().map(Into::into).collect()];
        self
    }

    /// Set the workload and log roots
    pub fn with_dirs(mut self, workload_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        self.workload_dir = workload_dir.into();
        self.log_dir = log_dir.into();
        self
    }

    /// All variants in configuration order, mechanism classes flattened
    pub fn flat_variants(&self) -> Vec<String> {
        self.variants.iter().flatten().cloned().collect()
    }

    /// Encoding of run logs on disk
    pub fn log_encoding(&self) -> LogEncoding {
        if self.compress {
            LogEncoding::Gzip
        } else {
            LogEncoding::Plain
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let variants = self.flat_variants();
        if variants.is_empty() {
            return Err(ConfigError::InvalidVariants(
                "at least one variant is required".into(),
            ));
        }
        if let Some(bad) = variants
            .iter()
            .find(|v| {
                v.is_empty() || v.contains(|c: char| c == '/' || c == ';' || c.is_whitespace())
            })
        {
            return Err(ConfigError::InvalidVariants(format!(
                "invalid variant name {bad:?}"
            )));
        }

        if self.repetitions == 0 {
            return Err(ConfigError::InvalidRepetitions(
                "repetitions must be at least 1".into(),
            ));
        }

        if self.run_concurrency == 0 || self.stats_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if self.timer_prefix.is_empty() || self.timer_prefix.contains(':') {
            return Err(ConfigError::InvalidPrefix(format!(
                "timer prefix {:?} must be non-empty and must not contain ':'",
                self.timer_prefix
            )));
        }

        for placeholder in ["{variant}", "{workload}"] {
            if !self.command_template.contains(placeholder) {
                return Err(ConfigError::InvalidTemplate(format!(
                    "command template must contain {placeholder}"
                )));
            }
        }

        if self.reports.any_table() && !self.reports.csv && !self.reports.dat {
            return Err(ConfigError::InvalidReports(
                "reports are enabled but neither csv nor dat encoding is".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file did not parse
    #[error("Invalid configuration file: {0}")]
    Parse(String),

    /// Invalid variant list
    #[error("Invalid variants: {0}")]
    InvalidVariants(String),

    /// Invalid repetition count
    #[error("Invalid repetitions: {0}")]
    InvalidRepetitions(String),

    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid timer prefix
    #[error("Invalid timer prefix: {0}")]
    InvalidPrefix(String),

    /// Invalid command template
    #[error("Invalid command template: {0}")]
    InvalidTemplate(String),

    /// Inconsistent report flags
    #[error("Invalid report flags: {0}")]
    InvalidReports(String),
}
