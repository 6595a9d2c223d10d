//! Job planning and command construction

use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::config::BenchConfig;
use crate::layout::LogLayout;
use crate::parser::LogEncoding;

/// One external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Variant executable
    pub variant: String,
    /// Size class of the workload
    pub size_class: u32,
    /// Workload instance id
    pub instance_id: i64,
    /// Repetition index
    pub repetition: usize,
    /// Shell command, output redirection included
    pub command: String,
    /// Where the command writes its output
    pub log_path: PathBuf,
}

/// Make a pipeline report the variant's exit status instead of gzip's,
/// on shells that know `pipefail`. Others run the pipeline unchanged.
const PIPEFAIL: &str = "(set -o pipefail) 2>/dev/null && set -o pipefail; ";

/// Renders invocation commands from a template
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    template: String,
    bin_dir: PathBuf,
    schedule: bool,
    encoding: LogEncoding,
}

impl CommandTemplate {
    /// Create a template
    pub fn new(
        template: impl Into<String>,
        bin_dir: impl Into<PathBuf>,
        schedule: bool,
        encoding: LogEncoding,
    ) -> Self {
        Self {
            template: template.into(),
            bin_dir: bin_dir.into(),
            schedule,
            encoding,
        }
    }

    /// Template described by a configuration
    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(
            config.command_template.clone(),
            config.bin_dir.clone(),
            config.schedule,
            config.log_encoding(),
        )
    }

    /// Build the full shell command for one invocation
    pub fn render(&self, variant: &str, workload: &Path, log_path: &Path) -> String {
        let invocation = self
            .template
            .replace("{bin}", &shell_quote(&self.bin_dir.to_string_lossy()))
            .replace("{variant}", &shell_quote(variant))
            .replace("{schedule}", if self.schedule { "1" } else { "0" })
            .replace("{workload}", &shell_quote(&workload.to_string_lossy()));
        let log = shell_quote(&log_path.to_string_lossy());

        match self.encoding {
            LogEncoding::Plain => format!("{invocation} > {log}"),
            LogEncoding::Gzip => format!("{PIPEFAIL}{invocation} | gzip -c > {log}"),
        }
    }
}

/// Quote a word for `sh` unless it is made of safe characters only
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Enumerate one job per (size class, variant, instance, repetition)
pub fn plan_jobs(
    catalog: &Catalog,
    variants: &[String],
    repetitions: usize,
    layout: &LogLayout,
    template: &CommandTemplate,
) -> Vec<Job> {
    let mut jobs = Vec::with_capacity(catalog.instance_count() * variants.len() * repetitions);

    for class in catalog.classes() {
        for variant in variants {
            for instance in &class.instances {
                let file_name = instance.file_name();
                for repetition in 0..repetitions {
                    let log_path = layout.run_log(&class.dir_name, &file_name, variant, repetition);
                    jobs.push(Job {
                        variant: variant.clone(),
                        size_class: class.size,
                        instance_id: instance.id,
                        repetition,
                        command: template.render(variant, &instance.path, &log_path),
                        log_path,
                    });
                }
            }
        }
    }

    jobs
}
