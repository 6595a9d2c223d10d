//! Job execution seam

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::job::Job;

/// Result of one finished invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Wall time of the invocation
    pub elapsed: Duration,
}

impl JobOutcome {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one job to completion
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Execute the job and wait for it to finish
    async fn execute(&self, job: &Job) -> Result<JobOutcome>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Executes job commands through a POSIX shell
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    /// Use a specific shell binary
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl JobExecutor for ShellExecutor {
    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let start = Instant::now();
        let status = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(&job.command)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::io(&job.log_path, e))?;

        Ok(JobOutcome {
            exit_code: status.code(),
            elapsed: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        &self.shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn job(command: String, log_path: PathBuf) -> Job {
        Job {
            variant: "v".into(),
            size_class: 1,
            instance_id: 0,
            repetition: 0,
            command,
            log_path,
        }
    }

    #[tokio::test]
    async fn test_shell_executor_writes_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("out.log");
        let command = format!("printf 'INSERTTIMER:10\\n' > '{}'", log.display());

        let outcome = ShellExecutor::default()
            .execute(&job(command, log.clone()))
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(std::fs::read_to_string(log).unwrap(), "INSERTTIMER:10\n");
    }

    #[tokio::test]
    async fn test_shell_executor_reports_failure_exit() {
        let outcome = ShellExecutor::default()
            .execute(&job("exit 3".into(), PathBuf::from("unused")))
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(3));
    }

    fn gzip_command(program: &str, log: &std::path::Path) -> String {
        use crate::parser::LogEncoding;
        use crate::runner::CommandTemplate;

        CommandTemplate::new("{variant} {workload}", "bin", true, LogEncoding::Gzip).render(
            program,
            std::path::Path::new("set0"),
            log,
        )
    }

    #[tokio::test]
    async fn test_compressed_command_runs_on_any_sh() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("set0-v-0.log.gz");

        let outcome = ShellExecutor::default()
            .execute(&job(gzip_command("echo", &log), log.clone()))
            .await
            .unwrap();

        assert!(outcome.success());
        assert!(std::fs::metadata(&log).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn test_compressed_command_reports_variant_failure() {
        if !std::path::Path::new("/bin/bash").exists() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("set0-v-0.log.gz");

        let outcome = ShellExecutor::new("/bin/bash")
            .execute(&job(gzip_command("false", &log), log.clone()))
            .await
            .unwrap();

        assert!(!outcome.success());
        assert!(log.exists());
    }

    #[tokio::test]
    async fn test_missing_shell_is_an_error() {
        let result = ShellExecutor::new("/definitely/not/a/shell")
            .execute(&job("true".into(), PathBuf::from("unused")))
            .await;
        assert!(result.is_err());
    }
}
