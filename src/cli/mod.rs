//! CLI argument parsing and command handling

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use crate::catalog::Catalog;
use crate::config::BenchConfig;
use crate::layout::LogLayout;
use crate::metrics::Metric;
use crate::pipeline::StatsPipeline;
use crate::rollup::RollupSet;
use crate::runner::{format_duration, plan_jobs, CommandTemplate, JobRunner, ShellExecutor};

/// Configuration file picked up from the working directory
const DEFAULT_CONFIG: &str = "emubench.toml";

/// emubench - run emulator variants over workload sets and roll up their timers
#[derive(Parser, Debug)]
#[command(name = "emubench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./emubench.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Execute every variant on every workload instance
    Run {
        /// Concurrent invocations
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Pipe run output through gzip
        #[arg(long)]
        compress: bool,

        /// Time only the overhead, with the scheduler disabled
        #[arg(long)]
        overhead: bool,

        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Parse run logs, aggregate them and write the reports
    Stats {
        /// Concurrent size-class workers
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Run logs are gzip-compressed
        #[arg(long)]
        compress: bool,
    },
}

impl Cli {
    /// Dispatch the selected subcommand
    pub async fn run(self) -> Result<ExitCode> {
        let Some(command) = self.command.clone() else {
            Cli::command().print_help()?;
            println!();
            return Ok(ExitCode::from(2));
        };

        let mut config = self.load_config()?;
        apply_overrides(&mut config, &command);
        config.validate()?;

        let catalog = Catalog::discover(&config.workload_dir).with_context(|| {
            format!(
                "Failed to read workloads from {}",
                config.workload_dir.display()
            )
        })?;
        tracing::info!(
            size_classes = catalog.classes().len(),
            instances = catalog.instance_count(),
            "Workload catalog loaded"
        );

        match command {
            Commands::Run { no_progress, .. } => run_benchmarks(&config, &catalog, !no_progress).await?,
            Commands::Stats { .. } => run_stats(&config, &catalog).await?,
        }

        Ok(ExitCode::SUCCESS)
    }

    fn load_config(&self) -> Result<BenchConfig> {
        match &self.config {
            Some(path) => BenchConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display())),
            None if Path::new(DEFAULT_CONFIG).is_file() => BenchConfig::load(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("Failed to load configuration from {DEFAULT_CONFIG}")),
            None => Ok(BenchConfig::default()),
        }
    }
}

/// Fold command-line flags into the loaded configuration
fn apply_overrides(config: &mut BenchConfig, command: &Commands) {
    match *command {
        Commands::Run {
            jobs,
            compress,
            overhead,
            ..
        } => {
            if let Some(jobs) = jobs {
                config.run_concurrency = jobs;
            }
            config.compress |= compress;
            if overhead {
                config.schedule = false;
            }
        }
        Commands::Stats { jobs, compress } => {
            if let Some(jobs) = jobs {
                config.stats_concurrency = jobs;
            }
            config.compress |= compress;
        }
    }
}

fn print_banner(title: &str, config: &BenchConfig, catalog: &Catalog) {
    println!("\n{}", "=".repeat(70));
    println!("   emubench - {title}");
    println!("{}", "=".repeat(70));
    println!();
    println!("Configuration:");
    println!("  Variants:     {}", config.flat_variants().join(", "));
    println!("  Repetitions:  {}", config.repetitions);
    println!(
        "  Workloads:    {} instances in {} size classes",
        catalog.instance_count(),
        catalog.classes().len()
    );
    println!("  Log dir:      {}", config.log_dir.display());
    println!(
        "  Compression:  {}",
        if config.compress { "gzip" } else { "none" }
    );
    println!("{}", "=".repeat(70));
    println!();
}

async fn run_benchmarks(config: &BenchConfig, catalog: &Catalog, show_progress: bool) -> Result<()> {
    print_banner("benchmark run", config, catalog);

    let layout = LogLayout::new(config.log_dir.clone(), config.log_encoding());
    layout
        .prepare(catalog)
        .context("Failed to create the log directory tree")?;

    let jobs = plan_jobs(
        catalog,
        &config.flat_variants(),
        config.repetitions,
        &layout,
        &CommandTemplate::from_config(config),
    );

    let summary = JobRunner::new(ShellExecutor::default(), config.run_concurrency)
        .with_progress_bar(show_progress)
        .run(jobs)
        .await?;

    println!();
    println!(
        "✓ {} jobs finished in {}",
        summary.total,
        format_duration(summary.elapsed)
    );
    if summary.failed > 0 {
        println!(
            "! {} jobs failed; their repetitions will be filled from other runs",
            summary.failed
        );
    }
    Ok(())
}

async fn run_stats(config: &BenchConfig, catalog: &Catalog) -> Result<()> {
    print_banner("statistics", config, catalog);

    let report = StatsPipeline::new(config).run(catalog).await?;

    print_overall(&report.rollup);
    println!("✓ {} report files written to {}", report.written.len(), config.log_dir.display());
    Ok(())
}

fn print_overall(rollup: &RollupSet) {
    println!("Overall ({} instances):", rollup.instance_count());
    println!(
        "  {:<24} {:>12} {:>16} {:>20}",
        "variant", "inserts", "time_total", "time_perinsert_mean"
    );
    for overall in &rollup.overall {
        println!(
            "  {:<24} {:>12.0} {:>16.0} {:>20.3}",
            overall.variant,
            overall.summary[Metric::Inserts],
            overall.summary[Metric::TimeTotal],
            overall.summary[Metric::PerInsertMean]
        );
    }
    println!();
}
