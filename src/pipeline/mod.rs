//! Statistics phase
//!
//! Each size class is aggregated by its own worker. Workers run on a
//! bounded pool and push their result into a shared collector; the overall
//! rollup and every report are produced only once all workers succeeded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::{Mutex, Semaphore};

use crate::catalog::{Catalog, SizeClass};
use crate::config::{BenchConfig, ReportFlags};
use crate::error::{Error, Result};
use crate::layout::LogLayout;
use crate::output::ReportWriter;
use crate::parser::{collect_repetitions, parse_run, RunKey};
use crate::rollup::{rollup_instance, rollup_size_class, InstanceKey, RollupSet, SizeClassRollup};

/// Everything a size-class worker needs, cheap to clone into a task
#[derive(Debug, Clone)]
struct WorkerContext {
    variants: Vec<String>,
    repetitions: usize,
    timer_prefix: String,
    layout: LogLayout,
}

/// Aggregate every variant of one size class
///
/// Runs on a blocking thread: it reads and decompresses log files.
fn aggregate_size_class(ctx: &WorkerContext, class: &SizeClass) -> Result<SizeClassRollup> {
    let encoding = ctx.layout.encoding();
    let mut variants = Vec::with_capacity(ctx.variants.len());

    for variant in &ctx.variants {
        let instances = class
            .instances
            .iter()
            .map(|instance| {
                let file_name = instance.file_name();
                let key = RunKey {
                    variant,
                    size_class: class.size,
                    instance_id: instance.id,
                };
                let runs = collect_repetitions(
                    key,
                    ctx.repetitions,
                    |rep| ctx.layout.run_log(&class.dir_name, &file_name, variant, rep),
                    |path| parse_run(path, encoding, &ctx.timer_prefix),
                )?;
                let borrowed = runs.iter().filter(|r| r.is_fallback()).count();
                if borrowed > 0 {
                    tracing::debug!(
                        variant = %variant,
                        size = class.size,
                        instance = instance.id,
                        borrowed,
                        "Repetitions filled from other runs"
                    );
                }
                rollup_instance(
                    InstanceKey {
                        variant: variant.clone(),
                        size_class: class.size,
                        instance_id: instance.id,
                        file_name,
                    },
                    runs,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        variants.push(rollup_size_class(instances)?);
    }

    Ok(SizeClassRollup {
        size_class: class.size,
        dir_name: class.dir_name.clone(),
        variants,
    })
}

/// Outcome of a statistics pass
#[derive(Debug, Clone)]
pub struct StatsReport {
    /// Aggregates at every level
    pub rollup: RollupSet,
    /// Report artifacts written
    pub written: Vec<PathBuf>,
}

/// Drives parsing, aggregation and reporting over a workload catalog
pub struct StatsPipeline {
    ctx: WorkerContext,
    concurrency: usize,
    workload_dir: PathBuf,
    reports: ReportFlags,
}

impl StatsPipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            ctx: WorkerContext {
                variants: config.flat_variants(),
                repetitions: config.repetitions,
                timer_prefix: config.timer_prefix.clone(),
                layout: LogLayout::new(config.log_dir.clone(), config.log_encoding()),
            },
            concurrency: config.stats_concurrency.max(1),
            workload_dir: config.workload_dir.clone(),
            reports: config.reports,
        }
    }

    /// Log tree the pipeline reads from and writes to
    pub fn layout(&self) -> &LogLayout {
        &self.ctx.layout
    }

    /// Aggregate every size class and compute the overall level
    pub async fn aggregate(&self, catalog: &Catalog) -> Result<RollupSet> {
        if catalog.is_empty() {
            return Err(Error::workload(
                &self.workload_dir,
                "no workload instances found",
            ));
        }

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let collector: Arc<Mutex<Vec<SizeClassRollup>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(catalog.classes().len());

        tracing::info!(
            size_classes = catalog.classes().len(),
            instances = catalog.instance_count(),
            workers = self.concurrency,
            "Aggregating run logs"
        );

        for class in catalog.classes() {
            if class.instances.is_empty() {
                tracing::warn!(size = class.size, "Skipping size class without instances");
                continue;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::Worker(e.to_string()))?;
            let ctx = self.ctx.clone();
            let class = class.clone();
            let collector = Arc::clone(&collector);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let size = class.size;

                let rollup = tokio::task::spawn_blocking(move || aggregate_size_class(&ctx, &class))
                    .await
                    .map_err(|e| Error::Worker(e.to_string()))??;

                tracing::info!(size, instances = rollup.instance_count(), "Size class aggregated");
                collector.lock().await.push(rollup);
                Ok::<(), Error>(())
            }));
        }

        let mut first_error = None;
        for result in join_all(handles).await {
            let outcome = result.map_err(|e| Error::Worker(e.to_string())).and_then(|r| r);
            if let Err(e) = outcome {
                tracing::error!(error = %e, "Size class aggregation failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let classes = std::mem::take(&mut *collector.lock().await);
        let rollup = RollupSet::build(self.ctx.variants.clone(), classes)?;

        tracing::info!(
            size_classes = rollup.classes.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Aggregation completed"
        );
        Ok(rollup)
    }

    /// Aggregate, then write the enabled reports
    ///
    /// Nothing is written unless aggregation succeeded for every size class.
    pub async fn run(&self, catalog: &Catalog) -> Result<StatsReport> {
        let rollup = self.aggregate(catalog).await?;

        let written = if self.reports.any_table() {
            ReportWriter::new(self.ctx.layout.clone(), self.reports).write_all(&rollup)?
        } else {
            Vec::new()
        };

        Ok(StatsReport { rollup, written })
    }
}

#[cfg(test)]
mod tests;
