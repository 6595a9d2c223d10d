//! Tests for the statistics phase

use super::*;

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use crate::metrics::Metric;

// ============================================================================
// Fixtures
// ============================================================================

const RUN_LOG: &str = "boot\nINSERTTIMER:10\nnoise\nINSERTTIMER:20\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self, variants: &[&str], repetitions: usize) -> BenchConfig {
        BenchConfig::default()
            .with_variants(variants.iter().copied())
            .with_repetitions(repetitions)
            .with_dirs(self.root().join("tasksets"), self.root().join("log"))
    }

    fn workload(&self, size: u32, id: i64) {
        let dir = self.root().join("tasksets").join(size.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("set{id}")), format!("{id}\n")).unwrap();
    }

    fn log_path(&self, size: u32, id: i64, variant: &str, rep: usize, ext: &str) -> PathBuf {
        let dir = self.root().join("log").join(size.to_string());
        fs::create_dir_all(&dir).unwrap();
        dir.join(format!("set{id}-{variant}-{rep}.{ext}"))
    }

    fn log(&self, size: u32, id: i64, variant: &str, rep: usize, body: &str) {
        fs::write(self.log_path(size, id, variant, rep, "log"), body).unwrap();
    }

    fn gz_log(&self, size: u32, id: i64, variant: &str, rep: usize, body: &str) {
        let file = fs::File::create(self.log_path(size, id, variant, rep, "log.gz")).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        encoder.finish().unwrap();
    }

    fn catalog(&self) -> Catalog {
        Catalog::discover(&self.root().join("tasksets")).unwrap()
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join("log").join(relative)).unwrap()
    }

    fn exists(&self, relative: &str) -> bool {
        self.root().join("log").join(relative).exists()
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_statistics() {
    let ws = Workspace::new();
    for id in [0, 1] {
        ws.workload(8, id);
        for rep in 0..2 {
            ws.log(8, id, "list", rep, RUN_LOG);
        }
    }

    let pipeline = StatsPipeline::new(&ws.config(&["list"], 2));
    let report = pipeline.run(&ws.catalog()).await.unwrap();

    let class = &report.rollup.classes[0].variants[0];
    let overall = &report.rollup.overall[0];
    for values in [&class.instances[0].representative, &class.summary, &overall.summary] {
        assert_close(values[Metric::Inserts], 2.0);
        assert_close(values[Metric::TimeTotal], 30.0);
        assert_close(values[Metric::PerInsertMin], 10.0);
        assert_close(values[Metric::PerInsertMax], 20.0);
        assert_close(values[Metric::PerInsertMean], 200f64.sqrt());
    }
    assert_close(overall.full[Metric::PerInsertMean].stdev, 0.0);
    assert_eq!(overall.instance_count(), 2);

    assert!(ws.exists("8/set0-list.csv"));
    assert!(ws.exists("8/set1-list.csv"));
    assert!(ws.exists("8.csv"));
    assert!(ws.exists("8-full.csv"));
    assert!(ws.exists("summary-full.csv"));
    assert!(!ws.exists("8/set0-list-full.csv"));

    let summary = ws.read("summary.csv");
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(
        lines[0],
        "size;sets;list_inserts_mean;list_time_total_mean;list_time_perinsert_mean_mean;list_time_perinsert_stdev_mean"
    );
    assert_eq!(lines[1], "8;2;2;30;14.142135624;7.071067812");
    assert_eq!(lines[2], "all;2;2;30;14.142135624;7.071067812");
}

#[tokio::test]
async fn test_missing_repetition_falls_back() {
    let ws = Workspace::new();
    ws.workload(8, 0);
    // repetition 0 never ran; repetition 2 is garbage
    ws.log(8, 0, "list", 1, "INSERTTIMER:30\nINSERTTIMER:40\n");
    ws.log(8, 0, "list", 2, "INSERTTIMER:abc\n");

    let pipeline = StatsPipeline::new(&ws.config(&["list"], 3));
    let rollup = pipeline.aggregate(&ws.catalog()).await.unwrap();

    let runs = &rollup.classes[0].variants[0].instances[0].runs;
    let sources: Vec<usize> = runs.iter().map(|r| r.source).collect();
    assert_eq!(sources, vec![1, 1, 1]);
    assert!(runs.iter().all(|r| r.stats.sum == 70));
}

#[tokio::test]
async fn test_missing_instance_is_fatal_and_writes_nothing() {
    let ws = Workspace::new();
    ws.workload(8, 0);
    ws.workload(8, 1);
    ws.log(8, 0, "list", 0, RUN_LOG);
    ws.log(8, 0, "list", 1, RUN_LOG);
    // instance 1 has no logs at all

    let pipeline = StatsPipeline::new(&ws.config(&["list"], 2));
    let err = pipeline.run(&ws.catalog()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::MissingRuns {
            instance_id: 1,
            size_class: 8,
            ..
        }
    ));
    assert!(!ws.exists("summary.csv"));
    assert!(!ws.exists("8.csv"));
    assert!(!ws.exists("8/set0-list.csv"));
}

#[tokio::test]
async fn test_empty_catalog_is_an_error() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.root().join("tasksets")).unwrap();

    let pipeline = StatsPipeline::new(&ws.config(&["list"], 1));
    let err = pipeline.aggregate(&ws.catalog()).await.unwrap_err();
    assert!(matches!(err, Error::Workload { .. }));
}

#[tokio::test]
async fn test_compressed_logs() {
    let ws = Workspace::new();
    ws.workload(4, 3);
    ws.gz_log(4, 3, "boi", 0, RUN_LOG);

    let config = BenchConfig {
        compress: true,
        ..ws.config(&["boi"], 1)
    };
    let rollup = StatsPipeline::new(&config)
        .aggregate(&ws.catalog())
        .await
        .unwrap();

    let instance = &rollup.classes[0].variants[0].instances[0];
    assert_eq!(instance.instance_id, 3);
    assert_close(instance.representative[Metric::TimeTotal], 30.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_size_classes_are_reported_in_order() {
    let ws = Workspace::new();
    for size in [32, 4, 16, 8] {
        for id in 0..3 {
            ws.workload(size, id);
            for variant in ["list", "boi"] {
                ws.log(size, id, variant, 0, RUN_LOG);
            }
        }
    }

    let config = BenchConfig {
        stats_concurrency: 2,
        ..ws.config(&["list", "boi"], 1)
    };
    let report = StatsPipeline::new(&config).run(&ws.catalog()).await.unwrap();

    let sizes: Vec<u32> = report.rollup.classes.iter().map(|c| c.size_class).collect();
    assert_eq!(sizes, vec![4, 8, 16, 32]);
    for class in &report.rollup.classes {
        let variants: Vec<&str> = class.variants.iter().map(|v| v.variant.as_str()).collect();
        assert_eq!(variants, vec!["list", "boi"]);
    }
    assert_eq!(report.rollup.instance_count(), 12);

    let summary = ws.read("summary.csv");
    let first: Vec<&str> = summary.lines().map(|l| l.split(';').next().unwrap()).collect();
    assert_eq!(first, vec!["size", "4", "8", "16", "32", "all"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_then_stats() {
    use crate::runner::{plan_jobs, CommandTemplate, JobRunner, ShellExecutor};
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    ws.workload(8, 0);
    ws.workload(8, 1);

    let bin = ws.root().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let script = bin.join("list");
    fs::write(
        &script,
        "#!/bin/sh\nprintf 'start\\nINSERTTIMER:10\\nINSERTTIMER:20\\n'\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let config = BenchConfig {
        bin_dir: bin,
        ..ws.config(&["list"], 2)
    };
    let catalog = ws.catalog();
    let pipeline = StatsPipeline::new(&config);
    pipeline.layout().prepare(&catalog).unwrap();

    let jobs = plan_jobs(
        &catalog,
        &config.flat_variants(),
        config.repetitions,
        pipeline.layout(),
        &CommandTemplate::from_config(&config),
    );
    assert_eq!(jobs.len(), 4);

    let summary = JobRunner::new(ShellExecutor::default(), 2)
        .run(jobs)
        .await
        .unwrap();
    assert_eq!(summary.failed, 0);

    let report = pipeline.run(&catalog).await.unwrap();
    assert_close(report.rollup.overall[0].summary[Metric::TimeTotal], 30.0);
    assert!(ws.exists("summary.csv"));
}
