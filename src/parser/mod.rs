//! Run log parsing and repetition fallback
//!
//! A run log is plain (or gzip-compressed) text. Lines containing
//! `<prefix>:` carry one integer timer sample after the colon; everything
//! else is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::{Error, Result};
use crate::metrics::RunStats;

/// Modulus at which the emulator's timer wraps
pub const TIMER_WRAP: i64 = 1_000_000_000;

/// On-disk encoding of a run log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogEncoding {
    /// Plain text
    #[default]
    Plain,
    /// gzip stream
    Gzip,
}

impl LogEncoding {
    /// File name suffix for logs in this encoding
    pub fn extension(self) -> &'static str {
        match self {
            LogEncoding::Plain => "log",
            LogEncoding::Gzip => "log.gz",
        }
    }
}

/// Undo the timer underflow: negative readings wrapped once
pub fn correct_wraparound(raw: i64) -> i64 {
    if raw < 0 {
        raw + TIMER_WRAP
    } else {
        raw
    }
}

/// Extract the corrected timer samples from a log stream
pub fn extract_samples<R: BufRead>(reader: R, prefix: &str) -> std::io::Result<Vec<i64>> {
    let marker = format!("{prefix}:");
    let mut samples = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.contains(&marker) {
            continue;
        }
        let field = line.split(':').nth(1).unwrap_or_default().trim();
        let raw: i64 = field.parse().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line {}: sample {field:?} is not an integer", lineno + 1),
            )
        })?;
        samples.push(correct_wraparound(raw));
    }

    Ok(samples)
}

/// Parse one run log into its statistics
pub fn parse_run(path: &Path, encoding: LogEncoding, prefix: &str) -> Result<RunStats> {
    let file = File::open(path).map_err(|e| Error::run_log(path, e.to_string()))?;
    let reader: Box<dyn Read> = match encoding {
        LogEncoding::Plain => Box::new(file),
        LogEncoding::Gzip => Box::new(GzDecoder::new(file)),
    };

    let samples = extract_samples(BufReader::new(reader), prefix)
        .map_err(|e| Error::run_log(path, e.to_string()))?;
    if samples.is_empty() {
        return Err(Error::run_log(path, "no timer samples"));
    }

    RunStats::from_samples(&samples).map_err(|e| Error::run_log(path, e.to_string()))
}

/// Statistics for one repetition slot
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Repetition slot this record fills
    pub repetition: usize,
    /// Repetition whose log actually produced the data
    pub source: usize,
    /// Derived statistics
    pub stats: RunStats,
}

impl RunRecord {
    /// Whether the data was borrowed from another repetition
    pub fn is_fallback(&self) -> bool {
        self.repetition != self.source
    }
}

/// Identifies the instance whose repetitions are being collected
#[derive(Debug, Clone, Copy)]
pub struct RunKey<'a> {
    /// Variant name
    pub variant: &'a str,
    /// Size class
    pub size_class: u32,
    /// Instance id
    pub instance_id: i64,
}

/// Collect exactly `repetitions` records, recovering from unusable logs
///
/// For each slot `k` the log of repetition `k` is parsed. When it is
/// unusable, the most recent record already collected is reused. With no
/// earlier record, the logs of `k+1`, `k+2`, ... are tried for slot `k`.
/// Only when the last repetition fails without any earlier success is the
/// instance abandoned with [`Error::MissingRuns`].
pub fn collect_repetitions<P, F>(
    key: RunKey<'_>,
    repetitions: usize,
    log_path: P,
    mut parse: F,
) -> Result<Vec<RunRecord>>
where
    P: Fn(usize) -> PathBuf,
    F: FnMut(&Path) -> Result<RunStats>,
{
    let mut records: Vec<RunRecord> = Vec::with_capacity(repetitions);

    for repetition in 0..repetitions {
        let mut current = repetition;
        loop {
            let path = log_path(current);
            match parse(&path) {
                Ok(stats) => {
                    records.push(RunRecord {
                        repetition,
                        source: current,
                        stats,
                    });
                    break;
                }
                Err(err) if err.is_transient() => {
                    if let Some(previous) = records.last().cloned() {
                        tracing::warn!(
                            error = %err,
                            fallback = previous.source,
                            "Unusable run log, reusing earlier repetition"
                        );
                        records.push(RunRecord {
                            repetition,
                            ..previous
                        });
                        break;
                    }
                    if current + 1 < repetitions {
                        tracing::warn!(
                            error = %err,
                            fallback = current + 1,
                            "Unusable run log, trying next repetition"
                        );
                        current += 1;
                        continue;
                    }
                    tracing::error!(error = %err, "Unusable run log and no alternative repetition");
                    return Err(Error::MissingRuns {
                        variant: key.variant.to_string(),
                        size_class: key.size_class,
                        instance_id: key.instance_id,
                        path,
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(records)
}
