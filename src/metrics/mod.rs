//! Metric schema and per-run statistics
//!
//! Every level of the rollup tracks the same seven quantities. They are
//! addressed through the [`Metric`] enum rather than string keys so a table
//! of per-metric values is a fixed-size [`PerMetric`] array.

mod stats;

pub use stats::{geomean, stdev, Stat, StatsError, Summary};

use std::ops::{Index, IndexMut};

/// One tracked quantity of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Number of timer samples
    Inserts,
    /// Sum of all samples
    TimeTotal,
    /// Geometric mean of the samples
    PerInsertMean,
    /// Smallest sample
    PerInsertMin,
    /// Largest sample
    PerInsertMax,
    /// Sample standard deviation
    PerInsertStdev,
    /// Standard error of the samples
    PerInsertErr,
}

impl Metric {
    /// Number of metrics
    pub const COUNT: usize = 7;

    /// All metrics in column order
    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Inserts,
        Metric::TimeTotal,
        Metric::PerInsertMean,
        Metric::PerInsertMin,
        Metric::PerInsertMax,
        Metric::PerInsertStdev,
        Metric::PerInsertErr,
    ];

    /// Headline metrics carried by the summary tables
    pub const HEADLINE: [Metric; 4] = [
        Metric::Inserts,
        Metric::TimeTotal,
        Metric::PerInsertMean,
        Metric::PerInsertStdev,
    ];

    /// Column name
    pub fn name(self) -> &'static str {
        match self {
            Metric::Inserts => "inserts",
            Metric::TimeTotal => "time_total",
            Metric::PerInsertMean => "time_perinsert_mean",
            Metric::PerInsertMin => "time_perinsert_min",
            Metric::PerInsertMax => "time_perinsert_max",
            Metric::PerInsertStdev => "time_perinsert_stdev",
            Metric::PerInsertErr => "time_perinsert_err",
        }
    }

    /// Fractional digits used when the metric is written to a report
    pub fn precision(self) -> usize {
        match self {
            Metric::Inserts | Metric::TimeTotal => 0,
            Metric::PerInsertMean
            | Metric::PerInsertMin
            | Metric::PerInsertMax
            | Metric::PerInsertStdev
            | Metric::PerInsertErr => 9,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One value per metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerMetric<T>([T; Metric::COUNT]);

impl<T> PerMetric<T> {
    /// Build by evaluating `f` for every metric
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self(Metric::ALL.map(&mut f))
    }

    /// Build by evaluating a fallible `f` for every metric
    pub fn try_from_fn<E>(mut f: impl FnMut(Metric) -> Result<T, E>) -> Result<Self, E>
    where
        T: Copy + Default,
    {
        let mut values = [T::default(); Metric::COUNT];
        for metric in Metric::ALL {
            values[metric.index()] = f(metric)?;
        }
        Ok(Self(values))
    }

    /// Iterate `(metric, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &T)> {
        Metric::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Metric> for PerMetric<T> {
    type Output = T;

    fn index(&self, metric: Metric) -> &T {
        &self.0[metric.index()]
    }
}

impl<T> IndexMut<Metric> for PerMetric<T> {
    fn index_mut(&mut self, metric: Metric) -> &mut T {
        &mut self.0[metric.index()]
    }
}

/// Statistics derived from the timer samples of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    /// Number of samples
    pub count: u64,
    /// Sum of samples
    pub sum: u64,
    /// Geometric mean of samples
    pub geomean: f64,
    /// Smallest sample
    pub min: u64,
    /// Largest sample
    pub max: u64,
    /// Sample standard deviation
    pub stdev: f64,
    /// Standard error, `stdev / sqrt(count)`
    pub stderr: f64,
}

impl RunStats {
    /// Derive statistics from a non-empty sample whose values are all positive
    pub fn from_samples(samples: &[i64]) -> Result<Self, StatsError> {
        if samples.is_empty() {
            return Err(StatsError::Empty);
        }
        if let Some(&bad) = samples.iter().find(|s| **s <= 0) {
            return Err(StatsError::NonPositive(bad as f64));
        }

        let values: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        let geomean = geomean(&values)?;
        let stdev = stdev(&values)?;
        let count = samples.len() as u64;

        // Samples are checked positive above.
        let sum = samples
            .iter()
            .try_fold(0u64, |acc, &s| acc.checked_add(s as u64))
            .ok_or(StatsError::SumOverflow)?;
        let min = samples.iter().copied().min().unwrap_or_default() as u64;
        let max = samples.iter().copied().max().unwrap_or_default() as u64;

        Ok(Self {
            count,
            sum,
            geomean,
            min,
            max,
            stdev,
            stderr: stdev / (count as f64).sqrt(),
        })
    }

    /// Value of one metric
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Inserts => self.count as f64,
            Metric::TimeTotal => self.sum as f64,
            Metric::PerInsertMean => self.geomean,
            Metric::PerInsertMin => self.min as f64,
            Metric::PerInsertMax => self.max as f64,
            Metric::PerInsertStdev => self.stdev,
            Metric::PerInsertErr => self.stderr,
        }
    }
}
