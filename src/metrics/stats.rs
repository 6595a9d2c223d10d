//! Statistics primitives shared by every rollup level

use thiserror::Error;

/// Numeric failures while summarizing a population
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum StatsError {
    /// Population has no values
    #[error("empty population")]
    Empty,

    /// Geometric mean over a value that is zero or negative
    #[error("geometric mean requires positive values, found {0}")]
    NonPositive(f64),

    /// Sample standard deviation needs at least two values
    #[error("standard deviation requires at least two values, found {0}")]
    TooFewValues(usize),

    /// Sum of the samples does not fit the counter
    #[error("sample sum overflows")]
    SumOverflow,
}

/// Geometric mean; every value must be strictly positive
pub fn geomean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::Empty);
    }
    if let Some(&bad) = values.iter().find(|v| !(**v > 0.0)) {
        return Err(StatsError::NonPositive(bad));
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    Ok((log_sum / values.len() as f64).exp())
}

/// Arithmetic mean
fn mean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::Empty);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (N-1 denominator)
pub fn stdev(values: &[f64]) -> Result<f64, StatsError> {
    if values.len() < 2 {
        return Err(StatsError::TooFewValues(values.len()));
    }
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// The five statistics reported for every metric at every level
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    /// Geometric mean
    pub mean: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Sample standard deviation (0 for a single value)
    pub stdev: f64,
    /// Standard error, `stdev / sqrt(n)`
    pub err: f64,
}

impl Summary {
    /// Summarize a population
    pub fn of(values: &[f64]) -> Result<Self, StatsError> {
        let mean = geomean(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A single repetition has no spread.
        let stdev = if values.len() == 1 { 0.0 } else { stdev(values)? };
        let err = stdev / (values.len() as f64).sqrt();

        Ok(Self {
            mean,
            min,
            max,
            stdev,
            err,
        })
    }

    /// Value of one statistic
    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Mean => self.mean,
            Stat::Min => self.min,
            Stat::Max => self.max,
            Stat::Stdev => self.stdev,
            Stat::Err => self.err,
        }
    }
}

/// Statistic selector, in report column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    /// Geometric mean
    Mean,
    /// Minimum
    Min,
    /// Maximum
    Max,
    /// Standard deviation
    Stdev,
    /// Standard error
    Err,
}

impl Stat {
    /// All statistics in column order
    pub const ALL: [Stat; 5] = [Stat::Mean, Stat::Min, Stat::Max, Stat::Stdev, Stat::Err];

    /// Column suffix
    pub fn name(self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Min => "min",
            Stat::Max => "max",
            Stat::Stdev => "stdev",
            Stat::Err => "err",
        }
    }
}
