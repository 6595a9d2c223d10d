//! Hierarchical aggregation: run → instance → size class → overall
//!
//! All functions here are pure. Every aggregate is built once from its
//! inputs and never mutated afterwards.

use crate::error::{Error, Result};
use crate::metrics::{geomean, Metric, PerMetric, StatsError, Summary};
use crate::parser::RunRecord;

/// Aggregation mode of a size-class or overall value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMode {
    /// Computed from representative per-group values
    Summary,
    /// Computed from the flattened population of every underlying run
    Full,
}

impl AggregateMode {
    /// Suffix appended to report names of this mode
    pub fn suffix(self) -> &'static str {
        match self {
            AggregateMode::Summary => "",
            AggregateMode::Full => "-full",
        }
    }
}

/// All repetitions of one (variant, size class, instance)
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceAggregate {
    /// Variant name
    pub variant: String,
    /// Size class
    pub size_class: u32,
    /// Instance id
    pub instance_id: i64,
    /// Workload file name
    pub file_name: String,
    /// One record per repetition, in slot order
    pub runs: Vec<RunRecord>,
    /// Per-metric geometric mean across repetitions
    pub representative: PerMetric<f64>,
    /// Per-metric statistics across repetitions
    pub spread: PerMetric<Summary>,
}

impl InstanceAggregate {
    /// Values of one metric, one per repetition
    pub fn series(&self, metric: Metric) -> impl Iterator<Item = f64> + '_ {
        self.runs.iter().map(move |r| r.stats.get(metric))
    }
}

/// Identity of the instance being rolled up
#[derive(Debug, Clone)]
pub struct InstanceKey {
    /// Variant name
    pub variant: String,
    /// Size class
    pub size_class: u32,
    /// Instance id
    pub instance_id: i64,
    /// Workload file name
    pub file_name: String,
}

/// Merge the repetitions of one instance
pub fn rollup_instance(key: InstanceKey, runs: Vec<RunRecord>) -> Result<InstanceAggregate> {
    let context = |metric: Metric| {
        format!(
            "variant {} size {} instance {} metric {}",
            key.variant,
            key.size_class,
            key.instance_id,
            metric.name()
        )
    };

    let series = |metric: Metric| -> Vec<f64> { runs.iter().map(|r| r.stats.get(metric)).collect() };

    let representative = PerMetric::try_from_fn(|metric| {
        geomean(&series(metric)).map_err(|source| Error::Aggregation {
            context: context(metric),
            source,
        })
    })?;
    let spread = PerMetric::try_from_fn(|metric| {
        Summary::of(&series(metric)).map_err(|source| Error::Aggregation {
            context: context(metric),
            source,
        })
    })?;

    Ok(InstanceAggregate {
        variant: key.variant,
        size_class: key.size_class,
        instance_id: key.instance_id,
        file_name: key.file_name,
        runs,
        representative,
        spread,
    })
}

/// All instances of one size class for one variant
#[derive(Debug, Clone, PartialEq)]
pub struct SizeClassAggregate {
    /// Variant name
    pub variant: String,
    /// Size class
    pub size_class: u32,
    /// Instances sorted by ascending id
    pub instances: Vec<InstanceAggregate>,
    /// Per-metric geometric mean of the instance representative values
    pub summary: PerMetric<f64>,
    /// Per-metric statistics over every run of every instance
    pub full: PerMetric<Summary>,
}

impl SizeClassAggregate {
    /// Number of contributing instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Every run value of one metric across all instances
    pub fn population(&self, metric: Metric) -> impl Iterator<Item = f64> + '_ {
        self.instances.iter().flat_map(move |i| i.series(metric))
    }
}

/// Merge the instances of one size class
///
/// All instances must belong to the same variant and size class.
pub fn rollup_size_class(mut instances: Vec<InstanceAggregate>) -> Result<SizeClassAggregate> {
    let first = instances.first().ok_or_else(|| Error::Aggregation {
        context: "size class without instances".into(),
        source: StatsError::Empty,
    })?;
    let variant = first.variant.clone();
    let size_class = first.size_class;
    debug_assert!(instances
        .iter()
        .all(|i| i.variant == variant && i.size_class == size_class));

    instances.sort_by_key(|i| i.instance_id);

    let context = |metric: Metric, mode: &str| {
        format!(
            "variant {variant} size {size_class} {mode} metric {}",
            metric.name()
        )
    };

    let summary = PerMetric::try_from_fn(|metric| {
        let values: Vec<f64> = instances.iter().map(|i| i.representative[metric]).collect();
        geomean(&values).map_err(|source| Error::Aggregation {
            context: context(metric, "summary"),
            source,
        })
    })?;
    let full = PerMetric::try_from_fn(|metric| {
        let values: Vec<f64> = instances.iter().flat_map(|i| i.series(metric)).collect();
        Summary::of(&values).map_err(|source| Error::Aggregation {
            context: context(metric, "full"),
            source,
        })
    })?;

    Ok(SizeClassAggregate {
        variant,
        size_class,
        instances,
        summary,
        full,
    })
}

/// Instance count contributed by one size class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClassCount {
    /// Size class
    pub size_class: u32,
    /// Number of instances
    pub instances: usize,
}

/// All size classes of one variant
#[derive(Debug, Clone, PartialEq)]
pub struct OverallAggregate {
    /// Variant name
    pub variant: String,
    /// Instance counts in ascending size order
    pub counts: Vec<SizeClassCount>,
    /// Per-metric geometric mean of the size-class summary values
    pub summary: PerMetric<f64>,
    /// Per-metric statistics over every run of every size class
    pub full: PerMetric<Summary>,
}

impl OverallAggregate {
    /// Total number of contributing instances
    pub fn instance_count(&self) -> usize {
        self.counts.iter().map(|c| c.instances).sum()
    }
}

/// Merge every size class of one variant
pub fn rollup_overall(classes: &[&SizeClassAggregate]) -> Result<OverallAggregate> {
    let first = classes.first().ok_or_else(|| Error::Aggregation {
        context: "overall rollup without size classes".into(),
        source: StatsError::Empty,
    })?;
    let variant = first.variant.clone();

    let mut sorted: Vec<&SizeClassAggregate> = classes.to_vec();
    sorted.sort_by_key(|c| c.size_class);

    let context = |metric: Metric, mode: &str| {
        format!("variant {variant} overall {mode} metric {}", metric.name())
    };

    let summary = PerMetric::try_from_fn(|metric| {
        let values: Vec<f64> = sorted.iter().map(|c| c.summary[metric]).collect();
        geomean(&values).map_err(|source| Error::Aggregation {
            context: context(metric, "summary"),
            source,
        })
    })?;
    let full = PerMetric::try_from_fn(|metric| {
        let values: Vec<f64> = sorted.iter().flat_map(|c| c.population(metric)).collect();
        Summary::of(&values).map_err(|source| Error::Aggregation {
            context: context(metric, "full"),
            source,
        })
    })?;

    let counts = sorted
        .iter()
        .map(|c| SizeClassCount {
            size_class: c.size_class,
            instances: c.instance_count(),
        })
        .collect();

    Ok(OverallAggregate {
        variant,
        counts,
        summary,
        full,
    })
}

/// Every variant's aggregate for one size class
#[derive(Debug, Clone, PartialEq)]
pub struct SizeClassRollup {
    /// Size class
    pub size_class: u32,
    /// Directory name of the size class
    pub dir_name: String,
    /// One aggregate per variant, in variant order
    pub variants: Vec<SizeClassAggregate>,
}

impl SizeClassRollup {
    /// Number of instances in the size class
    pub fn instance_count(&self) -> usize {
        self.variants
            .first()
            .map(SizeClassAggregate::instance_count)
            .unwrap_or_default()
    }
}

/// Complete result of one statistics pass
#[derive(Debug, Clone, PartialEq)]
pub struct RollupSet {
    /// Variant names in column order
    pub variants: Vec<String>,
    /// Size classes in ascending size order
    pub classes: Vec<SizeClassRollup>,
    /// One overall aggregate per variant, in variant order
    pub overall: Vec<OverallAggregate>,
}

impl RollupSet {
    /// Order size classes and compute the overall level for every variant
    pub fn build(variants: Vec<String>, mut classes: Vec<SizeClassRollup>) -> Result<Self> {
        classes.sort_by_key(|c| c.size_class);

        let overall = variants
            .iter()
            .enumerate()
            .map(|(idx, variant)| {
                let per_class: Vec<&SizeClassAggregate> = classes
                    .iter()
                    .filter_map(|c| c.variants.get(idx))
                    .collect();
                debug_assert!(per_class.iter().all(|c| &c.variant == variant));
                rollup_overall(&per_class)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            variants,
            classes,
            overall,
        })
    }

    /// Total number of instances across size classes
    pub fn instance_count(&self) -> usize {
        self.classes.iter().map(SizeClassRollup::instance_count).sum()
    }
}
