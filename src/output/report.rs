//! Report tables for every rollup level

use std::path::PathBuf;

use crate::config::ReportFlags;
use crate::error::Result;
use crate::layout::LogLayout;
use crate::metrics::{Metric, PerMetric, Stat, Summary};
use crate::rollup::{AggregateMode, InstanceAggregate, RollupSet, SizeClassRollup};

use super::table::{format_value, Table, TableFormat};

/// Precision of one cell: spread statistics always keep fractional digits
fn cell(metric: Metric, stat: Stat, value: f64) -> String {
    let precision = match stat {
        Stat::Stdev | Stat::Err => 9,
        Stat::Mean | Stat::Min | Stat::Max => metric.precision(),
    };
    format_value(value, precision)
}

fn mean_columns(variants: &[String]) -> Vec<String> {
    variants
        .iter()
        .flat_map(|v| {
            Metric::HEADLINE
                .into_iter()
                .map(move |m| format!("{v}_{}_mean", m.name()))
        })
        .collect()
}

fn full_columns(variants: &[String]) -> Vec<String> {
    let mut columns = Vec::new();
    for variant in variants {
        for metric in Metric::ALL {
            for stat in Stat::ALL {
                columns.push(format!("{variant}_{}_{}", metric.name(), stat.name()));
            }
        }
    }
    columns
}

fn mean_cells(values: &PerMetric<f64>) -> impl Iterator<Item = String> + '_ {
    Metric::HEADLINE
        .into_iter()
        .map(move |m| format_value(values[m], m.precision()))
}

fn full_cells(values: &PerMetric<Summary>) -> impl Iterator<Item = String> + '_ {
    Metric::ALL.into_iter().flat_map(move |m| {
        Stat::ALL
            .into_iter()
            .map(move |s| cell(m, s, values[m].get(s)))
    })
}

/// One row per repetition followed by the representative `mean` row
pub fn instance_summary_table(instance: &InstanceAggregate) -> Table {
    let mut columns = vec!["size".to_string(), "id".into(), "run".into()];
    columns.extend(Metric::ALL.iter().map(|m| m.name().to_string()));
    let mut table = Table::new(columns);

    let size = instance.size_class.to_string();
    let id = instance.instance_id.to_string();

    for run in &instance.runs {
        let mut row = vec![size.clone(), id.clone(), run.repetition.to_string()];
        row.extend(
            Metric::ALL
                .iter()
                .map(|&m| format_value(run.stats.get(m), m.precision())),
        );
        table.push_row(row);
    }

    let mut row = vec![size, id, "mean".into()];
    row.extend(
        Metric::ALL
            .iter()
            .map(|&m| format_value(instance.representative[m], m.precision())),
    );
    table.push_row(row);

    table
}

/// One row per metric with all five statistics across repetitions
pub fn instance_full_table(instance: &InstanceAggregate) -> Table {
    let mut columns = vec!["size".to_string(), "id".into(), "metric".into()];
    columns.extend(Stat::ALL.iter().map(|s| s.name().to_string()));
    let mut table = Table::new(columns);

    for metric in Metric::ALL {
        let mut row = vec![
            instance.size_class.to_string(),
            instance.instance_id.to_string(),
            metric.name().to_string(),
        ];
        let summary = instance.spread[metric];
        row.extend(Stat::ALL.iter().map(|&s| cell(metric, s, summary.get(s))));
        table.push_row(row);
    }

    table
}

/// Instance ids of a size class, in row order
fn instance_ids(class: &SizeClassRollup) -> Vec<i64> {
    class
        .variants
        .first()
        .map(|v| v.instances.iter().map(|i| i.instance_id).collect())
        .unwrap_or_default()
}

/// Instance representatives of every variant plus the size-class summary row
pub fn size_summary_table(variants: &[String], class: &SizeClassRollup) -> Table {
    let mut columns = vec!["size".to_string(), "id".into()];
    columns.extend(mean_columns(variants));
    let mut table = Table::new(columns);
    let size = class.size_class.to_string();

    for (idx, id) in instance_ids(class).into_iter().enumerate() {
        let mut row = vec![size.clone(), id.to_string()];
        for aggregate in &class.variants {
            match aggregate.instances.get(idx) {
                Some(instance) => row.extend(mean_cells(&instance.representative)),
                None => row.extend(Metric::HEADLINE.iter().map(|_| String::new())),
            }
        }
        table.push_row(row);
    }

    let mut row = vec![size, "mean".into()];
    for aggregate in &class.variants {
        row.extend(mean_cells(&aggregate.summary));
    }
    table.push_row(row);

    table
}

/// Instance spreads of every variant plus the flattened size-class row
pub fn size_full_table(variants: &[String], class: &SizeClassRollup) -> Table {
    let mut columns = vec!["size".to_string(), "id".into()];
    columns.extend(full_columns(variants));
    let mut table = Table::new(columns);
    let size = class.size_class.to_string();
    let per_variant = Metric::COUNT * Stat::ALL.len();

    for (idx, id) in instance_ids(class).into_iter().enumerate() {
        let mut row = vec![size.clone(), id.to_string()];
        for aggregate in &class.variants {
            match aggregate.instances.get(idx) {
                Some(instance) => row.extend(full_cells(&instance.spread)),
                None => row.extend(std::iter::repeat(String::new()).take(per_variant)),
            }
        }
        table.push_row(row);
    }

    let mut row = vec![size, "mean".into()];
    for aggregate in &class.variants {
        row.extend(full_cells(&aggregate.full));
    }
    table.push_row(row);

    table
}

/// Size-class summaries of every variant plus the overall `all` row
pub fn overall_summary_table(set: &RollupSet) -> Table {
    let mut columns = vec!["size".to_string(), "sets".into()];
    columns.extend(mean_columns(&set.variants));
    let mut table = Table::new(columns);

    for class in &set.classes {
        let mut row = vec![class.size_class.to_string(), class.instance_count().to_string()];
        for aggregate in &class.variants {
            row.extend(mean_cells(&aggregate.summary));
        }
        table.push_row(row);
    }

    let mut row = vec!["all".to_string(), set.instance_count().to_string()];
    for overall in &set.overall {
        row.extend(mean_cells(&overall.summary));
    }
    table.push_row(row);

    table
}

/// Size-class populations of every variant plus the overall `all` row
pub fn overall_full_table(set: &RollupSet) -> Table {
    let mut columns = vec!["size".to_string(), "sets".into()];
    columns.extend(full_columns(&set.variants));
    let mut table = Table::new(columns);

    for class in &set.classes {
        let mut row = vec![class.size_class.to_string(), class.instance_count().to_string()];
        for aggregate in &class.variants {
            row.extend(full_cells(&aggregate.full));
        }
        table.push_row(row);
    }

    let mut row = vec!["all".to_string(), set.instance_count().to_string()];
    for overall in &set.overall {
        row.extend(full_cells(&overall.full));
    }
    table.push_row(row);

    table
}

/// Writes the report artifacts selected by [`ReportFlags`]
#[derive(Debug, Clone)]
pub struct ReportWriter {
    layout: LogLayout,
    flags: ReportFlags,
}

impl ReportWriter {
    /// Create a writer for the given log tree
    pub fn new(layout: LogLayout, flags: ReportFlags) -> Self {
        Self { layout, flags }
    }

    fn formats(&self) -> Vec<TableFormat> {
        let mut formats = Vec::with_capacity(2);
        if self.flags.csv {
            formats.push(TableFormat::Csv);
        }
        if self.flags.dat {
            formats.push(TableFormat::Dat);
        }
        formats
    }

    /// Build every enabled table and write it in every enabled encoding
    ///
    /// Returns the paths written, in write order.
    pub fn write_all(&self, set: &RollupSet) -> Result<Vec<PathBuf>> {
        let mut tables: Vec<(PathBuf, Table)> = Vec::new();
        let flags = self.flags;

        for class in &set.classes {
            for aggregate in &class.variants {
                for instance in &aggregate.instances {
                    let file_name = &instance.file_name;
                    if flags.instance_summary {
                        let stem = self.layout.instance_report(
                            &class.dir_name,
                            file_name,
                            &instance.variant,
                            AggregateMode::Summary,
                        );
                        tables.push((stem, instance_summary_table(instance)));
                    }
                    if flags.instance_full {
                        let stem = self.layout.instance_report(
                            &class.dir_name,
                            file_name,
                            &instance.variant,
                            AggregateMode::Full,
                        );
                        tables.push((stem, instance_full_table(instance)));
                    }
                }
            }

            if flags.size_summary {
                tables.push((
                    self.layout.size_report(&class.dir_name, AggregateMode::Summary),
                    size_summary_table(&set.variants, class),
                ));
            }
            if flags.size_full {
                tables.push((
                    self.layout.size_report(&class.dir_name, AggregateMode::Full),
                    size_full_table(&set.variants, class),
                ));
            }
        }

        if flags.overall_summary {
            tables.push((self.layout.overall_report(AggregateMode::Summary), overall_summary_table(set)));
        }
        if flags.overall_full {
            tables.push((self.layout.overall_report(AggregateMode::Full), overall_full_table(set)));
        }

        let formats = self.formats();
        let mut written = Vec::with_capacity(tables.len() * formats.len());
        for (stem, table) in &tables {
            for &format in &formats {
                let path = table.write(stem, format)?;
                tracing::debug!(path = %path.display(), rows = table.rows().len(), "Report written");
                written.push(path);
            }
        }

        tracing::info!(files = written.len(), root = %self.layout.root().display(), "Reports written");
        Ok(written)
    }
}
