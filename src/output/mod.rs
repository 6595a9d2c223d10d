//! Report output
//!
//! Aggregates are turned into [`Table`]s and written as `.csv`
//! (semicolon-delimited) and/or `.dat` (space-delimited) files.

mod report;
mod table;

pub use report::{
    instance_full_table, instance_summary_table, overall_full_table, overall_summary_table,
    size_full_table, size_summary_table, ReportWriter,
};
pub use table::{format_value, Table, TableFormat};
