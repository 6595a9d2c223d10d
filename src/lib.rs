//! emubench - benchmark driver for emulated scheduler variants
//!
//! Two phases share one log tree:
//!
//! - `run` executes every variant executable on every workload instance a
//!   fixed number of times, on a bounded pool of concurrent invocations,
//!   capturing each run's output as a (optionally gzip-compressed) log.
//! - `stats` extracts the timer samples from those logs, recovers from
//!   unusable runs, rolls statistics up from run to instance to size class
//!   to overall, and writes delimited report tables.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod rollup;
pub mod runner;

pub use error::{Error, Result};
