//! Output module for reporting on crawled data
//!
//! Currently this is the `--stats` report: record counts per stored shape,
//! credits per role and complete movies per region.

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};
