//! Output module for summarising crawl results
//!
//! This module handles:
//! - Deriving statistics from a finished `CrawlResult`
//! - Printing the statistics to the console

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};
