//! Statistics derived from a finished crawl
//!
//! This module provides functionality for summarising a `CrawlResult` and
//! printing the summary to the console.

use crate::graph::{CrawlResult, StatusClass};
use crate::url::extract_host;
use std::collections::{BTreeMap, BTreeSet};

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Seed address of the run
    pub address: String,

    /// Total number of documents in the graph
    pub total_documents: usize,

    /// Count of documents by status class
    pub documents_by_status: BTreeMap<StatusClass, usize>,

    /// Number of distinct hosts among document URLs
    pub unique_hosts: usize,

    /// Total number of references (edges)
    pub total_references: usize,

    /// Documents whose fetch failed, with the first line of their error
    pub failed: Vec<(String, String)>,

    /// Documents answered with a 4xx/5xx status
    pub broken: Vec<(String, u16)>,

    /// Documents that are part of a redirect cycle
    pub redirect_loops: Vec<String>,
}

impl CrawlStatistics {
    /// Computes statistics for a crawl result
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut stats = Self {
            address: result.address().to_string(),
            total_documents: result.len(),
            total_references: result.reference_count(),
            ..Default::default()
        };

        let mut hosts = BTreeSet::new();

        for doc in result.documents() {
            *stats
                .documents_by_status
                .entry(doc.status_class())
                .or_insert(0) += 1;

            if let Ok(host) = extract_host(&doc.url) {
                hosts.insert(host);
            }

            if let Some(error) = &doc.error_message {
                let first_line = error.lines().next().unwrap_or_default().to_string();
                stats.failed.push((doc.url.clone(), first_line));
            }

            if let (Some(code), StatusClass::ClientError | StatusClass::ServerError) =
                (doc.status_code, doc.status_class())
            {
                stats.broken.push((doc.url.clone(), code));
            }

            if doc.is_redirection_loop {
                stats.redirect_loops.push(doc.url.clone());
            }
        }

        stats.unique_hosts = hosts.len();
        stats
    }

    /// Number of documents in one status class
    pub fn count(&self, class: StatusClass) -> usize {
        self.documents_by_status.get(&class).copied().unwrap_or(0)
    }

    /// Share of documents answered with a 2xx status, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_documents == 0 {
            return 0.0;
        }
        (self.count(StatusClass::Success) as f64 / self.total_documents as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seed address: {}", stats.address);
    println!("  Total documents: {}", stats.total_documents);
    println!("  Unique hosts: {}", stats.unique_hosts);
    println!("  Total references: {}", stats.total_references);
    println!();

    println!("Documents by Status:");
    let mut status_counts: Vec<_> = stats.documents_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (class, count) in status_counts {
        let percentage = if stats.total_documents > 0 {
            (*count as f64 / stats.total_documents as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", class, count, percentage);
    }
    println!();

    if !stats.broken.is_empty() {
        println!("Broken Documents ({}):", stats.broken.len());
        for (url, code) in &stats.broken {
            println!("  - [{}] {}", code, url);
        }
        println!();
    }

    if !stats.failed.is_empty() {
        println!("Failed Fetches ({}):", stats.failed.len());
        for (url, error) in &stats.failed {
            println!("  - {}: {}", url, error);
        }
        println!();
    }

    if !stats.redirect_loops.is_empty() {
        println!("Redirect Loops ({}):", stats.redirect_loops.len());
        for url in &stats.redirect_loops {
            println!("  - {}", url);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} documents returned 2xx)",
        stats.success_rate(),
        stats.count(StatusClass::Success),
        stats.total_documents
    );
}
