//! Crawler module for document fetching and link discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching without automatic redirects
//! - HTML and CSS link extraction
//! - The FIFO frontier and its enqueue rule
//! - Overall crawl coordination across workers

mod coordinator;
mod css;
mod fetcher;
mod frontier;
mod html;

pub use coordinator::{run_crawl, Coordinator};
pub use css::{extract_css, extract_stylesheet, parse_css_url_token};
pub use fetcher::{build_http_client, describe_error, fetch_url, ContentKind, FetchError, FetchResult};
pub use frontier::{DiscoveredLink, DiscoveredUrl, Frontier, LinkCollector};
pub use html::{extract_html, ParsedHtml, JAVASCRIPT_MIME_TYPES};
