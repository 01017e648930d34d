//! Site-Cartographer: a website structure auditor
//!
//! This crate crawls a website from a seed address and builds a graph of the
//! documents it finds (pages, scripts, stylesheets, media) together with the
//! references between them. Pages on the seed host are followed; documents on
//! other hosts are fetched once when an in-scope page links to them.

pub mod config;
pub mod crawler;
pub mod css;
pub mod events;
pub mod graph;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Cartographer operations
#[derive(Debug, Error)]
pub enum CartographerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid seed address {url}: {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::ItemState,
        to: state::ItemState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Site-Cartographer operations
pub type Result<T> = std::result::Result<T, CartographerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator};
pub use events::CrawlEvent;
pub use graph::{CrawlResult, Document, DocumentId, DocumentRef};
pub use state::ItemState;
pub use url::{must_process, resolve, same_host, strip_fragment};
