//! URL handling module for Site-Cartographer
//!
//! This module provides URL resolution, fragment stripping, host comparison
//! and the filter that decides whether a discovered link is worth queueing.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, same_host};
pub use normalize::{must_process, parse_absolute, resolve, strip_fragment};

/// Schemes that never lead to a fetchable document
pub const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:"];
