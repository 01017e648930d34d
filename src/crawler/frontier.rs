//! Frontier of discovered URLs awaiting processing
//!
//! This module handles:
//! - The FIFO queue of `DiscoveredUrl` work items
//! - The shared enqueue rule used by the HTML/CSS extractors and the redirect
//!   handler (`LinkCollector`)

use crate::graph::DocumentId;
use crate::url::{must_process, resolve};
use std::collections::VecDeque;
use url::Url;

/// A link found while fetching one document, before it has a referrer id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute URL without fragment
    pub url: String,

    /// Serialized markup or CSS that produced the link
    pub excerpt: Option<String>,

    /// True for the resolved target of a `Location` header
    pub is_redirect: bool,
}

/// Collects the links extracted from one response
///
/// Applies the enqueue rule: values rejected by `must_process` are dropped,
/// the rest are resolved against a base URL and stripped of their fragment.
#[derive(Debug, Default)]
pub struct LinkCollector {
    links: Vec<DiscoveredLink>,
}

impl LinkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a link found in markup or CSS
    pub fn enqueue(&mut self, base: &Url, raw: &str, excerpt: Option<String>) {
        if let Some(url) = resolve_link(base, raw) {
            tracing::trace!("Discovered {}", url);
            self.links.push(DiscoveredLink {
                url,
                excerpt,
                is_redirect: false,
            });
        }
    }

    /// Queues the target of a redirect response
    ///
    /// Returns the resolved target (fragment included) for the document's
    /// redirect URL, or `None` when the location is unusable.
    pub fn enqueue_redirect(&mut self, request_url: &Url, location: &str) -> Option<String> {
        if !must_process(location.trim()) {
            return None;
        }

        let target = match resolve(request_url, location) {
            Ok(target) => target,
            Err(e) => {
                tracing::debug!("Ignoring redirect from {}: {}", request_url, e);
                return None;
            }
        };

        let mut stripped = target.clone();
        stripped.set_fragment(None);
        self.links.push(DiscoveredLink {
            url: stripped.into(),
            excerpt: None,
            is_redirect: true,
        });

        Some(target.into())
    }

    pub fn links(&self) -> &[DiscoveredLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<DiscoveredLink> {
        self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn resolve_link(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if !must_process(raw) {
        return None;
    }

    match resolve(base, raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            Some(url.into())
        }
        Err(e) => {
            tracing::debug!("Dropping link: {}", e);
            None
        }
    }
}

/// A pending work item on the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUrl {
    /// Absolute URL without fragment
    pub url: String,

    /// Document whose content (or redirect) produced this item
    pub referrer: Option<DocumentId>,

    /// Serialized source fragment of the reference
    pub excerpt: Option<String>,

    /// True if this item is the target of a `Location` header
    pub is_redirect: bool,
}

impl DiscoveredUrl {
    /// The seed item of a run
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
            excerpt: None,
            is_redirect: false,
        }
    }

    /// Turns a link extracted from `referrer` into a work item
    pub fn from_link(link: DiscoveredLink, referrer: DocumentId) -> Self {
        Self {
            url: link.url,
            referrer: Some(referrer),
            excerpt: link.excerpt,
            is_redirect: link.is_redirect,
        }
    }
}

/// FIFO queue of work items
///
/// Items discovered while processing item *k* are appended after everything
/// already queued, so the drain order is insertion order, not strict BFS levels.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<DiscoveredUrl>,
    total_enqueued: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiscoveredUrl) {
        self.total_enqueued += 1;
        self.queue.push_back(item);
    }

    pub fn pop(&mut self) -> Option<DiscoveredUrl> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of items ever pushed
    pub fn total_enqueued(&self) -> usize {
        self.total_enqueued
    }
}
