//! The crawl result aggregate: every document keyed by URL

use crate::graph::document::{Document, DocumentId, DocumentRef, FetchedPage};
use crate::url::strip_fragment;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of reserving a URL in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The URL was absent; an empty document now holds its slot
    New(DocumentId),
    /// A document for the URL already exists (fetched or in flight)
    Existing(DocumentId),
}

/// All documents found by one crawl run, in first-claim order
///
/// No two documents share a URL, and every `DocumentRef` stored on a document
/// points at documents of this same result.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    address: String,
    documents: IndexMap<String, Document>,
    #[serde(skip)]
    in_flight: HashSet<DocumentId>,
}

impl CrawlResult {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            documents: IndexMap::new(),
            in_flight: HashSet::new(),
        }
    }

    /// The seed address of the run
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.documents.get(url)
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get_index(id.0).map(|(_, doc)| doc)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.documents.contains_key(url)
    }

    /// Total number of edges in the graph
    pub fn reference_count(&self) -> usize {
        self.documents.values().map(|d| d.referenced_by.len()).sum()
    }

    /// True while the document's fetch has not completed
    pub fn is_in_flight(&self, id: DocumentId) -> bool {
        self.in_flight.contains(&id)
    }

    /// Reserves the slot for `url` unless a document already holds it
    ///
    /// This is the single insert-if-absent step that keeps concurrent workers
    /// from fetching the same URL twice.
    pub fn claim(&mut self, url: &str) -> Claim {
        if let Some(index) = self.documents.get_index_of(url) {
            return Claim::Existing(DocumentId(index));
        }

        let id = DocumentId(self.documents.len());
        self.documents
            .insert(url.to_string(), Document::new(id, url));
        self.in_flight.insert(id);
        Claim::New(id)
    }

    /// Applies a finished fetch to a claimed document
    ///
    /// Returns the completed document, or `None` for an unknown id.
    pub fn complete(&mut self, id: DocumentId, page: FetchedPage) -> Option<&Document> {
        let (_, doc) = self.documents.get_index_mut(id.0)?;
        doc.apply(page);
        self.in_flight.remove(&id);
        Some(&*doc)
    }

    /// Records an edge on both endpoints
    ///
    /// The reference is appended to the target's `referenced_by` and to the
    /// source's `references`. Returns `None` when either id is unknown.
    pub fn add_reference(
        &mut self,
        source: DocumentId,
        target: DocumentId,
        excerpt: Option<String>,
    ) -> Option<DocumentRef> {
        let source_url = self.document(source)?.url.clone();
        let target_url = self.document(target)?.url.clone();

        let reference = DocumentRef {
            source,
            source_url,
            target,
            target_url,
            excerpt,
        };

        if let Some((_, doc)) = self.documents.get_index_mut(target.0) {
            doc.referenced_by.push(reference.clone());
        }
        if let Some((_, doc)) = self.documents.get_index_mut(source.0) {
            doc.references.push(reference.clone());
        }

        Some(reference)
    }

    /// Flags a document as part of a redirect cycle
    ///
    /// Returns true if the flag was newly set.
    pub fn mark_redirection_loop(&mut self, id: DocumentId) -> bool {
        match self.documents.get_index_mut(id.0) {
            Some((_, doc)) if !doc.is_redirection_loop => {
                doc.is_redirection_loop = true;
                true
            }
            _ => false,
        }
    }

    /// Documents on the redirect cycle closed by a redirect from `from` to `to`
    ///
    /// Follows `redirect_url` from `to` through completed documents. Returns
    /// the ids walked (starting with `to`) when the walk arrives back at
    /// `from`, or `None` when it stops elsewhere.
    pub fn redirect_cycle(&self, from: DocumentId, to: DocumentId) -> Option<Vec<DocumentId>> {
        let mut path = vec![to];
        let mut current = to;

        while current != from {
            if self.is_in_flight(current) {
                return None;
            }
            let next_url = strip_fragment(self.document(current)?.redirect_url.as_deref()?).ok()?;
            let next = self.get(&next_url)?.id;
            if path.contains(&next) && next != from {
                return None;
            }
            path.push(next);
            current = next;
        }

        Some(path)
    }

    /// Ids of documents whose fetch never completed
    pub fn in_flight(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.in_flight.iter().copied()
    }
}
