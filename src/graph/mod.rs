//! Document graph built by a crawl
//!
//! This module holds the data the crawl produces:
//! - `Document`: one fetched resource, unique by URL
//! - `DocumentRef`: a directed, excerpt-carrying edge between two documents
//! - `CrawlResult`: the insertion-ordered aggregate owning every document

mod document;
mod result;

pub use document::{
    AnalyserResult, Document, DocumentId, DocumentRef, FetchedPage, HtmlError, StatusClass,
};
pub use result::{Claim, CrawlResult};
