//! Documents and the references between them

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Position of a document in its `CrawlResult` (insertion order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(pub usize);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A directed edge: `source` referenced `target` through `excerpt`
///
/// Two references with the same endpoints are distinct edges; a page with two
/// anchors to the same URL produces two of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    #[serde(rename = "sourceDocumentId")]
    pub source: DocumentId,
    #[serde(rename = "sourceDocumentUrl")]
    pub source_url: String,
    #[serde(rename = "targetDocumentId")]
    pub target: DocumentId,
    #[serde(rename = "targetDocumentUrl")]
    pub target_url: String,
    pub excerpt: Option<String>,
}

/// Markup problem reported by an external HTML validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub excerpt: String,
    /// 1-based offset of the offending character inside `excerpt`
    pub excerpt_position: usize,
}

/// Finding attached by an external content analyser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyserResult {
    pub analyser: String,
    pub message: String,
}

/// Broad classification of a document's HTTP outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    /// No status: the request never completed
    Failed,
    /// Informational or otherwise unexpected status codes
    Other,
}

impl StatusClass {
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => Self::Failed,
            Some(200..=299) => Self::Success,
            Some(300..=399) => Self::Redirect,
            Some(400..=499) => Self::ClientError,
            Some(500..=599) => Self::ServerError,
            Some(_) => Self::Other,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "2xx success",
            Self::Redirect => "3xx redirect",
            Self::ClientError => "4xx client error",
            Self::ServerError => "5xx server error",
            Self::Failed => "failed",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Everything a single fetch learned about a URL
///
/// Produced by the fetcher and folded into the graph's `Document` once the
/// request finishes.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub status_code: Option<u16>,
    pub reason_phrase: Option<String>,
    pub request_headers: BTreeMap<String, String>,
    pub response_headers: BTreeMap<String, String>,
    pub redirect_url: Option<String>,
    pub title: Option<String>,
    pub crawled_on: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub full_error_message: Option<String>,
}

/// A crawled resource, unique by URL within a `CrawlResult`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub url: String,
    pub status_code: Option<u16>,
    pub reason_phrase: Option<String>,
    pub request_headers: BTreeMap<String, String>,
    pub response_headers: BTreeMap<String, String>,
    pub redirect_url: Option<String>,
    pub is_redirection_loop: bool,
    pub title: Option<String>,
    pub crawled_on: DateTime<Utc>,
    pub error_message: Option<String>,
    pub full_error_message: Option<String>,
    pub language: Option<String>,
    pub references: Vec<DocumentRef>,
    pub referenced_by: Vec<DocumentRef>,
    pub html_errors: Vec<HtmlError>,
    pub analyser_results: Vec<AnalyserResult>,
}

impl Document {
    /// Creates an empty document for `url`; fetch results are applied later
    pub fn new(id: DocumentId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            status_code: None,
            reason_phrase: None,
            request_headers: BTreeMap::new(),
            response_headers: BTreeMap::new(),
            redirect_url: None,
            is_redirection_loop: false,
            title: None,
            crawled_on: Utc::now(),
            error_message: None,
            full_error_message: None,
            language: None,
            references: Vec::new(),
            referenced_by: Vec::new(),
            html_errors: Vec::new(),
            analyser_results: Vec::new(),
        }
    }

    /// Copies the outcome of a fetch onto this document
    ///
    /// Edges and annotation slots are left untouched.
    pub fn apply(&mut self, page: FetchedPage) {
        self.status_code = page.status_code;
        self.reason_phrase = page.reason_phrase;
        self.request_headers = page.request_headers;
        self.response_headers = page.response_headers;
        self.redirect_url = page.redirect_url;
        self.title = page.title;
        if let Some(crawled_on) = page.crawled_on {
            self.crawled_on = crawled_on;
        }
        self.error_message = page.error_message;
        self.full_error_message = page.full_error_message;
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_status(self.status_code)
    }

    /// True when the fetch itself failed (network, TLS, cancellation)
    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }
}
