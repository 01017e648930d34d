//! Crawl lifecycle notifications
//!
//! The engine reports progress through three event kinds. Consumers (a live
//! viewer, a logger) receive them on an unbounded `tokio::sync::mpsc` channel;
//! sending never blocks the crawl and a dropped receiver is ignored.

use crate::graph::{Document, DocumentRef};
use serde::Serialize;
use tokio::sync::mpsc;

/// A notification emitted while a crawl runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CrawlEvent {
    /// A new document was fetched; emitted exactly once per document
    DocumentParsed { document: Document },

    /// An existing document changed after it was parsed
    ///
    /// `reference` is the new incoming edge, or `None` when the change is a
    /// redirect-loop flag.
    DocumentUpdated {
        document: Document,
        reference: Option<DocumentRef>,
    },

    /// The run cannot continue
    CrawlError { message: String },
}

impl CrawlEvent {
    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DocumentParsed { .. } => "document_parsed",
            Self::DocumentUpdated { .. } => "document_updated",
            Self::CrawlError { .. } => "crawl_error",
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<CrawlEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<CrawlEvent>;

/// Creates a connected event sender/receiver pair
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Optional event sink held by the coordinator
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    sender: Option<EventSender>,
}

impl EventSink {
    pub(crate) fn new(sender: Option<EventSender>) -> Self {
        Self { sender }
    }

    pub(crate) fn emit(&self, event: CrawlEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                tracing::trace!("Event receiver dropped; discarding event");
            }
        }
    }

    pub(crate) fn parsed(&self, document: &Document) {
        self.emit(CrawlEvent::DocumentParsed {
            document: document.clone(),
        });
    }

    pub(crate) fn updated(&self, document: &Document, reference: Option<DocumentRef>) {
        self.emit(CrawlEvent::DocumentUpdated {
            document: document.clone(),
            reference,
        });
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.emit(CrawlEvent::CrawlError {
            message: message.into(),
        });
    }
}
