//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (no automatic redirects)
//! - Issuing one GET per document and recording the response metadata
//! - Turning 301/302 responses into redirect links
//! - Dispatching HTML and CSS bodies to the link extractors
//! - Rendering transport failures into the document's error fields

use crate::config::CrawlerConfig;
use crate::crawler::css::extract_css;
use crate::crawler::frontier::{DiscoveredLink, LinkCollector};
use crate::crawler::html::extract_html;
use crate::graph::FetchedPage;
use crate::url::parse_absolute;
use crate::UrlError;
use chrono::Utc;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Reasons a fetch produced no usable response
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request URL")]
    InvalidUrl(#[source] UrlError),

    #[error("request failed")]
    Request(#[source] reqwest::Error),

    #[error("failed to read response body")]
    Body(#[source] reqwest::Error),

    #[error("the crawl was cancelled before the response arrived")]
    Cancelled,
}

/// Outcome of fetching one document
#[derive(Debug)]
pub struct FetchResult {
    /// Response metadata (or error fields) for the document
    pub page: FetchedPage,

    /// Links found in the response, in discovery order
    pub links: Vec<DiscoveredLink>,
}

impl FetchResult {
    /// Result recorded for a document whose fetch was interrupted by cancellation
    pub fn cancelled() -> Self {
        let mut page = FetchedPage {
            crawled_on: Some(Utc::now()),
            ..Default::default()
        };
        record_error(&mut page, &FetchError::Cancelled);

        Self {
            page,
            links: Vec::new(),
        }
    }
}

/// How a response body is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    Other,
}

impl ContentKind {
    /// Classifies a `Content-Type` header value
    ///
    /// A missing media type counts as HTML.
    pub fn from_content_type(header: Option<&str>) -> Self {
        let media_type = header
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .unwrap_or("");

        if media_type.is_empty()
            || media_type.eq_ignore_ascii_case("text/html")
            || media_type.eq_ignore_ascii_case("application/xhtml+xml")
        {
            Self::Html
        } else if media_type.eq_ignore_ascii_case("text/css") {
            Self::Css
        } else {
            Self::Other
        }
    }
}

/// Builds the HTTP client shared by all workers
///
/// Redirects are never followed automatically; the crawl engine treats the
/// target of a 301/302 as a separate document.
///
/// # Example
///
/// ```no_run
/// use site_cartographer::config::CrawlerConfig;
/// use site_cartographer::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one document
///
/// Never fails: transport errors are recorded in the page's error fields with
/// the status left unset, and links found before the failure are dropped.
///
/// # Request Flow
///
/// 1. GET the URL with the configured User-Agent
/// 2. Record status, reason phrase and both header sets
/// 3. On 301/302, resolve `Location` and return it as a redirect link
/// 4. Otherwise read the body and extract links from HTML or CSS
pub async fn fetch_url(client: &Client, user_agent: &str, url: &str) -> FetchResult {
    let mut page = FetchedPage {
        crawled_on: Some(Utc::now()),
        ..Default::default()
    };
    let mut links = LinkCollector::new();

    match fetch_into(client, user_agent, url, &mut page, &mut links).await {
        Ok(()) => FetchResult {
            page,
            links: links.into_links(),
        },
        Err(e) => {
            tracing::warn!("Fetch failed for {}: {}", url, e);
            page.status_code = None;
            page.reason_phrase = None;
            record_error(&mut page, &e);
            FetchResult {
                page,
                links: Vec::new(),
            }
        }
    }
}

async fn fetch_into(
    client: &Client,
    user_agent: &str,
    url: &str,
    page: &mut FetchedPage,
    links: &mut LinkCollector,
) -> Result<(), FetchError> {
    let request_url = parse_absolute(url).map_err(FetchError::InvalidUrl)?;

    let request = client
        .get(request_url.clone())
        .header(USER_AGENT, user_agent)
        .build()
        .map_err(FetchError::Request)?;
    page.request_headers = collect_headers(request.headers());

    let response = client.execute(request).await.map_err(FetchError::Request)?;
    let status = response.status();
    page.status_code = Some(status.as_u16());
    page.reason_phrase = status.canonical_reason().map(str::to_string);
    page.response_headers = collect_headers(response.headers());

    if is_followed_redirect(status) {
        if let Some(location) = header_str(response.headers(), LOCATION.as_str()) {
            page.redirect_url = links.enqueue_redirect(&request_url, location);
        }
        return Ok(());
    }

    let kind = ContentKind::from_content_type(header_str(response.headers(), CONTENT_TYPE.as_str()));
    match kind {
        ContentKind::Html => {
            let body = response.text().await.map_err(FetchError::Body)?;
            let parsed = extract_html(&body, &request_url, links);
            page.title = parsed.title;
        }
        ContentKind::Css => {
            let body = response.text().await.map_err(FetchError::Body)?;
            extract_css(&body, &request_url, links);
        }
        ContentKind::Other => {}
    }

    tracing::debug!("{} {} ({} links)", status.as_u16(), url, links.len());
    Ok(())
}

/// Only 301 and 302 produce redirect links
fn is_followed_redirect(status: StatusCode) -> bool {
    status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Flattens a header map, joining repeated headers with ", "
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

fn record_error(page: &mut FetchedPage, error: &FetchError) {
    page.error_message = Some(describe_error(error));
    page.full_error_message = Some(format!("{:?}", error));
}

/// Renders an error and its causes as `Type: message` plus one
/// `\n ---> cause` line per source
///
/// Causes are behind `dyn Error`, so their type is only named when it is one
/// the fetcher knows how to downcast to; other causes show the message alone.
pub fn describe_error<E>(error: &E) -> String
where
    E: std::error::Error + 'static,
{
    let mut message = format!("{}: {}", std::any::type_name::<E>(), error);

    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str("\n ---> ");
        if let Some(type_name) = cause_type_name(cause) {
            message.push_str(type_name);
            message.push_str(": ");
        }
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}

fn cause_type_name(cause: &(dyn std::error::Error + 'static)) -> Option<&'static str> {
    if cause.is::<reqwest::Error>() {
        Some(std::any::type_name::<reqwest::Error>())
    } else if cause.is::<UrlError>() {
        Some(std::any::type_name::<UrlError>())
    } else if cause.is::<url::ParseError>() {
        Some(std::any::type_name::<url::ParseError>())
    } else if cause.is::<std::io::Error>() {
        Some(std::any::type_name::<std::io::Error>())
    } else {
        None
    }
}
