//! Link extraction from HTML documents
//!
//! Walks every element of the parsed tree and pulls URLs from the attributes
//! that load or link a resource:
//! - `href` on `<a>`, `<area>` and `<link>`
//! - `src` on `<script>` (JavaScript types only), `<img>`, `<source>`,
//!   `<track>`, `<audio>`, `<iframe>` and `<video>`
//! - `poster` on `<video>`, `data` (or `src`) on `<object>`
//! - the text of `<style>` elements and every inline `style` attribute
//!
//! Attribute URLs resolve against the document base (`<base href>` when
//! present); CSS URLs resolve against the document URL.

use crate::crawler::css::extract_css;
use crate::crawler::frontier::LinkCollector;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// `<script type>` values that denote JavaScript
pub const JAVASCRIPT_MIME_TYPES: &[&str] = &[
    "application/ecmascript",
    "application/javascript",
    "application/x-ecmascript",
    "application/x-javascript",
    "text/ecmascript",
    "text/javascript",
    "text/javascript1.0",
    "text/javascript1.1",
    "text/javascript1.2",
    "text/javascript1.3",
    "text/javascript1.4",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-ecmascript",
    "text/x-javascript",
];

/// Metadata extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedHtml {
    /// Whitespace-collapsed content of `<title>`
    pub title: Option<String>,
}

/// Element names the extractor acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Hyperlink,
    Script,
    Media,
    Video,
    Object,
    Style,
    Other,
}

impl ElementKind {
    fn from_name(name: &str) -> Self {
        match name {
            "a" | "area" | "link" => Self::Hyperlink,
            "script" => Self::Script,
            "img" | "source" | "track" | "audio" | "iframe" => Self::Media,
            "video" => Self::Video,
            "object" => Self::Object,
            "style" => Self::Style,
            _ => Self::Other,
        }
    }
}

/// Parses an HTML document and collects every URL it references
///
/// # Example
///
/// ```
/// use site_cartographer::crawler::{extract_html, LinkCollector};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let url = Url::parse("https://example.com/").unwrap();
/// let mut links = LinkCollector::new();
/// let parsed = extract_html(html, &url, &mut links);
/// assert_eq!(parsed.title.as_deref(), Some("Test"));
/// assert_eq!(links.links()[0].url, "https://example.com/page");
/// ```
pub fn extract_html(html: &str, document_url: &Url, links: &mut LinkCollector) -> ParsedHtml {
    let document = Html::parse_document(html);
    if !document.errors.is_empty() {
        tracing::trace!(
            "{} HTML parse errors in {}",
            document.errors.len(),
            document_url
        );
    }

    let base = base_url(&document, document_url);

    for element in document.tree.root().descendants().filter_map(ElementRef::wrap) {
        extract_element(element, &base, document_url, links);
    }

    ParsedHtml {
        title: extract_title(&document),
    }
}

fn extract_element(element: ElementRef, base: &Url, document_url: &Url, links: &mut LinkCollector) {
    let value = element.value();

    match ElementKind::from_name(value.name()) {
        ElementKind::Hyperlink => enqueue_attr(element, "href", base, links),
        ElementKind::Script => {
            if is_javascript_type(value.attr("type")) {
                enqueue_attr(element, "src", base, links);
            }
        }
        ElementKind::Media => enqueue_attr(element, "src", base, links),
        ElementKind::Video => {
            enqueue_attr(element, "src", base, links);
            enqueue_attr(element, "poster", base, links);
        }
        ElementKind::Object => {
            let name = if value.attr("data").is_some() { "data" } else { "src" };
            enqueue_attr(element, name, base, links);
        }
        ElementKind::Style => {
            let css: String = element.text().collect();
            extract_css(&css, document_url, links);
        }
        ElementKind::Other => {}
    }

    if let Some(style) = value.attr("style") {
        if !style.trim().is_empty() {
            // wrap the declarations so the stylesheet parser sees a rule
            extract_css(&format!("dummy{{{}}}", style), document_url, links);
        }
    }
}

fn enqueue_attr(element: ElementRef, name: &str, base: &Url, links: &mut LinkCollector) {
    if let Some(raw) = element.value().attr(name) {
        links.enqueue(base, raw, Some(element.html()));
    }
}

fn is_javascript_type(script_type: Option<&str>) -> bool {
    match script_type.map(str::trim) {
        None | Some("") => true,
        Some(t) => JAVASCRIPT_MIME_TYPES
            .iter()
            .any(|mime| mime.eq_ignore_ascii_case(t)),
    }
}

/// Document base: the first `<base href>` that resolves, else the document URL
fn base_url(document: &Html, document_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return document_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| document_url.join(href.trim()).ok())
        .unwrap_or_else(|| document_url.clone())
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
}
