use crate::url::IGNORED_SCHEMES;
use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute URL string
///
/// # Errors
///
/// Returns `UrlError::Parse` when the string is not an absolute URL.
pub fn parse_absolute(url_str: &str) -> UrlResult<Url> {
    Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))
}

/// Resolves a possibly relative reference against a base URL
///
/// Absolute references are returned as-is (after parsing), relative ones are
/// joined onto `base` following the usual RFC 3986 rules.
///
/// # Examples
///
/// ```
/// use site_cartographer::url::resolve;
/// use url::Url;
///
/// let base = Url::parse("http://a.com/dir/page.html").unwrap();
/// assert_eq!(resolve(&base, "../img.png").unwrap().as_str(), "http://a.com/img.png");
/// assert_eq!(resolve(&base, "/new").unwrap().as_str(), "http://a.com/new");
/// ```
pub fn resolve(base: &Url, relative: &str) -> UrlResult<Url> {
    base.join(relative.trim())
        .map_err(|e| UrlError::Parse(format!("{} (relative to {}): {}", relative, base, e)))
}

/// Removes the fragment component of a URL
///
/// Stripping is idempotent: a URL without a fragment is returned unchanged
/// (apart from the canonical serialization of the parser).
///
/// # Examples
///
/// ```
/// use site_cartographer::url::strip_fragment;
///
/// assert_eq!(strip_fragment("http://a/b#frag").unwrap(), "http://a/b");
/// ```
pub fn strip_fragment(url_str: &str) -> UrlResult<String> {
    let mut url = parse_absolute(url_str)?;
    url.set_fragment(None);
    Ok(url.into())
}

/// Decides whether a raw link value should be queued at all
///
/// Empty values and the `javascript:`, `mailto:` and `tel:` schemes are
/// rejected (case-insensitive prefix match). Everything else is accepted,
/// including values that will later fail to resolve.
pub fn must_process(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    !IGNORED_SCHEMES.iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}
