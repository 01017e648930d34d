use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase host of a URL string
///
/// # Examples
///
/// ```
/// use site_cartographer::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.com:8080/path").unwrap(), "example.com");
/// ```
pub fn extract_host(url_str: &str) -> UrlResult<String> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    url.host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| UrlError::MissingHost(url_str.to_string()))
}

/// Compares the host component of two URLs
///
/// Scheme, port and path are ignored and the comparison is case-insensitive.
/// URLs that cannot be parsed or carry no host never match.
pub fn same_host(a: &str, b: &str) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
