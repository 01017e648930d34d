//! Link extraction from stylesheets
//!
//! Every declaration value is split on `,` and each segment is checked for a
//! `url(...)` token. `@import` preludes are followed as well. URLs resolve
//! against the owning document's URL.

use crate::crawler::frontier::LinkCollector;
use crate::css::{parse_stylesheet, CssNode, Stylesheet};
use url::Url;

/// Parses CSS text and collects every URL it references
pub fn extract_css(css: &str, document_url: &Url, links: &mut LinkCollector) {
    let sheet = parse_stylesheet(css);
    extract_stylesheet(&sheet, document_url, links);
}

/// Collects the URLs referenced by an already parsed stylesheet
pub fn extract_stylesheet(sheet: &Stylesheet, document_url: &Url, links: &mut LinkCollector) {
    for rule in &sheet.rules {
        visit(rule, document_url, links);
    }
}

fn visit(node: &CssNode, document_url: &Url, links: &mut LinkCollector) {
    match node {
        CssNode::Declaration(decl) => {
            for segment in decl.value.split(',') {
                if let Some(target) = parse_css_url_token(segment) {
                    links.enqueue(document_url, &target, Some(decl.to_css()));
                }
            }
        }
        CssNode::AtRule(at) if at.name == "import" => {
            if let Some(target) = import_target(&at.prelude) {
                links.enqueue(document_url, &target, Some(node.to_css()));
            }
        }
        _ => {}
    }

    for child in node.children() {
        visit(child, document_url, links);
    }
}

/// Target of `@import url(x)` or `@import "x"`
fn import_target(prelude: &str) -> Option<String> {
    let prelude = prelude.trim();
    if prelude.starts_with("url") {
        return parse_css_url_token(prelude);
    }

    let mut chars = prelude.chars();
    let quote = chars.next().filter(|c| *c == '"' || *c == '\'')?;
    let target: String = chars.take_while(|c| *c != quote).collect();
    Some(target)
}

/// Extracts the target of a `url(...)` token
///
/// Returns `None` when the segment does not start with `url`, when a second
/// unquoted `(` appears, when a `)` appears before any `(`, or when the input
/// ends before the closing `)`. Unquoted spaces are dropped; a quote opening
/// discards anything collected so far.
///
/// # Examples
///
/// ```
/// use site_cartographer::crawler::parse_css_url_token;
///
/// assert_eq!(parse_css_url_token("url('a b.png')").as_deref(), Some("a b.png"));
/// assert_eq!(parse_css_url_token("nourl(x)"), None);
/// ```
pub fn parse_css_url_token(segment: &str) -> Option<String> {
    let rest = segment.trim().strip_prefix("url")?;

    let mut result = String::with_capacity(rest.len());
    let mut in_parentheses = false;
    let mut quote: Option<char> = None;

    for c in rest.chars() {
        if c == ' ' && quote.is_none() {
            continue;
        }

        match c {
            '(' if quote.is_some() => result.push(c),
            '(' => {
                if in_parentheses {
                    return None;
                }
                in_parentheses = true;
            }
            ')' if quote.is_some() => result.push(c),
            ')' => {
                if !in_parentheses {
                    return None;
                }
                return Some(result);
            }
            '"' | '\'' => match quote {
                Some(open) if open == c => quote = None,
                Some(_) => result.push(c),
                None => {
                    quote = Some(c);
                    result.clear();
                }
            },
            _ => {
                if in_parentheses {
                    result.push(c);
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(css: &str) -> Vec<(String, Option<String>)> {
        let base = Url::parse("http://a.com/css/site.css").unwrap();
        let mut links = LinkCollector::new();
        extract_css(css, &base, &mut links);
        links
            .into_links()
            .into_iter()
            .map(|l| (l.url, l.excerpt))
            .collect()
    }

    #[test]
    fn test_url_token_forms() {
        assert_eq!(parse_css_url_token("url(foo.png)").as_deref(), Some("foo.png"));
        assert_eq!(parse_css_url_token("url('a b.png')").as_deref(), Some("a b.png"));
        assert_eq!(parse_css_url_token("url(\"x\")").as_deref(), Some("x"));
        assert_eq!(parse_css_url_token("  url( spaced.png )").as_deref(), Some("spaced.png"));
    }

    #[test]
    fn test_url_token_rejections() {
        assert_eq!(parse_css_url_token("nourl(x)"), None);
        assert_eq!(parse_css_url_token("url((x))"), None);
        assert_eq!(parse_css_url_token("url(x"), None);
        assert_eq!(parse_css_url_token("url)x("), None);
        assert_eq!(parse_css_url_token("red"), None);
    }

    #[test]
    fn test_url_token_parens_inside_quotes() {
        assert_eq!(
            parse_css_url_token("url('a(1).png')").as_deref(),
            Some("a(1).png")
        );
    }

    #[test]
    fn test_url_token_other_quote_inside_quotes() {
        assert_eq!(
            parse_css_url_token("url(\"it's.png\")").as_deref(),
            Some("it's.png")
        );
    }

    #[test]
    fn test_declaration_urls_resolve_against_document() {
        let links = collect(".x{background:url(img.png)}");
        assert_eq!(
            links,
            vec![(
                "http://a.com/css/img.png".to_string(),
                Some("background: url(img.png)".to_string())
            )]
        );
    }

    #[test]
    fn test_comma_separated_values() {
        let links = collect("@font-face { src: url(a.woff2) format('woff2'), url(/f/b.woff) }");
        let urls: Vec<_> = links.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(urls, vec!["http://a.com/css/a.woff2", "http://a.com/f/b.woff"]);
    }

    #[test]
    fn test_nested_media_rules() {
        let links = collect("@media print { .a { background: url(p.png) } }");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, "http://a.com/css/p.png");
    }

    #[test]
    fn test_import_forms() {
        let links = collect("@import url(\"base.css\") screen;\n@import 'theme.css';");
        let urls: Vec<_> = links.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(urls, vec!["http://a.com/css/base.css", "http://a.com/css/theme.css"]);
        assert_eq!(links[1].1.as_deref(), Some("@import 'theme.css';"));
    }

    #[test]
    fn test_ignored_schemes_and_data_uris() {
        // the comma split cuts the data URI in half, leaving no complete token
        let links = collect(".a { background: url(javascript:void) } .b { background: url(data:image/png;base64,AA) }");
        assert!(links.is_empty());
    }

    #[test]
    fn test_values_without_urls() {
        assert!(collect("a { color: red; margin: 0 auto }").is_empty());
        assert!(collect("").is_empty());
    }
}
