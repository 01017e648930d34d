//! Best-effort stylesheet parser
//!
//! Builds a `Stylesheet` from arbitrary text without ever failing: unbalanced
//! braces close at end of input, stray `}` at the top level are dropped, and
//! anything that is neither a rule nor a declaration is skipped. Strings,
//! parentheses and comments are respected when looking for `;`, `{` and `}`,
//! so `url(data:image/png;base64,...)` stays one value.

use crate::css::stylesheet::{AtRule, CssNode, Declaration, StyleRule, Stylesheet};

/// Parses CSS text into a rule tree
///
/// # Examples
///
/// ```
/// use site_cartographer::css::{parse_stylesheet, CssNode};
///
/// let sheet = parse_stylesheet(".x{background:url(img.png)}");
/// assert_eq!(sheet.rules.len(), 1);
/// assert!(matches!(sheet.rules[0], CssNode::Rule(_)));
/// ```
pub fn parse_stylesheet(input: &str) -> Stylesheet {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    Stylesheet {
        rules: parser.parse_items(true),
    }
}

/// What stopped a component scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Semicolon,
    OpenBrace,
    CloseBrace,
    Eof,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Parses rules/declarations until the enclosing block closes
    fn parse_items(&mut self, top_level: bool) -> Vec<CssNode> {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => break,
                Some('}') => {
                    self.pos += 1;
                    if top_level {
                        continue;
                    }
                    break;
                }
                Some(';') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            let (raw, terminator) = self.read_component();
            let text = raw.trim();

            if terminator == Terminator::OpenBrace {
                let children = self.parse_items(false);
                nodes.push(block_node(text, children));
                continue;
            }

            if let Some(at) = text.strip_prefix('@') {
                let (name, prelude) = split_at_keyword(at);
                nodes.push(CssNode::AtRule(AtRule {
                    name,
                    prelude,
                    block: None,
                }));
            } else if !top_level {
                if let Some(decl) = parse_declaration(text) {
                    nodes.push(CssNode::Declaration(decl));
                }
            }

            if terminator == Terminator::Eof {
                break;
            }
        }

        nodes
    }

    /// Reads text up to the next top-level `;`, `{` or `}`
    ///
    /// `;` and `{` are consumed, `}` is left for the caller.
    fn read_component(&mut self) -> (String, Terminator) {
        let mut text = String::new();
        let mut paren_depth = 0usize;

        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' => self.read_string(c, &mut text),
                '\\' => {
                    text.push(c);
                    self.pos += 1;
                    if let Some(next) = self.peek() {
                        text.push(next);
                        self.pos += 1;
                    }
                }
                '/' if self.peek_at(1) == Some('*') => self.skip_comment(),
                '(' => {
                    paren_depth += 1;
                    text.push(c);
                    self.pos += 1;
                }
                ')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    text.push(c);
                    self.pos += 1;
                }
                ';' if paren_depth == 0 => {
                    self.pos += 1;
                    return (text, Terminator::Semicolon);
                }
                '{' if paren_depth == 0 => {
                    self.pos += 1;
                    return (text, Terminator::OpenBrace);
                }
                '}' if paren_depth == 0 => return (text, Terminator::CloseBrace),
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        (text, Terminator::Eof)
    }

    /// Copies a quoted string (quotes included) into `text`
    fn read_string(&mut self, quote: char, text: &mut String) {
        text.push(quote);
        self.pos += 1;

        while let Some(c) = self.peek() {
            text.push(c);
            self.pos += 1;
            if c == '\\' {
                if let Some(next) = self.peek() {
                    text.push(next);
                    self.pos += 1;
                }
            } else if c == quote {
                return;
            }
        }
    }

    fn skip_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.chars.len() {
            if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('/') if self.peek_at(1) == Some('*') => self.skip_comment(),
                _ => return,
            }
        }
    }
}

fn block_node(prelude: &str, children: Vec<CssNode>) -> CssNode {
    match prelude.strip_prefix('@') {
        Some(at) => {
            let (name, prelude) = split_at_keyword(at);
            CssNode::AtRule(AtRule {
                name,
                prelude,
                block: Some(children),
            })
        }
        None => CssNode::Rule(StyleRule {
            selector: prelude.to_string(),
            children,
        }),
    }
}

/// Splits `import url(x)` into (`import`, `url(x)`)
fn split_at_keyword(at: &str) -> (String, String) {
    let end = at
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(at.len());
    let (name, prelude) = at.split_at(end);
    (name.to_ascii_lowercase(), prelude.trim().to_string())
}

fn parse_declaration(text: &str) -> Option<Declaration> {
    let (name, value) = text.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut value = value.trim();
    let mut important = false;
    if let Some(split) = value.len().checked_sub("!important".len()) {
        if let (Some(head), Some(tail)) = (value.get(..split), value.get(split..)) {
            if tail.eq_ignore_ascii_case("!important") {
                important = true;
                value = head.trim_end();
            }
        }
    }

    Some(Declaration {
        name: name.to_string(),
        value: value.to_string(),
        important,
    })
}
