//! Stylesheet rule tree and its serialization

/// A parsed stylesheet: the top-level rules in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    pub rules: Vec<CssNode>,
}

/// One node of the rule tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssNode {
    /// `selector { ... }`
    Rule(StyleRule),
    /// `@name prelude;` or `@name prelude { ... }`
    AtRule(AtRule),
    /// `name: value`
    Declaration(Declaration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub children: Vec<CssNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// Lowercase keyword without the `@`
    pub name: String,
    pub prelude: String,
    /// `None` for statement at-rules such as `@import`
    pub block: Option<Vec<CssNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl CssNode {
    /// Direct children of this node
    pub fn children(&self) -> &[CssNode] {
        match self {
            Self::Rule(rule) => rule.children.as_slice(),
            Self::AtRule(AtRule {
                block: Some(children),
                ..
            }) => children.as_slice(),
            Self::AtRule(_) | Self::Declaration(_) => &[],
        }
    }

    /// Serializes the node (and its subtree) back to CSS text
    pub fn to_css(&self) -> String {
        match self {
            Self::Declaration(decl) => decl.to_css(),
            Self::Rule(rule) => format!("{} {}", rule.selector, block_to_css(&rule.children)),
            Self::AtRule(at) => {
                let head = if at.prelude.is_empty() {
                    format!("@{}", at.name)
                } else {
                    format!("@{} {}", at.name, at.prelude)
                };
                match &at.block {
                    Some(children) => format!("{} {}", head, block_to_css(children)),
                    None => format!("{};", head),
                }
            }
        }
    }
}

impl Declaration {
    pub fn to_css(&self) -> String {
        if self.important {
            format!("{}: {} !important", self.name, self.value)
        } else {
            format!("{}: {}", self.name, self.value)
        }
    }
}

fn block_to_css(children: &[CssNode]) -> String {
    if children.is_empty() {
        return "{ }".to_string();
    }
    let body = children
        .iter()
        .map(CssNode::to_css)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{{ {} }}", body)
}
