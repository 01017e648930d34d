//! CSS module for Site-Cartographer
//!
//! A small, tolerant stylesheet parser. It produces a rule tree that can be
//! walked node by node and serialized back to CSS text, which is all the link
//! extractor needs: declarations carry the values where `url(...)` appears and
//! serialized nodes serve as reference excerpts.

mod parser;
mod stylesheet;

pub use parser::parse_stylesheet;
pub use stylesheet::{AtRule, CssNode, Declaration, StyleRule, Stylesheet};
