pub mod selector;
pub mod serialize;

mod document;
mod dom_builder;
mod entities;
mod text;
mod tokenizer;
mod types;

use memchr::{memchr, memchr2};

/// Whether a `Content-Type` header value names an HTML document.
pub fn is_html(ct: Option<&str>) -> bool {
    let Some(value) = ct else {
        return false;
    };
    contains_ignore_ascii_case(value, b"text/html")
        || contains_ignore_ascii_case(value, b"application/xhtml")
}

fn contains_ignore_ascii_case(haystack: &str, needle: &[u8]) -> bool {
    let hay = haystack.as_bytes();
    let n = needle.len();
    if n == 0 {
        return true;
    }
    if hay.len() < n {
        return false;
    }
    let first = needle[0];
    let (a, b) = (first.to_ascii_lowercase(), first.to_ascii_uppercase());
    let mut i = 0;
    while i + n <= hay.len() {
        let rel = if a == b {
            memchr(a, &hay[i..])
        } else {
            memchr2(a, b, &hay[i..])
        };
        let Some(rel) = rel else {
            return false;
        };
        let pos = i + rel;
        if pos + n <= hay.len() && hay[pos..pos + n].eq_ignore_ascii_case(needle) {
            return true;
        }
        i = pos + 1;
    }
    false
}

pub use crate::document::{Ancestors, Descendants, Document};
pub use crate::selector::{Selector, SelectorError, css_escape};
pub use crate::serialize::{inner_html, outer_html, serialize_document};
pub use crate::text::clean_text;
pub use crate::tokenizer::tokenize;
pub use crate::types::{Attribute, DocumentShell, NodeId, NodeKind, ParseOptions, Token};

/// Parse a full document, synthesizing `html`/`head`/`body` where the markup omits them.
pub fn parse_document(input: &str) -> Document {
    parse_document_with(input, &ParseOptions::default())
}

pub fn parse_document_with(input: &str, options: &ParseOptions) -> Document {
    let tokens = tokenize(input);
    log::trace!(target: "html", "parsing {} tokens", tokens.len());
    dom_builder::build_document(tokens, options)
}

/// Parse `markup` as a fragment and append the resulting nodes to `parent`.
///
/// Returns the newly appended top-level nodes. Used to install rich inline replacements.
pub fn parse_fragment_into(doc: &mut Document, parent: NodeId, markup: &str) -> Vec<NodeId> {
    let before = doc.children(parent).len();
    dom_builder::TreeBuilder::new(doc, parent).feed(tokenize(markup));
    doc.children(parent)[before..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_html_content_types() {
        assert!(is_html(Some("text/html; charset=utf-8")));
        assert!(is_html(Some("Application/XHTML+xml")));
        assert!(!is_html(Some("text/plain")));
        assert!(!is_html(None));
    }

    #[test]
    fn fragment_nodes_are_appended_in_order() {
        let mut doc = parse_document("<p id=t>old</p>");
        let p = Selector::parse("#t")
            .expect("selector")
            .query_first(&doc, NodeId::ROOT)
            .expect("p");
        doc.remove_children(p);
        let added = parse_fragment_into(&mut doc, p, "Contact <b>Us</b>!");
        assert_eq!(added.len(), 3);
        assert_eq!(inner_html(&doc, p), "Contact <b>Us</b>!");
        assert_eq!(clean_text(&doc.text_content(p)), "Contact Us!");
    }
}
