//! `outerHTML`-compatible serialization.
//!
//! Rules:
//! - Attribute values are always double-quoted; valueless attributes serialize as `name=""`.
//! - Void elements have no end tag and no self-closing slash.
//! - Children of `script`, `style`, `xmp`, `iframe`, `noembed`, `noframes`, `plaintext` and
//!   `noscript` are emitted raw; all other text is escaped.
//! - Documents always start with `<!DOCTYPE html>\n`, whatever doctype was parsed.
use crate::document::Document;
use crate::entities::{escape_attr, escape_text};
use crate::tokenizer::is_void_element;
use crate::types::{NodeId, NodeKind};

pub const DOCTYPE: &str = "<!DOCTYPE html>\n";

fn is_raw_text_parent(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext" | "noscript"
    )
}

enum Step {
    Open(NodeId),
    Close(NodeId),
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    // Explicit stack so pathological nesting cannot overflow the call stack.
    let mut stack = vec![Step::Open(id)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Close(id) => {
                if let Some(name) = doc.element_name(id) {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            Step::Open(id) => match doc.kind(id) {
                NodeKind::Document { .. } => {
                    for &child in doc.children(id).iter().rev() {
                        stack.push(Step::Open(child));
                    }
                }
                NodeKind::Element { name, attributes } => {
                    out.push('<');
                    out.push_str(name);
                    for (key, value) in attributes {
                        out.push(' ');
                        out.push_str(key);
                        out.push_str("=\"");
                        escape_attr(value.as_deref().unwrap_or(""), out);
                        out.push('"');
                    }
                    out.push('>');
                    if is_void_element(name) {
                        continue;
                    }
                    stack.push(Step::Close(id));
                    for &child in doc.children(id).iter().rev() {
                        stack.push(Step::Open(child));
                    }
                }
                NodeKind::Text { text } => {
                    let raw = doc
                        .parent(id)
                        .and_then(|p| doc.element_name(p))
                        .is_some_and(is_raw_text_parent);
                    if raw {
                        out.push_str(text);
                    } else {
                        escape_text(text, out);
                    }
                }
                NodeKind::Comment { text } => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
            },
        }
    }
}

/// Markup of `id` including the node itself, like `Element.outerHTML`.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Markup of the children of `id`, like `Element.innerHTML`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

/// `<!DOCTYPE html>\n` followed by the document element's markup.
///
/// Documents without a single `html` root (only possible with
/// [`DocumentShell::Preserve`](crate::DocumentShell::Preserve)) serialize every top-level
/// node in order instead.
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::from(DOCTYPE);
    match doc.first_child_element(NodeId::ROOT, "html") {
        Some(html) => write_node(doc, html, &mut out),
        None => write_node(doc, NodeId::ROOT, &mut out),
    }
    out
}
