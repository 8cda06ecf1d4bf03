//! Token stream -> arena DOM.
//!
//! This is a practical subset of the HTML tree construction rules: enough to rebuild the
//! structure authors actually write in static pages and fragments, with the implied end
//! tags that change element nesting (and therefore `nth-of-type` paths).
use crate::document::Document;
use crate::types::{DocumentShell, NodeId, ParseOptions, Token};

/// Start tags that implicitly close an open `<p>`.
fn closes_paragraph(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

fn is_heading(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() == 2 && b[0] == b'h' && (b'1'..=b'6').contains(&b[1])
}

/// Metadata elements that belong in `<head>` when the shell is synthesized.
fn is_head_content(name: &str) -> bool {
    matches!(
        name,
        "base" | "link" | "meta" | "noscript" | "script" | "style" | "template" | "title"
    )
}

pub(crate) struct TreeBuilder<'d> {
    doc: &'d mut Document,
    base: NodeId,
    open: Vec<NodeId>,
}

impl<'d> TreeBuilder<'d> {
    /// Builds under `base` (the document node, or an element for fragment parsing).
    pub(crate) fn new(doc: &'d mut Document, base: NodeId) -> Self {
        Self {
            doc,
            base,
            open: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.base)
    }

    fn current_is(&self, tag: &str) -> bool {
        self.open
            .last()
            .is_some_and(|&id| self.doc.has_tag(id, tag))
    }

    /// Index in `open` of the nearest element named `tag`, stopping at any `barrier` tag.
    fn find_open(&self, tag: &str, barriers: &[&str]) -> Option<usize> {
        for (i, &id) in self.open.iter().enumerate().rev() {
            let Some(name) = self.doc.element_name(id) else {
                continue;
            };
            if name == tag {
                return Some(i);
            }
            if barriers.contains(&name) {
                return None;
            }
        }
        None
    }

    fn close_to(&mut self, index: usize) {
        self.open.truncate(index);
    }

    fn close_named(&mut self, tag: &str, barriers: &[&str]) {
        if let Some(i) = self.find_open(tag, barriers) {
            self.close_to(i);
        }
    }

    fn apply_implied_end_tags(&mut self, name: &str) {
        if closes_paragraph(name) {
            self.close_named("p", &["button", "table", "td", "th", "li", "dd", "dt"]);
        }
        if is_heading(name) && self.open.last().is_some_and(|&id| {
            self.doc.element_name(id).is_some_and(is_heading)
        }) {
            self.open.pop();
        }
        match name {
            "li" => self.close_named("li", &["ul", "ol", "menu", "table"]),
            "dt" | "dd" => {
                self.close_named("dt", &["dl", "table"]);
                self.close_named("dd", &["dl", "table"]);
            }
            "option" => {
                if self.current_is("option") {
                    self.open.pop();
                }
            }
            "tr" => self.close_named("tr", &["table", "tbody", "thead", "tfoot"]),
            "td" | "th" => {
                self.close_named("td", &["tr", "table"]);
                self.close_named("th", &["tr", "table"]);
            }
            _ => {}
        }
    }

    pub(crate) fn feed(&mut self, tokens: Vec<Token>) {
        for token in tokens {
            match token {
                Token::Doctype(value) => {
                    if self.base == NodeId::ROOT && self.doc.doctype().is_none() {
                        self.doc.set_doctype(value);
                    }
                }
                Token::Comment(text) => {
                    let parent = self.current();
                    let node = self.doc.create_comment(text);
                    self.doc.append_child(parent, node);
                }
                Token::Text(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    let parent = self.current();
                    let node = self.doc.create_text(text);
                    self.doc.append_child(parent, node);
                }
                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    if matches!(name.as_str(), "html" | "head" | "body")
                        && self.find_open(&name, &[]).is_some()
                    {
                        // Repeated scaffold tags are ignored.
                        continue;
                    }
                    self.apply_implied_end_tags(&name);
                    let parent = self.current();
                    let node = self.doc.create_element(&name, attributes);
                    self.doc.append_child(parent, node);
                    if !self_closing {
                        self.open.push(node);
                    }
                }
                Token::EndTag(name) => {
                    // Unmatched end tags are ignored rather than unwinding everything.
                    if let Some(i) = self.find_open(&name, &[]) {
                        self.close_to(i);
                    }
                }
            }
        }
    }
}

pub(crate) fn build_document(tokens: Vec<Token>, options: &ParseOptions) -> Document {
    let mut doc = Document::new();
    TreeBuilder::new(&mut doc, NodeId::ROOT).feed(tokens);
    if options.shell == DocumentShell::Synthesize {
        synthesize_shell(&mut doc);
    }
    doc
}

fn is_whitespace_text(doc: &Document, id: NodeId) -> bool {
    doc.text(id)
        .is_some_and(|t| t.bytes().all(|b| b.is_ascii_whitespace()))
}

/// Guarantee `document > html > (head, body)`, moving stray content into place.
///
/// Running it on a document that already has the scaffold is a no-op, which keeps
/// parse -> serialize -> parse stable.
fn synthesize_shell(doc: &mut Document) {
    let top: Vec<NodeId> = doc.children(NodeId::ROOT).to_vec();
    for &id in &top {
        if is_whitespace_text(doc, id) {
            doc.detach(id);
        }
    }

    let html = match doc.first_child_element(NodeId::ROOT, "html") {
        Some(html) => html,
        None => {
            let html = doc.create_element("html", Vec::new());
            let top: Vec<NodeId> = doc.children(NodeId::ROOT).to_vec();
            // Comments move in too; anything left outside the document element would be
            // lost on serialization.
            for id in top {
                doc.append_child(html, id);
            }
            doc.append_child(NodeId::ROOT, html);
            log::trace!(target: "html.builder", "synthesized <html>");
            html
        }
    };

    let head = match doc.first_child_element(html, "head") {
        Some(head) => head,
        None => {
            let head = doc.create_element("head", Vec::new());
            if doc.first_child_element(html, "body").is_none() {
                // Leading metadata moves into the new head.
                let children: Vec<NodeId> = doc.children(html).to_vec();
                for id in children {
                    let movable = doc
                        .element_name(id)
                        .is_some_and(is_head_content);
                    if movable {
                        doc.append_child(head, id);
                    } else if !is_whitespace_text(doc, id) {
                        break;
                    }
                }
            }
            doc.insert_child(html, 0, head);
            head
        }
    };

    if doc.first_child_element(html, "body").is_none() {
        let body = doc.create_element("body", Vec::new());
        let children: Vec<NodeId> = doc.children(html).to_vec();
        for id in children {
            if id != head {
                doc.append_child(body, id);
            }
        }
        doc.append_child(html, body);
    }
}
