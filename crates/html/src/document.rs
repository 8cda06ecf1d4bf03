//! Mutable arena DOM shared by the live page and re-parsed source files.
//!
//! Invariants:
//! - Slot 0 is the document node and never has a parent.
//! - A node has at most one parent; `children` of that parent lists it exactly once.
//! - Detached nodes stay in the arena but are unreachable from the root.
//! - Element names are stored ASCII-lowercase.

use crate::types::{Attribute, NodeId, NodeKind};

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document { doctype: None },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn doctype(&self) -> Option<&str> {
        match &self.nodes[0].kind {
            NodeKind::Document { doctype } => doctype.as_deref(),
            _ => None,
        }
    }

    pub fn set_doctype(&mut self, value: String) {
        if let NodeKind::Document { doctype } = &mut self.nodes[0].kind {
            *doctype = Some(value);
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id).is_element()
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.element_name(id)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: Option<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            match attributes
                .iter_mut()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
            {
                Some(slot) => slot.1 = value,
                None => attributes.push((name.to_ascii_lowercase(), value)),
            }
        }
    }

    /// Whitespace-separated tokens of the `class` attribute, in source order.
    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Overwrite a text node's data. Returns `false` for non-text nodes.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Text { text } => {
                *text = value.into();
                true
            }
            _ => false,
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, name: &str, attributes: Vec<Attribute>) -> NodeId {
        self.push(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text { text: text.into() })
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment { text: text.into() })
    }

    /// Remove `id` from its parent's child list. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert_ne!(parent, child, "node cannot be its own parent");
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    pub fn remove_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent.index()].children);
        for child in children {
            self.nodes[child.index()].parent = None;
        }
    }

    /// Proper ancestors of `id`, nearest first, ending at the document node.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Descendants of `id` in document order (preorder), excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self.children(id).iter().rev().copied().collect();
        Descendants { doc: self, stack }
    }

    /// All element nodes reachable from the root, in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(NodeId::ROOT)
            .filter(|&id| self.is_element(id))
    }

    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements().filter(move |&id| self.has_tag(id, tag))
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    pub fn first_child_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.element_children(parent)
            .find(|&c| self.has_tag(c, tag))
    }

    /// The `html` element, or the first top-level element when there is none.
    pub fn document_element(&self) -> Option<NodeId> {
        self.first_child_element(NodeId::ROOT, "html")
            .or_else(|| self.element_children(NodeId::ROOT).next())
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.first_child_element(NodeId::ROOT, "html")?;
        self.first_child_element(html, "body")
    }

    /// 1-based position of `id` among element siblings with the same tag.
    pub fn index_of_type(&self, id: NodeId) -> usize {
        let (Some(parent), Some(name)) = (self.parent(id), self.element_name(id)) else {
            return 1;
        };
        let mut n = 0;
        for sibling in self.element_children(parent) {
            if self.has_tag(sibling, name) {
                n += 1;
            }
            if sibling == id {
                break;
            }
        }
        n.max(1)
    }

    pub fn nth_child_of_type(&self, parent: NodeId, tag: &str, nth: usize) -> Option<NodeId> {
        if nth == 0 {
            return None;
        }
        self.element_children(parent)
            .filter(|&c| self.has_tag(c, tag))
            .nth(nth - 1)
    }

    /// Concatenated data of all descendant text nodes, like `Node.textContent`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for d in self.descendants(id) {
            if let NodeKind::Text { text } = self.kind(d) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn has_element_children(&self, id: NodeId) -> bool {
        self.element_children(id).next().is_some()
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Push children in reverse so they pop in original order.
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
