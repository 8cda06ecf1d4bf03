//! # fingerprint
//!
//! Derives the structural identity of an editable element in a live page so that the same
//! element can be found again in a freshly parsed copy of its source file.
//!
//! A [`Fingerprint`] is made of:
//! - an anchor selector: the nearest stable ancestor (`#id`), else a known container
//!   selector, else `body`;
//! - the element's own non-volatile id and classes;
//! - a bounded ancestor chain;
//! - a `tag:nth-of-type(n)` path from the anchor down to the element.
//!
//! All walks stop at the element's *owning root*: the nearest ancestor carrying the source
//! marker attribute (content included from another file), else `body`. Inside an included
//! fragment the anchor therefore falls back to `body`, which is exactly where the fragment's
//! content sits once its own file is parsed.

pub mod similarity;
mod volatility;

pub use volatility::{DEFAULT_VOLATILE_PATTERN, Volatility};

use core_types::{AncestorStep, Fingerprint, NthStep};
use html::{Document, NodeId, Selector, css_escape};

pub const DEFAULT_KNOWN_ANCHORS: &[&str] =
    &["#page-content", ".pageWrapper", "#main", "main", "#content", "#root"];
pub const DEFAULT_ANCESTOR_DEPTH: usize = 8;
pub const DEFAULT_PATH_DEPTH: usize = 15;
pub const DEFAULT_SOURCE_ATTRIBUTE: &str = "data-src";
/// Anchor used when nothing more specific is found.
pub const ROOT_ANCHOR: &str = "body";

/// Resolved anchor: the selector recorded in the fingerprint and the live element it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub selector: String,
    pub node: NodeId,
}

#[derive(Clone, Debug)]
pub struct FingerprintBuilder {
    volatility: Volatility,
    known_anchors: Vec<(String, Selector)>,
    ancestor_depth: usize,
    path_depth: usize,
    source_attribute: String,
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        let known_anchors = DEFAULT_KNOWN_ANCHORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok().map(|sel| (s.to_string(), sel)))
            .collect();
        Self {
            volatility: Volatility::default(),
            known_anchors,
            ancestor_depth: DEFAULT_ANCESTOR_DEPTH,
            path_depth: DEFAULT_PATH_DEPTH,
            source_attribute: DEFAULT_SOURCE_ATTRIBUTE.to_string(),
        }
    }
}

impl FingerprintBuilder {
    pub fn new(
        volatility: Volatility,
        known_anchors: Vec<(String, Selector)>,
        ancestor_depth: usize,
        path_depth: usize,
        source_attribute: impl Into<String>,
    ) -> Self {
        Self {
            volatility,
            known_anchors,
            ancestor_depth,
            path_depth,
            source_attribute: source_attribute.into(),
        }
    }

    pub fn volatility(&self) -> &Volatility {
        &self.volatility
    }

    pub fn source_attribute(&self) -> &str {
        &self.source_attribute
    }

    /// The element's id when present, non-empty and not volatile; else empty.
    pub fn stable_id(&self, doc: &Document, node: NodeId) -> String {
        match doc.attr(node, "id") {
            Some(id) if !id.is_empty() && !self.volatility.is_volatile(id) => id.to_string(),
            _ => String::new(),
        }
    }

    /// Class names in attribute order, volatile ones removed.
    pub fn class_signature(&self, doc: &Document, node: NodeId) -> Vec<String> {
        doc.classes(node)
            .filter(|c| !self.volatility.is_volatile(c))
            .map(str::to_string)
            .collect()
    }

    /// Nearest inclusive ancestor carrying a non-empty source marker, with the marker value.
    pub fn source_marker<'d>(&self, doc: &'d Document, node: NodeId) -> Option<(NodeId, &'d str)> {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .find_map(|id| match doc.attr(id, &self.source_attribute) {
                Some(src) if !src.trim().is_empty() => Some((id, src.trim())),
                _ => None,
            })
    }

    /// File that owns `node`: the inherited source marker, else `page_file`.
    pub fn source_file(&self, doc: &Document, node: NodeId, page_file: &str) -> String {
        self.source_marker(doc, node)
            .map(|(_, src)| src.to_string())
            .unwrap_or_else(|| page_file.to_string())
    }

    /// The boundary no fingerprint walk crosses.
    pub fn owning_root(&self, doc: &Document, node: NodeId) -> NodeId {
        if let Some((marker, _)) = self.source_marker(doc, node) {
            if marker != node {
                return marker;
            }
            // A marker on the node itself scopes nothing below it; use the enclosing root.
            if let Some(parent) = doc.parent(node) {
                return self.owning_root(doc, parent);
            }
        }
        doc.body()
            .filter(|&b| doc.is_inclusive_ancestor(b, node))
            .or_else(|| doc.document_element())
            .unwrap_or(NodeId::ROOT)
    }

    /// `node` and its ancestors strictly below `root`, nearest first.
    fn inclusive_path<'d>(
        doc: &'d Document,
        node: NodeId,
        root: NodeId,
    ) -> impl Iterator<Item = NodeId> + 'd {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .take_while(move |&id| id != root && id != NodeId::ROOT)
            .filter(move |&id| doc.is_element(id))
    }

    pub fn resolve_anchor(&self, doc: &Document, node: NodeId) -> Anchor {
        let root = self.owning_root(doc, node);
        for id in Self::inclusive_path(doc, node, root) {
            let stable = self.stable_id(doc, id);
            if !stable.is_empty() {
                return Anchor {
                    selector: format!("#{}", css_escape(&stable)),
                    node: id,
                };
            }
        }
        for (text, selector) in &self.known_anchors {
            let hit = Self::inclusive_path(doc, node, root).find(|&id| selector.matches(doc, id));
            if let Some(id) = hit {
                return Anchor {
                    selector: text.clone(),
                    node: id,
                };
            }
        }
        Anchor {
            selector: ROOT_ANCHOR.to_string(),
            node: root,
        }
    }

    /// Up to `ancestor_depth` ancestors from the parent upward, stopping before `stop` or the
    /// owning root, whichever comes first.
    pub fn ancestor_signature(&self, doc: &Document, node: NodeId, stop: NodeId) -> Vec<AncestorStep> {
        let root = self.owning_root(doc, node);
        doc.ancestors(node)
            .take_while(|&id| {
                id != stop && id != root && id != NodeId::ROOT && !doc.has_tag(id, "html")
            })
            .filter(|&id| doc.is_element(id))
            .take(self.ancestor_depth)
            .map(|id| AncestorStep {
                tag: doc
                    .element_name(id)
                    .unwrap_or_default()
                    .to_ascii_uppercase(),
                classes: self.class_signature(doc, id),
                id: self.stable_id(doc, id),
            })
            .collect()
    }

    /// `tag:nth-of-type(n)` steps from `anchor` (exclusive) down to `node` (inclusive).
    ///
    /// A path deeper than `path_depth` is not recorded at all: a suffix of it would no longer
    /// start at the anchor, so the result is empty.
    pub fn nth_path(&self, doc: &Document, node: NodeId, anchor: NodeId) -> Vec<NthStep> {
        let mut steps: Vec<NthStep> = Self::inclusive_path(doc, node, anchor)
            .take(self.path_depth + 1)
            .filter_map(|id| {
                doc.element_name(id).map(|tag| NthStep {
                    tag: tag.to_string(),
                    nth: doc.index_of_type(id),
                })
            })
            .collect();
        if steps.len() > self.path_depth {
            log::debug!(
                target: "fingerprint",
                "path deeper than {} steps below the anchor, not recorded",
                self.path_depth
            );
            return Vec::new();
        }
        steps.reverse();
        steps
    }

    pub fn build(&self, doc: &Document, node: NodeId) -> Fingerprint {
        let anchor = self.resolve_anchor(doc, node);
        let fingerprint = Fingerprint {
            stable_id: self.stable_id(doc, node),
            class_signature: self.class_signature(doc, node),
            ancestor_signature: self.ancestor_signature(doc, node, anchor.node),
            nth_path: self.nth_path(doc, node, anchor.node),
            anchor_selector: anchor.selector,
        };
        log::debug!(
            target: "fingerprint",
            "{} -> anchor={} path={}",
            doc.element_name(node).unwrap_or("?"),
            fingerprint.anchor_selector,
            fingerprint.nth_path_selector()
        );
        fingerprint
    }
}
