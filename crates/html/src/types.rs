/// Arena index of a node inside a [`Document`](crate::Document).
///
/// Ids are only meaningful for the document that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The document node. Every document has exactly one and it is always slot 0.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

pub type Attribute = (String, Option<String>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document { doctype: Option<String> },
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text { text: String },
    Comment { text: String },
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

/// How the tree builder treats markup that lacks the `html`/`head`/`body` scaffold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentShell {
    /// Always produce `html > head + body`, like a browser's DOM parser does.
    #[default]
    Synthesize,
    /// Keep the tree exactly as written.
    Preserve,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    pub shell: DocumentShell,
}
