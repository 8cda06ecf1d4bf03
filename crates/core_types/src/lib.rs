//! Data model shared by the fingerprint builder, the change log, the apply engine and the
//! editing session.
//!
//! Everything here serializes to the camelCase JSON layout of an exported change log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-node handle assigned when a live element is made editable.
///
/// Handles are only meaningful inside the session that allocated them; they replace object
/// identity as the key for baselines, pending edits and change records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditKey(u64);

impl EditKey {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// The handle allocated after this one.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for EditKey {
    #[inline]
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for EditKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// One ancestor in a fingerprint's ancestor chain, nearest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorStep {
    /// Upper-case tag name.
    pub tag: String,
    pub classes: Vec<String>,
    /// Stable id, empty when absent or volatile.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

/// One `tag:nth-of-type(n)` segment; `nth` is 1-based among same-tag element siblings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NthStep {
    pub tag: String,
    pub nth: usize,
}

impl fmt::Display for NthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:nth-of-type({})", self.tag, self.nth)
    }
}

/// Structural identity of an editable node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub anchor_selector: String,
    #[serde(default)]
    pub stable_id: String,
    #[serde(default)]
    pub class_signature: Vec<String>,
    #[serde(default)]
    pub ancestor_signature: Vec<AncestorStep>,
    /// From the anchor (exclusive) down to the node (inclusive).
    #[serde(default)]
    pub nth_path: Vec<NthStep>,
}

impl Fingerprint {
    /// `nth_path` rendered as a child-combinator selector, e.g.
    /// `footer:nth-of-type(1) > a:nth-of-type(2)`.
    pub fn nth_path_selector(&self) -> String {
        let mut out = String::new();
        for (i, step) in self.nth_path.iter().enumerate() {
            if i > 0 {
                out.push_str(" > ");
            }
            out.push_str(&step.to_string());
        }
        out
    }
}

/// How a record's new content is written back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Replace the first text-bearing child with `new_text`.
    #[default]
    PlainText,
    /// Replace the whole element content with `new_markup`.
    RichInline,
}

/// One logical edit to one node.
///
/// `old_text` is the baseline captured when the node became editable and never changes.
/// `new_text`, `content`/`new_markup` and `timestamp_ms` are overwritten by later edits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub key: EditKey,
    pub source_file: String,
    /// Upper-case tag name, e.g. `A`.
    pub tag: String,
    pub old_text: String,
    pub new_text: String,
    #[serde(default)]
    pub content: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_markup: Option<String>,
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    /// Milliseconds since the editing session started.
    pub timestamp_ms: u64,
}

impl ChangeRecord {
    /// Lower-case tag name, for querying parsed documents.
    pub fn tag_name(&self) -> String {
        self.tag.to_ascii_lowercase()
    }
}
