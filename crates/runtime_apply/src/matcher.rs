//! Candidate resolution: find the node a change record refers to in a freshly parsed file.
//!
//! Strategies run in a fixed priority order. The first one producing a candidate wins and,
//! among several candidates, the first in document order is taken.

use core_types::ChangeRecord;
use fingerprint::FingerprintBuilder;
use html::{Document, NodeId, Selector, clean_text};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Element whose `id` equals the record's stable id.
    StableId,
    /// Element of the record's tag with the same non-volatile class set and baseline text.
    ClassSignature,
    /// Anchor selector, then the `nth-of-type` path below it. Records without a path never
    /// match here.
    StructuralPath,
    /// First element of the record's tag whose text equals the baseline.
    ///
    /// Once the record is applied its node no longer shows the baseline, but an untouched
    /// sibling with the same tag and text still does. When no earlier strategy resolves the
    /// record, a later pass therefore rewrites that sibling.
    TagText,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::StableId,
        Strategy::ClassSignature,
        Strategy::StructuralPath,
        Strategy::TagText,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::StableId => "stable-id",
            Strategy::ClassSignature => "class-signature",
            Strategy::StructuralPath => "structural-path",
            Strategy::TagText => "tag-text",
        })
    }
}

fn text_of(doc: &Document, id: NodeId) -> String {
    clean_text(&doc.text_content(id))
}

/// Resolve `record` in `doc`, returning the winning strategy and node.
pub fn resolve(
    builder: &FingerprintBuilder,
    doc: &Document,
    record: &ChangeRecord,
) -> Option<(Strategy, NodeId)> {
    Strategy::ORDER.iter().find_map(|&strategy| {
        candidate(builder, doc, record, strategy).map(|node| (strategy, node))
    })
}

/// First candidate produced by one strategy alone.
pub fn candidate(
    builder: &FingerprintBuilder,
    doc: &Document,
    record: &ChangeRecord,
    strategy: Strategy,
) -> Option<NodeId> {
    let tag = record.tag_name();
    let fp = &record.fingerprint;
    match strategy {
        Strategy::StableId => {
            if fp.stable_id.is_empty() {
                return None;
            }
            doc.elements()
                .find(|&e| doc.attr(e, "id") == Some(fp.stable_id.as_str()))
        }
        Strategy::ClassSignature => {
            if fp.class_signature.is_empty() {
                return None;
            }
            let wanted: BTreeSet<&str> = fp.class_signature.iter().map(String::as_str).collect();
            doc.elements_by_tag(&tag).find(|&e| {
                let have = builder.class_signature(doc, e);
                let have: BTreeSet<&str> = have.iter().map(String::as_str).collect();
                have == wanted && text_of(doc, e) == record.old_text
            })
        }
        Strategy::StructuralPath => {
            if fp.nth_path.is_empty() {
                return None;
            }
            let selector = match Selector::parse(&fp.anchor_selector) {
                Ok(selector) => selector,
                Err(err) => {
                    log::debug!(target: "apply", "record {}: {err}", record.key);
                    return None;
                }
            };
            let mut node = selector.query_first(doc, NodeId::ROOT)?;
            for step in &fp.nth_path {
                node = doc.nth_child_of_type(node, &step.tag, step.nth)?;
            }
            doc.has_tag(node, &tag).then_some(node)
        }
        Strategy::TagText => doc
            .elements_by_tag(&tag)
            .find(|&e| text_of(doc, e) == record.old_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ContentKind, EditKey, Fingerprint, NthStep};
    use html::parse_document;

    fn record(tag: &str, old: &str, fingerprint: Fingerprint) -> ChangeRecord {
        ChangeRecord {
            key: EditKey::from_raw(1),
            source_file: "index.html".into(),
            tag: tag.into(),
            old_text: old.into(),
            new_text: "new".into(),
            content: ContentKind::PlainText,
            new_markup: None,
            fingerprint,
            timestamp_ms: 0,
        }
    }

    fn path(steps: &[(&str, usize)]) -> Vec<NthStep> {
        steps
            .iter()
            .map(|&(tag, nth)| NthStep {
                tag: tag.into(),
                nth,
            })
            .collect()
    }

    #[test]
    fn stable_id_beats_text_fallback() {
        let doc = parse_document(r#"<p>Same</p><p id="target">Same</p>"#);
        let rec = record(
            "P",
            "Same",
            Fingerprint {
                anchor_selector: "#target".into(),
                stable_id: "target".into(),
                ..Fingerprint::default()
            },
        );
        let builder = FingerprintBuilder::default();
        let (strategy, node) = resolve(&builder, &doc, &rec).expect("match");
        assert_eq!(strategy, Strategy::StableId);
        assert_eq!(doc.attr(node, "id"), Some("target"));
        // The fallback alone would pick the first paragraph.
        let fallback = candidate(&builder, &doc, &rec, Strategy::TagText).expect("fallback");
        assert_ne!(fallback, node);
    }

    #[test]
    fn class_signature_ignores_volatile_classes_and_order() {
        let doc = parse_document(
            r#"<h2 class="card-title">Other</h2><h2 class="big card-title is-active">Title</h2>"#,
        );
        let rec = record(
            "H2",
            "Title",
            Fingerprint {
                class_signature: vec!["card-title".into(), "big".into()],
                ..Fingerprint::default()
            },
        );
        let builder = FingerprintBuilder::default();
        let (strategy, node) = resolve(&builder, &doc, &rec).expect("match");
        assert_eq!(strategy, Strategy::ClassSignature);
        assert_eq!(text_of(&doc, node), "Title");
    }

    #[test]
    fn empty_class_signature_is_skipped() {
        let doc = parse_document("<p>x</p>");
        let rec = record("P", "x", Fingerprint::default());
        let builder = FingerprintBuilder::default();
        assert!(candidate(&builder, &doc, &rec, Strategy::ClassSignature).is_none());
    }

    #[test]
    fn structural_path_walks_from_anchor() {
        let doc = parse_document(
            r#"<div id="team"><ul><li>Ann</li><li>Bob</li></ul></div><ul><li>Bob</li></ul>"#,
        );
        let rec = record(
            "LI",
            "Robert",
            Fingerprint {
                anchor_selector: "#team".into(),
                nth_path: path(&[("ul", 1), ("li", 2)]),
                ..Fingerprint::default()
            },
        );
        let builder = FingerprintBuilder::default();
        let (strategy, node) = resolve(&builder, &doc, &rec).expect("match");
        assert_eq!(strategy, Strategy::StructuralPath);
        assert_eq!(text_of(&doc, node), "Bob");
        assert!(doc.ancestors(node).any(|a| doc.attr(a, "id") == Some("team")));
    }

    #[test]
    fn structural_path_requires_the_record_tag() {
        let doc = parse_document(r#"<div id="c"><p>x</p></div>"#);
        let rec = record(
            "SPAN",
            "nope",
            Fingerprint {
                anchor_selector: "#c".into(),
                nth_path: path(&[("p", 1)]),
                ..Fingerprint::default()
            },
        );
        let builder = FingerprintBuilder::default();
        assert!(resolve(&builder, &doc, &rec).is_none());
    }

    #[test]
    fn empty_path_never_resolves_to_the_anchor() {
        let doc = parse_document(r#"<div id="box"><div>Old</div></div>"#);
        let rec = record(
            "DIV",
            "Old",
            Fingerprint {
                anchor_selector: "#box".into(),
                ..Fingerprint::default()
            },
        );
        let builder = FingerprintBuilder::default();
        assert_eq!(candidate(&builder, &doc, &rec, Strategy::StructuralPath), None);
        let (strategy, node) = resolve(&builder, &doc, &rec).expect("match");
        assert_eq!(strategy, Strategy::TagText);
        assert_eq!(doc.attr(node, "id"), None);
    }

    #[test]
    fn unparsable_anchor_falls_through() {
        let doc = parse_document("<a>Contact</a>");
        let rec = record(
            "A",
            "Contact",
            Fingerprint {
                anchor_selector: "a[href]".into(),
                ..Fingerprint::default()
            },
        );
        let builder = FingerprintBuilder::default();
        let (strategy, _) = resolve(&builder, &doc, &rec).expect("match");
        assert_eq!(strategy, Strategy::TagText);
    }
}
