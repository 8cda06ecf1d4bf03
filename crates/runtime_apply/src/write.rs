use core_types::{ChangeRecord, ContentKind};
use html::{Document, NodeId, NodeKind, clean_text, parse_fragment_into};

/// What writing a record into its resolved node did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Updated,
    /// The node already shows the record's new text; nothing was touched.
    AlreadyApplied,
}

/// Replace the text of `node` with `text`.
///
/// The first direct text child with visible content takes the new value, keeping its leading
/// and trailing whitespace; the other direct text children are removed. Element and comment
/// children stay. Without any text child the text is appended.
pub fn replace_plain_text(doc: &mut Document, node: NodeId, text: &str) {
    let children: Vec<NodeId> = doc.children(node).to_vec();
    let text_children: Vec<NodeId> = children
        .into_iter()
        .filter(|&c| matches!(doc.kind(c), NodeKind::Text { .. }))
        .collect();
    let target = text_children
        .iter()
        .copied()
        .find(|&c| doc.text(c).is_some_and(|t| !t.trim().is_empty()));

    let Some(target) = target else {
        for &c in &text_children {
            doc.detach(c);
        }
        let fresh = doc.create_text(text);
        doc.append_child(node, fresh);
        return;
    };

    let old = doc.text(target).unwrap_or_default();
    let lead = &old[..old.len() - old.trim_start().len()];
    let trail = &old[old.trim_end().len()..];
    let value = format!("{lead}{text}{trail}");
    doc.set_text(target, value);
    for c in text_children {
        if c != target {
            doc.detach(c);
        }
    }
}

/// Replace all content of `node` with the parsed `markup`.
pub fn replace_markup(doc: &mut Document, node: NodeId, markup: &str) {
    doc.remove_children(node);
    parse_fragment_into(doc, node, markup);
}

/// Write `record`'s new content into `node`.
pub fn write_record(doc: &mut Document, node: NodeId, record: &ChangeRecord) -> WriteOutcome {
    if clean_text(&doc.text_content(node)) == record.new_text {
        return WriteOutcome::AlreadyApplied;
    }
    match (record.content, record.new_markup.as_deref()) {
        (ContentKind::RichInline, Some(markup)) => replace_markup(doc, node, markup),
        _ => replace_plain_text(doc, node, &record.new_text),
    }
    WriteOutcome::Updated
}
