use core_types::{ChangeRecord, ContentKind, EditKey, Fingerprint};
use edit_core::{ChangeLog, CommitDecision, EditStateStore, Upsert};
use fingerprint::FingerprintBuilder;
use html::{NodeId, Selector, clean_text, inner_html};
use net::{PublishError, Publisher, SourceFetcher, publish_all};
use runtime_apply::{ApplyEngine, FileCache, PassReport, replace_plain_text};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::config::{ConfigError, EditorConfig};
use crate::error::SessionError;
use crate::page::LivePage;

/// The `inputType` family of an input notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    InsertText,
    DeleteContent,
    Paste,
    /// Formatting, history and anything else that does not change text.
    Other,
}

impl InputKind {
    /// Classify a DOM `InputEvent.inputType` value.
    pub fn from_input_type(input_type: &str) -> Self {
        match input_type {
            "insertFromPaste" | "insertFromPasteAsQuotation" => InputKind::Paste,
            t if t.starts_with("insert") => InputKind::InsertText,
            t if t.starts_with("delete") => InputKind::DeleteContent,
            _ => InputKind::Other,
        }
    }
}

/// A change the host observed on the live page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeChange {
    Input(InputKind),
    /// A text node's data was replaced.
    CharacterData,
}

impl NodeChange {
    fn qualifies(self) -> bool {
        !matches!(self, NodeChange::Input(InputKind::Other))
    }
}

/// All state of one editing session: handles for live nodes, debounce timers, the change log,
/// the file cache and the page baselines used when a source file cannot be fetched.
///
/// The session is clock-agnostic. Every operation that depends on time takes `now`, and the
/// host calls [`poll`](EditSession::poll) when [`next_deadline`](EditSession::next_deadline)
/// passes.
#[derive(Debug)]
pub struct EditSession {
    config: EditorConfig,
    builder: FingerprintBuilder,
    engine: ApplyEngine,
    keys: HashMap<NodeId, EditKey>,
    nodes: BTreeMap<EditKey, NodeId>,
    next_key: EditKey,
    store: EditStateStore,
    log: ChangeLog,
    cache: FileCache,
    baselines: HashMap<String, String>,
    epoch: Instant,
}

impl EditSession {
    pub fn new(config: EditorConfig) -> Result<Self, ConfigError> {
        Self::with_change_log(config, ChangeLog::new())
    }

    /// Continue a previous session's log; new handles are allocated past its largest key.
    pub fn with_change_log(config: EditorConfig, log: ChangeLog) -> Result<Self, ConfigError> {
        let builder = config.fingerprint_builder()?;
        let engine = ApplyEngine::new(builder.clone(), config.parse_options());
        let next_key = log
            .max_key()
            .map_or(EditKey::from_raw(1), EditKey::next);
        Ok(Self {
            config,
            builder,
            engine,
            keys: HashMap::new(),
            nodes: BTreeMap::new(),
            next_key,
            store: EditStateStore::new(),
            log,
            cache: FileCache::new(),
            baselines: HashMap::new(),
            epoch: Instant::now(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn builder(&self) -> &FingerprintBuilder {
        &self.builder
    }

    /// When the session started; record timestamps count from here.
    pub fn started_at(&self) -> Instant {
        self.epoch
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.log
    }

    pub fn into_change_log(self) -> ChangeLog {
        self.log
    }

    pub fn file_cache(&self) -> &FileCache {
        &self.cache
    }

    /// Text used for `path` when it is neither cached nor fetchable.
    pub fn register_baseline(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.baselines.insert(path.into(), text.into());
    }

    pub fn baseline(&self, path: &str) -> Option<&str> {
        self.baselines.get(path).map(String::as_str)
    }

    /// Parse `markup` as the live page at `path` and keep it as that file's baseline.
    ///
    /// Handles of a previously loaded page are forgotten; its pending edits are dropped.
    pub fn load_page(&mut self, path: &str, markup: &str) -> LivePage {
        let dropped = self.store.take_all_pending().len();
        if dropped > 0 {
            log::warn!(target: "editor", "dropping {dropped} pending edits of the previous page");
        }
        self.keys.clear();
        self.nodes.clear();
        let page = LivePage::parse(path, markup, &self.config.parse_options());
        let file = page.page_file(&self.config.default_page);
        self.register_baseline(file, markup);
        page
    }

    /// Make every element with an editable tag editable.
    ///
    /// Newly seen elements get a handle. Baselines are captured once, from the first non-empty
    /// cleaned text, and never reset. Returns the number of new handles.
    pub fn enable_editing(&mut self, page: &LivePage) -> usize {
        let doc = page.doc();
        let candidates: Vec<NodeId> = doc
            .elements()
            .filter(|&e| {
                doc.element_name(e)
                    .is_some_and(|name| self.config.is_editable_tag(name))
            })
            .collect();
        let mut added = 0;
        for node in candidates {
            let key = match self.keys.get(&node) {
                Some(&key) => key,
                None => {
                    added += 1;
                    self.allocate(node)
                }
            };
            self.store
                .ensure_baseline(key, &clean_text(&doc.text_content(node)));
        }
        log::info!(
            target: "editor",
            "{}: editing enabled, {added} new of {} editable elements",
            page.path(),
            self.nodes.len()
        );
        added
    }

    fn allocate(&mut self, node: NodeId) -> EditKey {
        let key = self.next_key;
        self.next_key = key.next();
        self.keys.insert(node, key);
        self.nodes.insert(key, node);
        self.store.register(key);
        key
    }

    pub fn key_of(&self, node: NodeId) -> Option<EditKey> {
        self.keys.get(&node).copied()
    }

    pub fn node_of(&self, key: EditKey) -> Option<NodeId> {
        self.nodes.get(&key).copied()
    }

    /// Registered handles in allocation order.
    pub fn editables(&self) -> impl Iterator<Item = (EditKey, NodeId)> + '_ {
        self.nodes.iter().map(|(&k, &n)| (k, n))
    }

    /// Nearest element at or above `node` with an editable tag.
    pub fn editable_element(&self, page: &LivePage, node: NodeId) -> Option<NodeId> {
        let doc = page.doc();
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .find(|&n| {
                doc.element_name(n)
                    .is_some_and(|name| self.config.is_editable_tag(name))
            })
    }

    /// Unified change notification for input events and character-data mutations on `node`
    /// (an element or a text node). Restarts the debounce timer of the owning editable element.
    pub fn notify(
        &mut self,
        page: &LivePage,
        node: NodeId,
        change: NodeChange,
        now: Instant,
    ) -> Option<EditKey> {
        if !change.qualifies() {
            return None;
        }
        let element = self.editable_element(page, node)?;
        let Some(key) = self.key_of(element) else {
            log::debug!(target: "editor", "change on an element that was never enabled");
            return None;
        };
        self.store.schedule(key, now + self.config.debounce());
        log::trace!(target: "editor", "{key}: {change:?}, commit scheduled");
        Some(key)
    }

    pub fn pending_count(&self) -> usize {
        self.store.pending_count()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.store.next_deadline()
    }

    /// Commit every edit whose debounce deadline is at or before `now`. Returns the keys of
    /// records that were inserted or updated.
    pub fn poll(&mut self, page: &LivePage, now: Instant) -> Vec<EditKey> {
        let due = self.store.take_due(now);
        due.into_iter()
            .filter(|&key| self.commit(page, key, now))
            .collect()
    }

    /// Commit every pending edit immediately.
    pub fn flush(&mut self, page: &LivePage, now: Instant) -> Vec<EditKey> {
        let pending = self.store.take_all_pending();
        pending
            .into_iter()
            .filter(|&key| self.commit(page, key, now))
            .collect()
    }

    fn commit(&mut self, page: &LivePage, key: EditKey, now: Instant) -> bool {
        let Some(node) = self.node_of(key) else {
            return false;
        };
        let doc = page.doc();
        if !doc.contains(node) || !doc.is_inclusive_ancestor(NodeId::ROOT, node) {
            log::debug!(target: "editor", "{key}: node left the page, edit dropped");
            return false;
        }
        let current = clean_text(&doc.text_content(node));
        let old_text = match self.store.decide(key, &current) {
            CommitDecision::Changed { old_text } => old_text,
            decision => {
                log::trace!(target: "editor", "{key}: {decision:?}, nothing to commit");
                return false;
            }
        };

        let (content, new_markup) = if doc.has_element_children(node) {
            (ContentKind::RichInline, Some(inner_html(doc, node)))
        } else {
            (ContentKind::PlainText, None)
        };
        let timestamp_ms = u64::try_from(now.saturating_duration_since(self.epoch).as_millis())
            .unwrap_or(u64::MAX);

        let record = match self.log.get(key) {
            Some(existing) => ChangeRecord {
                new_text: current.clone(),
                content,
                new_markup,
                timestamp_ms,
                ..existing.clone()
            },
            None => {
                let page_file = page.page_file(&self.config.default_page);
                ChangeRecord {
                    key,
                    source_file: self.builder.source_file(doc, node, &page_file),
                    tag: doc
                        .element_name(node)
                        .unwrap_or_default()
                        .to_ascii_uppercase(),
                    old_text,
                    new_text: current.clone(),
                    content,
                    new_markup,
                    fingerprint: self.builder.build(doc, node),
                    timestamp_ms,
                }
            }
        };
        match self.log.upsert(record) {
            Upsert::Inserted(i) => {
                log::debug!(target: "editor", "{key}: captured as record #{i} -> {current:?}")
            }
            Upsert::Updated(i) => {
                log::debug!(target: "editor", "{key}: record #{i} now {current:?}")
            }
        }
        self.store.mark_committed(key, &current);
        true
    }

    /// Fingerprint of a live node, as a new record for it would carry.
    pub fn fingerprint(&self, page: &LivePage, node: NodeId) -> Fingerprint {
        self.builder.build(page.doc(), node)
    }

    /// Replace the plain text of the first element matching `selector` and report it through
    /// [`notify`](EditSession::notify), as typing into it would. The element is enabled first
    /// if needed.
    pub fn edit_text(
        &mut self,
        page: &mut LivePage,
        selector: &str,
        text: &str,
        now: Instant,
    ) -> Result<EditKey, SessionError> {
        let parsed = Selector::parse(selector)?;
        let node = parsed
            .query_first(page.doc(), NodeId::ROOT)
            .ok_or_else(|| SessionError::NoMatch {
                selector: selector.to_string(),
            })?;
        let tag = page.doc().element_name(node).unwrap_or_default().to_string();
        if !self.config.is_editable_tag(&tag) {
            return Err(SessionError::NotEditable {
                selector: selector.to_string(),
                tag,
            });
        }
        if self.key_of(node).is_none() {
            self.enable_editing(page);
        }
        replace_plain_text(page.doc_mut(), node, text);
        self.notify(page, node, NodeChange::Input(InputKind::InsertText), now)
            .ok_or_else(|| SessionError::NoMatch {
                selector: selector.to_string(),
            })
    }

    /// Run an apply pass over the whole change log.
    pub fn apply<F>(&mut self, fetcher: &mut F) -> PassReport
    where
        F: SourceFetcher + ?Sized,
    {
        let groups = self.log.group_by_file();
        log::info!(
            target: "editor",
            "applying {} records to {} files",
            self.log.len(),
            groups.len()
        );
        self.engine
            .apply_pass(groups, &mut self.cache, fetcher, &self.baselines)
    }

    /// Flush pending edits of `page`, then run an apply pass.
    pub fn apply_pending<F>(&mut self, page: &LivePage, fetcher: &mut F, now: Instant) -> PassReport
    where
        F: SourceFetcher + ?Sized,
    {
        self.flush(page, now);
        self.apply(fetcher)
    }

    /// Hand every cached file to `publisher`.
    pub fn publish<P>(&self, publisher: &mut P) -> Vec<(String, Result<(), PublishError>)>
    where
        P: Publisher + ?Sized,
    {
        publish_all(publisher, self.cache.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_types_are_classified() {
        assert_eq!(InputKind::from_input_type("insertText"), InputKind::InsertText);
        assert_eq!(InputKind::from_input_type("insertParagraph"), InputKind::InsertText);
        assert_eq!(InputKind::from_input_type("insertFromPaste"), InputKind::Paste);
        assert_eq!(
            InputKind::from_input_type("deleteContentBackward"),
            InputKind::DeleteContent
        );
        assert_eq!(InputKind::from_input_type("formatBold"), InputKind::Other);
        assert!(!NodeChange::Input(InputKind::Other).qualifies());
        assert!(NodeChange::CharacterData.qualifies());
    }

    #[test]
    fn resumed_sessions_allocate_past_the_log() {
        let record = ChangeRecord {
            key: EditKey::from_raw(41),
            source_file: "index.html".into(),
            tag: "P".into(),
            old_text: "a".into(),
            new_text: "b".into(),
            content: ContentKind::PlainText,
            new_markup: None,
            fingerprint: Fingerprint::default(),
            timestamp_ms: 0,
        };
        let log = ChangeLog::from_records(vec![record]).expect("log");
        let mut session =
            EditSession::with_change_log(EditorConfig::default(), log).expect("session");
        let page = session.load_page("/index.html", "<p>x</p>");
        session.enable_editing(&page);
        let (key, _) = session.editables().next().expect("one editable");
        assert_eq!(key, EditKey::from_raw(42));
    }
}
