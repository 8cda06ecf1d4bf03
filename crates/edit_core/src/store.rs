//! Per-node editing state: baselines, last committed text and pending debounce deadlines.
//!
//! This store is clock-agnostic: callers pass `Instant`s in, nothing here reads the clock.
//! A node moves `idle -> pending` when [`schedule`](EditStateStore::schedule) is called,
//! `pending -> idle` when its deadline is taken by [`take_due`](EditStateStore::take_due)
//! and the caller then either commits or drops the change.

use core_types::EditKey;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Clone, Debug, Default)]
struct NodeState {
    baseline: Option<String>,
    committed: Option<String>,
    deadline: Option<Instant>,
}

/// Outcome of comparing a node's current text with what was last committed for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitDecision {
    /// The text differs; `old_text` is the node's baseline.
    Changed { old_text: String },
    /// Same as the last committed value (or the baseline when nothing was committed yet).
    Unchanged,
    /// Current text is empty.
    Empty,
    /// The node never had a non-empty baseline, so there is nothing to diff against.
    NoBaseline,
}

/// Central store for per-node edit state.
///
/// # Example
///
/// ```
/// use core_types::EditKey;
/// use edit_core::{CommitDecision, EditStateStore};
/// use std::time::{Duration, Instant};
///
/// let mut store = EditStateStore::new();
/// let key = EditKey::from_raw(1);
/// let t0 = Instant::now();
///
/// store.ensure_baseline(key, "Contact");
/// store.schedule(key, t0 + Duration::from_millis(300));
/// assert!(store.take_due(t0).is_empty());
/// assert_eq!(store.take_due(t0 + Duration::from_millis(300)), vec![key]);
///
/// assert_eq!(
///     store.decide(key, "Contact Us"),
///     CommitDecision::Changed { old_text: "Contact".into() }
/// );
/// store.mark_committed(key, "Contact Us");
/// assert_eq!(store.decide(key, "Contact Us"), CommitDecision::Unchanged);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EditStateStore {
    nodes: HashMap<EditKey, NodeState>,
}

impl EditStateStore {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Returns `true` if the node has been registered.
    pub fn has(&self, key: EditKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Register a node without a baseline. No-op when already registered.
    pub fn register(&mut self, key: EditKey) {
        self.nodes.entry(key).or_default();
    }

    /// Record `text` as the node's baseline unless one already exists.
    ///
    /// Empty text never becomes a baseline. Returns `true` when a baseline was captured.
    pub fn ensure_baseline(&mut self, key: EditKey, text: &str) -> bool {
        let state = self.nodes.entry(key).or_default();
        if state.baseline.is_some() || text.is_empty() {
            return false;
        }
        state.baseline = Some(text.to_string());
        true
    }

    pub fn baseline(&self, key: EditKey) -> Option<&str> {
        self.nodes.get(&key).and_then(|s| s.baseline.as_deref())
    }

    pub fn last_committed(&self, key: EditKey) -> Option<&str> {
        self.nodes.get(&key).and_then(|s| s.committed.as_deref())
    }

    /// Replace any pending deadline for the node with `deadline`.
    pub fn schedule(&mut self, key: EditKey, deadline: Instant) {
        self.nodes.entry(key).or_default().deadline = Some(deadline);
    }

    pub fn pending(&self, key: EditKey) -> Option<Instant> {
        self.nodes.get(&key).and_then(|s| s.deadline)
    }

    pub fn pending_count(&self) -> usize {
        self.nodes.values().filter(|s| s.deadline.is_some()).count()
    }

    /// Earliest pending deadline, for hosts that sleep until the next expiry.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.nodes.values().filter_map(|s| s.deadline).min()
    }

    /// Clear and return every node whose deadline is at or before `now`, in deadline order
    /// (ties by key).
    pub fn take_due(&mut self, now: Instant) -> Vec<EditKey> {
        self.take_where(|deadline| deadline <= now)
    }

    /// Clear and return every pending node regardless of deadline.
    pub fn take_all_pending(&mut self) -> Vec<EditKey> {
        self.take_where(|_| true)
    }

    fn take_where(&mut self, due: impl Fn(Instant) -> bool) -> Vec<EditKey> {
        let mut out: Vec<(Instant, EditKey)> = Vec::new();
        for (&key, state) in self.nodes.iter_mut() {
            if let Some(deadline) = state.deadline.filter(|&d| due(d)) {
                state.deadline = None;
                out.push((deadline, key));
            }
        }
        out.sort();
        out.into_iter().map(|(_, key)| key).collect()
    }

    /// Compare `current` (already cleaned) with the node's last committed value, falling back
    /// to its baseline.
    pub fn decide(&self, key: EditKey, current: &str) -> CommitDecision {
        let Some(state) = self.nodes.get(&key) else {
            return CommitDecision::NoBaseline;
        };
        let Some(baseline) = state.baseline.as_deref() else {
            return CommitDecision::NoBaseline;
        };
        if current.is_empty() {
            return CommitDecision::Empty;
        }
        let reference = state.committed.as_deref().unwrap_or(baseline);
        if current == reference {
            return CommitDecision::Unchanged;
        }
        CommitDecision::Changed {
            old_text: baseline.to_string(),
        }
    }

    pub fn mark_committed(&mut self, key: EditKey, text: &str) {
        self.nodes.entry(key).or_default().committed = Some(text.to_string());
    }
}
