//! # edit_core
//!
//! DOM-agnostic half of live text editing:
//! - [`EditStateStore`]: per-node baseline, last committed text and pending debounce deadline
//! - [`ChangeLog`]: ordered change records with upsert-by-key
//!
//! Nodes are addressed only by [`EditKey`](core_types::EditKey) handles; the integration
//! layer owns the mapping from handles to live nodes and reads their text.

mod change_log;
mod store;

pub use change_log::{ChangeLog, ChangeLogError, Upsert};
pub use store::{CommitDecision, EditStateStore};
