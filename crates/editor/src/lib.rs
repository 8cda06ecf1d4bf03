//! Editing session: wires a live page to the fingerprint builder, the coalescer, the change
//! log and the apply engine.
//!
//! A host drives an [`EditSession`] by loading a page, enabling editing, forwarding every
//! text change through [`EditSession::notify`] and polling for expired debounce deadlines.
//! Committed edits land in the change log; [`EditSession::apply`] writes them back into the
//! source files and [`EditSession::publish`] hands the results on.

mod config;
mod error;
mod page;
mod session;

pub use config::{
    ConfigError, DEFAULT_DEBOUNCE_MS, DEFAULT_EDITABLE_TAGS, DEFAULT_PAGE, EditorConfig,
    ShellMode,
};
pub use error::SessionError;
pub use page::LivePage;
pub use session::{EditSession, InputKind, NodeChange};
