/// Undo/redo history for text editing sessions.
///
/// Provides a `Session` that keeps a document, its selection, and two event
/// stacks (`done`/`undone`) in lockstep, with configurable coalescing of
/// consecutive edits into single undo events. A session can be exported as
/// a JSON-compatible `SessionRecord` and later made live again, history and
/// all, in the same or another process.
pub mod config;
pub mod error;
pub mod event;
pub mod log;
pub mod record;
pub mod session;

pub use config::{GroupingPolicy, HistoryConfig};
pub use error::HistoryError;
pub use event::HistoryEvent;
pub use log::HistoryLog;
pub use record::{deserialize, serialize, SessionRecord};
pub use session::Session;

pub use retrace_core::{ChangeSet, Document, Replacement, Selection, SelectionRange};
