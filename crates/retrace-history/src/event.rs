//! History events: the undoable units.

use retrace_core::{ChangeSet, Selection};

/// One undoable unit, possibly coalescing several edits.
///
/// An event without `changes` is a pure selection-boundary marker: it
/// records where the selection sat before the surrounding edits.
#[derive(Debug, Clone)]
pub struct HistoryEvent {
    /// The forward change this event applied to the document.
    pub changes: Option<ChangeSet>,
    /// Selection before the first edit folded into this event.
    pub start_selection: Option<Selection>,
    /// One selection per folded edit, in chronological order. The last
    /// entry is what redo restores.
    pub selections_after: Vec<Selection>,
}

impl HistoryEvent {
    /// An event recording a single edit.
    pub fn from_edit(
        changes: ChangeSet,
        start_selection: Selection,
        selection_after: Selection,
    ) -> Self {
        Self {
            changes: Some(changes),
            start_selection: Some(start_selection),
            selections_after: vec![selection_after],
        }
    }

    /// A selection-boundary marker with no document change.
    pub fn selection_only(selections_after: Vec<Selection>) -> Self {
        Self {
            changes: None,
            start_selection: None,
            selections_after,
        }
    }

    pub fn is_selection_only(&self) -> bool {
        self.changes.is_none()
    }
}
