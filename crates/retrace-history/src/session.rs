//! The live editing session: document, selection, and history in lockstep.

use retrace_core::{ChangeError, ChangeSet, Document, Replacement, Selection};

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::log::HistoryLog;
use crate::record::{self, SessionRecord};

/// A document, its selection, and the history log that tracks them.
///
/// Every operation either commits fully or leaves the session exactly as it
/// was; there is no partially applied state to observe after an error.
#[derive(Debug, Default)]
pub struct Session {
    document: Document,
    selection: Selection,
    history: HistoryLog,
}

impl Session {
    /// An empty session with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty session with the given history configuration.
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            document: Document::new(),
            selection: Selection::default(),
            history: HistoryLog::new(config),
        }
    }

    /// A session over existing text, caret at the start, empty history.
    pub fn from_text(text: &str, config: HistoryConfig) -> Self {
        Self {
            document: Document::from(text),
            selection: Selection::default(),
            history: HistoryLog::new(config),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> String {
        self.document.to_string()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Makes the next edit start a fresh undo event regardless of the
    /// coalescing policy.
    pub fn force_event_break(&mut self) {
        self.history.force_event_break();
    }

    /// Applies an edit and records it in history.
    ///
    /// `replacements` must be in ascending order and non-overlapping, with
    /// offsets into the current document. `selection_after` becomes the live
    /// selection; pass the caller's post-edit cursor state. An empty edit
    /// degrades to a selection move and touches neither stack's edits.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::MalformedChange`] if any replacement or the
    /// new selection does not fit the document. The session is unchanged on
    /// error.
    pub fn edit(
        &mut self,
        replacements: &[Replacement],
        selection_after: Selection,
    ) -> Result<(), HistoryError> {
        let changes = ChangeSet::from_replacements(self.document.text(), replacements)?;
        if changes.is_empty() {
            return self.set_selection(selection_after);
        }
        let next = self.document.apply(&changes)?;
        if selection_after.max_offset() > next.len_chars() {
            return Err(selection_bounds_error(&selection_after, next.len_chars()));
        }

        self.history.record_edit(
            changes,
            self.selection.clone(),
            selection_after.clone(),
        )?;
        self.document = next;
        self.selection = selection_after;
        Ok(())
    }

    /// Moves the selection without touching the document.
    ///
    /// The move is recorded so that undoing past the surrounding edits can
    /// restore it, and it breaks edit coalescing, but it never discards the
    /// redo stack.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::MalformedChange`] if the selection reaches
    /// beyond the document.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), HistoryError> {
        if selection.max_offset() > self.document.len_chars() {
            return Err(selection_bounds_error(&selection, self.document.len_chars()));
        }
        self.history.record_selection(selection.clone());
        self.selection = selection;
        Ok(())
    }

    /// Reverts the most recent history event.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. For an edit event
    /// the inverse change is applied and the selection returns to where the
    /// event started; for a selection-only event just the selection moves.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CorruptHistory`] if the top event does not
    /// fit the current document. Nothing is mutated in that case.
    pub fn undo(&mut self) -> Result<bool, HistoryError> {
        let Some(event) = self.history.peek_done() else {
            return Ok(false);
        };

        // Work everything out against the peeked event first so an
        // inconsistent stack leaves the session untouched.
        let (next_doc, next_sel) = match &event.changes {
            Some(changes) => {
                let inverse = changes.invert();
                let next = self.document.apply(&inverse).map_err(|e| {
                    HistoryError::CorruptHistory(format!("undo does not fit document: {e}"))
                })?;
                let sel = match &event.start_selection {
                    Some(sel) => sel.clone(),
                    None => self.selection.map_through(&inverse),
                };
                (next, sel)
            }
            None => {
                let Some(sel) = event.selections_after.first() else {
                    return Err(HistoryError::CorruptHistory(
                        "selection event holds no selection".to_string(),
                    ));
                };
                (self.document.clone(), sel.clone())
            }
        };
        if next_sel.max_offset() > next_doc.len_chars() {
            return Err(HistoryError::CorruptHistory(format!(
                "undo selection offset {} beyond document length {}",
                next_sel.max_offset(),
                next_doc.len_chars()
            )));
        }

        let event = match self.history.pop_done() {
            Some(event) => event,
            None => return Ok(false),
        };
        tracing::trace!(
            selection_only = event.is_selection_only(),
            "reverting history event"
        );
        self.history.push_undone(event);
        self.document = next_doc;
        self.selection = next_sel;
        Ok(true)
    }

    /// Re-applies the most recently undone event.
    ///
    /// Returns `Ok(false)` when there is nothing to redo. The selection
    /// becomes the event's final recorded selection, or the current one
    /// mapped through the change when none was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CorruptHistory`] if the event does not fit
    /// the current document. Nothing is mutated in that case.
    pub fn redo(&mut self) -> Result<bool, HistoryError> {
        let Some(event) = self.history.peek_undone() else {
            return Ok(false);
        };

        let (next_doc, next_sel) = match &event.changes {
            Some(changes) => {
                let next = self.document.apply(changes).map_err(|e| {
                    HistoryError::CorruptHistory(format!("redo does not fit document: {e}"))
                })?;
                let sel = match event.selections_after.last() {
                    Some(sel) => sel.clone(),
                    None => self.selection.map_through(changes),
                };
                (next, sel)
            }
            None => {
                let Some(sel) = event.selections_after.first() else {
                    return Err(HistoryError::CorruptHistory(
                        "selection event holds no selection".to_string(),
                    ));
                };
                (self.document.clone(), sel.clone())
            }
        };
        if next_sel.max_offset() > next_doc.len_chars() {
            return Err(HistoryError::CorruptHistory(format!(
                "redo selection offset {} beyond document length {}",
                next_sel.max_offset(),
                next_doc.len_chars()
            )));
        }

        let event = match self.history.pop_undone() {
            Some(event) => event,
            None => return Ok(false),
        };
        tracing::trace!(
            selection_only = event.is_selection_only(),
            "re-applying undone event"
        );
        self.history.push_done(event);
        self.document = next_doc;
        self.selection = next_sel;
        Ok(true)
    }

    /// Exports the whole session as a portable record.
    pub fn serialize(&self) -> SessionRecord {
        record::serialize(&self.document, &self.selection, &self.history)
    }

    /// Replaces this session's entire state with a deserialized record,
    /// keeping the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidRecord`] if the record fails
    /// validation; the live session is left exactly as it was.
    pub fn replace_session(&mut self, record: &SessionRecord) -> Result<(), HistoryError> {
        let config = self.history.config().clone();
        let (document, selection, history) = record::deserialize(record, config)?;
        tracing::debug!(
            doc_chars = document.len_chars(),
            done = history.done().len(),
            undone = history.undone().len(),
            "replacing session from record"
        );
        self.install(document, selection, history)
    }

    /// Atomically swaps in reconstructed session parts.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CorruptHistory`] if the selection does not
    /// fit the document.
    pub fn install(
        &mut self,
        document: Document,
        selection: Selection,
        history: HistoryLog,
    ) -> Result<(), HistoryError> {
        if selection.max_offset() > document.len_chars() {
            return Err(HistoryError::CorruptHistory(format!(
                "selection offset {} beyond document length {}",
                selection.max_offset(),
                document.len_chars()
            )));
        }
        *self = Session {
            document,
            selection,
            history,
        };
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &HistoryLog {
        &self.history
    }
}

/// Error for a selection reaching beyond a document of `len` chars. The
/// range that reaches furthest becomes the reported invalid span.
fn selection_bounds_error(selection: &Selection, len: usize) -> HistoryError {
    let range = selection
        .ranges()
        .iter()
        .copied()
        .max_by_key(|r| r.max_offset())
        .unwrap_or_default();
    HistoryError::MalformedChange(ChangeError::MalformedChange {
        from: range.anchor.min(range.head),
        to: range.max_offset(),
        len,
    })
}
