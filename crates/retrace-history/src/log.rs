//! The history log: two event stacks with coalescing.
//!
//! `done` and `undone` are plain vectors used as stacks, most recent event
//! last. Recording a new edit clears `undone`; the history is strictly
//! linear, never a tree.

use std::time::{Duration, Instant};

use retrace_core::{ChangeSet, Selection};

use crate::config::{GroupingPolicy, HistoryConfig};
use crate::error::HistoryError;
use crate::event::HistoryEvent;

/// Undo/redo event stacks for a single editing session.
#[derive(Debug)]
pub struct HistoryLog {
    /// Applied events, oldest first.
    done: Vec<HistoryEvent>,
    /// Undone events, most recently undone last.
    undone: Vec<HistoryEvent>,
    /// Configuration parameters.
    config: HistoryConfig,
    /// Timestamp of the last recorded edit; `None` forces the next edit to
    /// start a new event.
    last_edit_time: Option<Instant>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryLog {
    /// Creates an empty log.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            config,
            last_edit_time: None,
        }
    }

    /// Builds a log from reconstructed stacks, oldest event first in each.
    ///
    /// Used when a serialized session becomes live again. Events beyond
    /// `config.max_depth` are evicted from the bottom of `done`.
    pub fn from_parts(
        mut done: Vec<HistoryEvent>,
        undone: Vec<HistoryEvent>,
        config: HistoryConfig,
    ) -> Self {
        if done.len() > config.max_depth {
            let excess = done.len() - config.max_depth;
            done.drain(..excess);
        }
        Self {
            done,
            undone,
            config,
            last_edit_time: None,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn done(&self) -> &[HistoryEvent] {
        &self.done
    }

    pub fn undone(&self) -> &[HistoryEvent] {
        &self.undone
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Forces the next edit to start a new undo event regardless of policy.
    pub fn force_event_break(&mut self) {
        self.last_edit_time = None;
    }

    /// Records an edit, either coalescing it into the top `done` event or
    /// pushing a new one, then clears `undone`.
    ///
    /// `changes` is the forward change already applied to the document;
    /// `start_selection` is the selection it started from.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::CorruptHistory`] if the top event's changes
    /// cannot be composed with `changes`, which indicates the log no longer
    /// matches the document. Nothing is recorded in that case.
    pub(crate) fn record_edit(
        &mut self,
        changes: ChangeSet,
        start_selection: Selection,
        selection_after: Selection,
    ) -> Result<(), HistoryError> {
        let now = Instant::now();
        // Compose before mutating anything so a failure records nothing.
        let merged = if self.mergeable(now) {
            match self.done.last().and_then(|e| e.changes.as_ref()) {
                Some(prev) if changes.is_adjacent_to(prev) => {
                    Some(prev.compose(&changes).map_err(|e| {
                        HistoryError::CorruptHistory(format!(
                            "cannot fold edit into current event: {e}"
                        ))
                    })?)
                }
                _ => None,
            }
        } else {
            None
        };

        self.undone.clear();
        self.last_edit_time = Some(now);

        if let Some(composed) = merged {
            if let Some(event) = self.done.last_mut() {
                tracing::trace!("folding edit into current history event");
                event.changes = Some(composed);
                event.selections_after.push(selection_after);
                return Ok(());
            }
        }

        self.done
            .push(HistoryEvent::from_edit(changes, start_selection, selection_after));
        if self.done.len() > self.config.max_depth {
            let excess = self.done.len() - self.config.max_depth;
            self.done.drain(..excess);
        }
        Ok(())
    }

    /// Whether the configured policy allows folding an edit arriving `now`
    /// into the top `done` event. Adjacency is checked separately.
    fn mergeable(&self, now: Instant) -> bool {
        let Some(last) = self.last_edit_time else {
            return false;
        };
        match self.config.policy {
            GroupingPolicy::AlwaysNewEvent => false,
            GroupingPolicy::MergeAdjacent => true,
            GroupingPolicy::MergeWithinTimeout(ms) => {
                now.duration_since(last) < Duration::from_millis(ms)
            }
        }
    }

    /// Records a selection move into the top `done` event, or as a
    /// selection-only event when the log is empty.
    ///
    /// Does not clear `undone`: moving the cursor must not discard the redo
    /// branch. It does break edit coalescing.
    pub(crate) fn record_selection(&mut self, selection: Selection) {
        self.last_edit_time = None;
        match self.done.last_mut() {
            Some(event) => {
                if event.selections_after.last() != Some(&selection) {
                    event.selections_after.push(selection);
                }
            }
            None => self.done.push(HistoryEvent::selection_only(vec![selection])),
        }
    }

    pub(crate) fn peek_done(&self) -> Option<&HistoryEvent> {
        self.done.last()
    }

    pub(crate) fn peek_undone(&self) -> Option<&HistoryEvent> {
        self.undone.last()
    }

    pub(crate) fn pop_done(&mut self) -> Option<HistoryEvent> {
        self.last_edit_time = None;
        self.done.pop()
    }

    pub(crate) fn pop_undone(&mut self) -> Option<HistoryEvent> {
        self.last_edit_time = None;
        self.undone.pop()
    }

    pub(crate) fn push_undone(&mut self, event: HistoryEvent) {
        self.undone.push(event);
    }

    /// Pushes an event back onto `done` during redo: no coalescing, no
    /// clearing of `undone`.
    pub(crate) fn push_done(&mut self, event: HistoryEvent) {
        self.done.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_core::Document;

    fn insert_at(doc: &Document, at: usize, text: &str) -> (ChangeSet, Document) {
        let changes = ChangeSet::single(doc.text(), at, at, text).unwrap();
        let next = doc.apply(&changes).unwrap();
        (changes, next)
    }

    fn log_with(policy: GroupingPolicy) -> HistoryLog {
        HistoryLog::new(HistoryConfig {
            policy,
            max_depth: 100,
        })
    }

    #[test]
    fn test_always_new_event_never_merges() {
        let mut log = log_with(GroupingPolicy::AlwaysNewEvent);
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "a");
        let (b, _) = insert_at(&doc, 1, "b");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        assert_eq!(log.done().len(), 2);
    }

    #[test]
    fn test_merge_adjacent_folds_typing() {
        let mut log = log_with(GroupingPolicy::MergeAdjacent);
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "a");
        let (b, doc) = insert_at(&doc, 1, "b");
        let (c, _) = insert_at(&doc, 2, "c");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        log.record_edit(c, Selection::single(2, 2), Selection::single(3, 3))
            .unwrap();

        assert_eq!(log.done().len(), 1);
        let event = &log.done()[0];
        assert_eq!(event.selections_after.len(), 3);
        // The folded change inserts the whole run at once.
        let composed = event.changes.as_ref().unwrap();
        assert_eq!(
            composed.apply(Document::new().text()).unwrap().to_string(),
            "abc"
        );
    }

    #[test]
    fn test_merge_adjacent_skips_distant_edits() {
        let mut log = log_with(GroupingPolicy::MergeAdjacent);
        let doc = Document::from("0123456789");
        let (a, doc) = insert_at(&doc, 0, "x");
        let (b, _) = insert_at(&doc, 9, "y");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        log.record_edit(b, Selection::single(9, 9), Selection::single(10, 10))
            .unwrap();
        assert_eq!(log.done().len(), 2);
    }

    #[test]
    fn test_force_event_break_splits_events() {
        let mut log = log_with(GroupingPolicy::MergeAdjacent);
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "a");
        let (b, _) = insert_at(&doc, 1, "b");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        log.force_event_break();
        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        assert_eq!(log.done().len(), 2);
    }

    #[test]
    fn test_timeout_policy_merges_within_window() {
        // A generous window: consecutive calls land well inside it.
        let mut log = log_with(GroupingPolicy::MergeWithinTimeout(60_000));
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "a");
        let (b, _) = insert_at(&doc, 1, "b");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        assert_eq!(log.done().len(), 1);
    }

    #[test]
    fn test_timeout_policy_zero_window_never_merges() {
        let mut log = log_with(GroupingPolicy::MergeWithinTimeout(0));
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "a");
        let (b, _) = insert_at(&doc, 1, "b");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        assert_eq!(log.done().len(), 2);
    }

    #[test]
    fn test_record_edit_clears_undone() {
        let mut log = log_with(GroupingPolicy::AlwaysNewEvent);
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "a");
        let (b, _) = insert_at(&doc, 1, "b");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        let event = log.pop_done().unwrap();
        log.push_undone(event);
        assert!(log.can_redo());

        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        assert!(!log.can_redo());
    }

    #[test]
    fn test_no_merge_after_undo() {
        let mut log = log_with(GroupingPolicy::MergeAdjacent);
        let doc = Document::new();
        let (a, doc1) = insert_at(&doc, 0, "a");
        let (b, _) = insert_at(&doc1, 1, "b");
        log.record_edit(a, Selection::single(0, 0), Selection::single(1, 1))
            .unwrap();
        // Undo and redo: the restored event must not absorb the next edit.
        let event = log.pop_done().unwrap();
        log.push_undone(event);
        let event = log.pop_undone().unwrap();
        log.push_done(event);
        log.record_edit(b, Selection::single(1, 1), Selection::single(2, 2))
            .unwrap();
        assert_eq!(log.done().len(), 2);
    }

    #[test]
    fn test_selection_record_appends_without_clearing_redo() {
        let mut log = log_with(GroupingPolicy::AlwaysNewEvent);
        let doc = Document::new();
        let (a, doc) = insert_at(&doc, 0, "ab");
        let (b, _) = insert_at(&doc, 2, "c");
        log.record_edit(a, Selection::single(0, 0), Selection::single(2, 2))
            .unwrap();
        log.record_edit(b, Selection::single(2, 2), Selection::single(3, 3))
            .unwrap();
        let event = log.pop_done().unwrap();
        log.push_undone(event);

        log.record_selection(Selection::single(1, 1));
        assert!(log.can_redo());
        assert_eq!(log.done()[0].selections_after.len(), 2);
    }

    #[test]
    fn test_selection_record_on_empty_log_makes_marker_event() {
        let mut log = log_with(GroupingPolicy::AlwaysNewEvent);
        log.record_selection(Selection::single(4, 4));
        assert_eq!(log.done().len(), 1);
        assert!(log.done()[0].is_selection_only());
    }

    #[test]
    fn test_max_depth_evicts_oldest() {
        let mut log = HistoryLog::new(HistoryConfig {
            policy: GroupingPolicy::AlwaysNewEvent,
            max_depth: 3,
        });
        let mut doc = Document::new();
        for i in 0..6 {
            let (changes, next) = insert_at(&doc, i, "x");
            log.record_edit(changes, Selection::single(i, i), Selection::single(i + 1, i + 1))
                .unwrap();
            doc = next;
        }
        assert_eq!(log.done().len(), 3);
    }

    fn dummy_event() -> HistoryEvent {
        HistoryEvent::selection_only(vec![Selection::single(0, 0)])
    }

    #[test]
    fn test_from_parts_caps_depth() {
        let done = (0..10).map(|_| dummy_event()).collect();
        let log = HistoryLog::from_parts(
            done,
            vec![dummy_event()],
            HistoryConfig {
                policy: GroupingPolicy::AlwaysNewEvent,
                max_depth: 4,
            },
        );
        assert_eq!(log.done().len(), 4);
        assert_eq!(log.undone().len(), 1);
    }
}
