//! The portable session record and its (de)serializer.
//!
//! A [`SessionRecord`] is the JSON-compatible, versionless form of a whole
//! editing session: document text, live selection, and both history stacks.
//! Event changes are stored in the compact run-length form: a plain integer
//! retains that many chars, `[deleteLength]` deletes, and
//! `[deleteLength, insertedText]` replaces. A `done` entry's changes are
//! oriented so that popping the entry (undo) applies them directly to the
//! document as it then stands; an `undone` entry's changes likewise apply on
//! redo. Internally events hold the forward edit, so the serializer inverts
//! `done` entries on write and re-inverts on read.
//!
//! Deserialization is a validation pass, not a cast: out-of-range `main`
//! indexes, selections beyond the document, and change spans overrunning the
//! implied document length at their replay point are all rejected with
//! [`HistoryError::InvalidRecord`] rather than clamped.

use serde::{Deserialize, Serialize};

use retrace_core::{ChangeSet, ChangeSpan, Document, Replacement, Selection, SelectionRange};

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::event::HistoryEvent;
use crate::log::HistoryLog;

/// The portable form of a full editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub doc: String,
    pub selection: SelectionRecord,
    pub history: HistoryRecord,
}

/// Serialized selection: ranges plus the main-range index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub ranges: Vec<SelectionRange>,
    pub main: usize,
}

/// Serialized history stacks, oldest event first in each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub done: Vec<EventRecord>,
    pub undone: Vec<EventRecord>,
}

/// One serialized history event. Absent fields are omitted, not null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<CompactSpan>>,
    #[serde(
        rename = "startSelection",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_selection: Option<SelectionRecord>,
    #[serde(
        rename = "selectionsAfter",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub selections_after: Vec<SelectionRecord>,
}

/// One entry of a compact change list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompactSpan {
    /// Number of chars retained unchanged.
    Retain(usize),
    /// `[deleteLength]` or `[deleteLength, insertedText…]`; multiple text
    /// atoms are lines joined with a newline.
    Replace(Vec<ReplaceAtom>),
}

/// An element of a replace span: the leading delete length or inserted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplaceAtom {
    Len(usize),
    Text(String),
}

impl SessionRecord {
    /// Parses a record from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidRecord`] if the text is not a
    /// structurally valid record.
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        serde_json::from_str(json)
            .map_err(|e| HistoryError::InvalidRecord(format!("not a session record: {e}")))
    }

    /// Renders the record as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidRecord`] if encoding fails, which
    /// plain string/number data never does in practice.
    pub fn to_json(&self) -> Result<String, HistoryError> {
        serde_json::to_string(self)
            .map_err(|e| HistoryError::InvalidRecord(format!("record not encodable: {e}")))
    }
}

/// Serializes a live session triple into a portable record.
pub fn serialize(document: &Document, selection: &Selection, history: &HistoryLog) -> SessionRecord {
    SessionRecord {
        doc: document.to_string(),
        selection: selection_record(selection),
        history: HistoryRecord {
            done: history
                .done()
                .iter()
                .map(|e| event_record(e, Orientation::Undo))
                .collect(),
            undone: history
                .undone()
                .iter()
                .map(|e| event_record(e, Orientation::Redo))
                .collect(),
        },
    }
}

/// Reconstructs a session triple from a portable record.
///
/// `config` supplies the coalescing policy and depth for the rebuilt log;
/// the record itself is versionless and carries neither.
///
/// # Errors
///
/// Returns [`HistoryError::InvalidRecord`] on any structural or bounds
/// failure. No partial result is ever produced.
pub fn deserialize(
    record: &SessionRecord,
    config: HistoryConfig,
) -> Result<(Document, Selection, HistoryLog), HistoryError> {
    let document = Document::from(record.doc.as_str());
    let selection = decode_selection(&record.selection)?;
    if selection.max_offset() > document.len_chars() {
        return Err(HistoryError::InvalidRecord(format!(
            "selection offset {} beyond document length {}",
            selection.max_offset(),
            document.len_chars()
        )));
    }

    let done = replay_events(&record.history.done, &document, Orientation::Undo)?;
    let undone = replay_events(&record.history.undone, &document, Orientation::Redo)?;
    let history = HistoryLog::from_parts(done, undone, config);
    Ok((document, selection, history))
}

/// Which stack an event record belongs to, fixing the direction its stored
/// changes apply in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    /// `done`: stored changes apply on undo (newer doc to older doc).
    Undo,
    /// `undone`: stored changes apply on redo (current doc to newer doc).
    Redo,
}

fn selection_record(selection: &Selection) -> SelectionRecord {
    SelectionRecord {
        ranges: selection.ranges().to_vec(),
        main: selection.main_index(),
    }
}

fn decode_selection(record: &SelectionRecord) -> Result<Selection, HistoryError> {
    Selection::new(record.ranges.clone(), record.main).ok_or_else(|| {
        HistoryError::InvalidRecord(format!(
            "selection main index {} out of range for {} ranges",
            record.main,
            record.ranges.len()
        ))
    })
}

fn event_record(event: &HistoryEvent, orientation: Orientation) -> EventRecord {
    EventRecord {
        changes: event.changes.as_ref().map(|forward| match orientation {
            Orientation::Undo => compact(&forward.invert()),
            Orientation::Redo => compact(forward),
        }),
        start_selection: event.start_selection.as_ref().map(selection_record),
        selections_after: event.selections_after.iter().map(selection_record).collect(),
    }
}

fn compact(changes: &ChangeSet) -> Vec<CompactSpan> {
    changes
        .spans()
        .map(|span| match span {
            ChangeSpan::Retain(n) => CompactSpan::Retain(n),
            ChangeSpan::Replace { deleted, inserted } => {
                let mut atoms = vec![ReplaceAtom::Len(deleted.chars().count())];
                if !inserted.is_empty() {
                    atoms.push(ReplaceAtom::Text(inserted.to_string()));
                }
                CompactSpan::Replace(atoms)
            }
        })
        .collect()
}

/// Decodes a compact change list into replacements against a document of
/// `doc_len` chars. A missing trailing retain is implicit; any span running
/// past `doc_len` is rejected.
fn decode_compact(
    spans: &[CompactSpan],
    doc_len: usize,
) -> Result<Vec<Replacement>, HistoryError> {
    let mut replacements = Vec::new();
    let mut pos = 0usize;
    for span in spans {
        match span {
            CompactSpan::Retain(n) => {
                // Lengths come from untrusted JSON; unchecked addition would
                // wrap and sail past the bounds checks below.
                pos = pos.checked_add(*n).ok_or_else(|| {
                    HistoryError::InvalidRecord(format!(
                        "retain length {n} at {pos} overflows"
                    ))
                })?;
            }
            CompactSpan::Replace(atoms) => {
                let mut atoms = atoms.iter();
                let del = match atoms.next() {
                    Some(ReplaceAtom::Len(n)) => *n,
                    _ => {
                        return Err(HistoryError::InvalidRecord(
                            "replace span must start with a delete length".to_string(),
                        ))
                    }
                };
                let mut lines = Vec::new();
                for atom in atoms {
                    match atom {
                        ReplaceAtom::Text(text) => lines.push(text.as_str()),
                        ReplaceAtom::Len(_) => {
                            return Err(HistoryError::InvalidRecord(
                                "replace span holds a length after its text".to_string(),
                            ))
                        }
                    }
                }
                let end = pos.checked_add(del).ok_or_else(|| {
                    HistoryError::InvalidRecord(format!(
                        "delete length {del} at {pos} overflows"
                    ))
                })?;
                if end > doc_len {
                    return Err(HistoryError::InvalidRecord(format!(
                        "change span {pos}..{end} beyond document length {doc_len}"
                    )));
                }
                replacements.push(Replacement::new(pos, end, lines.join("\n")));
                pos = end;
            }
        }
        if pos > doc_len {
            return Err(HistoryError::InvalidRecord(format!(
                "change spans cover {pos} chars of a {doc_len}-char document"
            )));
        }
    }
    Ok(replacements)
}

/// Rebuilds internal events from serialized ones.
///
/// Records list events oldest first, but each entry's changes apply to the
/// document as it stands when that entry is on top of its stack, so replay
/// walks from the top (last entry) down, reconstructing each older (for
/// `done`) or further-redone (for `undone`) document along the way. The
/// walk is also what recovers deleted text, which the compact form omits.
fn replay_events(
    records: &[EventRecord],
    current: &Document,
    orientation: Orientation,
) -> Result<Vec<HistoryEvent>, HistoryError> {
    let mut cur = current.clone();
    let mut events = Vec::with_capacity(records.len());
    for record in records.iter().rev() {
        let top_len = cur.len_chars();
        let mut forward = None;
        if let Some(compact) = &record.changes {
            let replacements = decode_compact(compact, top_len)?;
            let pop_change = ChangeSet::from_replacements(cur.text(), &replacements)
                .map_err(|e| HistoryError::InvalidRecord(format!("unusable change spans: {e}")))?;
            let next = cur
                .apply(&pop_change)
                .map_err(|e| HistoryError::InvalidRecord(format!("unusable change spans: {e}")))?;
            forward = Some(match orientation {
                Orientation::Undo => pop_change.invert(),
                Orientation::Redo => pop_change,
            });
            cur = next;
        }
        let below_len = cur.len_chars();
        // The document each restorable snapshot belongs to.
        let (start_len, after_len) = match orientation {
            Orientation::Undo => (below_len, top_len),
            Orientation::Redo => (top_len, below_len),
        };

        let start_selection = record
            .start_selection
            .as_ref()
            .map(decode_selection)
            .transpose()?;
        if let Some(sel) = &start_selection {
            check_selection_len(sel, start_len)?;
        }
        let selections_after = record
            .selections_after
            .iter()
            .map(decode_selection)
            .collect::<Result<Vec<_>, _>>()?;
        // Only the snapshots undo/redo actually restore are bounds-checked;
        // intermediate entries may reference transient document lengths.
        if let Some(last) = selections_after.last() {
            check_selection_len(last, after_len)?;
        }
        if forward.is_none() {
            if let Some(first) = selections_after.first() {
                check_selection_len(first, top_len)?;
            }
        }

        events.push(HistoryEvent {
            changes: forward,
            start_selection,
            selections_after,
        });
    }
    events.reverse();
    Ok(events)
}

fn check_selection_len(selection: &Selection, len: usize) -> Result<(), HistoryError> {
    if selection.max_offset() > len {
        return Err(HistoryError::InvalidRecord(format!(
            "history selection offset {} beyond document length {len}",
            selection.max_offset()
        )));
    }
    Ok(())
}
