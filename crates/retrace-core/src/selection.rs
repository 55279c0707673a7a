//! Immutable selection snapshots.

use serde::{Deserialize, Serialize};

use crate::changes::ChangeSet;

/// One selection range: `anchor` is the fixed end, `head` the moving end.
/// A caret is a range with `anchor == head`. Offsets are char positions in
/// `0..=len` of the associated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionRange {
    pub anchor: usize,
    pub head: usize,
}

impl SelectionRange {
    /// A caret at `pos`.
    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    /// The larger of the two offsets.
    pub fn max_offset(&self) -> usize {
        self.anchor.max(self.head)
    }
}

/// An immutable snapshot of cursor/selection state: one or more ranges plus
/// the index of the main range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
    main: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Self::single(0, 0)
    }
}

impl Selection {
    /// A single-range selection from `anchor` to `head`.
    pub fn single(anchor: usize, head: usize) -> Self {
        Self {
            ranges: vec![SelectionRange { anchor, head }],
            main: 0,
        }
    }

    /// A multi-range selection. Returns `None` if `ranges` is empty or
    /// `main` is not a valid index, so an invalid snapshot cannot exist.
    pub fn new(ranges: Vec<SelectionRange>, main: usize) -> Option<Self> {
        if ranges.is_empty() || main >= ranges.len() {
            return None;
        }
        Some(Self { ranges, main })
    }

    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    /// Index of the main range.
    pub fn main_index(&self) -> usize {
        self.main
    }

    /// The main range itself.
    pub fn main(&self) -> SelectionRange {
        self.ranges[self.main]
    }

    /// The largest offset any range touches; used for bounds validation.
    pub fn max_offset(&self) -> usize {
        self.ranges
            .iter()
            .map(SelectionRange::max_offset)
            .max()
            .unwrap_or(0)
    }

    /// Recomputes every anchor/head through a change set applied to the
    /// document this selection belongs to.
    pub fn map_through(&self, changes: &ChangeSet) -> Selection {
        let ranges = self
            .ranges
            .iter()
            .map(|r| SelectionRange {
                anchor: changes.map_pos(r.anchor),
                head: changes.map_pos(r.head),
            })
            .collect();
        Selection {
            ranges,
            main: self.main,
        }
    }
}
