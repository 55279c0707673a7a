//! Immutable document snapshots.

use std::fmt;

use ropey::Rope;

use crate::changes::{ChangeError, ChangeSet};

/// The current text content plus a monotonically increasing version counter.
///
/// A `Document` is never mutated in place: applying a change set produces a
/// fresh snapshot with the version bumped by one. The rope makes those
/// snapshots cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: Rope,
    version: u64,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self {
            text: Rope::from_str(text),
            version: 0,
        }
    }
}

impl Document {
    /// An empty document at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len_chars() == 0
    }

    /// Applies a change set, returning the next snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::MalformedChange`] if the change set does not
    /// fit this document; `self` is left untouched either way.
    pub fn apply(&self, changes: &ChangeSet) -> Result<Document, ChangeError> {
        let text = changes.apply(&self.text)?;
        Ok(Document {
            text,
            version: self.version + 1,
        })
    }
}
