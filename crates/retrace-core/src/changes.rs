//! Invertible change sets.
//!
//! A [`ChangeSet`] describes a transformation of one text into another as a
//! run of sections: spans of retained characters interleaved with
//! replacements. Every replacement stores the deleted text alongside the
//! inserted text, so a change set can be inverted without access to the
//! document it was built against.
//!
//! All offsets and lengths are in `char` units.

use ropey::Rope;
use thiserror::Error;

/// Errors produced while building, applying, or composing change sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChangeError {
    /// A span's bounds are invalid against the text it targets: out of
    /// bounds, out of order, or overlapping a previous span.
    #[error("malformed change: span {from}..{to} invalid for text of length {len}")]
    MalformedChange {
        /// Start of the offending span (char offset).
        from: usize,
        /// End of the offending span (char offset).
        to: usize,
        /// Length of the text the span was applied against.
        len: usize,
    },
}

/// A caller-facing description of one edit: replace `from..to` with `insert`.
///
/// Within a single edit call, replacements must be sorted ascending and must
/// not overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Start of the replaced span (char offset, inclusive).
    pub from: usize,
    /// End of the replaced span (char offset, exclusive).
    pub to: usize,
    /// Text inserted in place of the span (may be empty).
    pub insert: String,
}

impl Replacement {
    /// Convenience constructor.
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }
}

/// One section of a change set, covering part of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    /// Characters passed through unchanged.
    Retain(usize),
    /// A span of deleted text replaced by inserted text. Either side may be
    /// empty (pure insertion / pure deletion), but not both.
    Replace { deleted: String, inserted: String },
}

/// A borrowed view of one section, exposed for serialization and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSpan<'a> {
    /// Characters retained unchanged.
    Retain(usize),
    /// Deleted text replaced by inserted text.
    Replace {
        /// The text removed from the source.
        deleted: &'a str,
        /// The text put in its place.
        inserted: &'a str,
    },
}

/// Accumulates sections, merging adjacent pieces of the same kind and
/// dropping empty ones.
#[derive(Debug, Default)]
struct SectionBuilder {
    sections: Vec<Section>,
}

impl SectionBuilder {
    fn retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        if let Some(Section::Retain(m)) = self.sections.last_mut() {
            *m += n;
        } else {
            self.sections.push(Section::Retain(n));
        }
    }

    fn replace(&mut self, deleted: String, inserted: String) {
        if deleted.is_empty() && inserted.is_empty() {
            return;
        }
        if let Some(Section::Replace {
            deleted: d,
            inserted: i,
        }) = self.sections.last_mut()
        {
            d.push_str(&deleted);
            i.push_str(&inserted);
        } else {
            self.sections.push(Section::Replace { deleted, inserted });
        }
    }

    fn finish(self) -> ChangeSet {
        ChangeSet {
            sections: self.sections,
        }
    }
}

/// Splits a string after `k` chars.
fn split_chars(s: &str, k: usize) -> (String, String) {
    let byte = s
        .char_indices()
        .nth(k)
        .map(|(b, _)| b)
        .unwrap_or(s.len());
    (s[..byte].to_string(), s[byte..].to_string())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// An ordered, invertible description of a text transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    sections: Vec<Section>,
}

impl ChangeSet {
    /// Builds a change set from ascending, non-overlapping replacements
    /// against `text`, capturing the deleted text from the rope.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::MalformedChange`] if a span is out of bounds,
    /// reversed, or overlaps the previous span.
    pub fn from_replacements(text: &Rope, spans: &[Replacement]) -> Result<Self, ChangeError> {
        let len = text.len_chars();
        let mut builder = SectionBuilder::default();
        let mut pos = 0usize;
        for span in spans {
            if span.from > span.to || span.to > len || span.from < pos {
                return Err(ChangeError::MalformedChange {
                    from: span.from,
                    to: span.to,
                    len,
                });
            }
            builder.retain(span.from - pos);
            let deleted = text.slice(span.from..span.to).to_string();
            builder.replace(deleted, span.insert.clone());
            pos = span.to;
        }
        builder.retain(len - pos);
        Ok(builder.finish())
    }

    /// Builds a single-span change set replacing `from..to` with `insert`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::MalformedChange`] on invalid bounds.
    pub fn single(
        text: &Rope,
        from: usize,
        to: usize,
        insert: impl Into<String>,
    ) -> Result<Self, ChangeError> {
        Self::from_replacements(text, &[Replacement::new(from, to, insert)])
    }

    /// Iterates the sections of this change set in order.
    pub fn spans(&self) -> impl Iterator<Item = ChangeSpan<'_>> + '_ {
        self.sections.iter().map(|s| match s {
            Section::Retain(n) => ChangeSpan::Retain(*n),
            Section::Replace { deleted, inserted } => ChangeSpan::Replace {
                deleted,
                inserted,
            },
        })
    }

    /// True if this change set leaves the text untouched.
    pub fn is_empty(&self) -> bool {
        self.sections
            .iter()
            .all(|s| matches!(s, Section::Retain(_)))
    }

    /// Length in chars of the text this change set applies to.
    pub fn len_before(&self) -> usize {
        self.sections
            .iter()
            .map(|s| match s {
                Section::Retain(n) => *n,
                Section::Replace { deleted, .. } => char_len(deleted),
            })
            .sum()
    }

    /// Length in chars of the text this change set produces.
    pub fn len_after(&self) -> usize {
        self.sections
            .iter()
            .map(|s| match s {
                Section::Retain(n) => *n,
                Section::Replace { inserted, .. } => char_len(inserted),
            })
            .sum()
    }

    /// Applies this change set to `text`, producing the transformed rope.
    ///
    /// Deterministic and pure; `text` itself is never mutated.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::MalformedChange`] if `text` is not the length
    /// this change set was built against. Checked before any work, so a
    /// failed apply produces nothing.
    pub fn apply(&self, text: &Rope) -> Result<Rope, ChangeError> {
        let expected = self.len_before();
        if text.len_chars() != expected {
            return Err(ChangeError::MalformedChange {
                from: 0,
                to: expected,
                len: text.len_chars(),
            });
        }
        let mut out = text.clone();
        let mut pos = 0usize;
        for section in &self.sections {
            match section {
                Section::Retain(n) => pos += n,
                Section::Replace { deleted, inserted } => {
                    let del = char_len(deleted);
                    out.remove(pos..pos + del);
                    out.insert(pos, inserted);
                    pos += char_len(inserted);
                }
            }
        }
        Ok(out)
    }

    /// Returns the change set mapping the result text back to the source.
    ///
    /// Pure: because deleted text is stored in each section, no document
    /// context is needed.
    pub fn invert(&self) -> ChangeSet {
        let sections = self
            .sections
            .iter()
            .map(|s| match s {
                Section::Retain(n) => Section::Retain(*n),
                Section::Replace { deleted, inserted } => Section::Replace {
                    deleted: inserted.clone(),
                    inserted: deleted.clone(),
                },
            })
            .collect();
        ChangeSet { sections }
    }

    /// Composes two sequential change sets into one: `self` maps T0 to T1,
    /// `other` maps T1 to T2, the result maps T0 directly to T2.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeError::MalformedChange`] if `other` does not apply to
    /// the text `self` produces.
    pub fn compose(&self, other: &ChangeSet) -> Result<ChangeSet, ChangeError> {
        if self.len_after() != other.len_before() {
            return Err(ChangeError::MalformedChange {
                from: 0,
                to: other.len_before(),
                len: self.len_after(),
            });
        }

        let mut a_rest = self.sections.iter().cloned();
        let mut b_rest = other.sections.iter().cloned();
        let mut a_cur = a_rest.next();
        let mut b_cur = b_rest.next();
        let mut out = SectionBuilder::default();

        loop {
            match (a_cur.take(), b_cur.take()) {
                (None, None) => break,
                // `a` consumes source text and produces nothing; pass through.
                (Some(Section::Replace { deleted, inserted }), b_opt)
                    if inserted.is_empty() =>
                {
                    out.replace(deleted, String::new());
                    b_cur = b_opt;
                    a_cur = a_rest.next();
                }
                // `b` inserts without consuming; emit directly.
                (a_opt, Some(Section::Replace { deleted, inserted }))
                    if deleted.is_empty() =>
                {
                    out.replace(String::new(), inserted);
                    a_cur = a_opt;
                    b_cur = b_rest.next();
                }
                (Some(Section::Retain(n)), Some(Section::Retain(m))) => {
                    let k = n.min(m);
                    out.retain(k);
                    a_cur = (n > k).then_some(Section::Retain(n - k)).or_else(|| a_rest.next());
                    b_cur = (m > k).then_some(Section::Retain(m - k)).or_else(|| b_rest.next());
                }
                // `b` edits text `a` retained: the deleted chars are original
                // source chars, carried by `b`'s section.
                (Some(Section::Retain(n)), Some(Section::Replace { deleted, inserted })) => {
                    let dlen = char_len(&deleted);
                    let k = n.min(dlen);
                    let (head, tail) = split_chars(&deleted, k);
                    if k == dlen {
                        out.replace(head, inserted);
                        b_cur = b_rest.next();
                    } else {
                        out.replace(head, String::new());
                        b_cur = Some(Section::Replace {
                            deleted: tail,
                            inserted,
                        });
                    }
                    a_cur = (n > k).then_some(Section::Retain(n - k)).or_else(|| a_rest.next());
                }
                // `b` keeps part of `a`'s insertion.
                (Some(Section::Replace { deleted, inserted }), Some(Section::Retain(m))) => {
                    let ilen = char_len(&inserted);
                    let k = m.min(ilen);
                    let (head, tail) = split_chars(&inserted, k);
                    out.replace(deleted, head);
                    a_cur = if k < ilen {
                        Some(Section::Replace {
                            deleted: String::new(),
                            inserted: tail,
                        })
                    } else {
                        a_rest.next()
                    };
                    b_cur = (m > k).then_some(Section::Retain(m - k)).or_else(|| b_rest.next());
                }
                // `b` deletes part of `a`'s insertion: that text existed in
                // neither endpoint, so it vanishes from the composition.
                (
                    Some(Section::Replace { deleted, inserted }),
                    Some(Section::Replace {
                        deleted: b_del,
                        inserted: b_ins,
                    }),
                ) => {
                    let ilen = char_len(&inserted);
                    let blen = char_len(&b_del);
                    let k = ilen.min(blen);
                    let (_, a_tail) = split_chars(&inserted, k);
                    let (_, b_tail) = split_chars(&b_del, k);
                    out.replace(deleted, String::new());
                    a_cur = if k < ilen {
                        Some(Section::Replace {
                            deleted: String::new(),
                            inserted: a_tail,
                        })
                    } else {
                        a_rest.next()
                    };
                    if k < blen {
                        b_cur = Some(Section::Replace {
                            deleted: b_tail,
                            inserted: b_ins,
                        });
                    } else {
                        out.replace(String::new(), b_ins);
                        b_cur = b_rest.next();
                    }
                }
                // One stream exhausted while the other still has length:
                // the length check above should have caught this.
                (a_opt, b_opt) => {
                    let _ = (a_opt, b_opt);
                    return Err(ChangeError::MalformedChange {
                        from: 0,
                        to: other.len_before(),
                        len: self.len_after(),
                    });
                }
            }
        }

        Ok(out.finish())
    }

    /// Maps a position in the source text to the result text.
    ///
    /// Positions before an edit are unchanged, positions inside a deleted
    /// span collapse to the span's start, positions after an edit shift by
    /// the length delta. A position exactly at an edit's start stays at the
    /// start of the replacement.
    pub fn map_pos(&self, pos: usize) -> usize {
        let mut old = 0usize;
        let mut new = 0usize;
        for section in &self.sections {
            match section {
                Section::Retain(n) => {
                    if pos < old + n {
                        return new + (pos - old);
                    }
                    old += n;
                    new += n;
                }
                Section::Replace { deleted, inserted } => {
                    let dlen = char_len(deleted);
                    if pos <= old || pos < old + dlen {
                        return new;
                    }
                    old += dlen;
                    new += char_len(inserted);
                }
            }
        }
        new + pos.saturating_sub(old)
    }

    /// Spans of deleted text in the source document, ascending.
    pub fn changed_ranges_before(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        for section in &self.sections {
            match section {
                Section::Retain(n) => pos += n,
                Section::Replace { deleted, .. } => {
                    let dlen = char_len(deleted);
                    out.push((pos, pos + dlen));
                    pos += dlen;
                }
            }
        }
        out
    }

    /// Spans of inserted text in the result document, ascending.
    pub fn changed_ranges_after(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        for section in &self.sections {
            match section {
                Section::Retain(n) => pos += n,
                Section::Replace { inserted, .. } => {
                    let ilen = char_len(inserted);
                    out.push((pos, pos + ilen));
                    pos += ilen;
                }
            }
        }
        out
    }

    /// True if any of this change set's source spans touch any of the spans
    /// `previous` produced, i.e. the two edits are adjacent in the document
    /// `previous` resulted in.
    pub fn is_adjacent_to(&self, previous: &ChangeSet) -> bool {
        let before = self.changed_ranges_before();
        previous
            .changed_ranges_after()
            .iter()
            .any(|&(pf, pt)| before.iter().any(|&(f, t)| f <= pt && t >= pf))
    }
}
