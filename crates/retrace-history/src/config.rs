//! Configuration for history grouping and depth.

/// Time window in milliseconds for merging consecutive edits into a single
/// undo event under [`GroupingPolicy::MergeWithinTimeout`].
const DEFAULT_GROUP_TIMEOUT_MS: u64 = 500;

/// Maximum number of events kept on the `done` stack before the oldest are
/// evicted.
const DEFAULT_MAX_DEPTH: usize = 1_000;

/// When consecutive edits are merged into one undo event.
///
/// Merging never happens across an undo/redo, a forced break, a selection
/// move, or a selection-only event at the top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingPolicy {
    /// Every edit becomes its own undo event.
    AlwaysNewEvent,
    /// Merge when the new edit touches the spans the previous event edited,
    /// regardless of timing.
    MergeAdjacent,
    /// Merge when the new edit is adjacent *and* arrives within the given
    /// window (milliseconds) of the previous one.
    MergeWithinTimeout(u64),
}

impl Default for GroupingPolicy {
    fn default() -> Self {
        Self::MergeWithinTimeout(DEFAULT_GROUP_TIMEOUT_MS)
    }
}

/// Configuration for the history log.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Coalescing policy for consecutive edits.
    pub policy: GroupingPolicy,
    /// Max events on the `done` stack; oldest are evicted beyond this.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            policy: GroupingPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
