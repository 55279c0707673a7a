/// Leaf types for the editing engine: invertible change sets, immutable
/// selection snapshots, and versioned document snapshots.
///
/// Everything here is pure and side-effect free; history bookkeeping and
/// session state live in the `retrace-history` crate.
pub mod changes;
pub mod document;
pub mod selection;

pub use changes::{ChangeError, ChangeSet, ChangeSpan, Replacement};
pub use document::Document;
pub use selection::{Selection, SelectionRange};
