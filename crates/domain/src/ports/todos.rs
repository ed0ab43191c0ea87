use crate::DomainResult;
use crate::todo::Todo;

use super::BoxFuture;

/// Outcome of a full replace, for logging only. Skipped items were dropped
/// after a warning; the stored list may be a subset of the submitted one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub replaced: usize,
    pub skipped: usize,
}

pub trait TodoRepository: Send + Sync {
    /// Every stored todo, in backend-defined order. Callers must not assume
    /// a stable ordering across calls.
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Todo>>>;

    fn count(&self) -> BoxFuture<'_, DomainResult<i64>>;

    /// Deletes every stored todo unconditionally, then upserts the submitted
    /// ones keyed by guid, one round trip per item. Not atomic across the
    /// batch: a failed upsert leaves a partial list, and concurrent callers
    /// race with last-writer-wins semantics.
    fn replace_all(&self, todos: &[Todo]) -> BoxFuture<'_, DomainResult<ReplaceOutcome>>;
}
