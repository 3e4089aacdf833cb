//! The `OutputWriter` trait implemented by backend writers.

use crate::{AllocationRow, CompletionRow, OutputResult};

/// All methods are infallible from the observer's perspective: errors are
/// stored and retrieved with [`OutputObserver::take_error`][crate::OutputObserver::take_error].
pub trait OutputWriter {
    fn write_allocation(&mut self, row: &AllocationRow) -> OutputResult<()>;

    fn write_completion(&mut self, row: &CompletionRow) -> OutputResult<()>;

    /// Flush all underlying file handles.
    ///
    /// Idempotent; safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
