//! Batch helpers for command behaviors that fan out over many items.
//!
//! These sit outside the core pipeline and follow a different error policy:
//! a failing item is logged and skipped so the rest of the batch completes,
//! instead of aborting the run the way pipeline errors do.

use rayon::prelude::*;

use crate::error::FigtreeError;

/// Apply `work` to every item in parallel, collecting the successful
/// results. Failures are logged at error level and dropped. Result order
/// follows input order.
pub fn map_ok<T, R, F>(items: &[T], work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, FigtreeError> + Sync,
{
    items
        .par_iter()
        .filter_map(|item| match work(item) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::error!("batch item failed: {err}");
                None
            }
        })
        .collect()
}

/// Split a slice into evenly sized chunks (the last may be shorter).
/// A zero `chunk_size` is treated as 1.
pub fn chunk<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(chunk_size.max(1))
        .map(|c| c.to_vec())
        .collect()
}
