//! Filter-size chunking
//!
//! Splits an id list into contiguous sub-lists no larger than the store's
//! "is one of" limit. The concatenation of the chunks is always the input.

use std::num::NonZeroUsize;

/// Partition `ids` into contiguous chunks of at most `limit` items
///
/// An empty input yields no chunks.
#[must_use]
pub fn chunk<T: Clone>(ids: &[T], limit: NonZeroUsize) -> Vec<Vec<T>> {
    ids.chunks(limit.get()).map(<[T]>::to_vec).collect()
}

/// Number of chunks `chunk` produces for `len` items
#[inline]
#[must_use]
pub fn chunk_count(len: usize, limit: NonZeroUsize) -> usize {
    len.div_ceil(limit.get())
}
