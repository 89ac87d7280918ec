//! Fixed-stride pointer arrays
//!
//! Thin views over the archive buffer: a base offset, an element width and
//! an optional element count. Nothing is decoded until `get` is called.

use crate::error::{ZimError, ZimResult};
use crate::layout::{Primitive, read_at};
use std::marker::PhantomData;

/// Array of little-endian integers of type `T`
#[derive(Debug, Clone, Copy)]
pub struct PointerArray<'a, T: Primitive> {
    buf: &'a [u8],
    offset: usize,
    len: Option<usize>,
    what: &'static str,
    _elem: PhantomData<T>,
}

/// URL pointer array: dirent offsets in URL order
pub type UrlPointers<'a> = PointerArray<'a, u64>;

/// Title pointer array: URL indices in title order
pub type TitlePointers<'a> = PointerArray<'a, u32>;

/// Cluster pointer array: cluster offsets
pub type ClusterPointers<'a> = PointerArray<'a, u64>;

impl<'a, T: Primitive> PointerArray<'a, T> {
    /// Unbounded view starting at `offset`.
    ///
    /// Only the buffer end limits the valid indices.
    pub fn new(buf: &'a [u8], offset: usize, what: &'static str) -> Self {
        Self {
            buf,
            offset,
            len: None,
            what,
            _elem: PhantomData,
        }
    }

    /// View limited to `len` elements
    pub fn with_len(buf: &'a [u8], offset: usize, len: usize, what: &'static str) -> Self {
        Self {
            len: Some(len),
            ..Self::new(buf, offset, what)
        }
    }

    /// Element count, when the array is bounded
    pub fn len(&self) -> Option<usize> {
        self.len
    }

    /// Whether a bounded array holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == Some(0)
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> ZimResult<T> {
        if let Some(len) = self.len
            && index >= len
        {
            return Err(ZimError::OutOfRange {
                what: self.what,
                index,
                len,
            });
        }

        let pos = index
            .checked_mul(T::WIDTH)
            .and_then(|rel| rel.checked_add(self.offset))
            .ok_or_else(|| ZimError::out_of_bounds(self.offset, usize::MAX, self.buf.len()))?;
        read_at(self.buf, pos)
    }

    /// Iterate over a bounded array; unbounded arrays yield nothing
    pub fn iter(&self) -> impl Iterator<Item = ZimResult<T>> + '_ {
        (0..self.len.unwrap_or(0)).map(move |index| self.get(index))
    }
}
