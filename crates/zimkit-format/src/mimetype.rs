//! Mimetype table
//!
//! A run of null-terminated strings starting at `mimeListPos`, closed by an
//! empty string. Dirent mimetype values index into it.

use crate::error::{ZimError, ZimResult};

/// View over the mimetype table
#[derive(Debug, Clone, Copy)]
pub struct MimetypeTable<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> MimetypeTable<'a> {
    /// View the table starting at `offset`
    pub fn new(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    /// Mimetype at `index`.
    ///
    /// Scans from the start of the table on every call.
    pub fn get(&self, index: usize) -> ZimResult<&'a str> {
        let mut pos = self.offset;
        let mut current = 0;
        loop {
            let entry = self.entry_at(pos)?;
            if entry.is_empty() {
                return Err(ZimError::OutOfRange {
                    what: "mimetype",
                    index,
                    len: current,
                });
            }
            if current == index {
                return std::str::from_utf8(entry).map_err(|e| {
                    ZimError::MalformedRecord(format!("mimetype {index} is not UTF-8: {e}"))
                });
            }
            pos += entry.len() + 1;
            current += 1;
        }
    }

    /// Number of entries before the empty terminator
    pub fn len(&self) -> ZimResult<usize> {
        let mut pos = self.offset;
        let mut count = 0;
        loop {
            let entry = self.entry_at(pos)?;
            if entry.is_empty() {
                return Ok(count);
            }
            pos += entry.len() + 1;
            count += 1;
        }
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> ZimResult<bool> {
        self.len().map(|len| len == 0)
    }

    /// All entries in order
    pub fn to_vec(&self) -> ZimResult<Vec<&'a str>> {
        (0..self.len()?).map(|index| self.get(index)).collect()
    }

    // Bytes from `pos` up to (not including) the next null.
    fn entry_at(&self, pos: usize) -> ZimResult<&'a [u8]> {
        let rest = self
            .buf
            .get(pos..)
            .ok_or_else(|| ZimError::out_of_bounds(pos, 1, self.buf.len()))?;
        let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            ZimError::MalformedRecord(format!("unterminated mimetype table at offset {pos}"))
        })?;
        Ok(&rest[..end])
    }
}
