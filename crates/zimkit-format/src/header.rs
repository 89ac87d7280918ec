//! Archive header (80-byte preamble)

use crate::error::{ZimError, ZimResult};
use crate::layout::record_layout;

/// Magic number at offset 0 of every archive
pub const ZIM_MAGIC: u32 = 0x044D_495A;

/// Size of the full header, and the smallest `mimeListPos` for which
/// `checksumPos` is part of the header
pub const HEADER_SIZE: usize = 80;

/// Header value marking an absent main or layout page
pub const NO_PAGE: u32 = 0xFFFF_FFFF;

record_layout! {
    /// Header view at the start of the archive buffer.
    ///
    /// All positions are absolute byte offsets into the archive.
    pub struct Header {
        /// Magic number, [`ZIM_MAGIC`] for valid archives
        pub magic_number: u32,
        /// Major format version
        pub major_version: u16,
        /// Minor format version
        pub minor_version: u16,
        /// Archive UUID
        pub uuid: [u8; 16],
        /// Number of dirents (and entries of the URL/title pointer arrays)
        pub article_count: u32,
        /// Number of clusters
        pub cluster_count: u32,
        /// Position of the URL pointer array
        pub url_ptr_pos: u64,
        /// Position of the title pointer array
        pub title_ptr_pos: u64,
        /// Position of the cluster pointer array
        pub cluster_ptr_pos: u64,
        /// Position of the mimetype table; also the logical header size
        pub mime_list_pos: u64,
        /// URL index of the main page, or [`NO_PAGE`]
        pub main_page: u32,
        /// URL index of the layout page, or [`NO_PAGE`]
        pub layout_page: u32,
        raw_checksum_pos: u64,
    }
}

impl<'a> Header<'a> {
    /// View the header of an archive buffer
    pub fn parse(buf: &'a [u8]) -> ZimResult<Self> {
        Self::new(buf, 0)
    }

    // Caller guarantees `buf.len() >= HEADER_SIZE`.
    pub(crate) fn from_validated(buf: &'a [u8]) -> Self {
        debug_assert!(buf.len() >= HEADER_SIZE);
        Self { buf, base: 0 }
    }

    /// Position of the trailing MD5 checksum.
    ///
    /// Only defined when the header is at least 80 bytes long, i.e. when
    /// `mime_list_pos >= 80`; older archives end their header before it.
    pub fn checksum_pos(&self) -> ZimResult<u64> {
        if self.mime_list_pos() < HEADER_SIZE as u64 {
            return Err(ZimError::PreconditionViolation(
                "checksumPos requires mimeListPos >= 80",
            ));
        }
        Ok(self.raw_checksum_pos())
    }

    /// Logical header size (bytes before the mimetype table)
    pub fn header_size(&self) -> u64 {
        self.mime_list_pos()
    }

    /// Check the magic number
    pub fn validate(&self) -> ZimResult<()> {
        let magic = self.magic_number();
        if magic != ZIM_MAGIC {
            return Err(ZimError::InvalidMagic(magic));
        }
        Ok(())
    }

    /// UUID as lowercase hex
    pub fn uuid_hex(&self) -> String {
        hex::encode(self.uuid())
    }

    /// Main page URL index, `None` when the archive has none
    pub fn main_page_index(&self) -> Option<u32> {
        Some(self.main_page()).filter(|&index| index != NO_PAGE)
    }

    /// Layout page URL index, `None` when the archive has none
    pub fn layout_page_index(&self) -> Option<u32> {
        Some(self.layout_page()).filter(|&index| index != NO_PAGE)
    }
}
