//! Directory entries
//!
//! Every dirent starts with the same 8-byte prefix. The 2-byte mimetype
//! doubles as the variant tag:
//!
//! | mimetype          | variant        | fixed part |
//! |-------------------|----------------|------------|
//! | `0xFFFF`          | redirect       | 12 bytes   |
//! | `0xFFFE`/`0xFFFD` | link / deleted | 8 bytes    |
//! | anything else     | article        | 16 bytes   |
//!
//! The fixed part is followed by a null-terminated url, a null-terminated
//! title and `parameter_len` bytes of extra data.

use crate::error::{ZimError, ZimResult};
use crate::layout::{read_at, record_layout, span};

/// Mimetype value tagging a redirect
pub const REDIRECT_MIMETYPE: u16 = 0xFFFF;

/// Mimetype value tagging a link placeholder
pub const LINK_MIMETYPE: u16 = 0xFFFE;

/// Mimetype value tagging a deleted entry
pub const DELETED_MIMETYPE: u16 = 0xFFFD;

record_layout! {
    /// Fixed part of an article dirent
    pub struct ArticleRecord {
        /// Index into the mimetype table
        pub mimetype: u16,
        /// Length of the trailing extra data
        pub parameter_len: u8,
        /// Namespace byte
        pub namespace: u8,
        /// Content revision
        pub revision: u32,
        /// Cluster holding the content
        pub cluster_number: u32,
        /// Blob inside the cluster
        pub blob_number: u32,
    }
}

record_layout! {
    /// Fixed part of a redirect dirent
    pub struct RedirectRecord {
        /// Always [`REDIRECT_MIMETYPE`]
        pub mimetype: u16,
        /// Length of the trailing extra data
        pub parameter_len: u8,
        /// Namespace byte
        pub namespace: u8,
        /// Content revision
        pub revision: u32,
        /// URL index of the redirect target
        pub redirect_index: u32,
    }
}

record_layout! {
    /// Fixed part of a link or deleted dirent
    pub struct LinkRecord {
        /// [`LINK_MIMETYPE`] or [`DELETED_MIMETYPE`]
        pub mimetype: u16,
        /// Length of the trailing extra data
        pub parameter_len: u8,
        /// Namespace byte
        pub namespace: u8,
        /// Content revision
        pub revision: u32,
    }
}

/// Kind of a decoded dirent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirentKind {
    /// Points at a blob
    Article,
    /// Points at another dirent
    Redirect,
    /// Link placeholder
    Link,
    /// Deleted entry placeholder
    Deleted,
}

impl std::fmt::Display for DirentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Article => "article",
            Self::Redirect => "redirect",
            Self::Link => "link",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// A directory entry borrowed from the archive buffer
#[derive(Debug, Clone, Copy)]
pub enum Dirent<'a> {
    /// Article entry
    Article(ArticleRecord<'a>),
    /// Redirect entry
    Redirect(RedirectRecord<'a>),
    /// Link or deleted placeholder
    LinkOrDeleted(LinkRecord<'a>),
}

/// Variable-length tail shared by all variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirentTail<'a> {
    /// Entry url
    pub url: &'a str,
    /// Entry title, possibly empty
    pub title: &'a str,
    /// Opaque extra data
    pub extra_data: &'a [u8],
}

macro_rules! each_variant {
    ($self:expr, $rec:ident => $body:expr) => {
        match $self {
            Dirent::Article($rec) => $body,
            Dirent::Redirect($rec) => $body,
            Dirent::LinkOrDeleted($rec) => $body,
        }
    };
}

impl<'a> Dirent<'a> {
    /// Decode the dirent at `offset`, choosing the variant from its mimetype
    pub fn at(buf: &'a [u8], offset: usize) -> ZimResult<Self> {
        let mimetype: u16 = read_at(buf, offset)?;
        Ok(match mimetype {
            REDIRECT_MIMETYPE => Self::Redirect(RedirectRecord::new(buf, offset)?),
            LINK_MIMETYPE | DELETED_MIMETYPE => Self::LinkOrDeleted(LinkRecord::new(buf, offset)?),
            _ => Self::Article(ArticleRecord::new(buf, offset)?),
        })
    }

    /// Variant kind
    pub fn kind(&self) -> DirentKind {
        match self {
            Self::Article(_) => DirentKind::Article,
            Self::Redirect(_) => DirentKind::Redirect,
            Self::LinkOrDeleted(rec) if rec.mimetype() == LINK_MIMETYPE => DirentKind::Link,
            Self::LinkOrDeleted(_) => DirentKind::Deleted,
        }
    }

    /// Raw mimetype field
    pub fn mimetype(&self) -> u16 {
        each_variant!(self, rec => rec.mimetype())
    }

    /// Length of the extra data
    pub fn parameter_len(&self) -> u8 {
        each_variant!(self, rec => rec.parameter_len())
    }

    /// Namespace byte
    pub fn namespace(&self) -> u8 {
        each_variant!(self, rec => rec.namespace())
    }

    /// Namespace as a character
    pub fn namespace_char(&self) -> char {
        char::from(self.namespace())
    }

    /// Content revision
    pub fn revision(&self) -> u32 {
        each_variant!(self, rec => rec.revision())
    }

    /// Offset of the dirent in the buffer
    pub fn offset(&self) -> usize {
        each_variant!(self, rec => rec.base())
    }

    /// Cluster number of an article
    pub fn cluster_number(&self) -> Option<u32> {
        match self {
            Self::Article(rec) => Some(rec.cluster_number()),
            _ => None,
        }
    }

    /// Blob number of an article
    pub fn blob_number(&self) -> Option<u32> {
        match self {
            Self::Article(rec) => Some(rec.blob_number()),
            _ => None,
        }
    }

    /// Target URL index of a redirect
    pub fn redirect_index(&self) -> Option<u32> {
        match self {
            Self::Redirect(rec) => Some(rec.redirect_index()),
            _ => None,
        }
    }

    /// Whether this entry is an article
    pub fn is_article(&self) -> bool {
        matches!(self, Self::Article(_))
    }

    /// Whether this entry is a redirect
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }

    /// Entry url
    pub fn url(&self) -> ZimResult<&'a str> {
        let (buf, pos) = self.fixed_end();
        read_cstr(buf, pos, "url").map(|(url, _)| url)
    }

    /// Entry title; empty when the writer left it out
    pub fn title(&self) -> ZimResult<&'a str> {
        self.url_and_title().map(|(_, title)| title)
    }

    /// Title, or the url when the title is empty
    pub fn title_or_url(&self) -> ZimResult<&'a str> {
        let (url, title) = self.url_and_title()?;
        Ok(if title.is_empty() { url } else { title })
    }

    /// Extra data after the title
    pub fn extra_data(&self) -> ZimResult<&'a [u8]> {
        self.tail().map(|tail| tail.extra_data)
    }

    /// Decode the whole variable-length tail in one scan
    pub fn tail(&self) -> ZimResult<DirentTail<'a>> {
        let (buf, pos) = self.fixed_end();
        let (url, pos) = read_cstr(buf, pos, "url")?;
        let (title, pos) = read_cstr(buf, pos, "title")?;
        let extra_data = span(buf, pos, usize::from(self.parameter_len()))?;
        Ok(DirentTail {
            url,
            title,
            extra_data,
        })
    }

    // Strings only; the extra data span is checked by `tail`.
    fn url_and_title(&self) -> ZimResult<(&'a str, &'a str)> {
        let (buf, pos) = self.fixed_end();
        let (url, pos) = read_cstr(buf, pos, "url")?;
        let (title, _) = read_cstr(buf, pos, "title")?;
        Ok((url, title))
    }

    fn fixed_end(&self) -> (&'a [u8], usize) {
        each_variant!(self, rec => (rec.buffer(), rec.end()))
    }
}

// Null-terminated string at `pos`; returns it with the position after the
// terminator.
fn read_cstr<'a>(buf: &'a [u8], pos: usize, what: &str) -> ZimResult<(&'a str, usize)> {
    let rest = buf.get(pos..).unwrap_or_default();
    let len = rest.iter().position(|&b| b == 0).ok_or_else(|| {
        ZimError::MalformedRecord(format!("unterminated {what} at offset {pos}"))
    })?;
    let value = std::str::from_utf8(&rest[..len])
        .map_err(|e| ZimError::MalformedRecord(format!("{what} at offset {pos} is not UTF-8: {e}")))?;
    Ok((value, pos + len + 1))
}
