//! Sorted-index lookup
//!
//! Dirents are sorted by `(namespace, url)` in the URL pointer array and by
//! `(namespace, title or url)` in the title pointer array. Both searches
//! probe through the pointer arrays and decode only the dirents they visit.
//! Keys compare byte-wise, which for UTF-8 is code point order.

use crate::dirent::Dirent;
use crate::error::{ZimError, ZimResult};
use crate::header::Header;
use crate::layout::to_offset;
use crate::pointer::{TitlePointers, UrlPointers};
use std::cmp::Ordering;
use tracing::trace;

/// Binary search over `[low, high)`.
///
/// `compare(i)` returns how the entry at `i` orders relative to the target.
/// The interval strictly shrinks on every probe, so the search ends with
/// `None` once it is empty.
pub fn bisect<F>(mut compare: F, mut low: usize, mut high: usize) -> ZimResult<Option<usize>>
where
    F: FnMut(usize) -> ZimResult<Ordering>,
{
    while low < high {
        let mid = low + (high - low) / 2;
        let ordering = compare(mid)?;
        trace!("bisect probe {} in [{}, {}): {:?}", mid, low, high, ordering);
        match ordering {
            Ordering::Equal => return Ok(Some(mid)),
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
        }
    }
    Ok(None)
}

/// Order an entry key against a target key
pub fn compare_keys(namespace: u8, key: &str, target_namespace: u8, target: &str) -> Ordering {
    namespace
        .cmp(&target_namespace)
        .then_with(|| key.as_bytes().cmp(target.as_bytes()))
}

/// Lookup over the pointer arrays of one archive
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    buf: &'a [u8],
    urls: UrlPointers<'a>,
    titles: TitlePointers<'a>,
    article_count: usize,
}

impl<'a> Resolver<'a> {
    /// Resolver for the archive `buf` described by `header`
    pub fn new(buf: &'a [u8], header: &Header<'_>) -> ZimResult<Self> {
        let article_count = header.article_count() as usize;
        Ok(Self {
            buf,
            urls: UrlPointers::with_len(
                buf,
                to_offset(header.url_ptr_pos())?,
                article_count,
                "url pointer",
            ),
            titles: TitlePointers::with_len(
                buf,
                to_offset(header.title_ptr_pos())?,
                article_count,
                "title pointer",
            ),
            article_count,
        })
    }

    /// Number of indexed entries
    pub fn article_count(&self) -> usize {
        self.article_count
    }

    /// URL pointer array
    pub fn url_pointers(&self) -> UrlPointers<'a> {
        self.urls
    }

    /// Title pointer array
    pub fn title_pointers(&self) -> TitlePointers<'a> {
        self.titles
    }

    /// Dirent at URL index `index`
    pub fn dirent_at(&self, index: usize) -> ZimResult<Dirent<'a>> {
        let offset = to_offset(self.urls.get(index)?)?;
        Dirent::at(self.buf, offset)
    }

    /// URL index stored at title index `title_index`
    pub fn url_index_of_title(&self, title_index: usize) -> ZimResult<usize> {
        Ok(self.titles.get(title_index)? as usize)
    }

    /// URL index of the entry with the given namespace and url
    pub fn find_by_url(&self, namespace: char, url: &str) -> ZimResult<usize> {
        let target_ns = namespace_byte(namespace, url)?;
        let found = bisect(
            |index| {
                let dirent = self.dirent_at(index)?;
                Ok(compare_keys(dirent.namespace(), dirent.url()?, target_ns, url))
            },
            0,
            self.article_count,
        )?;
        found.ok_or_else(|| not_found(namespace, url))
    }

    /// Title index of the entry with the given namespace and title.
    ///
    /// Entries without a title are indexed under their url.
    pub fn find_title_index(&self, namespace: char, title: &str) -> ZimResult<usize> {
        let target_ns = namespace_byte(namespace, title)?;
        let found = bisect(
            |index| {
                let dirent = self.dirent_at(self.url_index_of_title(index)?)?;
                Ok(compare_keys(
                    dirent.namespace(),
                    dirent.title_or_url()?,
                    target_ns,
                    title,
                ))
            },
            0,
            self.article_count,
        )?;
        found.ok_or_else(|| not_found(namespace, title))
    }

    /// URL index of the entry with the given namespace and title
    pub fn find_by_title(&self, namespace: char, title: &str) -> ZimResult<usize> {
        let title_index = self.find_title_index(namespace, title)?;
        self.url_index_of_title(title_index)
    }
}

// Namespaces are single bytes; anything wider cannot be in the index.
fn namespace_byte(namespace: char, key: &str) -> ZimResult<u8> {
    u8::try_from(namespace).map_err(|_| not_found(namespace, key))
}

fn not_found(namespace: char, key: &str) -> ZimError {
    ZimError::NotFound {
        namespace,
        key: key.to_string(),
    }
}
