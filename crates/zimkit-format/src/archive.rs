//! Opened archive
//!
//! [`Archive`] owns the archive bytes, either read into memory or memory
//! mapped, and hands out borrowed views: header, mimetype table, pointer
//! arrays, dirents and clusters. Nothing is decoded up front besides the
//! header check.

use crate::cluster::Cluster;
use crate::config::ArchiveConfig;
use crate::dirent::Dirent;
use crate::error::{ZimError, ZimResult};
use crate::header::Header;
use crate::layout::{span, to_offset};
use crate::mimetype::MimetypeTable;
use crate::pointer::{ClusterPointers, TitlePointers, UrlPointers};
use crate::resolver::Resolver;
use memmap2::{Mmap, MmapOptions};
use std::borrow::Cow;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Size of the trailing MD5 checksum
pub const CHECKSUM_SIZE: usize = 16;

/// Backing storage of an archive
#[derive(Debug)]
pub enum ArchiveBytes {
    /// Bytes held in memory
    Owned(Vec<u8>),
    /// Memory-mapped file
    Mapped(Mmap),
}

impl Deref for ArchiveBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Mapped(mmap) => mmap,
        }
    }
}

/// A read-only archive
#[derive(Debug)]
pub struct Archive {
    bytes: ArchiveBytes,
    config: ArchiveConfig,
    path: Option<PathBuf>,
}

impl Archive {
    /// Memory-map and open the archive at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or mapped, or if it is
    /// not an archive
    pub fn open<P: AsRef<Path>>(path: P) -> ZimResult<Self> {
        Self::open_with_config(path, ArchiveConfig::default())
    }

    /// Memory-map and open the archive at `path` with `config`
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the file cannot be
    /// mapped, or its content fails the open checks
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: ArchiveConfig) -> ZimResult<Self> {
        config.validate()?;
        let path = path.as_ref();
        let file = File::open(path)?;

        #[allow(unsafe_code)]
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        Self::from_storage(ArchiveBytes::Mapped(mmap), config, Some(path.to_path_buf()))
    }

    /// Open an archive held in memory
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not an archive
    pub fn from_bytes(bytes: Vec<u8>) -> ZimResult<Self> {
        Self::from_bytes_with_config(bytes, ArchiveConfig::default())
    }

    /// Open an archive held in memory with `config`
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the bytes fail the
    /// open checks
    pub fn from_bytes_with_config(bytes: Vec<u8>, config: ArchiveConfig) -> ZimResult<Self> {
        config.validate()?;
        Self::from_storage(ArchiveBytes::Owned(bytes), config, None)
    }

    fn from_storage(
        bytes: ArchiveBytes,
        config: ArchiveConfig,
        path: Option<PathBuf>,
    ) -> ZimResult<Self> {
        let header = Header::parse(&bytes)?;
        header.validate()?;

        info!(
            "Opened archive v{}.{} ({} entries, {} clusters, {} bytes)",
            header.major_version(),
            header.minor_version(),
            header.article_count(),
            header.cluster_count(),
            bytes.len()
        );

        let archive = Self {
            bytes,
            config,
            path,
        };
        if archive.config.verify_checksum {
            archive.verify_checksum()?;
        }
        Ok(archive)
    }

    /// Raw archive bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Path the archive was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Configuration in effect
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archive header
    pub fn header(&self) -> Header<'_> {
        Header::from_validated(&self.bytes)
    }

    /// Number of dirents
    pub fn article_count(&self) -> usize {
        self.header().article_count() as usize
    }

    /// Number of clusters
    pub fn cluster_count(&self) -> usize {
        self.header().cluster_count() as usize
    }

    /// Mimetype table
    pub fn mimetypes(&self) -> ZimResult<MimetypeTable<'_>> {
        Ok(MimetypeTable::new(
            &self.bytes,
            to_offset(self.header().mime_list_pos())?,
        ))
    }

    /// Lookup over the URL and title indices
    pub fn resolver(&self) -> ZimResult<Resolver<'_>> {
        Resolver::new(&self.bytes, &self.header())
    }

    /// URL pointer array, bounded by the article count
    pub fn url_pointers(&self) -> ZimResult<UrlPointers<'_>> {
        self.resolver().map(|r| r.url_pointers())
    }

    /// Title pointer array, bounded by the article count
    pub fn title_pointers(&self) -> ZimResult<TitlePointers<'_>> {
        self.resolver().map(|r| r.title_pointers())
    }

    /// Cluster pointer array, bounded by the cluster count
    pub fn cluster_pointers(&self) -> ZimResult<ClusterPointers<'_>> {
        Ok(ClusterPointers::with_len(
            &self.bytes,
            to_offset(self.header().cluster_ptr_pos())?,
            self.cluster_count(),
            "cluster pointer",
        ))
    }

    /// Dirent at URL index `index`
    pub fn dirent_at(&self, index: usize) -> ZimResult<Dirent<'_>> {
        self.resolver()?.dirent_at(index)
    }

    /// Dirent at title index `title_index`
    pub fn dirent_at_title_index(&self, title_index: usize) -> ZimResult<Dirent<'_>> {
        let resolver = self.resolver()?;
        resolver.dirent_at(resolver.url_index_of_title(title_index)?)
    }

    /// Cluster `cluster_number`.
    ///
    /// The cluster ends where the next one starts; the last cluster ends at
    /// the checksum, or at the end of the archive when there is none.
    pub fn cluster(&self, cluster_number: usize) -> ZimResult<Cluster<'_>> {
        let pointers = self.cluster_pointers()?;
        let start = to_offset(pointers.get(cluster_number)?)?;

        let end = if cluster_number + 1 < self.cluster_count() {
            to_offset(pointers.get(cluster_number + 1)?)?
        } else {
            self.header()
                .checksum_pos()
                .ok()
                .and_then(|pos| to_offset(pos).ok())
                .filter(|&pos| pos > start && pos <= self.bytes.len())
                .unwrap_or(self.bytes.len())
        };

        if end <= start {
            return Err(ZimError::MalformedRecord(format!(
                "cluster {cluster_number} spans [{start}, {end})"
            )));
        }

        let data = span(&self.bytes, start, end - start)?;
        Cluster::with_limits(data, self.config.limits())
    }

    /// Follow redirects until a non-redirect entry
    ///
    /// # Errors
    ///
    /// Returns error if a target cannot be decoded or the chain is longer
    /// than `max_redirect_depth`
    pub fn resolve_redirect<'a>(&'a self, dirent: Dirent<'a>) -> ZimResult<Dirent<'a>> {
        let mut current = dirent;
        for _ in 0..=self.config.max_redirect_depth {
            let Some(target) = current.redirect_index() else {
                return Ok(current);
            };
            debug!(
                "Following redirect {}/{} -> {}",
                current.namespace_char(),
                current.url()?,
                target
            );
            current = self.dirent_at(target as usize)?;
        }
        Err(ZimError::MalformedRecord(format!(
            "redirect chain longer than {}",
            self.config.max_redirect_depth
        )))
    }

    /// Content of an entry, following redirects
    ///
    /// # Errors
    ///
    /// Returns error for link and deleted entries, and for any decoding
    /// failure along the way
    pub fn blob<'a>(&'a self, dirent: &Dirent<'a>) -> ZimResult<Cow<'a, [u8]>> {
        let target = self.resolve_redirect(*dirent)?;
        match (target.cluster_number(), target.blob_number()) {
            (Some(cluster), Some(blob)) => self
                .cluster(cluster as usize)?
                .into_blob(blob as usize),
            _ => Err(ZimError::MalformedRecord(format!(
                "{} entry has no content",
                target.kind()
            ))),
        }
    }

    /// Mimetype of an article; `None` for other kinds
    pub fn mimetype_of(&self, dirent: &Dirent<'_>) -> ZimResult<Option<&str>> {
        if !dirent.is_article() {
            return Ok(None);
        }
        self.mimetypes()?
            .get(usize::from(dirent.mimetype()))
            .map(Some)
    }

    /// URL index of `namespace/url`
    pub fn find_by_url(&self, namespace: char, url: &str) -> ZimResult<usize> {
        self.resolver()?.find_by_url(namespace, url)
    }

    /// URL index of the entry titled `title` in `namespace`
    pub fn find_by_title(&self, namespace: char, title: &str) -> ZimResult<usize> {
        self.resolver()?.find_by_title(namespace, title)
    }

    /// URL index and dirent of `namespace/url`
    pub fn get_by_url(&self, namespace: char, url: &str) -> ZimResult<(usize, Dirent<'_>)> {
        let resolver = self.resolver()?;
        let index = resolver.find_by_url(namespace, url)?;
        Ok((index, resolver.dirent_at(index)?))
    }

    /// Main page entry, if the archive names one
    pub fn main_page(&self) -> ZimResult<Option<Dirent<'_>>> {
        self.header()
            .main_page_index()
            .map(|index| self.dirent_at(index as usize))
            .transpose()
    }

    /// Layout page entry, if the archive names one
    pub fn layout_page(&self) -> ZimResult<Option<Dirent<'_>>> {
        self.header()
            .layout_page_index()
            .map(|index| self.dirent_at(index as usize))
            .transpose()
    }

    /// All dirents in URL order
    pub fn entries(&self) -> impl Iterator<Item = (usize, ZimResult<Dirent<'_>>)> + '_ {
        (0..self.article_count()).map(move |index| (index, self.dirent_at(index)))
    }

    /// Checksum stored at `checksumPos`
    pub fn checksum(&self) -> ZimResult<[u8; CHECKSUM_SIZE]> {
        let pos = to_offset(self.header().checksum_pos()?)?;
        let mut stored = [0u8; CHECKSUM_SIZE];
        stored.copy_from_slice(span(&self.bytes, pos, CHECKSUM_SIZE)?);
        Ok(stored)
    }

    /// MD5 of the bytes before `checksumPos`
    pub fn compute_checksum(&self) -> ZimResult<[u8; CHECKSUM_SIZE]> {
        let pos = to_offset(self.header().checksum_pos()?)?;
        Ok(md5::compute(span(&self.bytes, 0, pos)?).0)
    }

    /// Compare the stored checksum with the archive content
    ///
    /// # Errors
    ///
    /// Returns `ChecksumMismatch` if they differ, `PreconditionViolation`
    /// if the header predates the checksum field
    pub fn verify_checksum(&self) -> ZimResult<()> {
        let expected = self.checksum()?;
        let actual = self.compute_checksum()?;
        if expected != actual {
            return Err(ZimError::ChecksumMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            });
        }
        debug!("Checksum verified: {}", hex::encode(actual));
        Ok(())
    }
}
