//! Clusters and blob extraction
//!
//! A cluster is an info byte followed by a payload, optionally XZ
//! compressed. The payload starts with a table of `nb_blobs + 1` offsets
//! (4 bytes each, 8 when the extended bit is set) whose first entry is the
//! byte length of the table itself. Blob `i` spans payload bytes
//! `[offset[i], offset[i + 1])`.
//!
//! The payload and the offset table are decoded on first use and kept for
//! the lifetime of the [`Cluster`]. Initialization runs at most once, also
//! when the cluster is shared between threads.

pub mod compression;

pub use compression::{
    Compression, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CLUSTER_SIZE, DecompressLimits, decompress_xz,
};

use crate::error::{ZimError, ZimResult};
use crate::layout::{record_layout, span, to_offset};
use crate::pointer::PointerArray;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::debug;

/// Info byte bit selecting 8-byte blob offsets
pub const EXTENDED_FLAG: u8 = 0x10;

/// Info byte bits holding the compression code
pub const COMPRESSION_MASK: u8 = 0x0F;

record_layout! {
    /// Leading info byte of a cluster
    pub struct ClusterInfo {
        /// Compression code (low nibble) and extended flag
        pub info: u8,
    }
}

impl ClusterInfo<'_> {
    /// Raw compression code
    pub fn compression_code(&self) -> u8 {
        self.info() & COMPRESSION_MASK
    }

    /// Whether blob offsets are 8 bytes wide
    pub fn is_extended(&self) -> bool {
        self.info() & EXTENDED_FLAG != 0
    }
}

// Decoded payload: borrowed for raw clusters, owned once inflated.
#[derive(Debug)]
enum Payload<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl Payload<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Borrowed(bytes) => bytes,
            Self::Owned(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OffsetTable {
    nb_offsets: usize,
}

/// One cluster borrowed from the archive buffer
#[derive(Debug)]
pub struct Cluster<'a> {
    info: ClusterInfo<'a>,
    body: &'a [u8],
    compression: Compression,
    limits: DecompressLimits,
    payload: OnceLock<Payload<'a>>,
    offsets: OnceLock<OffsetTable>,
    init: Mutex<()>,
}

impl<'a> Cluster<'a> {
    /// View the cluster whose info byte is `data[0]`, with default limits.
    ///
    /// `data` may extend past the end of the cluster; raw payloads are
    /// addressed through the offset table and XZ streams carry their own
    /// end marker.
    pub fn new(data: &'a [u8]) -> ZimResult<Self> {
        Self::with_limits(data, DecompressLimits::default())
    }

    /// View a cluster, inflating it under `limits`
    pub fn with_limits(data: &'a [u8], limits: DecompressLimits) -> ZimResult<Self> {
        let info = ClusterInfo::new(data, 0)?;
        let compression = Compression::from_code(info.compression_code())?;
        let body = data.get(ClusterInfo::SIZE..).unwrap_or_default();
        Ok(Self {
            info,
            body,
            compression,
            limits,
            payload: OnceLock::new(),
            offsets: OnceLock::new(),
            init: Mutex::new(()),
        })
    }

    /// Compression of the payload
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Whether blob offsets are 8 bytes wide
    pub fn is_extended(&self) -> bool {
        self.info.is_extended()
    }

    /// Width of one blob offset
    pub fn offset_width(&self) -> usize {
        if self.is_extended() { 8 } else { 4 }
    }

    /// Whether the payload has been decoded already
    pub fn is_decoded(&self) -> bool {
        self.payload.get().is_some()
    }

    /// Decoded payload, inflating it on first call
    pub fn payload(&self) -> ZimResult<&[u8]> {
        if let Some(payload) = self.payload.get() {
            return Ok(payload.as_slice());
        }

        let _guard = self.init.lock();
        if let Some(payload) = self.payload.get() {
            return Ok(payload.as_slice());
        }

        let decoded = match self.compression {
            Compression::None => Payload::Borrowed(self.body),
            Compression::Xz => {
                let inflated = decompress_xz(self.body, self.limits)?;
                debug!(
                    "Inflated cluster: {} -> {} bytes",
                    self.body.len(),
                    inflated.len()
                );
                Payload::Owned(inflated)
            }
        };
        Ok(self.payload.get_or_init(|| decoded).as_slice())
    }

    /// Number of entries of the offset table
    pub fn nb_offsets(&self) -> ZimResult<usize> {
        self.offset_table().map(|table| table.nb_offsets)
    }

    /// Number of blobs in the cluster
    pub fn nb_blobs(&self) -> ZimResult<usize> {
        self.nb_offsets().map(|n| n - 1)
    }

    /// Payload offset `index` of the offset table
    pub fn get_blob_offset(&self, index: usize) -> ZimResult<u64> {
        let nb_offsets = self.nb_offsets()?;
        if index >= nb_offsets {
            return Err(ZimError::OutOfRange {
                what: "blob offset",
                index,
                len: nb_offsets,
            });
        }
        self.read_offset(self.payload()?, index)
    }

    /// Bytes of blob `index`
    pub fn get_blob_data(&self, index: usize) -> ZimResult<&[u8]> {
        let (start, end) = self.blob_range(index)?;
        span(self.payload()?, start, end - start)
    }

    /// Bytes of blob `index`, consuming the cluster.
    ///
    /// Raw clusters hand out a slice of the archive buffer; inflated ones
    /// reuse the decoded allocation.
    pub fn into_blob(self, index: usize) -> ZimResult<Cow<'a, [u8]>> {
        let (start, end) = self.blob_range(index)?;
        match self.payload.into_inner() {
            Some(Payload::Borrowed(bytes)) => span(bytes, start, end - start).map(Cow::Borrowed),
            Some(Payload::Owned(mut bytes)) => {
                bytes.truncate(end);
                bytes.drain(..start);
                Ok(Cow::Owned(bytes))
            }
            None => Err(ZimError::PreconditionViolation(
                "cluster payload not decoded",
            )),
        }
    }

    // Validated `[start, end)` of blob `index` inside the payload.
    fn blob_range(&self, index: usize) -> ZimResult<(usize, usize)> {
        let nb_blobs = self.nb_blobs()?;
        if index >= nb_blobs {
            return Err(ZimError::OutOfRange {
                what: "blob",
                index,
                len: nb_blobs,
            });
        }

        let start = to_offset(self.get_blob_offset(index)?)?;
        let end = to_offset(self.get_blob_offset(index + 1)?)?;
        if end < start {
            return Err(ZimError::MalformedRecord(format!(
                "blob {index} ends at {end} before its start {start}"
            )));
        }
        span(self.payload()?, start, end - start)?;
        Ok((start, end))
    }

    fn offset_table(&self) -> ZimResult<OffsetTable> {
        if let Some(table) = self.offsets.get() {
            return Ok(*table);
        }

        let payload = self.payload()?;
        let width = self.offset_width();
        let table_len = to_offset(self.read_offset(payload, 0)?)?;
        if table_len == 0 || table_len % width != 0 || table_len > payload.len() {
            return Err(ZimError::MalformedRecord(format!(
                "cluster offset table length {table_len} invalid for {width}-byte offsets \
                 and {} byte payload",
                payload.len()
            )));
        }

        let table = OffsetTable {
            nb_offsets: table_len / width,
        };
        Ok(*self.offsets.get_or_init(|| table))
    }

    fn read_offset(&self, payload: &[u8], index: usize) -> ZimResult<u64> {
        if self.is_extended() {
            PointerArray::<u64>::new(payload, 0, "blob offset").get(index)
        } else {
            PointerArray::<u32>::new(payload, 0, "blob offset")
                .get(index)
                .map(u64::from)
        }
    }
}
