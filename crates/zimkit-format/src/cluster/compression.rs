//! Cluster compression codes and XZ decoding

use crate::error::{ZimError, ZimResult};
use tracing::warn;
use xz2::stream::{Action, Status, Stream};

/// Default cap on a decompressed cluster (512 MiB)
///
/// Clusters written by common tools stay around a few MiB; the cap bounds
/// memory spent on a hostile or corrupt stream.
pub const DEFAULT_MAX_CLUSTER_SIZE: usize = 512 * 1024 * 1024;

/// Default output chunk for incremental decompression (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Cluster compression, from the low nibble of the info byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Code 0: payload stored as is
    None,
    /// Code 4: XZ container around an LZMA2 stream
    Xz,
}

impl Compression {
    /// Map a compression code, rejecting everything but 0 and 4
    pub fn from_code(code: u8) -> ZimResult<Self> {
        match code {
            0 => Ok(Self::None),
            4 => Ok(Self::Xz),
            other => Err(ZimError::UnsupportedCompression(other)),
        }
    }

    /// Code as stored in the info byte
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Xz => 4,
        }
    }
}

/// Bounds applied while inflating a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressLimits {
    /// Largest accepted output in bytes
    pub max_size: usize,
    /// Output bytes requested from the decoder per step
    pub chunk_size: usize,
}

impl Default for DecompressLimits {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_CLUSTER_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Inflate one XZ stream.
///
/// The decoder is driven one output chunk at a time and fed whatever input
/// it has not consumed yet, until it reports the end of the stream. Output
/// growth is checked against `limits.max_size` before every extension. A
/// step that makes no progress means the input ran out before the stream
/// ended; that and any decoder error are a [`ZimError::MalformedRecord`].
pub fn decompress_xz(data: &[u8], limits: DecompressLimits) -> ZimResult<Vec<u8>> {
    let mut stream = Stream::new_stream_decoder(u64::MAX, 0)
        .map_err(|e| ZimError::MalformedRecord(format!("XZ decoder setup failed: {e}")))?;
    let mut decompressed = Vec::new();
    let mut chunk = vec![0u8; limits.chunk_size.max(1)];

    loop {
        let before_in = stream.total_in();
        let before_out = stream.total_out();
        let input = usize::try_from(before_in)
            .ok()
            .and_then(|consumed| data.get(consumed..))
            .unwrap_or_default();

        let status = stream
            .process(input, &mut chunk, Action::Run)
            .map_err(|e| ZimError::MalformedRecord(format!("XZ decompression failed: {e}")))?;

        let produced = (stream.total_out() - before_out) as usize;
        let consumed = stream.total_in() - before_in;

        if decompressed.len() + produced > limits.max_size {
            return Err(ZimError::DecompressionLimit {
                limit: limits.max_size,
            });
        }
        decompressed.extend_from_slice(&chunk[..produced]);

        match status {
            Status::StreamEnd => break,
            // liblzma reports a stalled buffer this way
            Status::MemNeeded => {
                return Err(ZimError::MalformedRecord(
                    "XZ stream truncated".to_string(),
                ));
            }
            Status::Ok | Status::GetCheck => {}
        }

        if produced == 0 && consumed == 0 {
            return Err(ZimError::MalformedRecord(
                "XZ stream truncated".to_string(),
            ));
        }
    }

    let consumed = stream.total_in();
    if consumed < data.len() as u64 {
        warn!(
            "{} trailing bytes after XZ stream ignored",
            data.len() as u64 - consumed
        );
    }

    Ok(decompressed)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::xz_compress;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compression_codes() {
        assert_eq!(Compression::from_code(0).unwrap(), Compression::None);
        assert_eq!(Compression::from_code(4).unwrap(), Compression::Xz);
        assert_eq!(Compression::Xz.code(), 4);

        for code in [1, 2, 3, 5, 15] {
            assert!(matches!(
                Compression::from_code(code),
                Err(ZimError::UnsupportedCompression(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_small_chunks_reassemble() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let compressed = xz_compress(&data);

        let limits = DecompressLimits {
            max_size: data.len(),
            chunk_size: 7,
        };
        assert_eq!(decompress_xz(&compressed, limits).unwrap(), data);
    }

    #[test]
    fn test_output_cap() {
        let data = vec![0u8; 4096];
        let compressed = xz_compress(&data);

        let limits = DecompressLimits {
            max_size: 4095,
            chunk_size: 1024,
        };
        assert!(matches!(
            decompress_xz(&compressed, limits),
            Err(ZimError::DecompressionLimit { limit: 4095 })
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = xz_compress(b"a blob that will not survive truncation");
        let truncated = &compressed[..compressed.len() / 2];

        let err = decompress_xz(truncated, DecompressLimits::default()).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_garbage_input() {
        let err = decompress_xz(b"definitely not xz", DecompressLimits::default()).unwrap_err();
        assert!(matches!(err, ZimError::MalformedRecord(_)));
    }

    #[test]
    fn test_trailing_bytes_tolerated() {
        let mut compressed = xz_compress(b"payload");
        compressed.extend_from_slice(&[0xAA; 16]);

        let out = decompress_xz(&compressed, DecompressLimits::default()).unwrap();
        assert_eq!(out, b"payload");
    }
}
