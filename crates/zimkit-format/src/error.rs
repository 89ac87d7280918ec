//! Error types for archive decoding

use thiserror::Error;

/// Result type for archive operations
pub type ZimResult<T> = Result<T, ZimError>;

/// Errors raised while decoding an archive.
///
/// Every variant is local to the accessor that produced it; none of them
/// invalidates the archive as a whole.
#[derive(Debug, Error)]
pub enum ZimError {
    /// Index past the number of elements of an array, table or cluster
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        /// What was being indexed
        what: &'static str,
        /// Requested index
        index: usize,
        /// Number of valid elements
        len: usize,
    },

    /// Byte span reaching past the end of the buffer
    #[error("span of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        /// Start of the span
        offset: usize,
        /// Length of the span
        len: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Resolver search exhausted without an exact match
    #[error("entry not found: {namespace}/{key}")]
    NotFound {
        /// Namespace searched
        namespace: char,
        /// URL or title searched
        key: String,
    },

    /// Record bytes do not follow the expected layout
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Cluster compression code other than raw or XZ
    #[error("unsupported cluster compression: {0}")]
    UnsupportedCompression(u8),

    /// Accessor used while its precondition does not hold
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    /// Wrong magic number in the header
    #[error("invalid archive magic: expected 0x044D495A, got {0:#010X}")]
    InvalidMagic(u32),

    /// Stored MD5 does not match the archive content
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum stored in the archive
        expected: String,
        /// Checksum computed over the archive
        actual: String,
    },

    /// Decompressed cluster grew past the configured cap
    #[error("decompressed cluster exceeds limit of {limit} bytes")]
    DecompressionLimit {
        /// Configured cap in bytes
        limit: usize,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZimError {
    /// Check if this error reports an index or span past the available data
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::OutOfBounds { .. })
    }

    /// Check if this error is a failed lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error comes from corrupt or unsupported record content
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord(_)
                | Self::UnsupportedCompression(_)
                | Self::InvalidMagic(_)
                | Self::ChecksumMismatch { .. }
        )
    }

    pub(crate) fn out_of_bounds(offset: usize, len: usize, available: usize) -> Self {
        Self::OutOfBounds {
            offset,
            len,
            available,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let range = ZimError::OutOfRange {
            what: "url pointer",
            index: 3,
            len: 3,
        };
        assert!(range.is_out_of_range());
        assert!(!range.is_not_found());

        assert!(ZimError::out_of_bounds(10, 8, 12).is_out_of_range());

        let missing = ZimError::NotFound {
            namespace: 'A',
            key: "Auto".to_string(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_malformed());

        assert!(ZimError::UnsupportedCompression(5).is_malformed());
        assert!(!ZimError::PreconditionViolation("checksum").is_malformed());
    }

    #[test]
    fn test_display() {
        let err = ZimError::NotFound {
            namespace: 'B',
            key: "Auto".to_string(),
        };
        assert_eq!(err.to_string(), "entry not found: B/Auto");

        let err = ZimError::InvalidMagic(0x1234);
        assert_eq!(
            err.to_string(),
            "invalid archive magic: expected 0x044D495A, got 0x00001234"
        );
    }
}
