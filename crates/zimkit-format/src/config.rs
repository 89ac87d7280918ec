//! Configuration for opening archives

use crate::cluster::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CLUSTER_SIZE, DecompressLimits};
use crate::error::{ZimError, ZimResult};
use serde::{Deserialize, Serialize};

/// Smallest accepted decompression chunk
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Configuration for an opened archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Largest accepted decompressed cluster (in bytes)
    pub max_cluster_size: usize,

    /// Output chunk used while inflating a cluster (in bytes)
    pub decompress_chunk_size: usize,

    /// Verify the trailing MD5 checksum when opening
    pub verify_checksum: bool,

    /// Longest redirect chain followed before giving up
    pub max_redirect_depth: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_cluster_size: DEFAULT_MAX_CLUSTER_SIZE,
            decompress_chunk_size: DEFAULT_CHUNK_SIZE,
            verify_checksum: false,
            max_redirect_depth: 32,
        }
    }
}

impl ArchiveConfig {
    /// Set the decompressed cluster cap
    #[must_use]
    pub const fn with_max_cluster_size(mut self, size: usize) -> Self {
        self.max_cluster_size = size;
        self
    }

    /// Set the decompression chunk size
    #[must_use]
    pub const fn with_decompress_chunk_size(mut self, size: usize) -> Self {
        self.decompress_chunk_size = size;
        self
    }

    /// Enable or disable checksum verification at open
    #[must_use]
    pub const fn with_checksum_verification(mut self, enable: bool) -> Self {
        self.verify_checksum = enable;
        self
    }

    /// Set the redirect chain bound
    #[must_use]
    pub const fn with_max_redirect_depth(mut self, depth: usize) -> Self {
        self.max_redirect_depth = depth;
        self
    }

    /// Check the values for consistency
    pub fn validate(&self) -> ZimResult<()> {
        if self.max_cluster_size == 0 {
            return Err(ZimError::InvalidConfig(
                "max_cluster_size must be positive".to_string(),
            ));
        }
        if self.decompress_chunk_size < MIN_CHUNK_SIZE {
            return Err(ZimError::InvalidConfig(format!(
                "decompress_chunk_size must be at least {MIN_CHUNK_SIZE} bytes, got {}",
                self.decompress_chunk_size
            )));
        }
        Ok(())
    }

    /// Decompression bounds for clusters
    pub const fn limits(&self) -> DecompressLimits {
        DecompressLimits {
            max_size: self.max_cluster_size,
            chunk_size: self.decompress_chunk_size,
        }
    }
}
