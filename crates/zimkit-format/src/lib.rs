//! Read-only decoder and index resolver for ZIM content archives
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format field names don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::missing_errors_doc)] // Error variants are documented on ZimError
#![allow(clippy::must_use_candidate)] // Accessor-heavy views
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
//! A ZIM archive packs many documents into one file: a fixed header, a
//! mimetype table, sorted URL and title indices, directory entries
//! (dirents) and clusters of optionally XZ-compressed blobs. This crate
//! decodes all of them in place, borrowing from one archive buffer.
//!
//! # Layers
//!
//! - [`layout`]: declarative fixed-layout records over a shared buffer
//! - [`header`], [`mimetype`], [`pointer`]: header, mimetype table and
//!   pointer arrays
//! - [`dirent`]: article, redirect and link/deleted entries
//! - [`cluster`]: cluster decoding and blob extraction
//! - [`resolver`]: binary search over the URL and title indices
//! - [`archive`]: the owning [`Archive`] tying them together
//!
//! # Example
//!
//! ```rust,no_run
//! use zimkit_format::Archive;
//!
//! # fn example() -> zimkit_format::ZimResult<()> {
//! let archive = Archive::open("wikipedia_en_top.zim")?;
//! let (index, dirent) = archive.get_by_url('A', "Auto")?;
//! let content = archive.blob(&dirent)?;
//! println!("entry {index}: {} bytes", content.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod cluster;
pub mod config;
pub mod dirent;
pub mod error;
pub mod header;
pub mod layout;
pub mod mimetype;
pub mod pointer;
pub mod resolver;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use archive::{Archive, ArchiveBytes};
pub use cluster::{Cluster, Compression};
pub use config::ArchiveConfig;
pub use dirent::{Dirent, DirentKind};
pub use error::{ZimError, ZimResult};
pub use header::{Header, ZIM_MAGIC};
pub use mimetype::MimetypeTable;
pub use pointer::PointerArray;
pub use resolver::Resolver;
