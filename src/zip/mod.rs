//! ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 trailer, file headers, extra fields)
//! - [`locator`]: finds the EOCD in the archive tail and resolves ZIP64 trailers
//! - [`walker`]: decodes the central directory into [`ArchiveEntry`] values
//! - [`archive`]: the [`ZipArchive`] facade tying the above to a [`ReadAt`](crate::io::ReadAt) source
//! - [`extractor`]: payload extraction for end users
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. Optional ZIP64 End of Central Directory record and locator
//! 4. End of Central Directory (EOCD) record and comment at the end
//!
//! ## Limitations
//!
//! - No multi-disk archive support (rejected with [`ZipError::MultiDiskUnsupported`](crate::ZipError::MultiDiskUnsupported))
//! - No encryption support
//! - Only STORED and DEFLATE payloads can be extracted; listing works for any method

pub mod archive;
pub mod entry;
pub mod extractor;
pub mod locator;
pub mod structures;
pub mod walker;

#[cfg(test)]
pub(crate) mod testutil;

pub use archive::ZipArchive;
pub use entry::{ArchiveEntry, ArchiveMetadata};
pub use extractor::ZipExtractor;
pub use locator::{find_last_valid_eocd, locate_eocd};
pub use structures::CompressionMethod;
pub use walker::CentralDirectoryWalker;
