//! # zipscan
//!
//! List and extract ZIP archives without downloading them.
//!
//! Archives are read through the [`ReadAt`] trait, so the same parser works on
//! local files and on remote resources served with HTTP Range requests. Listing
//! an archive needs only its tail and its central directory; payloads are
//! fetched per entry on demand.
//!
//! ## Features
//!
//! - Local files and HTTP/HTTPS URLs (Range requests)
//! - ZIP64 archives and entries (sizes and offsets beyond 4 GiB)
//! - Robust EOCD search through arbitrary archive comments
//! - Extraction of STORED and DEFLATE entries with CRC-32 verification
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zipscan::{HttpRangeReader, ZipArchive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(HttpRangeReader::new("https://example.com/archive.zip".to_string()).await?);
//!     let archive = ZipArchive::parse(reader).await?;
//!
//!     for entry in archive.entries() {
//!         let offset = archive.resolve_payload_offset(entry).await?;
//!         println!("{} {} bytes at {}", entry.name_lossy(), entry.compressed_size, offset);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{ZipError, ZipResult};
pub use io::{HttpOptions, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use zip::{ArchiveEntry, ArchiveMetadata, CompressionMethod, ZipArchive, ZipExtractor};
