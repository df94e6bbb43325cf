//! Parsed view of an archive.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) in the file's tail
//! 2. If ZIP64, follow the locator to the ZIP64 EOCD
//! 3. Walk the Central Directory to get metadata for all files
//! 4. On demand, read an entry's Local File Header to find its payload
//!
//! Listing therefore costs a handful of reads regardless of archive size,
//! which is what makes HTTP Range sources practical.

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ZipResult;
use crate::io::ReadAt;

use super::entry::{ArchiveEntry, ArchiveMetadata};
use super::locator::locate_eocd;
use super::structures::LocalFileHeader;
use super::walker::CentralDirectoryWalker;

/// A ZIP archive whose central directory has been fully parsed.
///
/// ## Example
///
/// ```ignore
/// let archive = ZipArchive::parse(reader).await?;
/// for entry in archive.entries() {
///     let offset = archive.resolve_payload_offset(entry).await?;
///     // Read entry.compressed_size bytes from offset...
/// }
/// ```
pub struct ZipArchive<R: ReadAt + ?Sized> {
    reader: Arc<R>,
    metadata: ArchiveMetadata,
    entries: Vec<ArchiveEntry>,
}

impl<R: ReadAt + ?Sized> ZipArchive<R> {
    /// Locate the central directory and decode every entry.
    ///
    /// Fails on the first structural problem; no partial listing is returned.
    pub async fn parse(reader: Arc<R>) -> ZipResult<Self> {
        let metadata = locate_eocd(&*reader).await?;

        let mut walker = CentralDirectoryWalker::new(&*reader, &metadata)?;
        let mut entries = Vec::with_capacity(metadata.declared_entry_count.min(1 << 16) as usize);
        while let Some(entry) = walker.next().await? {
            entries.push(entry);
        }
        debug!(
            "parsed {} entries (zip64: {})",
            entries.len(),
            metadata.is_zip64
        );

        Ok(Self {
            reader,
            metadata,
            entries,
        })
    }

    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// Entries in central directory order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose raw name equals `name`.
    pub fn by_name(&self, name: impl AsRef<[u8]>) -> Option<&ArchiveEntry> {
        let name = name.as_ref();
        self.entries.iter().find(|e| e.name == name)
    }

    /// Map from raw entry name to its position in [`entries`](Self::entries).
    ///
    /// When a name repeats, the first occurrence wins, matching [`by_name`](Self::by_name).
    pub fn name_index(&self) -> HashMap<&[u8], usize> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            index.entry(entry.name.as_slice()).or_insert(i);
        }
        index
    }

    /// Absolute offset of `entry`'s payload, read from its local header and memoized on the entry.
    pub async fn resolve_payload_offset(&self, entry: &ArchiveEntry) -> ZipResult<u64> {
        if let Some(offset) = entry.payload_offset() {
            return Ok(offset);
        }

        let buf = self
            .reader
            .read_vec(entry.local_header_offset, LocalFileHeader::SIZE as u64)
            .await?;
        let header = LocalFileHeader::from_bytes(&buf)?;
        let offset = entry.local_header_offset + header.header_len();

        // A concurrent resolution may have won; both computed the same value.
        let _ = entry.payload_offset.set(offset);
        Ok(offset)
    }

    /// The entry's payload exactly as stored (still compressed).
    pub async fn read_raw(&self, entry: &ArchiveEntry) -> ZipResult<Vec<u8>> {
        let offset = self.resolve_payload_offset(entry).await?;
        self.reader.read_vec(offset, entry.compressed_size).await
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}
