//! Sequential decoding of central directory records.
//!
//! The byte range `[cd_offset, cd_offset + cd_size)` is authoritative: the walker
//! stops at the declared entry count or at the end of that range, whichever comes
//! first, and never reads past it.

use log::{debug, trace, warn};
use std::sync::OnceLock;

use crate::error::{ZipError, ZipResult, malformed};
use crate::io::ReadAt;

use super::entry::{ArchiveEntry, ArchiveMetadata};
use super::structures::{
    CentralDirectoryHeader, CompressionMethod, ExtraFieldHeader, ZIP64_SENTINEL_16,
    ZIP64_SENTINEL_32, Zip64ExtendedInfo, extra_fields,
};

/// Central directories up to this size are fetched with a single read.
pub const BULK_READ_LIMIT: u64 = 64 * 1024 * 1024;

/// Read size used for larger central directories.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Lazy, single-pass sequence of [`ArchiveEntry`] values.
///
/// Once it has returned `Ok(None)` or an error it stays exhausted; walking
/// again means constructing a new walker from the same metadata.
pub struct CentralDirectoryWalker<'a, R: ReadAt + ?Sized> {
    reader: &'a R,
    pos: u64,
    end: u64,
    declared: u64,
    produced: u64,
    window: Vec<u8>,
    window_start: u64,
    chunk_size: usize,
    done: bool,
}

impl<'a, R: ReadAt + ?Sized> CentralDirectoryWalker<'a, R> {
    /// Prepare a walk over the central directory described by `metadata`.
    ///
    /// Fails with [`ZipError::TruncatedCentralDirectory`] if the directory would
    /// overlap the trailer records that follow it.
    pub fn new(reader: &'a R, metadata: &ArchiveMetadata) -> ZipResult<Self> {
        let truncated = ZipError::TruncatedCentralDirectory {
            declared: metadata.declared_entry_count,
            found: 0,
        };
        let end = match metadata.central_directory_end() {
            Some(end) if end <= metadata.directory_end => end,
            _ => return Err(truncated),
        };

        let size = metadata.central_directory_size;
        let chunk_size = if size <= BULK_READ_LIMIT {
            (size as usize).max(1)
        } else {
            DEFAULT_CHUNK_SIZE
        };

        Ok(Self {
            reader,
            pos: metadata.central_directory_offset,
            end,
            declared: metadata.declared_entry_count,
            produced: 0,
            window: Vec::new(),
            window_start: metadata.central_directory_offset,
            chunk_size,
            done: false,
        })
    }

    /// Read the directory in chunks of at most `chunk_size` bytes (records larger
    /// than a chunk are still read whole).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of entries produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Decode the next entry, or `Ok(None)` once the walk is over.
    pub async fn next(&mut self) -> ZipResult<Option<ArchiveEntry>> {
        if self.done {
            return Ok(None);
        }
        match self.step().await {
            Ok(Some(entry)) => Ok(Some(entry)),
            other => {
                self.done = true;
                other
            }
        }
    }

    async fn step(&mut self) -> ZipResult<Option<ArchiveEntry>> {
        if self.produced == self.declared {
            if self.pos < self.end {
                warn!(
                    "{} central directory bytes left after {} declared entries",
                    self.end - self.pos,
                    self.declared
                );
            }
            return Ok(None);
        }

        if self.pos == self.end {
            if self.produced == 0 {
                return Err(self.truncated());
            }
            warn!(
                "central directory holds {} entries but {} were declared",
                self.produced, self.declared
            );
            return Ok(None);
        }

        let header = CentralDirectoryHeader::from_bytes(
            self.fill(CentralDirectoryHeader::SIZE).await?,
        )?;
        let record_len = header.record_len();
        let record = self.fill(record_len).await?;
        let entry = decode_entry(&header, record)?;

        trace!(
            "entry {}: {:?} at {}",
            self.produced,
            entry.name_lossy(),
            entry.local_header_offset
        );
        self.pos += record_len as u64;
        self.produced += 1;
        Ok(Some(entry))
    }

    fn truncated(&self) -> ZipError {
        ZipError::TruncatedCentralDirectory {
            declared: self.declared,
            found: self.produced,
        }
    }

    /// Make `n` bytes starting at the current position available in the window.
    async fn fill(&mut self, n: usize) -> ZipResult<&[u8]> {
        let needed_end = match self.pos.checked_add(n as u64) {
            Some(e) if e <= self.end => e,
            _ => return Err(self.truncated()),
        };

        if needed_end > self.window_start + self.window.len() as u64 {
            let consumed = (self.pos - self.window_start) as usize;
            self.window.drain(..consumed);
            self.window_start = self.pos;

            let have_end = self.window_start + self.window.len() as u64;
            let want = (needed_end - have_end)
                .max(self.chunk_size as u64)
                .min(self.end - have_end);
            debug!("reading {want} central directory bytes at offset {have_end}");
            let chunk = self.reader.read_vec(have_end, want).await?;
            self.window.extend_from_slice(&chunk);
        }

        let start = (self.pos - self.window_start) as usize;
        Ok(&self.window[start..start + n])
    }
}

/// Build an entry from a decoded header and its full record bytes.
///
/// `record` starts at the header signature and spans at least
/// [`CentralDirectoryHeader::record_len`] bytes.
pub fn decode_entry(header: &CentralDirectoryHeader, record: &[u8]) -> ZipResult<ArchiveEntry> {
    let name_end = CentralDirectoryHeader::SIZE + header.file_name_length as usize;
    let extra_end = name_end + header.extra_field_length as usize;
    if record.len() < extra_end {
        return malformed(format!(
            "central directory record: need {extra_end} bytes, got {}",
            record.len()
        ));
    }
    let name = record[CentralDirectoryHeader::SIZE..name_end].to_vec();
    let extra = &record[name_end..extra_end];

    let mut uncompressed_size = header.uncompressed_size as u64;
    let mut compressed_size = header.compressed_size as u64;
    let mut local_header_offset = header.local_header_offset as u64;

    let need_uncompressed = header.uncompressed_size == ZIP64_SENTINEL_32;
    let need_compressed = header.compressed_size == ZIP64_SENTINEL_32;
    let need_offset = header.local_header_offset == ZIP64_SENTINEL_32;
    let need_disk = header.disk_number_start == ZIP64_SENTINEL_16;

    if need_uncompressed || need_compressed || need_offset || need_disk {
        let Some((_, payload)) =
            extra_fields(extra).find(|(id, _)| *id == ExtraFieldHeader::ZIP64_ID)
        else {
            return malformed(format!(
                "{:?}: ZIP64 sentinel without a ZIP64 extra field",
                String::from_utf8_lossy(&name)
            ));
        };
        let info = Zip64ExtendedInfo::from_bytes(
            payload,
            need_uncompressed,
            need_compressed,
            need_offset,
            need_disk,
        )?;
        uncompressed_size = info.uncompressed_size.unwrap_or(uncompressed_size);
        compressed_size = info.compressed_size.unwrap_or(compressed_size);
        local_header_offset = info.local_header_offset.unwrap_or(local_header_offset);
    }

    Ok(ArchiveEntry {
        name,
        compression_method: CompressionMethod::from_u16(header.compression_method),
        compressed_size,
        uncompressed_size,
        crc32: header.crc32,
        local_header_offset,
        flags: header.flags,
        last_mod_time: header.last_mod_time,
        last_mod_date: header.last_mod_date,
        payload_offset: OnceLock::new(),
    })
}
