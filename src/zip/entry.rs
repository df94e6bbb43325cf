use std::borrow::Cow;
use std::sync::OnceLock;

use super::structures::CompressionMethod;

/// Where the central directory lives, as resolved from the EOCD (and the ZIP64 EOCD when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMetadata {
    pub central_directory_offset: u64,
    pub central_directory_size: u64,
    /// Entry count claimed by the trailer; the walker treats it as advisory.
    pub declared_entry_count: u64,
    pub is_zip64: bool,
    /// Absolute offset of the EOCD record
    pub eocd_offset: u64,
    /// Offset of the first trailer record after the central directory
    pub directory_end: u64,
    pub comment: Vec<u8>,
}

impl ArchiveMetadata {
    pub fn central_directory_end(&self) -> Option<u64> {
        self.central_directory_offset
            .checked_add(self.central_directory_size)
    }
}

/// One file in the archive, as described by its central directory record.
///
/// Sizes and offsets are the true 64-bit values; ZIP64 sentinels never survive parsing.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Raw file name bytes; not guaranteed to be UTF-8
    pub name: Vec<u8>,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub local_header_offset: u64,
    pub flags: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub(crate) payload_offset: OnceLock<u64>,
}

impl ArchiveEntry {
    const FLAG_ENCRYPTED: u16 = 1 << 0;

    /// File name for display, with invalid UTF-8 replaced.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn is_dir(&self) -> bool {
        self.name.last() == Some(&b'/')
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & Self::FLAG_ENCRYPTED != 0
    }

    /// Payload offset, if [`ZipArchive::resolve_payload_offset`](super::ZipArchive::resolve_payload_offset)
    /// has already run for this entry.
    pub fn payload_offset(&self) -> Option<u64> {
        self.payload_offset.get().copied()
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

impl PartialEq for ArchiveEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.compression_method == other.compression_method
            && self.compressed_size == other.compressed_size
            && self.uncompressed_size == other.uncompressed_size
            && self.crc32 == other.crc32
            && self.local_header_offset == other.local_header_offset
            && self.flags == other.flags
            && self.last_mod_time == other.last_mod_time
            && self.last_mod_date == other.last_mod_date
    }
}

impl Eq for ArchiveEntry {}
