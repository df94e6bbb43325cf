//! Fixed-layout ZIP records.
//!
//! Every record decodes from its fixed-size little-endian prefix only; the
//! variable-length name, extra and comment fields that follow are left to the
//! caller, which reads them as raw byte ranges using the length fields here.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Cursor;

use crate::error::{ZipResult, malformed};

/// Sentinel stored in 16-bit fields whose real value lives in a ZIP64 record.
pub const ZIP64_SENTINEL_16: u16 = 0xFFFF;
/// Sentinel stored in 32-bit fields whose real value lives in a ZIP64 record.
pub const ZIP64_SENTINEL_32: u32 = 0xFFFF_FFFF;

/// Check length and signature, returning a cursor positioned after the signature.
fn open_record<'a>(
    data: &'a [u8],
    size: usize,
    signature: &[u8],
    record: &'static str,
) -> ZipResult<Cursor<&'a [u8]>> {
    if data.len() < size {
        return malformed(format!(
            "{record}: need {size} bytes, got {}",
            data.len()
        ));
    }
    if &data[0..4] != signature {
        return malformed(format!("{record}: bad signature {:02x?}", &data[0..4]));
    }
    Ok(Cursor::new(&data[4..size]))
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::Stored => f.write_str("Stored"),
            CompressionMethod::Deflate => f.write_str("Defl"),
            CompressionMethod::Unknown(v) => write!(f, "M{v}"),
        }
    }
}

/// Local File Header (LFH) - 30 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;

    pub fn from_bytes(data: &[u8]) -> ZipResult<Self> {
        let mut c = open_record(data, Self::SIZE, Self::SIGNATURE, "local file header")?;
        Ok(Self {
            version_needed: c.read_u16::<LittleEndian>()?,
            flags: c.read_u16::<LittleEndian>()?,
            compression_method: c.read_u16::<LittleEndian>()?,
            last_mod_time: c.read_u16::<LittleEndian>()?,
            last_mod_date: c.read_u16::<LittleEndian>()?,
            crc32: c.read_u32::<LittleEndian>()?,
            compressed_size: c.read_u32::<LittleEndian>()?,
            uncompressed_size: c.read_u32::<LittleEndian>()?,
            file_name_length: c.read_u16::<LittleEndian>()?,
            extra_field_length: c.read_u16::<LittleEndian>()?,
        })
    }

    /// Bytes between the header start and the entry payload.
    pub fn header_len(&self) -> u64 {
        Self::SIZE as u64 + self.file_name_length as u64 + self.extra_field_length as u64
    }
}

/// Central Directory File Header (CDFH) - 46 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;

    pub fn from_bytes(data: &[u8]) -> ZipResult<Self> {
        let mut c = open_record(data, Self::SIZE, Self::SIGNATURE, "central directory header")?;
        Ok(Self {
            version_made_by: c.read_u16::<LittleEndian>()?,
            version_needed: c.read_u16::<LittleEndian>()?,
            flags: c.read_u16::<LittleEndian>()?,
            compression_method: c.read_u16::<LittleEndian>()?,
            last_mod_time: c.read_u16::<LittleEndian>()?,
            last_mod_date: c.read_u16::<LittleEndian>()?,
            crc32: c.read_u32::<LittleEndian>()?,
            compressed_size: c.read_u32::<LittleEndian>()?,
            uncompressed_size: c.read_u32::<LittleEndian>()?,
            file_name_length: c.read_u16::<LittleEndian>()?,
            extra_field_length: c.read_u16::<LittleEndian>()?,
            comment_length: c.read_u16::<LittleEndian>()?,
            disk_number_start: c.read_u16::<LittleEndian>()?,
            internal_attrs: c.read_u16::<LittleEndian>()?,
            external_attrs: c.read_u32::<LittleEndian>()?,
            local_header_offset: c.read_u32::<LittleEndian>()?,
        })
    }

    /// Full record length: fixed header plus name, extra field and comment.
    pub fn record_len(&self) -> usize {
        Self::SIZE
            + self.file_name_length as usize
            + self.extra_field_length as usize
            + self.comment_length as usize
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    pub const MAX_COMMENT_LEN: usize = u16::MAX as usize;

    pub fn from_bytes(data: &[u8]) -> ZipResult<Self> {
        let mut c = open_record(data, Self::SIZE, Self::SIGNATURE, "end of central directory")?;
        Ok(Self {
            disk_number: c.read_u16::<LittleEndian>()?,
            disk_with_cd: c.read_u16::<LittleEndian>()?,
            disk_entries: c.read_u16::<LittleEndian>()?,
            total_entries: c.read_u16::<LittleEndian>()?,
            cd_size: c.read_u32::<LittleEndian>()?,
            cd_offset: c.read_u32::<LittleEndian>()?,
            comment_len: c.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != self.disk_with_cd || self.disk_entries != self.total_entries
    }

    /// Any overflowed field means the real values live in the ZIP64 EOCD.
    pub fn is_zip64(&self) -> bool {
        self.total_entries == ZIP64_SENTINEL_16
            || self.cd_size == ZIP64_SENTINEL_32
            || self.cd_offset == ZIP64_SENTINEL_32
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> ZipResult<Self> {
        let mut c = open_record(data, Self::SIZE, Self::SIGNATURE, "ZIP64 EOCD locator")?;
        Ok(Self {
            disk_with_eocd64: c.read_u32::<LittleEndian>()?,
            eocd64_offset: c.read_u64::<LittleEndian>()?,
            total_disks: c.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> ZipResult<Self> {
        let mut c = open_record(data, Self::SIZE, Self::SIGNATURE, "ZIP64 EOCD")?;
        Ok(Self {
            eocd64_size: c.read_u64::<LittleEndian>()?,
            version_made_by: c.read_u16::<LittleEndian>()?,
            version_needed: c.read_u16::<LittleEndian>()?,
            disk_number: c.read_u32::<LittleEndian>()?,
            disk_with_cd: c.read_u32::<LittleEndian>()?,
            disk_entries: c.read_u64::<LittleEndian>()?,
            total_entries: c.read_u64::<LittleEndian>()?,
            cd_size: c.read_u64::<LittleEndian>()?,
            cd_offset: c.read_u64::<LittleEndian>()?,
        })
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != self.disk_with_cd || self.disk_entries != self.total_entries
    }
}

/// Header of one sub-block inside an extra field - 4 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraFieldHeader {
    pub header_id: u16,
    pub data_size: u16,
}

impl ExtraFieldHeader {
    pub const SIZE: usize = 4;
    /// ZIP64 extended information
    pub const ZIP64_ID: u16 = 0x0001;

    pub fn from_bytes(data: &[u8]) -> ZipResult<Self> {
        if data.len() < Self::SIZE {
            return malformed(format!(
                "extra field header: need {} bytes, got {}",
                Self::SIZE,
                data.len()
            ));
        }
        let mut c = Cursor::new(data);
        Ok(Self {
            header_id: c.read_u16::<LittleEndian>()?,
            data_size: c.read_u16::<LittleEndian>()?,
        })
    }
}

/// Iterate over the `(header_id, payload)` sub-blocks of an extra field.
///
/// Stops at the first sub-block whose header or payload runs past the end of
/// `data`; what follows cannot be framed reliably.
pub fn extra_fields(data: &[u8]) -> impl Iterator<Item = (u16, &[u8])> {
    let mut rest = data;
    std::iter::from_fn(move || {
        let header = ExtraFieldHeader::from_bytes(rest).ok()?;
        let end = ExtraFieldHeader::SIZE + header.data_size as usize;
        if end > rest.len() {
            return None;
        }
        let payload = &rest[ExtraFieldHeader::SIZE..end];
        rest = &rest[end..];
        Some((header.header_id, payload))
    })
}

/// The values carried by a ZIP64 extended information block.
///
/// Only fields whose fixed-header counterpart held the sentinel are stored, in
/// the order uncompressed size, compressed size, local header offset, disk start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zip64ExtendedInfo {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub local_header_offset: Option<u64>,
    pub disk_number_start: Option<u32>,
}

impl Zip64ExtendedInfo {
    /// Decode `payload`, reading each field only when its `need_*` flag is set.
    pub fn from_bytes(
        payload: &[u8],
        need_uncompressed: bool,
        need_compressed: bool,
        need_offset: bool,
        need_disk: bool,
    ) -> ZipResult<Self> {
        let mut c = Cursor::new(payload);
        let mut read_u64 = |wanted: bool, what: &str| -> ZipResult<Option<u64>> {
            if !wanted {
                return Ok(None);
            }
            match c.read_u64::<LittleEndian>() {
                Ok(v) => Ok(Some(v)),
                Err(_) => malformed(format!("ZIP64 extra field too short for {what}")),
            }
        };
        let uncompressed_size = read_u64(need_uncompressed, "uncompressed size")?;
        let compressed_size = read_u64(need_compressed, "compressed size")?;
        let local_header_offset = read_u64(need_offset, "local header offset")?;
        let disk_number_start = if need_disk {
            match c.read_u32::<LittleEndian>() {
                Ok(v) => Some(v),
                Err(_) => return malformed("ZIP64 extra field too short for disk number"),
            }
        } else {
            None
        };
        Ok(Self {
            uncompressed_size,
            compressed_size,
            local_header_offset,
            disk_number_start,
        })
    }
}
