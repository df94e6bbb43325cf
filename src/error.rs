//! Error types shared by the readers, the parser and the extractor.

use std::borrow::Cow;
use std::io;

use thiserror::Error;

/// Result type used throughout the crate.
pub type ZipResult<T> = Result<T, ZipError>;

/// Everything that can go wrong while reading, parsing or extracting an archive.
///
/// A parse either succeeds with a complete entry list or fails with the first
/// structural problem encountered; no variant carries a partial listing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZipError {
    /// The source could not be opened or its size could not be determined.
    #[error("archive unavailable: {0}")]
    Unavailable(String),

    /// A byte range could not be read from the source.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A read was requested past the end of the source.
    #[error("read of {length} bytes at offset {offset} exceeds source size {size}")]
    OutOfRange { offset: u64, length: u64, size: u64 },

    /// No end of central directory record exists in the archive tail.
    #[error("end of central directory record not found, not a ZIP archive")]
    EocdNotFound,

    /// A record has a bad signature, an impossible length or misses a required ZIP64 field.
    #[error("malformed record: {0}")]
    MalformedRecord(Cow<'static, str>),

    /// The archive is split over several disks.
    #[error("multi-disk archives are not supported")]
    MultiDiskUnsupported,

    /// The central directory ends before its records do.
    #[error("central directory truncated: {found} of {declared} entries decoded")]
    TruncatedCentralDirectory { declared: u64, found: u64 },

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("entry is encrypted")]
    Encrypted,

    #[error("CRC-32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// The entry name would escape the extraction directory.
    #[error("unsafe entry path: {0}")]
    UnsafePath(String),
}

pub(crate) fn malformed<T, M: Into<Cow<'static, str>>>(message: M) -> ZipResult<T> {
    Err(ZipError::MalformedRecord(message.into()))
}
