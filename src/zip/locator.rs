//! Locating the end of central directory.
//!
//! The EOCD is followed by a comment of up to 65535 bytes, so its position is
//! unknown. The whole candidate tail is fetched in a single read (one round trip
//! for HTTP sources) and scanned backwards in memory.

use log::debug;

use crate::error::{ZipError, ZipResult, malformed};
use crate::io::ReadAt;

use super::entry::ArchiveMetadata;
use super::structures::{EndOfCentralDirectory, Zip64EOCD, Zip64EOCDLocator};

/// Largest tail that can hold an EOCD: the record plus a maximal comment.
const MAX_TAIL_WINDOW: u64 =
    (EndOfCentralDirectory::SIZE + EndOfCentralDirectory::MAX_COMMENT_LEN) as u64;

/// Find the last EOCD in `buf` whose comment ends exactly at the end of `buf`.
///
/// Signature bytes inside a comment are rejected because their implied comment
/// length does not reach the end of the buffer. Returns the record's position
/// within `buf`.
pub fn find_last_valid_eocd(buf: &[u8]) -> Option<(usize, EndOfCentralDirectory)> {
    let last = buf.len().checked_sub(EndOfCentralDirectory::SIZE)?;
    (0..=last).rev().find_map(|i| {
        if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
            return None;
        }
        let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
        if i + EndOfCentralDirectory::SIZE + comment_len != buf.len() {
            return None;
        }
        EndOfCentralDirectory::from_bytes(&buf[i..])
            .ok()
            .map(|eocd| (i, eocd))
    })
}

/// Find and resolve the EOCD (and ZIP64 EOCD when needed) of the archive behind `reader`.
pub async fn locate_eocd<R: ReadAt + ?Sized>(reader: &R) -> ZipResult<ArchiveMetadata> {
    let size = reader.size();
    if size < EndOfCentralDirectory::SIZE as u64 {
        return Err(ZipError::EocdNotFound);
    }

    let window = size.min(MAX_TAIL_WINDOW);
    let tail_start = size - window;
    let tail = reader.read_vec(tail_start, window).await?;

    let (pos, eocd) = find_last_valid_eocd(&tail).ok_or(ZipError::EocdNotFound)?;
    let eocd_offset = tail_start + pos as u64;
    let comment = tail[pos + EndOfCentralDirectory::SIZE..].to_vec();
    debug!(
        "EOCD at offset {eocd_offset}: {} entries, central directory {} bytes at {}",
        eocd.total_entries, eocd.cd_size, eocd.cd_offset
    );

    if eocd.is_multi_disk() {
        return Err(ZipError::MultiDiskUnsupported);
    }

    if !eocd.is_zip64() {
        return Ok(ArchiveMetadata {
            central_directory_offset: eocd.cd_offset as u64,
            central_directory_size: eocd.cd_size as u64,
            declared_entry_count: eocd.total_entries as u64,
            is_zip64: false,
            eocd_offset,
            directory_end: eocd_offset,
            comment,
        });
    }

    // The locator sits immediately before the EOCD; reuse the tail when it covers it.
    let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
        return malformed("ZIP64 markers present but no room for a ZIP64 EOCD locator");
    };
    let locator = if pos >= Zip64EOCDLocator::SIZE {
        Zip64EOCDLocator::from_bytes(&tail[pos - Zip64EOCDLocator::SIZE..pos])?
    } else {
        let buf = reader
            .read_vec(locator_offset, Zip64EOCDLocator::SIZE as u64)
            .await?;
        Zip64EOCDLocator::from_bytes(&buf)?
    };

    if locator.total_disks > 1 {
        return Err(ZipError::MultiDiskUnsupported);
    }

    let eocd64_fits = locator
        .eocd64_offset
        .checked_add(Zip64EOCD::SIZE as u64)
        .is_some_and(|end| end <= locator_offset);
    if !eocd64_fits {
        return malformed(format!(
            "ZIP64 EOCD offset {} overlaps its locator at {locator_offset}",
            locator.eocd64_offset
        ));
    }

    let buf = reader
        .read_vec(locator.eocd64_offset, Zip64EOCD::SIZE as u64)
        .await?;
    let eocd64 = Zip64EOCD::from_bytes(&buf)?;
    if eocd64.is_multi_disk() {
        return Err(ZipError::MultiDiskUnsupported);
    }

    debug!(
        "ZIP64 EOCD at offset {}: {} entries, central directory {} bytes at {}",
        locator.eocd64_offset, eocd64.total_entries, eocd64.cd_size, eocd64.cd_offset
    );

    Ok(ArchiveMetadata {
        central_directory_offset: eocd64.cd_offset,
        central_directory_size: eocd64.cd_size,
        declared_entry_count: eocd64.total_entries,
        is_zip64: true,
        eocd_offset,
        directory_end: locator.eocd64_offset,
        comment,
    })
}
