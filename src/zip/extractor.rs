use flate2::Crc;
use flate2::read::DeflateDecoder;
use log::debug;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{ZipError, ZipResult};
use crate::io::ReadAt;

use super::archive::ZipArchive;
use super::entry::ArchiveEntry;
use super::structures::CompressionMethod;

/// Upper bound on the buffer reserved up front from an entry's declared size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// ZIP file extractor
///
/// Reads payloads of entries from a parsed [`ZipArchive`], inflating deflate
/// data and checking the declared size and CRC-32.
pub struct ZipExtractor<R: ReadAt + ?Sized> {
    archive: ZipArchive<R>,
}

impl<R: ReadAt + ?Sized> ZipExtractor<R> {
    pub fn new(archive: ZipArchive<R>) -> Self {
        Self { archive }
    }

    /// Parse the archive behind `reader` and wrap it.
    pub async fn open(reader: Arc<R>) -> ZipResult<Self> {
        Ok(Self::new(ZipArchive::parse(reader).await?))
    }

    pub fn archive(&self) -> &ZipArchive<R> {
        &self.archive
    }

    /// List all files in the archive
    pub fn entries(&self) -> &[ArchiveEntry] {
        self.archive.entries()
    }

    /// Extract file data to memory
    pub async fn extract_to_memory(&self, entry: &ArchiveEntry) -> ZipResult<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(ZipError::Encrypted);
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(ZipError::UnsupportedCompression(method));
        }

        let raw = self.archive.read_raw(entry).await?;
        let data = match entry.compression_method {
            CompressionMethod::Deflate => {
                let mut out =
                    Vec::with_capacity(entry.uncompressed_size.min(MAX_PREALLOCATION) as usize);
                // One byte past the declared size is enough to detect an overlong stream.
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)?;
                out
            }
            _ => raw,
        };

        verify(entry, &data)?;
        Ok(data)
    }

    /// Extract an entry below `dir`, creating parent directories as needed.
    ///
    /// Returns the path written. Directory entries only create the directory.
    pub async fn extract_to_file(&self, entry: &ArchiveEntry, dir: &Path) -> ZipResult<PathBuf> {
        let relative = enclosed_path(entry)?;
        let output_path = dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).await?;
            return Ok(output_path);
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = self.extract_to_memory(entry).await?;
        let mut file = fs::File::create(&output_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        debug!("wrote {} bytes to {}", data.len(), output_path.display());

        Ok(output_path)
    }

    /// Extract file to stdout
    pub async fn extract_to_stdout(&self, entry: &ArchiveEntry) -> ZipResult<()> {
        let data = self.extract_to_memory(entry).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&data).await?;
        stdout.flush().await?;

        Ok(())
    }
}

fn verify(entry: &ArchiveEntry, data: &[u8]) -> ZipResult<()> {
    if data.len() as u64 != entry.uncompressed_size {
        return Err(ZipError::SizeMismatch {
            expected: entry.uncompressed_size,
            actual: data.len() as u64,
        });
    }
    let mut crc = Crc::new();
    crc.update(data);
    if crc.sum() != entry.crc32 {
        return Err(ZipError::ChecksumMismatch {
            expected: entry.crc32,
            actual: crc.sum(),
        });
    }
    Ok(())
}

/// Relative path for `entry` that cannot escape the extraction directory.
///
/// Backslashes are treated as separators; absolute paths, drive prefixes and
/// `..` components are rejected.
pub fn enclosed_path(entry: &ArchiveEntry) -> ZipResult<PathBuf> {
    let name = entry.name_lossy();
    let unsafe_path = || ZipError::UnsafePath(name.to_string());

    if name.contains('\0') {
        return Err(unsafe_path());
    }
    let normalized = name.replace('\\', "/");
    let mut path = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path());
            }
        }
    }
    if path.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(path)
}
