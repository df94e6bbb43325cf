mod http;
mod local;
mod memory;

pub use http::{HttpOptions, HttpRangeReader};
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use async_trait::async_trait;

use crate::error::{ZipError, ZipResult};

/// Random access to a sized byte source.
///
/// Implementations resolve their total size up front; a source whose size
/// cannot be determined fails to construct with [`ZipError::Unavailable`].
/// Reads at disjoint offsets must be safe to issue concurrently.
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with [`ZipError::OutOfRange`] if the range ends past [`size`](Self::size)
    /// and with [`ZipError::Io`] if the underlying transport fails.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ZipResult<()>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Read `length` bytes at `offset` into a freshly allocated buffer.
    async fn read_vec(&self, offset: u64, length: u64) -> ZipResult<Vec<u8>> {
        check_range(offset, length, self.size())?;
        let length = usize::try_from(length).map_err(|_| ZipError::OutOfRange {
            offset,
            length,
            size: self.size(),
        })?;
        let mut buf = vec![0u8; length];
        self.read_at(offset, &mut buf).await?;
        Ok(buf)
    }
}

/// Reject ranges that end past `size`, including ones whose end overflows.
pub(crate) fn check_range(offset: u64, length: u64, size: u64) -> ZipResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ZipError::OutOfRange {
            offset,
            length,
            size,
        }),
    }
}
