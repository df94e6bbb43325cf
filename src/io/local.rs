use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::Path;

use super::{ReadAt, check_range};
use crate::error::{ZipError, ZipResult};

/// Local file reader with random access support
///
/// Reads are positional, so a single handle serves concurrent callers.
pub struct LocalFileReader {
    file: File,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> ZipResult<Self> {
        let file = File::open(path)
            .map_err(|e| ZipError::Unavailable(format!("{}: {e}", path.display())))?;
        let size = file
            .metadata()
            .map_err(|e| ZipError::Unavailable(format!("{}: {e}", path.display())))?
            .len();
        Ok(Self { file, size })
    }

    #[cfg(unix)]
    fn pread(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn pread(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file.seek_read(buf, offset)
    }

    // Not positional: concurrent readers on these targets need their own handle.
    #[cfg(not(any(unix, windows)))]
    fn pread(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ZipResult<()> {
        check_range(offset, buf.len() as u64, self.size)?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.pread(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}
