//! Byte-exact archive construction for parser tests.

use flate2::Crc;

use super::structures::ZIP64_SENTINEL_32;

pub(crate) struct TestEntry {
    name: Vec<u8>,
    data: Vec<u8>,
    zip64: bool,
    declared_size: Option<u64>,
    disk_start: Option<u32>,
    unknown_extra: Vec<u8>,
    local_extra: Vec<u8>,
    comment: Vec<u8>,
}

impl TestEntry {
    pub(crate) fn stored(name: impl AsRef<[u8]>, data: &[u8]) -> Self {
        Self {
            name: name.as_ref().to_vec(),
            data: data.to_vec(),
            zip64: false,
            declared_size: None,
            disk_start: None,
            unknown_extra: Vec::new(),
            local_extra: Vec::new(),
            comment: Vec::new(),
        }
    }

    /// Store sizes and offset as sentinels backed by a ZIP64 extra block.
    pub(crate) fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    /// Claim `size` for both sizes in the central directory (via ZIP64).
    pub(crate) fn declared_size(mut self, size: u64) -> Self {
        self.zip64 = true;
        self.declared_size = Some(size);
        self
    }

    /// Put the 0xFFFF sentinel in the central directory's disk-start field and
    /// append `disk` as the fourth ZIP64 value.
    pub(crate) fn disk_start(mut self, disk: u32) -> Self {
        self.zip64 = true;
        self.disk_start = Some(disk);
        self
    }

    pub(crate) fn unknown_extra(mut self, id: u16, payload: &[u8]) -> Self {
        self.unknown_extra.extend_from_slice(&id.to_le_bytes());
        self.unknown_extra
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.unknown_extra.extend_from_slice(payload);
        self
    }

    pub(crate) fn local_extra(mut self, extra: &[u8]) -> Self {
        self.local_extra = extra.to_vec();
        self
    }

    pub(crate) fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    fn crc(&self) -> u32 {
        let mut crc = Crc::new();
        crc.update(&self.data);
        crc.sum()
    }
}

#[derive(Default)]
pub(crate) struct ArchiveBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    zip64_trailer: bool,
}

pub(crate) struct BuiltArchive {
    pub bytes: Vec<u8>,
    pub cd_offset: u64,
    pub cd_size: u64,
    pub eocd_offset: u64,
    pub local_offsets: Vec<u64>,
    pub record_offsets: Vec<u64>,
}

impl ArchiveBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub(crate) fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Write a ZIP64 EOCD and locator, leaving sentinels in the EOCD.
    pub(crate) fn zip64_trailer(mut self) -> Self {
        self.zip64_trailer = true;
        self
    }

    pub(crate) fn build(&self) -> BuiltArchive {
        let mut out = Vec::new();
        let mut local_offsets = Vec::new();

        for e in &self.entries {
            local_offsets.push(out.len() as u64);
            let size = e.data.len() as u32;
            let (size32, version) = if e.zip64 {
                (ZIP64_SENTINEL_32, 45u16)
            } else {
                (size, 20u16)
            };
            let mut extra = e.local_extra.clone();
            if e.zip64 {
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&16u16.to_le_bytes());
                extra.extend_from_slice(&(e.data.len() as u64).to_le_bytes());
                extra.extend_from_slice(&(e.data.len() as u64).to_le_bytes());
            }

            out.extend_from_slice(b"PK\x03\x04");
            put16(&mut out, version);
            put16(&mut out, 0);
            put16(&mut out, 0);
            put16(&mut out, 0);
            put16(&mut out, 0x21);
            put32(&mut out, e.crc());
            put32(&mut out, size32);
            put32(&mut out, size32);
            put16(&mut out, e.name.len() as u16);
            put16(&mut out, extra.len() as u16);
            out.extend_from_slice(&e.name);
            out.extend_from_slice(&extra);
            out.extend_from_slice(&e.data);
        }

        let cd_offset = out.len() as u64;
        let mut record_offsets = Vec::new();
        for (e, &local) in self.entries.iter().zip(&local_offsets) {
            record_offsets.push(out.len() as u64);
            let size = e.declared_size.unwrap_or(e.data.len() as u64);
            let mut extra = e.unknown_extra.clone();
            let (size32, offset32) = if e.zip64 {
                let block_len: u16 = if e.disk_start.is_some() { 28 } else { 24 };
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&block_len.to_le_bytes());
                extra.extend_from_slice(&size.to_le_bytes());
                extra.extend_from_slice(&size.to_le_bytes());
                extra.extend_from_slice(&local.to_le_bytes());
                if let Some(disk) = e.disk_start {
                    extra.extend_from_slice(&disk.to_le_bytes());
                }
                (ZIP64_SENTINEL_32, ZIP64_SENTINEL_32)
            } else {
                (size as u32, local as u32)
            };

            out.extend_from_slice(b"PK\x01\x02");
            put16(&mut out, 20);
            put16(&mut out, if e.zip64 { 45 } else { 20 });
            put16(&mut out, 0);
            put16(&mut out, 0);
            put16(&mut out, 0);
            put16(&mut out, 0x21);
            put32(&mut out, e.crc());
            put32(&mut out, size32);
            put32(&mut out, size32);
            put16(&mut out, e.name.len() as u16);
            put16(&mut out, extra.len() as u16);
            put16(&mut out, e.comment.len() as u16);
            put16(&mut out, if e.disk_start.is_some() { 0xFFFF } else { 0 });
            put16(&mut out, 0);
            put32(&mut out, 0);
            put32(&mut out, offset32);
            out.extend_from_slice(&e.name);
            out.extend_from_slice(&extra);
            out.extend_from_slice(&e.comment);
        }
        let cd_size = out.len() as u64 - cd_offset;
        let count = self.entries.len() as u64;

        if self.zip64_trailer {
            let eocd64_offset = out.len() as u64;
            out.extend_from_slice(b"PK\x06\x06");
            put64(&mut out, 44);
            put16(&mut out, 45);
            put16(&mut out, 45);
            put32(&mut out, 0);
            put32(&mut out, 0);
            put64(&mut out, count);
            put64(&mut out, count);
            put64(&mut out, cd_size);
            put64(&mut out, cd_offset);

            out.extend_from_slice(b"PK\x06\x07");
            put32(&mut out, 0);
            put64(&mut out, eocd64_offset);
            put32(&mut out, 1);
        }

        let eocd_offset = out.len() as u64;
        out.extend_from_slice(b"PK\x05\x06");
        put16(&mut out, 0);
        put16(&mut out, 0);
        if self.zip64_trailer {
            put16(&mut out, 0xFFFF);
            put16(&mut out, 0xFFFF);
            put32(&mut out, ZIP64_SENTINEL_32);
            put32(&mut out, ZIP64_SENTINEL_32);
        } else {
            put16(&mut out, count as u16);
            put16(&mut out, count as u16);
            put32(&mut out, cd_size as u32);
            put32(&mut out, cd_offset as u32);
        }
        put16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);

        BuiltArchive {
            bytes: out,
            cd_offset,
            cd_size,
            eocd_offset,
            local_offsets,
            record_offsets,
        }
    }
}

impl BuiltArchive {
    /// Overwrite the EOCD's total entry count (both per-disk and total).
    pub(crate) fn set_declared_count(&mut self, count: u16) {
        let at = self.eocd_offset as usize + 8;
        self.bytes[at..at + 2].copy_from_slice(&count.to_le_bytes());
        self.bytes[at + 2..at + 4].copy_from_slice(&count.to_le_bytes());
    }

    /// Offset of the ZIP64 EOCD locator, which sits right before the EOCD.
    pub(crate) fn zip64_locator_offset(&self) -> usize {
        self.eocd_offset as usize - 20
    }

    /// Offset of the ZIP64 EOCD written by [`ArchiveBuilder::zip64_trailer`].
    pub(crate) fn zip64_eocd_offset(&self) -> usize {
        (self.cd_offset + self.cd_size) as usize
    }

    /// Overwrite the EOCD's central directory size.
    pub(crate) fn set_cd_size(&mut self, size: u32) {
        let at = self.eocd_offset as usize + 12;
        self.bytes[at..at + 4].copy_from_slice(&size.to_le_bytes());
    }
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}
