//! Metadata-only bundle reading
//!
//! [`BundleDirectory::read`] validates a bundle and parses its header and
//! blocks info, then seeks past the block data without reading it. Entry
//! content is reached through [`EntryReader`], a bounded view over the
//! same underlying stream.

use crate::bundle::blocks_info::{BlocksInfo, Node};
use crate::bundle::error::{BundleError, BundleResult};
use crate::bundle::header::{BundleHeader, CompressionType, HEADER_ALIGNMENT};
use crate::strings::align_from;
use binrw::BinRead;
use binrw::io::{Read, Seek, SeekFrom};
use std::io;

/// Header and entry directory of a bundle, with the position of its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDirectory {
    /// Bundle header
    pub header: BundleHeader,
    /// Storage blocks and entry directory
    pub blocks_info: BlocksInfo,
    /// Stream position of the bundle start
    pub start: u64,
    /// Stream position of the first block data byte
    pub data_start: u64,
}

impl BundleDirectory {
    /// Parse the bundle starting at the reader's current position
    ///
    /// The reader is left at the first byte after the bundle. Block data is
    /// skipped, not read.
    pub fn read<R: Read + Seek>(reader: &mut R) -> BundleResult<Self> {
        let start = reader.stream_position()?;
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;

        let header = BundleHeader::read_options(reader, binrw::Endian::Big, ())?;
        header.validate()?;

        let end = start
            .checked_add(header.size as u64)
            .ok_or_else(|| BundleError::InvalidLayout("bundle size overflows".to_string()))?;
        if end > stream_len {
            return Err(BundleError::Truncated {
                offset: start,
                declared_end: end,
                stream_len,
            });
        }

        if header.is_aligned() {
            align_from(reader, start, HEADER_ALIGNMENT)?;
        }
        let header_end = reader.stream_position()?;
        let info_size = u64::from(header.compressed_blocks_info_size);
        let info_at_end = header.flags.blocks_info_at_end();

        let (info_pos, data_start) = if info_at_end {
            let info_pos = end
                .checked_sub(info_size)
                .filter(|pos| *pos >= header_end)
                .ok_or_else(|| {
                    BundleError::InvalidLayout(format!(
                        "blocks info of {info_size} bytes does not fit before {end:#x}"
                    ))
                })?;
            (info_pos, header_end)
        } else {
            (header_end, header_end + info_size)
        };

        if info_pos + info_size > end {
            return Err(BundleError::InvalidLayout(format!(
                "blocks info at {info_pos:#x} runs past bundle end {end:#x}"
            )));
        }

        reader.seek(SeekFrom::Start(info_pos))?;
        let blocks_info = BlocksInfo::read_options(reader, binrw::Endian::Big, ())?;
        let consumed = reader.stream_position()? - info_pos;
        if consumed > info_size {
            return Err(BundleError::InvalidLayout(format!(
                "blocks info declares {info_size} bytes, parsed {consumed}"
            )));
        }

        for block in &blocks_info.blocks {
            let compression = CompressionType::from_bits(u32::from(block.flags));
            if compression != CompressionType::None {
                return Err(BundleError::UnsupportedCompression(compression.as_u8()));
            }
            if block.compressed_size != block.uncompressed_size {
                return Err(BundleError::InvalidLayout(format!(
                    "stored block declares {} bytes stored, {} decoded",
                    block.compressed_size, block.uncompressed_size
                )));
            }
        }

        let data_len = blocks_info.stored_data_len();
        let data_limit = if info_at_end { info_pos } else { end };
        if data_start + data_len > data_limit {
            return Err(BundleError::InvalidLayout(format!(
                "{data_len} bytes of block data at {data_start:#x} exceed limit {data_limit:#x}"
            )));
        }

        for node in &blocks_info.nodes {
            if node_span(node, data_len).is_none() {
                return Err(BundleError::EntryOutOfBounds {
                    path: node.path.clone(),
                    offset: node.offset,
                    size: node.size,
                    data_len,
                });
            }
        }

        reader.seek(SeekFrom::Start(end))?;

        Ok(Self {
            header,
            blocks_info,
            start,
            data_start,
        })
    }

    /// Entry directory
    pub fn entries(&self) -> &[Node] {
        &self.blocks_info.nodes
    }

    /// Find an entry by exact path
    pub fn find_entry(&self, path: &str) -> Option<&Node> {
        self.blocks_info.nodes.iter().find(|node| node.path == path)
    }

    /// Length of the concatenated block data
    pub fn data_len(&self) -> u64 {
        self.blocks_info.stored_data_len()
    }

    /// Declared bundle size in bytes
    pub fn size(&self) -> u64 {
        self.header.size as u64
    }

    /// Bounded view of an entry's content over `reader`
    ///
    /// `reader` must be the stream this directory was read from.
    pub fn entry_reader<'r, R: Read + Seek>(
        &self,
        reader: &'r mut R,
        node: &Node,
    ) -> Option<EntryReader<'r, R>> {
        let (offset, len) = node_span(node, self.data_len())?;
        Some(EntryReader::new(reader, self.data_start + offset, len))
    }
}

/// Offset and length of an entry within block data of `data_len` bytes
pub(crate) fn node_span(node: &Node, data_len: u64) -> Option<(u64, u64)> {
    let offset = u64::try_from(node.offset).ok()?;
    let size = u64::try_from(node.size).ok()?;
    let end = offset.checked_add(size)?;
    (end <= data_len).then_some((offset, size))
}

/// Read-only window of `len` bytes starting at `start` in the inner stream
///
/// Positions are relative to the window, so `SeekFrom::End(0)` lands at the
/// entry's end.
#[derive(Debug)]
pub struct EntryReader<'r, R> {
    inner: &'r mut R,
    start: u64,
    len: u64,
    pos: u64,
    synced: bool,
}

impl<'r, R: Read + Seek> EntryReader<'r, R> {
    /// Window over `len` bytes of `inner` from `start`
    pub fn new(inner: &'r mut R, start: u64, len: u64) -> Self {
        Self {
            inner,
            start,
            len,
            pos: 0,
            synced: false,
        }
    }

    /// Window length
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Read + Seek> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        if !self.synced {
            self.inner.seek(SeekFrom::Start(self.start + self.pos))?;
            self.synced = true;
        }

        let wanted = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let read = self.inner.read(&mut buf[..wanted])?;
        self.pos += read as u64;
        Ok(read)
    }
}

impl<R: Read + Seek> Seek for EntryReader<'_, R> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match target {
            SeekFrom::Start(pos) => (pos, 0),
            SeekFrom::End(delta) => (self.len, delta),
            SeekFrom::Current(delta) => (self.pos, delta),
        };
        let pos = base.checked_add_signed(delta).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the entry",
            )
        })?;

        if pos != self.pos {
            self.pos = pos;
            self.synced = false;
        }
        Ok(pos)
    }
}
