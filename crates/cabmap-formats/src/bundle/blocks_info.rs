//! Blocks info: storage blocks and the entry directory

use crate::strings::{read_cstring, write_cstring};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Entry flag marking a serialized asset file
pub const NODE_FLAG_SERIALIZED: u32 = 0x04;

/// One storage block of the bundle payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(big)]
pub struct StorageBlock {
    /// Size after decoding
    pub uncompressed_size: u32,
    /// Size as stored
    pub compressed_size: u32,
    /// Low six bits carry the compression type
    pub flags: u16,
}

/// Directory entry naming a CAB inside the bundle
///
/// `offset` and `size` address the concatenated block data, not the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Offset into the block data
    pub offset: i64,
    /// Entry length
    pub size: i64,
    /// Entry flags
    pub flags: u32,
    /// Entry path, usually `CAB-<hash>` or `CAB-<hash>.resS`
    pub path: String,
}

impl BinRead for Node {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let offset = i64::read_options(reader, binrw::Endian::Big, ())?;
        let size = i64::read_options(reader, binrw::Endian::Big, ())?;
        let flags = u32::read_options(reader, binrw::Endian::Big, ())?;
        let path = read_cstring(reader)?;

        Ok(Self {
            offset,
            size,
            flags,
            path,
        })
    }
}

impl BinWrite for Node {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.offset.write_options(writer, binrw::Endian::Big, ())?;
        self.size.write_options(writer, binrw::Endian::Big, ())?;
        self.flags.write_options(writer, binrw::Endian::Big, ())?;
        write_cstring(writer, &self.path)
    }
}

/// Blocks info section
///
/// Layout (big-endian):
/// - Uncompressed data hash (16 bytes)
/// - Block count (4 bytes, signed) followed by 10-byte block records
/// - Node count (4 bytes, signed) followed by variable-length node records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocksInfo {
    /// Hash of the uncompressed data
    pub hash: [u8; 16],
    /// Storage blocks in payload order
    pub blocks: Vec<StorageBlock>,
    /// Directory of entries
    pub nodes: Vec<Node>,
}

impl BlocksInfo {
    /// Total stored size of all blocks
    pub fn stored_data_len(&self) -> u64 {
        self.blocks
            .iter()
            .map(|block| u64::from(block.compressed_size))
            .sum()
    }

    /// Serialized length of this section
    pub fn encoded_len(&self) -> u64 {
        let nodes: u64 = self
            .nodes
            .iter()
            .map(|node| 8 + 8 + 4 + node.path.len() as u64 + 1)
            .sum();
        16 + 4 + 10 * self.blocks.len() as u64 + 4 + nodes
    }
}

fn read_count<R: Read + Seek>(reader: &mut R, what: &str) -> BinResult<usize> {
    let pos = reader.stream_position()?;
    let count = i32::read_options(reader, binrw::Endian::Big, ())?;
    usize::try_from(count).map_err(|_| binrw::Error::AssertFail {
        pos,
        message: format!("Negative {what} count: {count}"),
    })
}

fn write_count<W: Write + Seek>(writer: &mut W, count: usize, what: &str) -> BinResult<()> {
    let pos = writer.stream_position()?;
    let count = i32::try_from(count).map_err(|_| binrw::Error::AssertFail {
        pos,
        message: format!("Too many {what} entries: {count}"),
    })?;
    count.write_options(writer, binrw::Endian::Big, ())
}

impl BinRead for BlocksInfo {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let mut hash = [0u8; 16];
        reader.read_exact(&mut hash)?;

        let block_count = read_count(reader, "block")?;
        let mut blocks = Vec::with_capacity(block_count.min(1024));
        for _ in 0..block_count {
            blocks.push(StorageBlock::read_options(reader, binrw::Endian::Big, ())?);
        }

        let node_count = read_count(reader, "node")?;
        let mut nodes = Vec::with_capacity(node_count.min(1024));
        for _ in 0..node_count {
            nodes.push(Node::read_options(reader, binrw::Endian::Big, ())?);
        }

        Ok(Self {
            hash,
            blocks,
            nodes,
        })
    }
}

impl BinWrite for BlocksInfo {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        writer.write_all(&self.hash)?;

        write_count(writer, self.blocks.len(), "block")?;
        for block in &self.blocks {
            block.write_options(writer, binrw::Endian::Big, ())?;
        }

        write_count(writer, self.nodes.len(), "node")?;
        for node in &self.nodes {
            node.write_options(writer, binrw::Endian::Big, ())?;
        }

        Ok(())
    }
}
