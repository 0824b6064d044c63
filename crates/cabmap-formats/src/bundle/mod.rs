//! UnityFS bundle parsing and building
//!
//! A bundle is laid out as:
//!
//! ```text
//! [header]       signature, versions, total size, blocks info sizes, flags
//! [padding]      to 16 bytes from the bundle start (version >= 7)
//! [blocks info]  hash, storage blocks, entry directory
//! [block data]   concatenated storage blocks; entries address into it
//! ```
//!
//! With the `BLOCKS_INFO_AT_END` flag the blocks info moves behind the block
//! data, ending exactly at the declared bundle size.
//!
//! # Example
//!
//! ```rust
//! use cabmap_formats::bundle::{Bundle, BundleBuilder};
//! use std::io::Cursor;
//!
//! let bytes = BundleBuilder::new()
//!     .add_serialized_entry("CAB-0123", b"assets".to_vec())
//!     .to_bytes()?;
//!
//! let mut cursor = Cursor::new(&bytes);
//! let bundle = Bundle::read(&mut cursor)?;
//! assert_eq!(cursor.position(), bytes.len() as u64);
//! assert_eq!(bundle.entries()[0].path, "CAB-0123");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod blocks_info;
mod builder;
mod directory;
mod error;
mod header;

pub use blocks_info::{BlocksInfo, NODE_FLAG_SERIALIZED, Node, StorageBlock};
pub use builder::BundleBuilder;
pub use directory::{BundleDirectory, EntryReader};
pub use error::{BundleError, BundleResult};
pub use header::{
    BundleFlags, BundleHeader, CompressionType, HEADER_ALIGNMENT, MAX_BUNDLE_VERSION,
    MIN_BUNDLE_VERSION, UNITYFS_SIGNATURE,
};

use binrw::io::{Cursor, Read, Seek, SeekFrom, Write};
use binrw::BinWrite;
use directory::node_span;

/// A parsed bundle with its block data held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Bundle header
    pub header: BundleHeader,
    /// Storage blocks and entry directory
    pub blocks_info: BlocksInfo,
    /// Concatenated block data
    data: Vec<u8>,
}

impl Bundle {
    /// Parse one bundle starting at the reader's current position, block
    /// data included
    ///
    /// On success the reader is left at the first byte after the bundle, as
    /// given by the declared bundle size. Use [`BundleDirectory::read`] when
    /// only the entry directory is needed.
    pub fn read<R: Read + Seek>(reader: &mut R) -> BundleResult<Self> {
        let directory = BundleDirectory::read(reader)?;
        let end = reader.stream_position()?;

        reader.seek(SeekFrom::Start(directory.data_start))?;
        let mut data = vec![
            0u8;
            usize::try_from(directory.data_len()).map_err(|_| BundleError::InvalidLayout(
                "block data too large for platform".to_string()
            ))?
        ];
        reader.read_exact(&mut data)?;
        reader.seek(SeekFrom::Start(end))?;

        Ok(Self {
            header: directory.header,
            blocks_info: directory.blocks_info,
            data,
        })
    }

    /// Write this bundle at the writer's current position
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> BundleResult<()> {
        let start = writer.stream_position()?;
        let declared = u64::try_from(self.header.size).map_err(|_| {
            BundleError::InvalidLayout(format!("negative bundle size {}", self.header.size))
        })?;

        let info_size = u64::from(self.header.compressed_blocks_info_size);

        self.header
            .write_options(writer, binrw::Endian::Big, ())?;
        pad_to(writer, start, self.header.region_len())?;

        if self.header.flags.blocks_info_at_end() {
            writer.write_all(&self.data)?;
            pad_to(writer, start, declared.saturating_sub(info_size))?;
            self.blocks_info
                .write_options(writer, binrw::Endian::Big, ())?;
        } else {
            self.blocks_info
                .write_options(writer, binrw::Endian::Big, ())?;
            pad_to(writer, start, self.header.region_len() + info_size)?;
            writer.write_all(&self.data)?;
        }

        pad_to(writer, start, declared)
    }

    /// Convenience method to serialize into a byte vector
    pub fn to_bytes(&self) -> BundleResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(&mut Cursor::new(&mut buffer))?;
        Ok(buffer)
    }

    /// Entry directory
    pub fn entries(&self) -> &[Node] {
        &self.blocks_info.nodes
    }

    /// Find an entry by exact path
    pub fn find_entry(&self, path: &str) -> Option<&Node> {
        self.blocks_info.nodes.iter().find(|node| node.path == path)
    }

    /// Content bytes of an entry
    pub fn entry_data(&self, node: &Node) -> Option<&[u8]> {
        node_range(node, &self.data).map(|range| &self.data[range])
    }

    /// Seekable content stream of an entry
    pub fn entry_reader(&self, node: &Node) -> Option<Cursor<&[u8]>> {
        self.entry_data(node).map(Cursor::new)
    }

    /// Iterate over entries together with their content
    pub fn iter_entries(&self) -> impl Iterator<Item = (&Node, &[u8])> + '_ {
        self.blocks_info
            .nodes
            .iter()
            .filter_map(|node| self.entry_data(node).map(|data| (node, data)))
    }

    /// Concatenated block data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Declared bundle size in bytes
    pub fn size(&self) -> u64 {
        self.header.size as u64
    }
}

impl crate::BinaryFormat for Bundle {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Self::read(&mut Cursor::new(data)).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.to_bytes()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

/// Byte range of an entry within the in-memory block data
fn node_range(node: &Node, data: &[u8]) -> Option<std::ops::Range<usize>> {
    let (offset, size) = node_span(node, data.len() as u64)?;
    let offset = usize::try_from(offset).ok()?;
    let size = usize::try_from(size).ok()?;
    Some(offset..offset + size)
}

/// Zero-fill up to `target` bytes past `start`
fn pad_to<W: Write + Seek>(writer: &mut W, start: u64, target: u64) -> BundleResult<()> {
    let written = writer.stream_position()? - start;
    if written > target {
        return Err(BundleError::InvalidLayout(format!(
            "wrote {written} bytes, layout allows {target}"
        )));
    }
    writer.write_all(&vec![0u8; (target - written) as usize])?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::test_round_trip;

    fn two_entry_bundle(version: u32, at_end: bool) -> Bundle {
        BundleBuilder::new()
            .with_version(version)
            .with_blocks_info_at_end(at_end)
            .add_serialized_entry("CAB-aaaa", vec![1u8; 37])
            .add_entry("CAB-aaaa.resS", vec![2u8; 11])
            .build()
            .expect("bundle should build")
    }

    #[test]
    fn test_read_leaves_reader_after_bundle() {
        let bytes = two_entry_bundle(6, false).to_bytes().unwrap();
        let mut stream = bytes.clone();
        stream.extend_from_slice(b"trailing");

        let mut cursor = Cursor::new(&stream);
        let bundle = Bundle::read(&mut cursor).expect("bundle should parse");
        assert_eq!(cursor.position(), bytes.len() as u64);
        assert_eq!(bundle.size(), bytes.len() as u64);
    }

    #[test]
    fn test_entries_and_content() {
        let bytes = two_entry_bundle(7, false).to_bytes().unwrap();
        let bundle = Bundle::read(&mut Cursor::new(&bytes)).unwrap();

        let paths: Vec<_> = bundle.entries().iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["CAB-aaaa", "CAB-aaaa.resS"]);

        let cab = bundle.find_entry("CAB-aaaa").unwrap();
        assert_eq!(cab.flags, NODE_FLAG_SERIALIZED);
        assert_eq!(bundle.entry_data(cab).unwrap(), &[1u8; 37][..]);

        let res = bundle.find_entry("CAB-aaaa.resS").unwrap();
        assert_eq!(bundle.entry_data(res).unwrap(), &[2u8; 11][..]);
        assert_eq!(bundle.iter_entries().count(), 2);
    }

    #[test]
    fn test_round_trip_all_layouts() {
        for version in MIN_BUNDLE_VERSION..=MAX_BUNDLE_VERSION {
            for at_end in [false, true] {
                let bundle = two_entry_bundle(version, at_end);
                let result = test_round_trip(&bundle);
                assert!(
                    result.is_ok(),
                    "version {version}, at_end {at_end}: {result:?}"
                );
            }
        }
    }

    #[test]
    fn test_aligned_header_padding() {
        let bundle = two_entry_bundle(7, false);
        let bytes = bundle.to_bytes().unwrap();
        let header_len = bundle.header.encoded_len();
        let padded = bundle.header.region_len();
        assert_eq!(padded % HEADER_ALIGNMENT, 0);
        assert!(padded >= header_len);
        assert!(bytes[header_len as usize..padded as usize].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let bytes = two_entry_bundle(6, false).to_bytes().unwrap();
        let truncated = &bytes[..bytes.len() - 1];

        let result = Bundle::read(&mut Cursor::new(truncated));
        assert!(matches!(result, Err(BundleError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let mut bytes = two_entry_bundle(6, false).to_bytes().unwrap();
        bytes[0] = b'X';

        let result = Bundle::read(&mut Cursor::new(&bytes));
        assert!(matches!(result, Err(BundleError::InvalidSignature(_))));
    }

    #[test]
    fn test_compressed_block_rejected() {
        let mut bundle = two_entry_bundle(6, false);
        bundle.blocks_info.blocks[0].flags = 0x02;
        let bytes = bundle.to_bytes().unwrap();

        let result = Bundle::read(&mut Cursor::new(&bytes));
        assert!(matches!(result, Err(BundleError::UnsupportedCompression(2))));
    }

    #[test]
    fn test_entry_out_of_bounds_rejected() {
        let mut bundle = two_entry_bundle(6, false);
        bundle.blocks_info.nodes[1].size = 1000;
        let bytes = bundle.to_bytes().unwrap();

        let result = Bundle::read(&mut Cursor::new(&bytes));
        assert!(matches!(
            result,
            Err(BundleError::EntryOutOfBounds { ref path, .. }) if path == "CAB-aaaa.resS"
        ));
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = BundleBuilder::new().build().unwrap();
        assert!(bundle.entries().is_empty());
        test_round_trip(&bundle).unwrap();
    }
}
