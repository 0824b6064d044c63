//! Wrapper container scanning
//!
//! A wrapper file packs one or more bundles. It may start with an explicit
//! offset table:
//!
//! ```text
//! "WMVT"        magic (4 bytes)
//! count         number of bundles (4 bytes, big-endian)
//! offsets       count * 8 bytes, big-endian absolute stream positions
//! ```
//!
//! Without a table the bundles are simply concatenated and found by parsing
//! one after another until the stream ends exactly.
//!
//! # Example
//!
//! ```rust
//! use cabmap_formats::bundle::BundleBuilder;
//! use cabmap_formats::wrapper::{WrapperBuilder, WrapperFile};
//! use std::io::Cursor;
//!
//! let first = BundleBuilder::new().add_entry("CAB-a.resS", vec![0; 8]).build()?;
//! let second = BundleBuilder::new().add_entry("CAB-b.resS", vec![0; 8]).build()?;
//! let bytes = WrapperBuilder::new()
//!     .add_bundle(first)
//!     .add_bundle(second)
//!     .build()?;
//!
//! let wrapper = WrapperFile::read(&mut Cursor::new(&bytes))?;
//! assert_eq!(wrapper.len(), 2);
//! assert_eq!(wrapper.offsets()[0], 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod error;

pub use builder::WrapperBuilder;
pub use error::{WrapperError, WrapperResult};

use crate::bundle::BundleDirectory;
use binrw::BinRead;
use binrw::io::{Read, Seek, SeekFrom};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Magic opening an explicit offset table
pub const OFFSET_TABLE_MAGIC: [u8; 4] = *b"WMVT";

/// Bundles discovered in one wrapper file
///
/// Only bundle directories are kept; entry content is read on demand through
/// [`BundleDirectory::entry_reader`] over the same stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperFile {
    /// Bundle directories keyed by their starting stream position
    pub bundles: BTreeMap<u64, BundleDirectory>,
    /// Offsets listed by an explicit table, in table order
    pub offset_table: Option<Vec<u64>>,
}

impl WrapperFile {
    /// Scan a wrapper from the reader's current position
    ///
    /// Any bundle that fails to parse aborts the whole scan.
    pub fn read<R: Read + Seek>(reader: &mut R) -> WrapperResult<Self> {
        let start = reader.stream_position()?;
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;

        match read_offset_table(reader, start, stream_len)? {
            Some(table) => Self::read_listed(reader, table),
            None => {
                reader.seek(SeekFrom::Start(start))?;
                Self::read_sequential(reader, stream_len)
            }
        }
    }

    fn read_listed<R: Read + Seek>(reader: &mut R, table: Vec<u64>) -> WrapperResult<Self> {
        let mut bundles = BTreeMap::new();
        for &offset in &table {
            reader.seek(SeekFrom::Start(offset))?;
            let bundle = read_bundle_at(reader, offset)?;
            match bundles.entry(offset) {
                Entry::Vacant(slot) => {
                    slot.insert(bundle);
                }
                Entry::Occupied(_) => return Err(WrapperError::DuplicateOffset(offset)),
            }
        }

        Ok(Self {
            bundles,
            offset_table: Some(table),
        })
    }

    fn read_sequential<R: Read + Seek>(reader: &mut R, stream_len: u64) -> WrapperResult<Self> {
        let mut bundles = BTreeMap::new();
        let mut pos = reader.stream_position()?;
        while pos != stream_len {
            let bundle = read_bundle_at(reader, pos)?;
            bundles.insert(pos, bundle);
            pos = reader.stream_position()?;
        }

        Ok(Self {
            bundles,
            offset_table: None,
        })
    }

    /// Bundle start offsets in ascending order
    pub fn offsets(&self) -> Vec<u64> {
        self.bundles.keys().copied().collect()
    }

    /// Bundle starting at `offset`
    pub fn get(&self, offset: u64) -> Option<&BundleDirectory> {
        self.bundles.get(&offset)
    }

    /// Iterate bundles in offset order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &BundleDirectory)> + '_ {
        self.bundles.iter().map(|(offset, bundle)| (*offset, bundle))
    }

    /// Number of bundles
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether no bundles were found
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

fn read_bundle_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
) -> WrapperResult<BundleDirectory> {
    BundleDirectory::read(reader).map_err(|source| WrapperError::Bundle { offset, source })
}

/// Read the offset table if the stream starts with one
fn read_offset_table<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    stream_len: u64,
) -> WrapperResult<Option<Vec<u64>>> {
    if stream_len.saturating_sub(start) < 8 {
        return Ok(None);
    }

    let magic = <[u8; 4]>::read_options(reader, binrw::Endian::Big, ())?;
    if magic != OFFSET_TABLE_MAGIC {
        return Ok(None);
    }

    let count = u32::read_options(reader, binrw::Endian::Big, ())?;
    let table_end = start + 8 + u64::from(count) * 8;
    if table_end > stream_len {
        return Err(WrapperError::InvalidTable {
            reason: format!("{count} offsets do not fit in {stream_len} bytes"),
        });
    }

    let mut table = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = u64::read_options(reader, binrw::Endian::Big, ())?;
        if offset < table_end || offset >= stream_len {
            return Err(WrapperError::InvalidTable {
                reason: format!(
                    "offset {offset:#x} outside bundle area {table_end:#x}..{stream_len:#x}"
                ),
            });
        }
        table.push(offset);
    }

    Ok(Some(table))
}
