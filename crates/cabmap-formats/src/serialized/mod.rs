//! Serialized asset file header reader
//!
//! Only the fixed header and the front of the metadata are decoded:
//!
//! ```text
//! [header]    sizes, version, data offset, metadata endianness
//! [metadata]  unity version, target platform, externals table, ...
//! [padding]
//! [payload]   object data, never read here
//! ```
//!
//! # Example
//!
//! ```rust
//! use cabmap_formats::serialized::{SerializedFile, SerializedFileBuilder};
//! use std::io::Cursor;
//!
//! let bytes = SerializedFileBuilder::new()
//!     .add_external("archive:/CAB-beef/CAB-beef")
//!     .build()?;
//!
//! let file = SerializedFile::read_header(&mut Cursor::new(&bytes))?;
//! assert_eq!(file.dependencies(), vec!["CAB-beef".to_string()]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod error;
mod external;
mod header;

pub use builder::SerializedFileBuilder;
pub use error::{SerializedError, SerializedResult};
pub use external::ExternalReference;
pub use header::{
    MIN_SERIALIZED_VERSION, NARROW_HEADER_LEN, SerializedHeader, WIDE_HEADER_LEN,
    WIDE_HEADER_VERSION,
};

use crate::strings::{read_cstring, write_cstring};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinWrite};

/// Header and externals of a serialized file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedFile {
    /// Fixed header
    pub header: SerializedHeader,
    /// Engine version that wrote the file
    pub unity_version: String,
    /// Build target platform id
    pub target_platform: i32,
    /// Other files this one references
    pub externals: Vec<ExternalReference>,
}

impl SerializedFile {
    /// Read the header and externals table at the reader's position
    ///
    /// The payload is never touched; the reader is left at the end of the
    /// externals table.
    pub fn read_header<R: Read + Seek>(reader: &mut R) -> SerializedResult<Self> {
        let header = SerializedHeader::read_options(reader, binrw::Endian::Big, ())?;

        if header.version < MIN_SERIALIZED_VERSION {
            return Err(SerializedError::UnsupportedVersion(header.version));
        }
        if header.endianness > 1 {
            return Err(SerializedError::InvalidEndianness(header.endianness));
        }

        let metadata_start = reader.stream_position()?;
        let endian = header.metadata_endian();

        let unity_version = read_cstring(reader)?;
        let target_platform = i32::read_options(reader, endian, ())?;

        let count_pos = reader.stream_position()?;
        let count = i32::read_options(reader, endian, ())?;
        let count = usize::try_from(count).map_err(|_| binrw::Error::AssertFail {
            pos: count_pos,
            message: format!("Negative external count: {count}"),
        })?;

        let mut externals = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            externals.push(ExternalReference::read_options(reader, endian, ())?);
        }

        let consumed = reader.stream_position()? - metadata_start;
        if consumed > u64::from(header.metadata_size) {
            return Err(SerializedError::InvalidLayout {
                reason: format!(
                    "externals end {consumed} bytes into metadata declared as {}",
                    header.metadata_size
                ),
            });
        }
        if header.encoded_len() + u64::from(header.metadata_size) > header.data_offset {
            return Err(SerializedError::InvalidLayout {
                reason: format!(
                    "metadata of {} bytes overlaps data offset {}",
                    header.metadata_size, header.data_offset
                ),
            });
        }

        Ok(Self {
            header,
            unity_version,
            target_platform,
            externals,
        })
    }

    /// Dependency ids declared by this file, in table order
    pub fn dependencies(&self) -> Vec<String> {
        self.externals
            .iter()
            .map(|external| external.file_name().to_string())
            .collect()
    }

    /// Write the header and the metadata prefix
    pub fn write_header<W: Write + Seek>(&self, writer: &mut W) -> SerializedResult<()> {
        self.header
            .write_options(writer, binrw::Endian::Big, ())?;
        self.write_metadata(writer)
    }

    /// Write the metadata prefix in the header's endianness
    pub(crate) fn write_metadata<W: Write + Seek>(&self, writer: &mut W) -> SerializedResult<()> {
        let endian = self.header.metadata_endian();
        write_cstring(writer, &self.unity_version)?;
        self.target_platform.write_options(writer, endian, ())?;

        let pos = writer.stream_position()?;
        let count = i32::try_from(self.externals.len()).map_err(|_| binrw::Error::AssertFail {
            pos,
            message: format!("Too many externals: {}", self.externals.len()),
        })?;
        count.write_options(writer, endian, ())?;
        for external in &self.externals {
            external.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}
