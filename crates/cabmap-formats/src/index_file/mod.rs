//! Persisted CAB index file
//!
//! ```text
//! i32 record_count
//! record_count * {
//!     string key
//!     string container_path
//!     i64    offset
//!     i32    dependency_count
//!     dependency_count * string dependency
//! }
//! ```
//!
//! Integers are little-endian. Strings carry a 7-bit encoded byte length
//! followed by UTF-8 bytes.

mod error;

pub use error::{IndexFileError, IndexFileResult};

use crate::strings::{read_prefixed_string, write_prefixed_string};
use binrw::io::{Cursor, Read, Seek, Write};
use binrw::{BinRead, BinWrite};

/// Upper bound for capacity reserved from an untrusted count
const MAX_PREALLOCATED: usize = 4096;

/// One CAB location record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    /// CAB id
    pub key: String,
    /// Path of the wrapper file holding the CAB
    pub container_path: String,
    /// Start offset of the owning bundle within the wrapper
    pub offset: i64,
    /// CAB ids this CAB references
    pub dependencies: Vec<String>,
}

impl IndexRecord {
    fn read<R: Read + Seek>(reader: &mut R) -> IndexFileResult<Self> {
        let key = read_prefixed_string(reader)?;
        let container_path = read_prefixed_string(reader)?;
        let offset = i64::read_options(reader, binrw::Endian::Little, ())?;

        let count = read_count(reader, "dependency")?;
        let mut dependencies = Vec::with_capacity(count.min(MAX_PREALLOCATED));
        for _ in 0..count {
            dependencies.push(read_prefixed_string(reader)?);
        }

        Ok(Self {
            key,
            container_path,
            offset,
            dependencies,
        })
    }

    fn write<W: Write + Seek>(&self, writer: &mut W) -> IndexFileResult<()> {
        write_prefixed_string(writer, &self.key)?;
        write_prefixed_string(writer, &self.container_path)?;
        self.offset
            .write_options(writer, binrw::Endian::Little, ())?;

        write_count(writer, self.dependencies.len(), "dependency")?;
        for dependency in &self.dependencies {
            write_prefixed_string(writer, dependency)?;
        }
        Ok(())
    }
}

/// Decoded index file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexFile {
    /// Records in file order
    pub records: Vec<IndexRecord>,
}

impl IndexFile {
    /// Create an index file from records, keeping their order
    pub fn new(records: Vec<IndexRecord>) -> Self {
        Self { records }
    }

    /// Decode from a reader
    pub fn read<R: Read + Seek>(reader: &mut R) -> IndexFileResult<Self> {
        let count = read_count(reader, "record")?;
        let mut records = Vec::with_capacity(count.min(MAX_PREALLOCATED));
        for _ in 0..count {
            records.push(IndexRecord::read(reader)?);
        }
        Ok(Self { records })
    }

    /// Encode to a writer, records in their current order
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> IndexFileResult<()> {
        write_count(writer, self.records.len(), "record")?;
        for record in &self.records {
            record.write(writer)?;
        }
        Ok(())
    }

    /// Encode to a byte vector
    pub fn to_bytes(&self) -> IndexFileResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(&mut Cursor::new(&mut buffer))?;
        Ok(buffer)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the file holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl crate::BinaryFormat for IndexFile {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Self::read(&mut Cursor::new(data)).map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.to_bytes()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

fn read_count<R: Read + Seek>(reader: &mut R, what: &'static str) -> IndexFileResult<usize> {
    let offset = reader.stream_position()?;
    let count = i32::read_options(reader, binrw::Endian::Little, ())?;
    usize::try_from(count).map_err(|_| IndexFileError::NegativeCount {
        what,
        count,
        offset,
    })
}

fn write_count<W: Write + Seek>(
    writer: &mut W,
    count: usize,
    what: &'static str,
) -> IndexFileResult<()> {
    let value = i32::try_from(count).map_err(|_| IndexFileError::TooMany { what, count })?;
    value.write_options(writer, binrw::Endian::Little, ())?;
    Ok(())
}
