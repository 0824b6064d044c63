//! Serialized file fixed header

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Oldest format version with the endianness byte in the header
pub const MIN_SERIALIZED_VERSION: u32 = 9;

/// First format version using 64-bit sizes and offsets
pub const WIDE_HEADER_VERSION: u32 = 22;

/// Header length for versions 9 to 21
pub const NARROW_HEADER_LEN: u64 = 20;

/// Header length from version 22
pub const WIDE_HEADER_LEN: u64 = 48;

/// Serialized file header
///
/// The leading fields are always big-endian:
/// - Metadata size, file size, version, data offset (4 bytes each)
/// - Endianness of the metadata, then 3 reserved bytes (version 9+)
/// - Version 22+: metadata size (4 bytes), file size, data offset and a
///   reserved field (8 bytes each); the 32-bit copies above are then unused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedHeader {
    /// Metadata length in bytes
    pub metadata_size: u32,
    /// Total file length in bytes
    pub file_size: u64,
    /// Format version
    pub version: u32,
    /// Offset of the object payload
    pub data_offset: u64,
    /// 0 for little-endian metadata, 1 for big-endian
    pub endianness: u8,
}

impl SerializedHeader {
    /// Whether the 64-bit header layout applies
    pub const fn is_wide(&self) -> bool {
        self.version >= WIDE_HEADER_VERSION
    }

    /// Serialized length of this header
    pub const fn encoded_len(&self) -> u64 {
        if self.is_wide() {
            WIDE_HEADER_LEN
        } else {
            NARROW_HEADER_LEN
        }
    }

    /// Endianness of the metadata that follows
    pub const fn metadata_endian(&self) -> binrw::Endian {
        if self.endianness == 0 {
            binrw::Endian::Little
        } else {
            binrw::Endian::Big
        }
    }
}

impl BinRead for SerializedHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let be = binrw::Endian::Big;
        let mut metadata_size = u32::read_options(reader, be, ())?;
        let mut file_size = u64::from(u32::read_options(reader, be, ())?);
        let version = u32::read_options(reader, be, ())?;
        let mut data_offset = u64::from(u32::read_options(reader, be, ())?);

        let mut endianness = 0;
        if version >= MIN_SERIALIZED_VERSION {
            endianness = u8::read_options(reader, be, ())?;
            let _reserved = <[u8; 3]>::read_options(reader, be, ())?;
        }

        if version >= WIDE_HEADER_VERSION {
            let pos = reader.stream_position()?;
            metadata_size = u32::read_options(reader, be, ())?;
            let wide_size = i64::read_options(reader, be, ())?;
            let wide_offset = i64::read_options(reader, be, ())?;
            let _reserved = i64::read_options(reader, be, ())?;

            file_size = u64::try_from(wide_size).map_err(|_| binrw::Error::AssertFail {
                pos,
                message: format!("Negative file size: {wide_size}"),
            })?;
            data_offset = u64::try_from(wide_offset).map_err(|_| binrw::Error::AssertFail {
                pos,
                message: format!("Negative data offset: {wide_offset}"),
            })?;
        }

        Ok(Self {
            metadata_size,
            file_size,
            version,
            data_offset,
            endianness,
        })
    }
}

impl BinWrite for SerializedHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let be = binrw::Endian::Big;
        let pos = writer.stream_position()?;
        let narrow = |value: u64, what: &str| {
            u32::try_from(value).map_err(|_| binrw::Error::AssertFail {
                pos,
                message: format!("{what} {value} needs the wide header"),
            })
        };

        if self.is_wide() {
            // Narrow copies are left zeroed
            0u32.write_options(writer, be, ())?;
            0u32.write_options(writer, be, ())?;
            self.version.write_options(writer, be, ())?;
            0u32.write_options(writer, be, ())?;
        } else {
            self.metadata_size.write_options(writer, be, ())?;
            narrow(self.file_size, "File size")?.write_options(writer, be, ())?;
            self.version.write_options(writer, be, ())?;
            narrow(self.data_offset, "Data offset")?.write_options(writer, be, ())?;
        }

        if self.version >= MIN_SERIALIZED_VERSION {
            self.endianness.write_options(writer, be, ())?;
            [0u8; 3].write_options(writer, be, ())?;
        }

        if self.is_wide() {
            self.metadata_size.write_options(writer, be, ())?;
            (self.file_size as i64).write_options(writer, be, ())?;
            (self.data_offset as i64).write_options(writer, be, ())?;
            0i64.write_options(writer, be, ())?;
        }

        Ok(())
    }
}
