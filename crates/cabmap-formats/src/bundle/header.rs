//! Bundle header parsing and building

use crate::bundle::error::{BundleError, BundleResult};
use crate::strings::{padding_for, read_cstring, write_cstring};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Signature at the start of every bundle
pub const UNITYFS_SIGNATURE: &str = "UnityFS";

/// Oldest supported bundle format version
pub const MIN_BUNDLE_VERSION: u32 = 6;

/// Newest supported bundle format version
pub const MAX_BUNDLE_VERSION: u32 = 8;

/// Alignment applied after the header from version 7 onwards
pub const HEADER_ALIGNMENT: u64 = 16;

/// Compression scheme recorded in the low bits of the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Stored
    None,
    /// LZMA
    Lzma,
    /// LZ4
    Lz4,
    /// LZ4 high compression
    Lz4Hc,
    /// Any other value
    Other(u8),
}

impl CompressionType {
    /// Decode from the low six bits of a flags value
    pub const fn from_bits(bits: u32) -> Self {
        match (bits & 0x3F) as u8 {
            0 => Self::None,
            1 => Self::Lzma,
            2 => Self::Lz4,
            3 => Self::Lz4Hc,
            other => Self::Other(other),
        }
    }

    /// Numeric compression type
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Lzma => 1,
            Self::Lz4 => 2,
            Self::Lz4Hc => 3,
            Self::Other(value) => value,
        }
    }
}

/// Bundle header flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BundleFlags(pub u32);

impl BundleFlags {
    /// Blocks info and directory share one block
    pub const BLOCKS_AND_DIRECTORY_COMBINED: u32 = 0x40;
    /// Blocks info is stored at the end of the bundle
    pub const BLOCKS_INFO_AT_END: u32 = 0x80;

    /// Compression applied to the blocks info
    pub const fn compression(self) -> CompressionType {
        CompressionType::from_bits(self.0)
    }

    /// Whether the blocks info sits at the end of the bundle
    pub const fn blocks_info_at_end(self) -> bool {
        self.0 & Self::BLOCKS_INFO_AT_END != 0
    }
}

/// Bundle header
///
/// All numeric fields are big-endian:
/// - Signature (NUL-terminated, always `UnityFS`)
/// - Format version (4 bytes)
/// - Unity version and revision (NUL-terminated)
/// - Total bundle size (8 bytes, signed)
/// - Compressed and uncompressed blocks info size (4 bytes each)
/// - Flags (4 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    /// Signature string
    pub signature: String,
    /// Format version
    pub version: u32,
    /// Engine version that wrote the bundle
    pub unity_version: String,
    /// Engine revision that wrote the bundle
    pub unity_revision: String,
    /// Total bundle size measured from the signature
    pub size: i64,
    /// Stored size of the blocks info
    pub compressed_blocks_info_size: u32,
    /// Decoded size of the blocks info
    pub uncompressed_blocks_info_size: u32,
    /// Layout and compression flags
    pub flags: BundleFlags,
}

impl BundleHeader {
    /// Validate the header fields
    pub fn validate(&self) -> BundleResult<()> {
        if self.signature != UNITYFS_SIGNATURE {
            return Err(BundleError::InvalidSignature(self.signature.clone()));
        }

        if !(MIN_BUNDLE_VERSION..=MAX_BUNDLE_VERSION).contains(&self.version) {
            return Err(BundleError::UnsupportedVersion(self.version));
        }

        let compression = self.flags.compression();
        if compression != CompressionType::None {
            return Err(BundleError::UnsupportedCompression(compression.as_u8()));
        }

        if self.compressed_blocks_info_size != self.uncompressed_blocks_info_size {
            return Err(BundleError::InvalidLayout(format!(
                "stored blocks info declares {} bytes compressed, {} uncompressed",
                self.compressed_blocks_info_size, self.uncompressed_blocks_info_size
            )));
        }

        if self.size <= 0 {
            return Err(BundleError::InvalidLayout(format!(
                "non-positive bundle size {}",
                self.size
            )));
        }

        Ok(())
    }

    /// Whether a padding block follows the header
    pub const fn is_aligned(&self) -> bool {
        self.version >= 7
    }

    /// Serialized length of this header, before alignment
    pub fn encoded_len(&self) -> u64 {
        // Signature, unity version and revision each carry one NUL
        (self.signature.len() + self.unity_version.len() + self.unity_revision.len() + 3) as u64
            + 4 // version
            + 8 // size
            + 4 // compressed blocks info size
            + 4 // uncompressed blocks info size
            + 4 // flags
    }

    /// Length of the header including alignment padding
    pub fn region_len(&self) -> u64 {
        let len = self.encoded_len();
        if self.is_aligned() {
            len + padding_for(len, HEADER_ALIGNMENT)
        } else {
            len
        }
    }
}

impl BinRead for BundleHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let signature = read_cstring(reader)?;
        let version = u32::read_options(reader, binrw::Endian::Big, ())?;
        let unity_version = read_cstring(reader)?;
        let unity_revision = read_cstring(reader)?;
        let size = i64::read_options(reader, binrw::Endian::Big, ())?;
        let compressed_blocks_info_size = u32::read_options(reader, binrw::Endian::Big, ())?;
        let uncompressed_blocks_info_size = u32::read_options(reader, binrw::Endian::Big, ())?;
        let flags = BundleFlags(u32::read_options(reader, binrw::Endian::Big, ())?);

        Ok(Self {
            signature,
            version,
            unity_version,
            unity_revision,
            size,
            compressed_blocks_info_size,
            uncompressed_blocks_info_size,
            flags,
        })
    }
}

impl BinWrite for BundleHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        write_cstring(writer, &self.signature)?;
        self.version
            .write_options(writer, binrw::Endian::Big, ())?;
        write_cstring(writer, &self.unity_version)?;
        write_cstring(writer, &self.unity_revision)?;
        self.size.write_options(writer, binrw::Endian::Big, ())?;
        self.compressed_blocks_info_size
            .write_options(writer, binrw::Endian::Big, ())?;
        self.uncompressed_blocks_info_size
            .write_options(writer, binrw::Endian::Big, ())?;
        self.flags
            .0
            .write_options(writer, binrw::Endian::Big, ())?;
        Ok(())
    }
}
