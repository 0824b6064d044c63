//! Entry stream classification

use crate::bundle::UNITYFS_SIGNATURE;
use crate::serialized::{NARROW_HEADER_LEN, SerializedHeader, WIDE_HEADER_LEN};
use binrw::BinRead;
use binrw::io::{Read, Seek, SeekFrom};
use std::fmt;

/// Kind of content held by a bundle entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// A nested `UnityFS` bundle
    Bundle,
    /// A serialized asset file
    Assets,
    /// Anything else, typically `.resS` texture or audio data
    Resource,
}

impl FileType {
    /// Classify the stream starting at the reader's position
    ///
    /// The reader is returned to its original position.
    pub fn detect<R: Read + Seek>(reader: &mut R) -> std::io::Result<Self> {
        let start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        let available = end.saturating_sub(start);

        reader.seek(SeekFrom::Start(start))?;
        let is_bundle = has_bundle_signature(reader, available)?;

        reader.seek(SeekFrom::Start(start))?;
        let file_type = if is_bundle {
            Self::Bundle
        } else if looks_serialized(reader, available) {
            Self::Assets
        } else {
            Self::Resource
        };

        reader.seek(SeekFrom::Start(start))?;
        Ok(file_type)
    }

    /// Conventional display name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bundle => "BundleFile",
            Self::Assets => "AssetsFile",
            Self::Resource => "ResourceFile",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read failures other than a short stream are passed on
fn has_bundle_signature<R: Read>(reader: &mut R, available: u64) -> std::io::Result<bool> {
    let signature = UNITYFS_SIGNATURE.as_bytes();
    if available < signature.len() as u64 {
        return Ok(false);
    }
    let mut leading = vec![0u8; signature.len()];
    match reader.read_exact(&mut leading) {
        Ok(()) => Ok(leading == signature),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// The declared file size must match the stream and the data offset must lie
/// within it
fn looks_serialized<R: Read + Seek>(reader: &mut R, available: u64) -> bool {
    if available < NARROW_HEADER_LEN {
        return false;
    }
    let Ok(header) = SerializedHeader::read_options(reader, binrw::Endian::Big, ()) else {
        return false;
    };
    if header.is_wide() && available < WIDE_HEADER_LEN {
        return false;
    }
    header.file_size == available && header.data_offset <= available
}
