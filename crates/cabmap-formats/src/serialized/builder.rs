//! Serialized file builder

use crate::serialized::error::{SerializedError, SerializedResult};
use crate::serialized::external::ExternalReference;
use crate::serialized::header::{MIN_SERIALIZED_VERSION, SerializedHeader};
use crate::serialized::SerializedFile;
use crate::strings::padding_for;
use binrw::io::{Cursor, Write};

/// Payload alignment used when laying out built files
const DATA_ALIGNMENT: u64 = 16;

/// Builder for serialized files with an externals table
#[derive(Debug, Clone)]
pub struct SerializedFileBuilder {
    version: u32,
    big_endian: bool,
    unity_version: String,
    target_platform: i32,
    externals: Vec<ExternalReference>,
    payload: Vec<u8>,
}

impl SerializedFileBuilder {
    /// Create a builder for a version 17 little-endian file
    pub fn new() -> Self {
        Self {
            version: 17,
            big_endian: false,
            unity_version: "2017.4.30f1".to_string(),
            target_platform: 19,
            externals: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Set the format version
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Write the metadata big-endian
    pub fn with_big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    /// Set the engine version string
    pub fn with_unity_version(mut self, unity_version: impl Into<String>) -> Self {
        self.unity_version = unity_version.into();
        self
    }

    /// Add an external reference by path name
    pub fn add_external(mut self, path_name: impl Into<String>) -> Self {
        self.externals.push(ExternalReference::new(path_name));
        self
    }

    /// Add a fully specified external reference
    pub fn add_external_reference(mut self, reference: ExternalReference) -> Self {
        self.externals.push(reference);
        self
    }

    /// Set the object payload placed after the metadata
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Lay out the header for the current contents
    pub fn build_header(&self) -> SerializedResult<SerializedFile> {
        if self.version < MIN_SERIALIZED_VERSION {
            return Err(SerializedError::UnsupportedVersion(self.version));
        }

        let mut file = SerializedFile {
            header: SerializedHeader {
                metadata_size: 0,
                file_size: 0,
                version: self.version,
                data_offset: 0,
                endianness: u8::from(self.big_endian),
            },
            unity_version: self.unity_version.clone(),
            target_platform: self.target_platform,
            externals: self.externals.clone(),
        };

        let mut metadata = Vec::new();
        file.write_metadata(&mut Cursor::new(&mut metadata))?;
        let metadata_size =
            u32::try_from(metadata.len()).map_err(|_| SerializedError::InvalidLayout {
                reason: format!("metadata of {} bytes is too large", metadata.len()),
            })?;

        let metadata_end = file.header.encoded_len() + u64::from(metadata_size);
        let data_offset = metadata_end + padding_for(metadata_end, DATA_ALIGNMENT);

        file.header.metadata_size = metadata_size;
        file.header.data_offset = data_offset;
        file.header.file_size = data_offset + self.payload.len() as u64;
        Ok(file)
    }

    /// Serialize the complete file
    pub fn build(&self) -> SerializedResult<Vec<u8>> {
        let file = self.build_header()?;

        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        file.write_header(&mut cursor)?;

        let written = cursor.position();
        let padding = file.header.data_offset - written;
        cursor.write_all(&vec![0u8; padding as usize])?;
        cursor.write_all(&self.payload)?;

        Ok(buffer)
    }
}

impl Default for SerializedFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_aligned() {
        let builder = SerializedFileBuilder::new()
            .add_external("archive:/CAB-a/CAB-a")
            .with_payload(vec![7u8; 5]);
        let file = builder.build_header().unwrap();
        let bytes = builder.build().unwrap();

        assert_eq!(file.header.data_offset % DATA_ALIGNMENT, 0);
        assert_eq!(bytes.len() as u64, file.header.file_size);
        assert_eq!(&bytes[file.header.data_offset as usize..], &[7u8; 5]);
    }

    #[test]
    fn test_old_version_not_built() {
        let result = SerializedFileBuilder::new().with_version(8).build();
        assert!(matches!(result, Err(SerializedError::UnsupportedVersion(8))));
    }
}
