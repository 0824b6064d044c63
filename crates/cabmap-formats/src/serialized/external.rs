//! External file references

use crate::strings::{read_cstring, write_cstring};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// One entry of the externals table
///
/// Layout (metadata endianness):
/// - Temp path, normally empty (NUL-terminated)
/// - GUID (16 bytes)
/// - Reference type (4 bytes, signed)
/// - Path name (NUL-terminated), e.g. `archive:/CAB-<hash>/CAB-<hash>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    /// Temporary path, empty in shipped files
    pub temp_empty: String,
    /// GUID of the referenced asset
    pub guid: [u8; 16],
    /// Reference type
    pub ref_type: i32,
    /// Full path of the referenced file
    pub path_name: String,
}

impl ExternalReference {
    /// Create a reference with an empty GUID
    pub fn new(path_name: impl Into<String>) -> Self {
        Self {
            temp_empty: String::new(),
            guid: [0u8; 16],
            ref_type: 0,
            path_name: path_name.into(),
        }
    }

    /// Final `/`-separated component of the path name
    ///
    /// This is the CAB id the reference resolves to.
    pub fn file_name(&self) -> &str {
        self.path_name
            .rsplit('/')
            .next()
            .unwrap_or(self.path_name.as_str())
    }

    /// GUID as lowercase hex
    pub fn guid_hex(&self) -> String {
        hex::encode(self.guid)
    }
}

impl BinRead for ExternalReference {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let temp_empty = read_cstring(reader)?;
        let guid = <[u8; 16]>::read_options(reader, endian, ())?;
        let ref_type = i32::read_options(reader, endian, ())?;
        let path_name = read_cstring(reader)?;

        Ok(Self {
            temp_empty,
            guid,
            ref_type,
            path_name,
        })
    }
}

impl BinWrite for ExternalReference {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        write_cstring(writer, &self.temp_empty)?;
        self.guid.write_options(writer, endian, ())?;
        self.ref_type.write_options(writer, endian, ())?;
        write_cstring(writer, &self.path_name)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    #[test]
    fn test_file_name() {
        let reference = ExternalReference::new("archive:/CAB-1234/CAB-1234");
        assert_eq!(reference.file_name(), "CAB-1234");

        let bare = ExternalReference::new("unity default resources");
        assert_eq!(bare.file_name(), "unity default resources");

        let library = ExternalReference::new("library/unity_builtin_extra");
        assert_eq!(library.file_name(), "unity_builtin_extra");
    }

    #[test]
    fn test_endianness_applies_to_type() {
        let mut reference = ExternalReference::new("CAB-ff");
        reference.ref_type = 3;
        reference.guid[0] = 0xAB;

        for (endian, expected) in [
            (binrw::Endian::Little, 3i32.to_le_bytes()),
            (binrw::Endian::Big, 3i32.to_be_bytes()),
        ] {
            let mut buffer = Vec::new();
            reference
                .write_options(&mut Cursor::new(&mut buffer), endian, ())
                .unwrap();
            // empty temp path (1) + guid (16)
            assert_eq!(&buffer[17..21], &expected);

            let parsed =
                ExternalReference::read_options(&mut Cursor::new(&buffer), endian, ()).unwrap();
            assert_eq!(parsed, reference);
        }
        assert!(reference.guid_hex().starts_with("ab00"));
    }
}
