//! String encodings shared by the formats in this crate
//!
//! Two encodings are used:
//! - **C strings**: UTF-8 bytes terminated by a single NUL (bundle and
//!   serialized file headers)
//! - **Prefixed strings**: a 7-bit variable-length byte count followed by
//!   UTF-8 bytes (index file), the same encoding .NET's `BinaryWriter` uses

use binrw::BinResult;
use binrw::io::{Read, Seek, SeekFrom, Write};

/// Longest C string accepted before the read is treated as corrupt
pub const MAX_CSTRING_LEN: usize = 0x1_0000;

/// Read a NUL-terminated UTF-8 string
pub fn read_cstring<R: Read + Seek>(reader: &mut R) -> BinResult<String> {
    let pos = reader.stream_position()?;
    let mut bytes = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        if byte[0] == 0 {
            break;
        }
        if bytes.len() == MAX_CSTRING_LEN {
            return Err(binrw::Error::AssertFail {
                pos,
                message: format!("C string exceeds {MAX_CSTRING_LEN} bytes"),
            });
        }
        bytes.push(byte[0]);
    }

    String::from_utf8(bytes).map_err(|e| binrw::Error::Custom {
        pos,
        err: Box::new(e),
    })
}

/// Write a NUL-terminated UTF-8 string
pub fn write_cstring<W: Write + Seek>(writer: &mut W, value: &str) -> BinResult<()> {
    writer.write_all(value.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

/// Read a 7-bit encoded length
///
/// At most five bytes are consumed. The decoded value must fit a
/// non-negative `i32`.
pub fn read_7bit_length<R: Read + Seek>(reader: &mut R) -> BinResult<usize> {
    let pos = reader.stream_position()?;
    let mut value: u32 = 0;

    for shift in (0u32..35).step_by(7) {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        let b = byte[0];

        // Fifth byte may only contribute the top bits of a positive i32
        if shift == 28 && b > 0x07 {
            break;
        }

        value |= u32::from(b & 0x7F) << shift;
        if b & 0x80 == 0 {
            return Ok(value as usize);
        }
    }

    Err(binrw::Error::AssertFail {
        pos,
        message: "Malformed 7-bit encoded length".to_string(),
    })
}

/// Write a 7-bit encoded length
pub fn write_7bit_length<W: Write + Seek>(writer: &mut W, length: usize) -> BinResult<()> {
    let pos = writer.stream_position()?;
    let mut value = i32::try_from(length)
        .map(|v| v as u32)
        .map_err(|_| binrw::Error::AssertFail {
            pos,
            message: format!("String length {length} does not fit a 7-bit encoded i32"),
        })?;

    while value >= 0x80 {
        writer.write_all(&[(value as u8) | 0x80])?;
        value >>= 7;
    }
    writer.write_all(&[value as u8])?;
    Ok(())
}

/// Read a 7-bit length-prefixed UTF-8 string
pub fn read_prefixed_string<R: Read + Seek>(reader: &mut R) -> BinResult<String> {
    let pos = reader.stream_position()?;
    let length = read_7bit_length(reader)?;

    // Never trust the prefix for the allocation size
    let mut bytes = Vec::new();
    reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
    if bytes.len() != length {
        return Err(binrw::Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "String at {pos:#x} declares {length} bytes, only {} available",
                bytes.len()
            ),
        )));
    }

    String::from_utf8(bytes).map_err(|e| binrw::Error::Custom {
        pos,
        err: Box::new(e),
    })
}

/// Write a 7-bit length-prefixed UTF-8 string
pub fn write_prefixed_string<W: Write + Seek>(writer: &mut W, value: &str) -> BinResult<()> {
    write_7bit_length(writer, value.len())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

/// Skip forward to the next multiple of `alignment`, measured from `base`
pub fn align_from<S: Seek>(stream: &mut S, base: u64, alignment: u64) -> std::io::Result<u64> {
    let pos = stream.stream_position()?;
    let relative = pos.saturating_sub(base);
    let padding = (alignment - relative % alignment) % alignment;
    if padding > 0 {
        stream.seek(SeekFrom::Current(padding as i64))?;
    }
    Ok(padding)
}

/// Number of padding bytes needed to reach the next multiple of `alignment`
pub const fn padding_for(length: u64, alignment: u64) -> u64 {
    (alignment - length % alignment) % alignment
}
