//! Wrapper file builder

use crate::bundle::Bundle;
use crate::wrapper::OFFSET_TABLE_MAGIC;
use crate::wrapper::error::{WrapperError, WrapperResult};
use binrw::io::{Cursor, Write};

/// Builder concatenating bundles into a wrapper file
#[derive(Debug, Clone, Default)]
pub struct WrapperBuilder {
    bundles: Vec<Bundle>,
    offset_table: bool,
}

impl WrapperBuilder {
    /// Create an empty builder without an offset table
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix the bundles with an explicit offset table
    pub fn with_offset_table(mut self, offset_table: bool) -> Self {
        self.offset_table = offset_table;
        self
    }

    /// Append a bundle
    pub fn add_bundle(mut self, bundle: Bundle) -> Self {
        self.bundles.push(bundle);
        self
    }

    /// Start offsets the bundles will be written at
    pub fn offsets(&self) -> Vec<u64> {
        let mut pos = if self.offset_table {
            8 + 8 * self.bundles.len() as u64
        } else {
            0
        };
        self.bundles
            .iter()
            .map(|bundle| {
                let offset = pos;
                pos += bundle.size();
                offset
            })
            .collect()
    }

    /// Serialize the wrapper file
    pub fn build(&self) -> WrapperResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        if self.offset_table {
            let count =
                u32::try_from(self.bundles.len()).map_err(|_| WrapperError::InvalidTable {
                    reason: format!("{} bundles exceed the table limit", self.bundles.len()),
                })?;
            cursor.write_all(&OFFSET_TABLE_MAGIC)?;
            cursor.write_all(&count.to_be_bytes())?;
            for offset in self.offsets() {
                cursor.write_all(&offset.to_be_bytes())?;
            }
        }

        for (bundle, offset) in self.bundles.iter().zip(self.offsets()) {
            bundle
                .write(&mut cursor)
                .map_err(|source| WrapperError::Bundle { offset, source })?;
        }

        Ok(buffer)
    }
}
