//! Bundle builder

use crate::bundle::blocks_info::{BlocksInfo, NODE_FLAG_SERIALIZED, Node, StorageBlock};
use crate::bundle::error::{BundleError, BundleResult};
use crate::bundle::header::{BundleFlags, BundleHeader, UNITYFS_SIGNATURE};
use crate::bundle::Bundle;

/// Entry queued for a bundle
#[derive(Debug, Clone)]
struct PendingEntry {
    path: String,
    flags: u32,
    data: Vec<u8>,
}

/// Builder for uncompressed bundles
///
/// All entries are packed into a single stored block in insertion order.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    version: u32,
    unity_version: String,
    unity_revision: String,
    blocks_info_at_end: bool,
    entries: Vec<PendingEntry>,
}

impl BundleBuilder {
    /// Create a builder for a version 6 bundle
    pub fn new() -> Self {
        Self {
            version: 6,
            unity_version: "5.x.x".to_string(),
            unity_revision: "2017.4.30f1".to_string(),
            blocks_info_at_end: false,
            entries: Vec::new(),
        }
    }

    /// Set the bundle format version
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set the engine revision string
    pub fn with_unity_revision(mut self, revision: impl Into<String>) -> Self {
        self.unity_revision = revision.into();
        self
    }

    /// Place the blocks info behind the block data
    pub fn with_blocks_info_at_end(mut self, at_end: bool) -> Self {
        self.blocks_info_at_end = at_end;
        self
    }

    /// Add a plain entry such as a `.resS` resource
    pub fn add_entry(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        self.entries.push(PendingEntry {
            path: path.into(),
            flags: 0,
            data,
        });
        self
    }

    /// Add an entry flagged as a serialized asset file
    pub fn add_serialized_entry(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        self.entries.push(PendingEntry {
            path: path.into(),
            flags: NODE_FLAG_SERIALIZED,
            data,
        });
        self
    }

    /// Assemble the bundle
    pub fn build(&self) -> BundleResult<Bundle> {
        let mut data = Vec::new();
        let mut nodes = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            nodes.push(Node {
                offset: data.len() as i64,
                size: entry.data.len() as i64,
                flags: entry.flags,
                path: entry.path.clone(),
            });
            data.extend_from_slice(&entry.data);
        }

        let data_len = u32::try_from(data.len()).map_err(|_| {
            BundleError::InvalidLayout(format!(
                "{} bytes of entry data exceed a single storage block",
                data.len()
            ))
        })?;

        let blocks = if data.is_empty() {
            Vec::new()
        } else {
            vec![StorageBlock {
                uncompressed_size: data_len,
                compressed_size: data_len,
                flags: 0,
            }]
        };

        let blocks_info = BlocksInfo {
            hash: [0u8; 16],
            blocks,
            nodes,
        };
        let info_len = u32::try_from(blocks_info.encoded_len()).map_err(|_| {
            BundleError::InvalidLayout("blocks info exceeds 4 GiB".to_string())
        })?;

        let mut flags = BundleFlags::BLOCKS_AND_DIRECTORY_COMBINED;
        if self.blocks_info_at_end {
            flags |= BundleFlags::BLOCKS_INFO_AT_END;
        }

        let mut header = BundleHeader {
            signature: UNITYFS_SIGNATURE.to_string(),
            version: self.version,
            unity_version: self.unity_version.clone(),
            unity_revision: self.unity_revision.clone(),
            size: 0,
            compressed_blocks_info_size: info_len,
            uncompressed_blocks_info_size: info_len,
            flags: BundleFlags(flags),
        };

        let total = header.region_len() + u64::from(info_len) + data.len() as u64;
        header.size = i64::try_from(total)
            .map_err(|_| BundleError::InvalidLayout(format!("bundle size {total} overflows")))?;
        header.validate()?;

        Ok(Bundle {
            header,
            blocks_info,
            data,
        })
    }

    /// Assemble and serialize the bundle
    pub fn to_bytes(&self) -> BundleResult<Vec<u8>> {
        self.build()?.to_bytes()
    }
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
