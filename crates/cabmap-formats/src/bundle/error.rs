//! Error types for bundle parsing and building

use thiserror::Error;

/// Bundle operation result type
pub type BundleResult<T> = Result<T, BundleError>;

/// Errors that can occur when parsing or building bundles
#[derive(Debug, Error)]
pub enum BundleError {
    /// Signature is not `UnityFS`
    #[error("Invalid bundle signature: {0:?}")]
    InvalidSignature(String),

    /// Bundle format version outside the supported range
    #[error("Unsupported bundle version: {0}")]
    UnsupportedVersion(u32),

    /// Blocks info or block data uses a compression scheme
    #[error("Unsupported bundle compression type: {0}")]
    UnsupportedCompression(u8),

    /// Declared bundle size runs past the end of the stream
    #[error(
        "Bundle at {offset:#x} declares end {declared_end:#x} beyond stream length {stream_len:#x}"
    )]
    Truncated {
        /// Bundle start offset
        offset: u64,
        /// Offset the bundle claims to end at
        declared_end: u64,
        /// Total length of the underlying stream
        stream_len: u64,
    },

    /// Header, blocks info and block data do not fit together
    #[error("Invalid bundle layout: {0}")]
    InvalidLayout(String),

    /// An entry addresses bytes outside the block data
    #[error("Entry {path} ({offset}+{size}) exceeds block data of {data_len} bytes")]
    EntryOutOfBounds {
        /// Entry path
        path: String,
        /// Declared offset into block data
        offset: i64,
        /// Declared size
        size: i64,
        /// Length of the block data
        data_len: u64,
    },

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
