//! Error types for serialized file header reads

use thiserror::Error;

/// Serialized file operation result type
pub type SerializedResult<T> = Result<T, SerializedError>;

/// Errors that can occur when reading or building serialized file headers
#[derive(Debug, Error)]
pub enum SerializedError {
    /// Format version older than the supported minimum
    #[error("Unsupported serialized file version: {0}")]
    UnsupportedVersion(u32),

    /// Endianness byte is neither 0 nor 1
    #[error("Invalid endianness flag: {0}")]
    InvalidEndianness(u8),

    /// Metadata does not fit the sizes declared in the header
    #[error("Invalid serialized file layout: {reason}")]
    InvalidLayout {
        /// Detailed description of the problem
        reason: String,
    },

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
