//! Error types for wrapper scanning

use crate::bundle::BundleError;
use thiserror::Error;

/// Wrapper operation result type
pub type WrapperResult<T> = Result<T, WrapperError>;

/// Errors that can occur when scanning or building wrapper files
#[derive(Debug, Error)]
pub enum WrapperError {
    /// Offset table is malformed
    #[error("Invalid offset table: {reason}")]
    InvalidTable {
        /// Detailed description of the problem
        reason: String,
    },

    /// The offset table lists the same position twice
    #[error("Duplicate bundle offset {0:#x}")]
    DuplicateOffset(u64),

    /// A bundle failed to parse
    #[error("Bundle at offset {offset:#x}: {source}")]
    Bundle {
        /// Position the bundle was expected at
        offset: u64,
        /// Underlying bundle error
        #[source]
        source: BundleError,
    },

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
