//! Error types for the index file codec

use thiserror::Error;

/// Index file operation result type
pub type IndexFileResult<T> = Result<T, IndexFileError>;

/// Errors that can occur when encoding or decoding an index file
#[derive(Debug, Error)]
pub enum IndexFileError {
    /// A count field is negative
    #[error("Negative {what} count {count} at offset {offset:#x}")]
    NegativeCount {
        /// Which count was read
        what: &'static str,
        /// Value read
        count: i32,
        /// Stream position of the count
        offset: u64,
    },

    /// A collection does not fit an `i32` count
    #[error("Too many {what} entries to encode: {count}")]
    TooMany {
        /// Which collection overflowed
        what: &'static str,
        /// Collection length
        count: usize,
    },

    /// Binary read/write error (truncation, bad length prefix, bad UTF-8)
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
