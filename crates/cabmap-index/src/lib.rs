//! CAB location index for wrapper files holding asset bundles.
//!
//! The index maps every CAB id to the wrapper file and bundle offset it lives
//! in, together with the CAB ids it references. It is built once from a batch
//! of wrapper files, persisted next to them, and loaded on later runs to
//! expand a short request list into every wrapper (and bundle offset) the
//! request transitively needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use cabmap_index::{CabMap, IndexConfig, NoProgress};
//! use std::path::PathBuf;
//!
//! # fn example() -> cabmap_index::Result<()> {
//! let mut map = CabMap::new(IndexConfig::new("data/WMVMap.bin"));
//! map.build(&[PathBuf::from("data/level0.wmv")], &mut NoProgress)?;
//!
//! let resolution = map.resolve_dependencies(&["data/level0.wmv".to_string()]);
//! for (path, offsets) in resolution.required_offsets.iter() {
//!     println!("{path}: {offsets:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use cabmap_formats::{IndexFileError, SerializedError, WrapperError};
use std::path::PathBuf;
use thiserror::Error;

// Index data model
pub mod entry;

// Wrapper inspection
pub mod inspect;

// Index construction
pub mod builder;

// On-disk persistence
pub mod persist;

// Dependency resolution
pub mod resolver;

// Progress reporting
pub mod progress;

// Configuration
pub mod config;

// Top-level state object
mod manager;

pub use builder::IndexBuilder;
pub use config::IndexConfig;
pub use entry::{Index, IndexEntry, IndexStats};
pub use inspect::{CabRecord, ContainerInspector, ScannedBundle, UnityInspector};
pub use manager::CabMap;
pub use persist::{load_index, save_index, try_load_index};
pub use progress::{LogProgress, NoProgress, ProgressSink};
pub use resolver::{RequiredOffsets, Resolution, ResolutionSession, resolve_dependencies};

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur while building, persisting or loading an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A wrapper file could not be opened.
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        /// Wrapper path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A wrapper file could not be scanned for bundles.
    #[error("Failed to scan {}: {source}", path.display())]
    Container {
        /// Wrapper path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: WrapperError,
    },

    /// A CAB's serialized header could not be read.
    #[error("Failed to read header of {cab} in {}: {source}", path.display())]
    Serialized {
        /// Wrapper path
        path: PathBuf,
        /// CAB id
        cab: String,
        /// Underlying error
        #[source]
        source: SerializedError,
    },

    /// A bundle entry could not be read while classifying it.
    #[error("Failed to read entry {cab} in {}: {source}", path.display())]
    Entry {
        /// Wrapper path
        path: PathBuf,
        /// Entry path inside the bundle
        cab: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A container inspector reported a failure of its own.
    #[error("Inspection of {} failed: {reason}", path.display())]
    Inspection {
        /// Wrapper path
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// The persisted index could not be encoded or decoded.
    #[error("Index file error: {0}")]
    IndexFile(#[from] IndexFileError),

    /// The same CAB id was found twice.
    #[error("Duplicate CAB {id}: already indexed from {existing}, found again in {container}")]
    DuplicateEntry {
        /// CAB id
        id: String,
        /// Container of the first occurrence
        existing: String,
        /// Container of the second occurrence
        container: String,
    },

    /// A bundle offset does not fit the persisted signed 64-bit field.
    #[error("Bundle offset {offset} in {} does not fit the index", path.display())]
    OffsetOverflow {
        /// Wrapper path
        path: PathBuf,
        /// Offset found
        offset: u64,
    },

    /// The build was given no input files.
    #[error("No input files to index")]
    EmptyInput,
}

/// Version information for the index library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default file name of the persisted index.
pub const DEFAULT_INDEX_FILE: &str = "WMVMap.bin";

/// Default extension of wrapper files, without the dot.
pub const DEFAULT_WRAPPER_EXTENSION: &str = "wmv";

/// Reserved name of the builtin default resources file.
pub const DEFAULT_RESOURCES: &str = "unity default resources";

/// Reserved name of the builtin extra resources file.
pub const BUILTIN_EXTRA: &str = "unity_builtin_extra";
