//! Parsers and builders for asset bundle containers and the CAB index file
//!
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! This crate provides symmetric (parser and builder) implementations for the
//! binary formats involved in building a CAB location index:
//!
//! - **Bundle**: self-describing `UnityFS` archives holding named entries (CABs)
//! - **Serialized**: header-only reader for serialized asset files, exposing the
//!   external file references each CAB depends on
//! - **File type**: classification of an entry stream (bundle, assets, resource)
//! - **Wrapper**: outer container files packing one or more bundles, with an
//!   optional explicit offset table
//! - **Index file**: the persisted CAB index (`WMVMap.bin` layout)
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: Both parsing and building supported
//! - **Header-only Reads**: Dependency extraction never touches object payloads
//! - **Round-Trip Guarantee**: parse(build(data)) == data

#![warn(missing_docs)]

/// UnityFS bundle parsing and building
///
/// A bundle is a self-describing archive embedded in a wrapper file. The
/// parser reads exactly one bundle starting at the reader's position and
/// leaves the reader immediately after it, which is what the wrapper scanner
/// relies on to walk concatenated bundles.
///
/// Only uncompressed block storage is supported; payload decompression is
/// handled outside this crate.
pub mod bundle;
/// Entry stream classification
pub mod file_type;
/// Persisted CAB index file format
///
/// Little-endian counts and offsets with 7-bit length-prefixed UTF-8 strings.
/// The layout carries no magic number and no version field.
pub mod index_file;
/// Serialized asset file header reader
///
/// Reads the fixed header and the externals table of a serialized file. The
/// externals table lists the other CABs this file references, which is all the
/// index needs; type trees, object tables and payload are never read.
pub mod serialized;
pub mod strings;
/// Wrapper container scanning
///
/// Discovers every bundle inside a wrapper file and keys it by its starting
/// byte offset, either from an explicit offset table or by walking the
/// stream bundle after bundle until its end.
pub mod wrapper;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use bundle::{Bundle, BundleBuilder, BundleDirectory, BundleError, EntryReader};
pub use file_type::FileType;
pub use index_file::{IndexFile, IndexFileError, IndexRecord};
pub use serialized::{ExternalReference, SerializedError, SerializedFile, SerializedFileBuilder};
pub use wrapper::{WrapperBuilder, WrapperError, WrapperFile};

/// Common format trait for whole-buffer formats
pub trait BinaryFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
