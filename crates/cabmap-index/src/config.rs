//! Configuration for index building and resolution

use crate::{BUILTIN_EXTRA, DEFAULT_INDEX_FILE, DEFAULT_RESOURCES, DEFAULT_WRAPPER_EXTENSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Location of the persisted index
    pub index_path: PathBuf,

    /// Extension marking wrapper files, without the dot
    pub wrapper_extension: String,

    /// Reserved builtin resource names, matched as substrings of the
    /// trailing input paths
    pub builtin_names: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_FILE),
            wrapper_extension: DEFAULT_WRAPPER_EXTENSION.to_string(),
            builtin_names: vec![DEFAULT_RESOURCES.to_string(), BUILTIN_EXTRA.to_string()],
        }
    }
}

impl IndexConfig {
    /// Create a configuration persisting to `index_path`
    pub fn new<P: AsRef<Path>>(index_path: P) -> Self {
        Self {
            index_path: index_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Set the persisted index location
    #[must_use]
    pub fn with_index_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the wrapper file extension; a leading dot is ignored
    #[must_use]
    pub fn with_wrapper_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.wrapper_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Replace the reserved builtin names
    #[must_use]
    pub fn with_builtin_names(mut self, names: Vec<String>) -> Self {
        self.builtin_names = names;
        self
    }

    /// Whether `path` carries the wrapper extension (case-sensitive)
    pub fn is_wrapper_path(&self, path: &str) -> bool {
        let wanted = self.wrapper_extension.trim_start_matches('.');
        Path::new(path)
            .extension()
            .is_some_and(|extension| extension == wanted)
    }
}
