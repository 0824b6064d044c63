//! Index state owned by the caller

use crate::builder::IndexBuilder;
use crate::config::IndexConfig;
use crate::entry::Index;
use crate::inspect::{ContainerInspector, UnityInspector};
use crate::persist::{load_index, save_index};
use crate::progress::ProgressSink;
use crate::resolver::{Resolution, ResolutionSession, resolve_dependencies};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration plus the current in-memory index
///
/// Not synchronized; confine a `CabMap` to one thread or guard it.
#[derive(Debug, Clone, Default)]
pub struct CabMap {
    config: IndexConfig,
    index: Index,
}

impl CabMap {
    /// Create a map with an empty index
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            index: Index::new(),
        }
    }

    /// Create a map around an existing index
    pub fn with_index(config: IndexConfig, index: Index) -> Self {
        Self { config, index }
    }

    /// Active configuration
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Location of the persisted index
    pub fn index_path(&self) -> &Path {
        &self.config.index_path
    }

    /// Current index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Build from wrapper files on disk, persist, and replace the index
    pub fn build(&mut self, paths: &[PathBuf], progress: &mut dyn ProgressSink) -> Result<()> {
        self.build_with(paths, &UnityInspector, progress)
    }

    /// Build using `inspector`, persist, and replace the index
    ///
    /// On failure a warning is logged, the error is returned, and both the
    /// in-memory index and the persisted file are left as they were.
    pub fn build_with(
        &mut self,
        paths: &[PathBuf],
        inspector: &dyn ContainerInspector,
        progress: &mut dyn ProgressSink,
    ) -> Result<()> {
        info!("Building index from {} files", paths.len());

        let result = IndexBuilder::new(&self.config)
            .build(paths, inspector, progress)
            .and_then(|index| {
                save_index(&index, &self.config.index_path)?;
                Ok(index)
            });

        match result {
            Ok(index) => {
                info!(
                    "Index built with {} entries, saved to {}",
                    index.len(),
                    self.config.index_path.display()
                );
                self.index = index;
                Ok(())
            }
            Err(e) => {
                warn!("Index was not built: {}", e);
                Err(e)
            }
        }
    }

    /// Replace the index with the persisted one
    ///
    /// A missing or unreadable file leaves an empty index.
    pub fn load(&mut self) {
        self.index = load_index(&self.config.index_path);
    }

    /// CAB ids whose wrapper path contains `fragment`
    pub fn find_cabs(&self, fragment: &str) -> Vec<&str> {
        self.index.lookup_by_path_fragment(fragment)
    }

    /// Whether any CAB lives in a wrapper whose path contains `fragment`
    pub fn has_cabs(&self, fragment: &str) -> bool {
        !self.find_cabs(fragment).is_empty()
    }

    /// Start a resolution session over the current index
    pub fn session(&self) -> ResolutionSession<'_> {
        ResolutionSession::new(&self.index)
    }

    /// Expand `files` with everything their CABs depend on
    pub fn resolve_dependencies(&self, files: &[String]) -> Resolution {
        resolve_dependencies(&self.index, files, &self.config)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entry::IndexEntry;
    use crate::inspect::ScannedBundle;
    use crate::progress::NoProgress;
    use crate::IndexError;
    use tempfile::TempDir;

    struct Failing;

    impl ContainerInspector for Failing {
        fn inspect(&self, path: &Path) -> Result<Vec<ScannedBundle>> {
            Err(IndexError::Inspection {
                path: path.to_path_buf(),
                reason: "injected".to_string(),
            })
        }
    }

    #[test]
    fn test_failed_build_keeps_state() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig::new(dir.path().join("WMVMap.bin"));

        let mut previous = Index::new();
        previous
            .insert("CAB-old", IndexEntry::new("old.wmv", 0, vec![]))
            .unwrap();
        let mut map = CabMap::with_index(config, previous.clone());

        let result = map.build_with(&[PathBuf::from("x.wmv")], &Failing, &mut NoProgress);
        assert!(result.is_err());
        assert_eq!(map.index(), &previous);
        assert!(!map.index_path().exists());
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut map = CabMap::new(IndexConfig::new(dir.path().join("none.bin")));
        map.load();
        assert!(map.index().is_empty());
        assert!(!map.has_cabs("anything"));
    }
}
