//! Index construction from a batch of wrapper files

use crate::config::IndexConfig;
use crate::entry::{Index, IndexEntry};
use crate::inspect::ContainerInspector;
use crate::progress::ProgressSink;
use crate::{IndexError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builds a fresh index from wrapper files
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder<'a> {
    config: &'a IndexConfig,
}

impl<'a> IndexBuilder<'a> {
    /// Create a builder using the reserved names of `config`
    pub const fn new(config: &'a IndexConfig) -> Self {
        Self { config }
    }

    /// Split trailing builtin resource files off the input
    ///
    /// Up to one path per reserved name is taken from the end of the list,
    /// in either order. Each match yields `(reserved name, path)`.
    pub fn split_builtins<'p>(
        &self,
        paths: &'p [PathBuf],
    ) -> (Vec<(&'a str, &'p Path)>, &'p [PathBuf]) {
        let mut remaining = paths;
        let mut builtins = Vec::new();
        let mut taken = vec![false; self.config.builtin_names.len()];

        while let Some((last, rest)) = remaining.split_last() {
            let text = last.to_string_lossy();
            let matched = self
                .config
                .builtin_names
                .iter()
                .enumerate()
                .find(|(i, name)| !taken[*i] && text.contains(name.as_str()));

            let Some((i, name)) = matched else {
                break;
            };
            taken[i] = true;
            builtins.push((name.as_str(), last.as_path()));
            remaining = rest;
        }

        (builtins, remaining)
    }

    /// Build an index from `paths`
    ///
    /// Wrapper files are inspected one at a time in order. The first error
    /// aborts the build and nothing is returned.
    pub fn build(
        &self,
        paths: &[PathBuf],
        inspector: &dyn ContainerInspector,
        progress: &mut dyn ProgressSink,
    ) -> Result<Index> {
        if paths.is_empty() {
            return Err(IndexError::EmptyInput);
        }

        let mut index = Index::new();
        let (builtins, scan) = self.split_builtins(paths);
        for (name, path) in builtins {
            debug!("Indexing builtin {} as {}", path.display(), name);
            index.insert(name, IndexEntry::standalone(path.to_string_lossy()))?;
        }

        progress.reset();
        let total = scan.len();
        for (i, path) in scan.iter().enumerate() {
            let container = path.to_string_lossy().into_owned();

            for bundle in inspector.inspect(path)? {
                let offset =
                    i64::try_from(bundle.offset).map_err(|_| IndexError::OffsetOverflow {
                        path: path.clone(),
                        offset: bundle.offset,
                    })?;
                for cab in bundle.cabs {
                    index.insert(
                        cab.path,
                        IndexEntry::new(container.clone(), offset, cab.dependencies),
                    )?;
                }
            }

            info!("[{}/{}] Processed {}", i + 1, total, display_name(path));
            progress.report(i + 1, total);
        }

        Ok(index)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
