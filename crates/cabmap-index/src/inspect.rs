//! Wrapper inspection
//!
//! Turns one wrapper file into the CABs it holds, grouped by the bundle they
//! were found in. Only serialized asset entries become CABs; resource
//! payloads and nested bundles are skipped.

use crate::{IndexError, Result};
use cabmap_formats::serialized::SerializedFile;
use cabmap_formats::wrapper::WrapperFile;
use cabmap_formats::FileType;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{debug, trace};

/// One CAB found in a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabRecord {
    /// Entry path inside the bundle, used as the CAB id
    pub path: String,
    /// Declared dependency ids
    pub dependencies: Vec<String>,
}

/// CABs of one bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBundle {
    /// Bundle start offset within the wrapper
    pub offset: u64,
    /// CABs in entry order
    pub cabs: Vec<CabRecord>,
}

/// Source of the CAB listing for a wrapper file
pub trait ContainerInspector {
    /// List the bundles and CABs of the wrapper at `path`
    ///
    /// Any error aborts the index build that requested it.
    fn inspect(&self, path: &Path) -> Result<Vec<ScannedBundle>>;
}

/// Inspector reading wrapper files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct UnityInspector;

impl UnityInspector {
    /// Open a wrapper file and scan its bundle directories
    ///
    /// The returned reader is the stream the directories were read from;
    /// entry content is read through it.
    pub fn open_wrapper(path: &Path) -> Result<(BufReader<File>, WrapperFile)> {
        let file = File::open(path).map_err(|source| IndexError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let wrapper = WrapperFile::read(&mut reader).map_err(|source| IndexError::Container {
            path: path.to_path_buf(),
            source,
        })?;
        Ok((reader, wrapper))
    }

    /// Collect the CABs of an already scanned wrapper
    ///
    /// Only the header and externals of serialized entries are read from
    /// `reader`; resource payloads are never touched.
    pub fn collect_cabs<R: Read + Seek>(
        path: &Path,
        reader: &mut R,
        wrapper: &WrapperFile,
    ) -> Result<Vec<ScannedBundle>> {
        let mut bundles = Vec::with_capacity(wrapper.len());

        for (offset, bundle) in wrapper.iter() {
            let mut cabs = Vec::new();
            for node in bundle.entries() {
                // Bounds were checked when the directory was parsed
                let Some(mut entry) = bundle.entry_reader(reader, node) else {
                    continue;
                };

                let file_type = FileType::detect(&mut entry).map_err(|source| IndexError::Entry {
                    path: path.to_path_buf(),
                    cab: node.path.clone(),
                    source,
                })?;
                if file_type != FileType::Assets {
                    trace!("Skipping {} ({})", node.path, file_type);
                    continue;
                }

                let header = SerializedFile::read_header(&mut entry).map_err(|source| {
                    IndexError::Serialized {
                        path: path.to_path_buf(),
                        cab: node.path.clone(),
                        source,
                    }
                })?;

                cabs.push(CabRecord {
                    path: node.path.clone(),
                    dependencies: header.dependencies(),
                });
            }

            debug!(
                "Bundle at {:#x} in {} holds {} CABs",
                offset,
                path.display(),
                cabs.len()
            );
            bundles.push(ScannedBundle { offset, cabs });
        }

        Ok(bundles)
    }
}

impl ContainerInspector for UnityInspector {
    fn inspect(&self, path: &Path) -> Result<Vec<ScannedBundle>> {
        let (mut reader, wrapper) = Self::open_wrapper(path)?;
        Self::collect_cabs(path, &mut reader, &wrapper)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use cabmap_formats::bundle::BundleBuilder;
    use cabmap_formats::serialized::SerializedFileBuilder;
    use cabmap_formats::wrapper::WrapperBuilder;
    use std::io::{self, Cursor, SeekFrom};
    use tempfile::TempDir;

    /// Seeks normally, fails every read
    struct UnreadableReads<R>(R);

    impl<R> Read for UnreadableReads<R> {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unavailable"))
        }
    }

    impl<R: Seek> Seek for UnreadableReads<R> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    fn assets(deps: &[&str]) -> Vec<u8> {
        let mut builder = SerializedFileBuilder::new();
        for dep in deps {
            builder = builder.add_external(format!("archive:/{dep}/{dep}"));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_inspect_lists_assets_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("level.wmv");

        let first = BundleBuilder::new()
            .add_serialized_entry("CAB-a", assets(&["CAB-b"]))
            .add_entry("CAB-a.resS", vec![0u8; 40])
            .build()
            .unwrap();
        let second = BundleBuilder::new()
            .add_serialized_entry("CAB-b", assets(&[]))
            .build()
            .unwrap();
        let second_offset = first.size();
        let bytes = WrapperBuilder::new()
            .add_bundle(first)
            .add_bundle(second)
            .build()
            .unwrap();
        std::fs::write(&path, bytes).unwrap();

        let bundles = UnityInspector.inspect(&path).unwrap();
        assert_eq!(
            bundles,
            vec![
                ScannedBundle {
                    offset: 0,
                    cabs: vec![CabRecord {
                        path: "CAB-a".to_string(),
                        dependencies: vec!["CAB-b".to_string()],
                    }],
                },
                ScannedBundle {
                    offset: second_offset,
                    cabs: vec![CabRecord {
                        path: "CAB-b".to_string(),
                        dependencies: vec![],
                    }],
                },
            ]
        );
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.wmv");

        let result = UnityInspector.inspect(&path);
        assert!(matches!(result, Err(IndexError::Open { path: ref p, .. }) if *p == path));
    }

    #[test]
    fn test_corrupt_wrapper_reports_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.wmv");
        std::fs::write(&path, b"not a bundle at all").unwrap();

        let result = UnityInspector.inspect(&path);
        assert!(matches!(result, Err(IndexError::Container { .. })));
    }

    #[test]
    fn test_entry_read_failure_names_cab() {
        let bundle = BundleBuilder::new()
            .add_serialized_entry("CAB-a", assets(&[]))
            .build()
            .unwrap();
        let bytes = WrapperBuilder::new().add_bundle(bundle).build().unwrap();
        let wrapper = WrapperFile::read(&mut Cursor::new(&bytes)).unwrap();

        let path = Path::new("data/level.wmv");
        let mut reader = UnreadableReads(Cursor::new(&bytes));
        let result = UnityInspector::collect_cabs(path, &mut reader, &wrapper);

        assert!(matches!(
            result,
            Err(IndexError::Entry { path: ref p, ref cab, .. })
                if p == path && cab == "CAB-a"
        ));
    }
}
