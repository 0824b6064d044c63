//! On-disk persistence of the index
//!
//! Saves go through a temporary file in the same directory that is synced
//! and then renamed over the target, so the previous file stays intact until
//! the new one is complete.

use crate::entry::Index;
use crate::{IndexError, Result};
use cabmap_formats::IndexFile;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Encode `index` and atomically replace the file at `path`
pub fn save_index(index: &Index, path: &Path) -> Result<()> {
    let bytes = index.to_index_file().to_bytes()?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    let result = write_synced(&temp_path, &bytes).and_then(|()| {
        fs::rename(&temp_path, path)?;
        Ok(())
    });

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    debug!(
        "Saved index with {} entries ({} bytes) to {}",
        index.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Decode the index stored at `path`
pub fn try_load_index(path: &Path) -> Result<Index> {
    let bytes = fs::read(path)?;
    let file = IndexFile::read(&mut Cursor::new(bytes.as_slice()))?;
    Index::from_index_file(file)
}

/// Load the index at `path`, falling back to an empty index
///
/// A missing or corrupt file is logged as a warning and never returned as an
/// error.
pub fn load_index(path: &Path) -> Index {
    info!("Loading index from {}", path.display());
    match try_load_index(path) {
        Ok(index) => {
            info!("Loaded index with {} entries", index.len());
            index
        }
        Err(e) => {
            warn!(
                "Index was not loaded from {}, continuing without it: {}",
                path.display(),
                e
            );
            Index::new()
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(&file);
    writer.write_all(bytes)?;
    writer.flush()?;
    drop(writer);
    file.sync_all().map_err(IndexError::Io)
}
