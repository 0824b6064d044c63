use crate::output::{format_key_value, print_json, print_section_header};
use crate::progress::BarProgress;
use crate::{BuildArgs, OutputFormat};
use anyhow::{Context, bail};
use cabmap_index::{CabMap, IndexConfig, IndexStats};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    index_path: &'a Path,
    inputs: usize,
    #[serde(flatten)]
    stats: IndexStats,
}

pub fn handle(args: BuildArgs, config: &IndexConfig, format: OutputFormat) -> anyhow::Result<()> {
    let paths = match &args.dir {
        Some(dir) => collect_dir(dir, config)
            .with_context(|| format!("Failed to walk {}", dir.display()))?,
        None => args.paths,
    };
    if paths.is_empty() {
        bail!("No input files to index");
    }

    let mut progress = if args.no_progress || format.is_json() {
        BarProgress::hidden()
    } else {
        BarProgress::new()
    };

    let mut map = CabMap::new(config.clone());
    let result = map.build(&paths, &mut progress);
    progress.finish();
    if result.is_err() {
        // The failure was already logged by the index manager
        std::process::exit(1);
    }

    let summary = BuildSummary {
        index_path: map.index_path(),
        inputs: paths.len(),
        stats: map.index().stats(),
    };

    if format.is_json() {
        print_json(&summary, format)?;
    } else {
        print_section_header("Index Built");
        println!("{}", format_key_value("Index file", summary.index_path.display()));
        println!("{}", format_key_value("Input files", summary.inputs));
        println!("{}", format_key_value("Entries", summary.stats.entries));
        println!("{}", format_key_value("Bundles", summary.stats.bundles));
    }

    Ok(())
}

/// Collect the inputs for a directory build
///
/// Wrapper files are returned in path order, followed by any builtin
/// resource files in the order their reserved names are configured.
pub fn collect_dir(dir: &Path, config: &IndexConfig) -> walkdir::Result<Vec<PathBuf>> {
    let mut wrappers = Vec::new();
    let mut builtins: Vec<Option<PathBuf>> = vec![None; config.builtin_names.len()];

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let text = path.to_string_lossy();
        if config.is_wrapper_path(&text) {
            wrappers.push(path);
            continue;
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(slot) = config
            .builtin_names
            .iter()
            .position(|name| file_name == *name)
            && builtins[slot].is_none()
        {
            debug!("Found builtin resource {}", path.display());
            builtins[slot] = Some(path);
        }
    }

    wrappers.extend(builtins.into_iter().flatten());
    Ok(wrappers)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_dir_orders_builtins_last() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Data/sub")).unwrap();
        for name in [
            "Data/unity_builtin_extra",
            "Data/b.wmv",
            "Data/sub/a.wmv",
            "Data/unity default resources",
            "Data/notes.txt",
            "Data/c.WMV",
        ] {
            fs::write(root.join(name), b"x").unwrap();
        }

        let collected = collect_dir(root, &IndexConfig::default()).unwrap();
        let relative: Vec<_> = collected
            .iter()
            .map(|path| path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("Data/b.wmv"),
                PathBuf::from("Data/sub/a.wmv"),
                PathBuf::from("Data/unity default resources"),
                PathBuf::from("Data/unity_builtin_extra"),
            ]
        );
    }

    #[test]
    fn test_collect_dir_custom_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.wmv"), b"x").unwrap();
        fs::write(dir.path().join("b.pak"), b"x").unwrap();

        let config = IndexConfig::default().with_wrapper_extension(".pak");
        let collected = collect_dir(dir.path(), &config).unwrap();
        assert_eq!(collected, vec![dir.path().join("b.pak")]);
    }
}
