use crate::output::{format_key_value, print_json, print_section_header};
use crate::{OutputFormat, QueryCommands};
use anyhow::bail;
use cabmap_index::{CabMap, IndexConfig, IndexEntry, IndexStats};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub fn handle(cmd: QueryCommands, config: &IndexConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut map = CabMap::new(config.clone());
    map.load();

    match cmd {
        QueryCommands::Info { missing } => info(&map, missing, format),
        QueryCommands::Find { fragment } => find(&map, &fragment, format),
        QueryCommands::Show { cab } => show(&map, &cab, format),
        QueryCommands::Resolve { files } => resolve(&map, &files, format),
    }
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    index_path: &'a Path,
    #[serde(flatten)]
    stats: IndexStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<BTreeMap<&'a str, Vec<&'a str>>>,
}

fn info(map: &CabMap, list_missing: bool, format: OutputFormat) -> anyhow::Result<()> {
    let output = InfoOutput {
        index_path: map.index_path(),
        stats: map.index().stats(),
        missing: list_missing.then(|| map.index().missing_dependencies()),
    };

    if format.is_json() {
        print_json(&output, format)?;
        return Ok(());
    }

    print_section_header("CAB Index");
    println!("{}", format_key_value("Index file", output.index_path.display()));
    println!("{}", format_key_value("Entries", output.stats.entries));
    println!("{}", format_key_value("Wrapper files", output.stats.containers));
    println!("{}", format_key_value("Bundles", output.stats.bundles));
    println!("{}", format_key_value("Dependency refs", output.stats.dependency_refs));
    println!("{}", format_key_value("Missing refs", output.stats.missing_refs));

    if let Some(missing) = &output.missing {
        println!();
        print_section_header("Missing Dependencies");
        for (dependency, referrers) in missing {
            println!("{dependency} <- {}", referrers.join(", "));
        }
    }

    Ok(())
}

fn find(map: &CabMap, fragment: &str, format: OutputFormat) -> anyhow::Result<()> {
    let cabs = map.find_cabs(fragment);

    if format.is_json() {
        print_json(&cabs, format)?;
    } else if cabs.is_empty() {
        println!("No CABs found in wrappers matching '{fragment}'");
    } else {
        for cab in cabs {
            println!("{cab}");
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    id: &'a str,
    #[serde(flatten)]
    entry: &'a IndexEntry,
    closure: Vec<&'a str>,
}

fn show(map: &CabMap, cab: &str, format: OutputFormat) -> anyhow::Result<()> {
    let Some(entry) = map.index().get(cab) else {
        bail!("CAB '{cab}' is not in the index");
    };
    let output = ShowOutput {
        id: cab,
        entry,
        closure: map.index().dependency_closure(cab),
    };

    if format.is_json() {
        print_json(&output, format)?;
        return Ok(());
    }

    print_section_header(cab);
    println!("{}", format_key_value("Wrapper", &entry.container_path));
    println!("{}", format_key_value("Offset", entry.offset));
    println!("{}", format_key_value("Dependencies", entry.dependencies.len()));
    for dependency in &entry.dependencies {
        let marker = if map.index().contains(dependency) { "" } else { " (missing)" };
        println!("  {dependency}{marker}");
    }

    println!();
    println!("Closure ({} CABs):", output.closure.len());
    for id in &output.closure {
        if let Some(found) = map.index().get(id) {
            println!("  {id} @ {}:{}", found.container_path, found.offset);
        }
    }

    Ok(())
}

fn resolve(map: &CabMap, files: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let resolution = map.resolve_dependencies(files);

    if format.is_json() {
        print_json(&resolution, format)?;
        return Ok(());
    }

    print_section_header("Files");
    for file in &resolution.files {
        println!("{file}");
    }

    if !resolution.required_offsets.is_empty() {
        println!();
        print_section_header("Required Offsets");
        for (path, offsets) in resolution.required_offsets.iter() {
            let offsets: Vec<String> = offsets.iter().map(ToString::to_string).collect();
            println!("{path}: {}", offsets.join(", "));
        }
    }

    Ok(())
}
