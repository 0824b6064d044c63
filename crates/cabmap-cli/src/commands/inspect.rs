use crate::output::{format_key_value, print_json, print_section_header};
use crate::{InspectArgs, OutputFormat};
use anyhow::Context;
use cabmap_formats::{FileType, SerializedFile, WrapperFile};
use cabmap_index::UnityInspector;
use serde::Serialize;
use std::io::{Read, Seek};

#[derive(Debug, Serialize)]
struct ExternalView {
    path_name: String,
    guid: String,
    ref_type: i32,
}

#[derive(Debug, Serialize)]
struct EntryView {
    path: String,
    offset: i64,
    size: i64,
    flags: u32,
    file_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unity_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    externals: Vec<ExternalView>,
}

#[derive(Debug, Serialize)]
struct BundleView {
    offset: u64,
    size: u64,
    version: u32,
    unity_revision: String,
    blocks_hash: String,
    entries: Vec<EntryView>,
}

#[derive(Debug, Serialize)]
struct WrapperView {
    path: String,
    offset_table: bool,
    bundles: Vec<BundleView>,
}

pub fn handle(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (mut reader, wrapper) = UnityInspector::open_wrapper(&args.path)?;
    let view = describe(&args.path.to_string_lossy(), &mut reader, &wrapper, args.externals)
        .with_context(|| format!("Failed to inspect {}", args.path.display()))?;

    if format.is_json() {
        print_json(&view, format)?;
        return Ok(());
    }

    print_section_header(&view.path);
    println!(
        "{}",
        format_key_value("Offset table", if view.offset_table { "yes" } else { "no" })
    );
    println!("{}", format_key_value("Bundles", view.bundles.len()));

    for bundle in &view.bundles {
        println!();
        println!(
            "Bundle @ {:#x} ({} bytes, v{}, {})",
            bundle.offset, bundle.size, bundle.version, bundle.unity_revision
        );
        for entry in &bundle.entries {
            println!(
                "  {:<12} {:>10} {:>10}  {}",
                entry.file_type, entry.offset, entry.size, entry.path
            );
            for external in &entry.externals {
                println!("      -> {} [{}]", external.path_name, external.guid);
            }
        }
    }

    Ok(())
}

fn describe<R: Read + Seek>(
    path: &str,
    reader: &mut R,
    wrapper: &WrapperFile,
    externals: bool,
) -> anyhow::Result<WrapperView> {
    let mut bundles = Vec::with_capacity(wrapper.len());

    for (offset, bundle) in wrapper.iter() {
        let mut entries = Vec::with_capacity(bundle.entries().len());
        for node in bundle.entries() {
            let mut view = EntryView {
                path: node.path.clone(),
                offset: node.offset,
                size: node.size,
                flags: node.flags,
                file_type: "",
                unity_version: None,
                externals: Vec::new(),
            };

            if let Some(mut entry) = bundle.entry_reader(reader, node) {
                let file_type = FileType::detect(&mut entry)
                    .with_context(|| format!("Failed to read entry {}", node.path))?;
                view.file_type = file_type.as_str();

                if file_type == FileType::Assets {
                    let header = SerializedFile::read_header(&mut entry)
                        .with_context(|| format!("Bad serialized header in {}", node.path))?;
                    view.unity_version = Some(header.unity_version.clone());
                    if externals {
                        view.externals = header
                            .externals
                            .iter()
                            .map(|external| ExternalView {
                                path_name: external.path_name.clone(),
                                guid: external.guid_hex(),
                                ref_type: external.ref_type,
                            })
                            .collect();
                    }
                }
            }

            entries.push(view);
        }

        bundles.push(BundleView {
            offset,
            size: bundle.size(),
            version: bundle.header.version,
            unity_revision: bundle.header.unity_revision.clone(),
            blocks_hash: hex::encode(bundle.blocks_info.hash),
            entries,
        });
    }

    Ok(WrapperView {
        path: path.to_string(),
        offset_table: wrapper.offset_table.is_some(),
        bundles,
    })
}
