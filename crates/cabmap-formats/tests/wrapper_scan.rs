//! Integration tests walking a wrapper file down to serialized-file externals
//!
//! Fixtures are generated with the builders so the whole chain (wrapper,
//! bundle, entry classification, header-only read) is exercised together.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use cabmap_formats::bundle::{Bundle, BundleBuilder};
use cabmap_formats::serialized::{SerializedFile, SerializedFileBuilder};
use cabmap_formats::wrapper::{WrapperBuilder, WrapperFile};
use cabmap_formats::{BinaryFormat, FileType};
use std::io::{self, Cursor, Read, Seek, SeekFrom};

fn assets(deps: &[&str]) -> Vec<u8> {
    deps.iter()
        .fold(SerializedFileBuilder::new(), |builder, dep| {
            builder.add_external(format!("archive:/{dep}/{dep}"))
        })
        .with_payload(vec![0x5A; 96])
        .build()
        .expect("serialized file should build")
}

fn bundle_with(cabs: &[(&str, &[&str])], version: u32) -> Bundle {
    cabs.iter()
        .fold(BundleBuilder::new().with_version(version), |builder, (name, deps)| {
            builder
                .add_serialized_entry(*name, assets(deps))
                .add_entry(format!("{name}.resS"), vec![0u8; 64])
        })
        .build()
        .expect("bundle should build")
}

/// (offset, cab, dependencies) for every assets entry in the wrapper
fn collect_cabs<R: Read + Seek>(
    stream: &mut R,
    wrapper: &WrapperFile,
) -> Vec<(u64, String, Vec<String>)> {
    let mut found = Vec::new();
    for (offset, bundle) in wrapper.iter() {
        for node in bundle.entries() {
            let mut reader = bundle.entry_reader(stream, node).expect("entry in bounds");
            if FileType::detect(&mut reader).unwrap() != FileType::Assets {
                continue;
            }
            let file = SerializedFile::read_header(&mut reader).expect("header should parse");
            found.push((offset, node.path.clone(), file.dependencies()));
        }
    }
    found
}

#[test]
fn sequential_wrapper_to_dependencies() {
    let first = bundle_with(&[("CAB-a", &["CAB-b"]), ("CAB-c", &[])], 6);
    let second = bundle_with(&[("CAB-b", &["CAB-c", "CAB-gone"])], 7);
    let second_offset = first.size();

    let bytes = WrapperBuilder::new()
        .add_bundle(first)
        .add_bundle(second)
        .build()
        .unwrap();

    let mut stream = Cursor::new(&bytes);
    let wrapper = WrapperFile::read(&mut stream).unwrap();
    let cabs = collect_cabs(&mut stream, &wrapper);

    assert_eq!(
        cabs,
        vec![
            (0, "CAB-a".to_string(), vec!["CAB-b".to_string()]),
            (0, "CAB-c".to_string(), vec![]),
            (
                second_offset,
                "CAB-b".to_string(),
                vec!["CAB-c".to_string(), "CAB-gone".to_string()]
            ),
        ]
    );
}

#[test]
fn table_wrapper_matches_sequential_content() {
    let bundles = [
        bundle_with(&[("CAB-1", &["CAB-2"])], 6),
        bundle_with(&[("CAB-2", &[])], 8),
    ];

    let sequential = WrapperBuilder::new()
        .add_bundle(bundles[0].clone())
        .add_bundle(bundles[1].clone())
        .build()
        .unwrap();
    let tabled = WrapperBuilder::new()
        .with_offset_table(true)
        .add_bundle(bundles[0].clone())
        .add_bundle(bundles[1].clone())
        .build()
        .unwrap();

    let names = |bytes: &[u8]| -> (Vec<u64>, Vec<(String, Vec<String>)>) {
        let mut stream = Cursor::new(bytes);
        let wrapper = WrapperFile::read(&mut stream).unwrap();
        let cabs = collect_cabs(&mut stream, &wrapper)
            .into_iter()
            .map(|(_, cab, deps)| (cab, deps))
            .collect();
        (wrapper.offsets(), cabs)
    };
    let (plain_offsets, plain) = names(sequential.as_slice());
    let (listed_offsets, listed) = names(tabled.as_slice());
    assert_eq!(plain, listed);
    assert_ne!(plain_offsets, listed_offsets);
}

#[test]
fn resource_entries_are_not_assets() {
    let bundle = bundle_with(&[("CAB-r", &[])], 6);
    let resource = bundle.find_entry("CAB-r.resS").unwrap();
    let mut reader = bundle.entry_reader(resource).unwrap();
    assert_eq!(FileType::detect(&mut reader).unwrap(), FileType::Resource);
}

#[test]
fn bundle_bytes_verify_round_trip() {
    let bytes = bundle_with(&[("CAB-v", &["CAB-w"])], 7).to_bytes().unwrap();
    Bundle::verify_round_trip(&bytes).unwrap();
}

/// Counts the bytes pulled from the inner stream
struct CountingReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.bytes_read += read as u64;
        Ok(read)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn scan_reads_metadata_not_payload() {
    const PAYLOAD: usize = 8 * 1024 * 1024;

    let bundle = BundleBuilder::new()
        .add_serialized_entry("CAB-big", assets(&["CAB-dep"]))
        .add_entry("CAB-big.resS", vec![0x33; PAYLOAD])
        .build()
        .unwrap();
    let bytes = WrapperBuilder::new().add_bundle(bundle).build().unwrap();

    let mut stream = CountingReader {
        inner: Cursor::new(bytes.as_slice()),
        bytes_read: 0,
    };
    let wrapper = WrapperFile::read(&mut stream).unwrap();
    let cabs = collect_cabs(&mut stream, &wrapper);

    assert_eq!(
        cabs,
        vec![(0, "CAB-big".to_string(), vec!["CAB-dep".to_string()])]
    );
    assert!(
        stream.bytes_read < 64 * 1024,
        "scan pulled {} bytes for a {PAYLOAD}-byte payload",
        stream.bytes_read
    );
}
