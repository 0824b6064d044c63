//! Dependency resolution
//!
//! Expands a request list of wrapper paths into every wrapper whose CABs the
//! request transitively references, together with the bundle offsets needed
//! from each.

use crate::config::IndexConfig;
use crate::entry::Index;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Bundle offsets required from each wrapper file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequiredOffsets(BTreeMap<String, BTreeSet<i64>>);

impl RequiredOffsets {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as wanted without adding an offset
    pub fn ensure(&mut self, path: &str) {
        self.0.entry(path.to_owned()).or_default();
    }

    /// Record that `offset` is needed from `path`
    pub fn add(&mut self, path: &str, offset: i64) {
        self.0.entry(path.to_owned()).or_default().insert(offset);
    }

    /// Offsets needed from `path`
    pub fn get(&self, path: &str) -> Option<&BTreeSet<i64>> {
        self.0.get(path)
    }

    /// Whether `path` is wanted
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Wanted paths in ascending order
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    /// Iterate paths with their offsets
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<i64>)> + '_ {
        self.0.iter().map(|(path, offsets)| (path.as_str(), offsets))
    }

    /// Number of wanted paths
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is wanted
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying map
    pub fn into_inner(self) -> BTreeMap<String, BTreeSet<i64>> {
        self.0
    }
}

/// Result of expanding a request list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Request list followed by every wanted path; may contain duplicates
    pub files: Vec<String>,
    /// Offsets to materialize per wanted path
    pub required_offsets: RequiredOffsets,
}

/// Offset collection over one index
///
/// A session accumulates offsets across calls; start a new session for an
/// independent request.
#[derive(Debug, Clone)]
pub struct ResolutionSession<'a> {
    index: &'a Index,
    offsets: RequiredOffsets,
}

impl<'a> ResolutionSession<'a> {
    /// Start a session with no required offsets
    pub fn new(index: &'a Index) -> Self {
        Self {
            index,
            offsets: RequiredOffsets::new(),
        }
    }

    /// Record the location of `id` and of everything it references
    ///
    /// Unknown ids, and references to ids without an entry, are ignored.
    pub fn add_required_offset(&mut self, id: &str) {
        for reached in self.index.dependency_closure(id) {
            if let Some(entry) = self.index.get(reached) {
                self.offsets.add(&entry.container_path, entry.offset);
            }
        }
    }

    /// Expand `files` with every wrapper their CABs depend on
    ///
    /// Each input path is marked as wanted even if no CAB lives in it. The
    /// returned list is the input followed by every wanted path.
    pub fn expand_request_list(&mut self, files: &[String]) -> Resolution {
        for file in files {
            self.offsets.ensure(file);
            let index = self.index;
            for id in index.lookup_by_path_fragment(file) {
                self.add_required_offset(id);
            }
        }

        let mut expanded = files.to_vec();
        expanded.extend(self.offsets.paths().map(str::to_string));
        debug!(
            "Expanded {} requested files to {} ({} wanted paths)",
            files.len(),
            expanded.len(),
            self.offsets.len()
        );

        Resolution {
            files: expanded,
            required_offsets: self.offsets.clone(),
        }
    }

    /// Offsets collected so far
    pub fn required_offsets(&self) -> &RequiredOffsets {
        &self.offsets
    }

    /// End the session, keeping the collected offsets
    pub fn into_required_offsets(self) -> RequiredOffsets {
        self.offsets
    }
}

/// Resolve a request list against `index`
///
/// Only the first path decides: if it is a wrapper file the list is
/// expanded, otherwise it is returned unchanged with no offsets.
pub fn resolve_dependencies(index: &Index, files: &[String], config: &IndexConfig) -> Resolution {
    match files.first() {
        Some(first) if config.is_wrapper_path(first) => {
            ResolutionSession::new(index).expand_request_list(files)
        }
        _ => Resolution {
            files: files.to_vec(),
            required_offsets: RequiredOffsets::new(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entry::IndexEntry;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, offset: i64, deps: &[&str]) -> IndexEntry {
        IndexEntry::new(path, offset, deps.iter().map(|d| (*d).to_string()).collect())
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn offsets(items: &[(&str, &[i64])]) -> BTreeMap<String, BTreeSet<i64>> {
        items
            .iter()
            .map(|(path, offsets)| ((*path).to_string(), offsets.iter().copied().collect()))
            .collect()
    }

    fn chain() -> Index {
        let mut index = Index::new();
        index.insert("A", entry("a.wmv", 0, &["B"])).unwrap();
        index.insert("B", entry("b.wmv", 100, &["C"])).unwrap();
        index.insert("C", entry("c.wmv", 200, &[])).unwrap();
        index.insert("D", entry("d.wmv", 300, &[])).unwrap();
        index
    }

    #[test]
    fn test_transitive_closure() {
        let index = chain();
        let mut session = ResolutionSession::new(&index);
        session.add_required_offset("A");

        assert_eq!(
            session.into_required_offsets().into_inner(),
            offsets(&[("a.wmv", &[0]), ("b.wmv", &[100]), ("c.wmv", &[200])])
        );
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let index = chain();
        let mut session = ResolutionSession::new(&index);
        session.add_required_offset("nope");
        assert!(session.required_offsets().is_empty());
    }

    #[test]
    fn test_missing_dependency_tolerated() {
        let mut index = Index::new();
        index.insert("A", entry("a.wmv", 0, &["GHOST"])).unwrap();

        let mut session = ResolutionSession::new(&index);
        session.add_required_offset("A");
        assert_eq!(
            session.into_required_offsets().into_inner(),
            offsets(&[("a.wmv", &[0])])
        );
    }

    #[test]
    fn test_cycle_terminates() {
        let mut index = Index::new();
        index.insert("A", entry("a.wmv", 0, &["B"])).unwrap();
        index.insert("B", entry("b.wmv", 8, &["A"])).unwrap();

        let mut session = ResolutionSession::new(&index);
        session.add_required_offset("A");
        assert_eq!(session.required_offsets().len(), 2);
    }

    #[test]
    fn test_offsets_deduplicated_per_file() {
        let mut index = Index::new();
        index.insert("A", entry("a.wmv", 0, &["B", "C"])).unwrap();
        index.insert("B", entry("a.wmv", 0, &[])).unwrap();
        index.insert("C", entry("a.wmv", 64, &[])).unwrap();

        let mut session = ResolutionSession::new(&index);
        session.add_required_offset("A");
        assert_eq!(
            session.into_required_offsets().into_inner(),
            offsets(&[("a.wmv", &[0, 64])])
        );
    }

    #[test]
    fn test_expand_request_list() {
        let index = chain();
        let request = strings(&["a.wmv", "empty.wmv"]);

        let resolution = ResolutionSession::new(&index).expand_request_list(&request);
        assert_eq!(
            resolution.files,
            strings(&["a.wmv", "empty.wmv", "a.wmv", "b.wmv", "c.wmv", "empty.wmv"])
        );
        assert_eq!(
            resolution.required_offsets.into_inner(),
            offsets(&[
                ("a.wmv", &[0]),
                ("b.wmv", &[100]),
                ("c.wmv", &[200]),
                ("empty.wmv", &[]),
            ])
        );
    }

    #[test]
    fn test_expand_does_not_touch_input() {
        let index = chain();
        let request = strings(&["b.wmv"]);
        let resolution = ResolutionSession::new(&index).expand_request_list(&request);

        assert_eq!(request, strings(&["b.wmv"]));
        assert_eq!(resolution.files, strings(&["b.wmv", "b.wmv", "c.wmv"]));
    }

    #[test]
    fn test_expand_twice_same_set() {
        let index = chain();
        let request = strings(&["a.wmv"]);

        let mut session = ResolutionSession::new(&index);
        let first: BTreeSet<_> = session.expand_request_list(&request).files.into_iter().collect();
        let second: BTreeSet<_> = session.expand_request_list(&request).files.into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_only_checks_first_extension() {
        let index = chain();
        let config = IndexConfig::default();

        let passthrough = resolve_dependencies(&index, &strings(&["a.bundle", "a.wmv"]), &config);
        assert_eq!(passthrough.files, strings(&["a.bundle", "a.wmv"]));
        assert!(passthrough.required_offsets.is_empty());

        let expanded = resolve_dependencies(&index, &strings(&["b.wmv", "a.bundle"]), &config);
        assert!(expanded.required_offsets.contains("c.wmv"));
        assert!(expanded.required_offsets.contains("a.bundle"));

        let empty = resolve_dependencies(&index, &[], &config);
        assert!(empty.files.is_empty());
    }

    #[test]
    fn test_serializes_as_map() {
        let mut offsets = RequiredOffsets::new();
        offsets.add("a.wmv", 16);
        offsets.ensure("b.wmv");
        assert_eq!(
            serde_json::to_string(&offsets).unwrap(),
            r#"{"a.wmv":[16],"b.wmv":[]}"#
        );
    }

    #[test]
    fn test_add_creates_and_merges() {
        let mut required = RequiredOffsets::new();
        required.add("a.wmv", 64);
        required.add("a.wmv", 0);
        required.add("a.wmv", 64);
        required.ensure("a.wmv");
        required.add("b.wmv", 8);

        assert_eq!(
            required.into_inner(),
            offsets(&[("a.wmv", &[0, 64]), ("b.wmv", &[8])])
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Acyclic graphs: entry i may only depend on entries with a larger index
        fn acyclic_index() -> impl Strategy<Value = Index> {
            (1usize..12).prop_flat_map(|n| {
                prop::collection::vec(
                    (0usize..4, 0i64..4, prop::collection::vec(0usize..16, 0..4)),
                    n,
                )
                .prop_map(move |specs| {
                    let mut index = Index::new();
                    for (i, (container, offset, deps)) in specs.into_iter().enumerate() {
                        let dependencies = deps
                            .into_iter()
                            .map(|d| format!("CAB-{}", i + 1 + d))
                            .collect();
                        index
                            .insert(
                                format!("CAB-{i}"),
                                IndexEntry::new(format!("w{container}.wmv"), offset, dependencies),
                            )
                            .unwrap();
                    }
                    index
                })
            })
        }

        proptest! {
            /// Expanding the same request twice yields the same file set
            #[test]
            fn expand_is_idempotent(index in acyclic_index(), pick in 0usize..4) {
                let request = vec![format!("w{pick}.wmv")];
                let first: BTreeSet<String> = ResolutionSession::new(&index)
                    .expand_request_list(&request)
                    .files
                    .into_iter()
                    .collect();
                let second: BTreeSet<String> = ResolutionSession::new(&index)
                    .expand_request_list(&request)
                    .files
                    .into_iter()
                    .collect();
                prop_assert_eq!(first, second);
            }

            /// Every wanted offset belongs to some entry of that container
            #[test]
            fn offsets_point_at_entries(index in acyclic_index(), pick in 0usize..4) {
                let request = vec![format!("w{pick}.wmv")];
                let resolution = ResolutionSession::new(&index).expand_request_list(&request);
                for (path, offsets) in resolution.required_offsets.iter() {
                    for offset in offsets {
                        prop_assert!(index
                            .iter()
                            .any(|(_, e)| e.container_path == path && e.offset == *offset));
                    }
                }
            }
        }
    }
}
