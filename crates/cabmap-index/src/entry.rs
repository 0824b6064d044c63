//! Index data model

use crate::{IndexError, Result};
use cabmap_formats::{IndexFile, IndexRecord};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Location and references of one CAB
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Wrapper file holding the CAB
    pub container_path: String,
    /// Start offset of the owning bundle within the wrapper; 0 for
    /// standalone files
    pub offset: i64,
    /// CAB ids this CAB references, in declaration order
    ///
    /// Ids without an entry of their own are allowed.
    pub dependencies: Vec<String>,
}

impl IndexEntry {
    /// Create an entry
    pub fn new(container_path: impl Into<String>, offset: i64, dependencies: Vec<String>) -> Self {
        Self {
            container_path: container_path.into(),
            offset,
            dependencies,
        }
    }

    /// Entry for a standalone file without references
    pub fn standalone(container_path: impl Into<String>) -> Self {
        Self::new(container_path, 0, Vec::new())
    }
}

/// Summary counts for an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of CABs
    pub entries: usize,
    /// Number of distinct wrapper files
    pub containers: usize,
    /// Distinct (container, offset) bundle locations
    pub bundles: usize,
    /// Total dependency references
    pub dependency_refs: usize,
    /// References to ids without an entry
    pub missing_refs: usize,
}

/// CAB id to location mapping, always ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; a second entry for the same id is an error
    pub fn insert(&mut self, id: impl Into<String>, entry: IndexEntry) -> Result<()> {
        match self.entries.entry(id.into()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
            Entry::Occupied(existing) => Err(IndexError::DuplicateEntry {
                id: existing.key().clone(),
                existing: existing.get().container_path.clone(),
                container: entry.container_path,
            }),
        }
    }

    /// Entry for `id`
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// Whether `id` has an entry
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Ids whose container path contains `fragment`
    ///
    /// An empty result means nothing matched; it is not an error.
    pub fn lookup_by_path_fragment(&self, fragment: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.container_path.contains(fragment))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// `id` and every id it transitively references that has an entry
    ///
    /// Ids are returned in breadth-first discovery order, each once. Missing
    /// ids are skipped and cycles terminate.
    pub fn dependency_closure<'a>(&'a self, id: &str) -> Vec<&'a str> {
        let Some((root, _)) = self.entries.get_key_value(id) else {
            return Vec::new();
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut closure = Vec::new();

        visited.insert(root.as_str());
        queue.push_back(root.as_str());

        while let Some(current) = queue.pop_front() {
            closure.push(current);
            let Some(entry) = self.entries.get(current) else {
                continue;
            };
            for dependency in &entry.dependencies {
                if let Some((key, _)) = self.entries.get_key_value(dependency.as_str())
                    && visited.insert(key.as_str())
                {
                    queue.push_back(key.as_str());
                }
            }
        }

        closure
    }

    /// Referenced ids without an entry, each with the ids referencing it
    pub fn missing_dependencies(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut missing: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, entry) in &self.entries {
            for dependency in &entry.dependencies {
                if !self.entries.contains_key(dependency) {
                    missing
                        .entry(dependency.as_str())
                        .or_default()
                        .push(id.as_str());
                }
            }
        }
        missing
    }

    /// Distinct container paths in ascending order
    pub fn containers(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .map(|entry| entry.container_path.as_str())
            .collect()
    }

    /// Summary counts
    pub fn stats(&self) -> IndexStats {
        let bundles: BTreeSet<(&str, i64)> = self
            .entries
            .values()
            .map(|entry| (entry.container_path.as_str(), entry.offset))
            .collect();

        let dependency_refs = self
            .entries
            .values()
            .map(|entry| entry.dependencies.len())
            .sum();

        let missing_refs = self
            .missing_dependencies()
            .values()
            .map(Vec::len)
            .sum();

        IndexStats {
            entries: self.entries.len(),
            containers: self.containers().len(),
            bundles: bundles.len(),
            dependency_refs,
            missing_refs,
        }
    }

    /// Convert to the persisted record list, ascending by id
    pub fn to_index_file(&self) -> IndexFile {
        IndexFile::new(
            self.entries
                .iter()
                .map(|(id, entry)| IndexRecord {
                    key: id.clone(),
                    container_path: entry.container_path.clone(),
                    offset: entry.offset,
                    dependencies: entry.dependencies.clone(),
                })
                .collect(),
        )
    }

    /// Build an index from persisted records
    pub fn from_index_file(file: IndexFile) -> Result<Self> {
        let mut index = Self::new();
        for record in file.records {
            index.insert(
                record.key,
                IndexEntry::new(record.container_path, record.offset, record.dependencies),
            )?;
        }
        Ok(index)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, offset: i64, deps: &[&str]) -> IndexEntry {
        IndexEntry::new(path, offset, deps.iter().map(|d| (*d).to_string()).collect())
    }

    fn chain() -> Index {
        let mut index = Index::new();
        index.insert("A", entry("a.wmv", 0, &["B"])).unwrap();
        index.insert("B", entry("b.wmv", 16, &["C"])).unwrap();
        index.insert("C", entry("c.wmv", 32, &[])).unwrap();
        index.insert("D", entry("d.wmv", 0, &[])).unwrap();
        index
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut index = Index::new();
        index.insert("CAB-1", entry("a.wmv", 0, &[])).unwrap();

        let result = index.insert("CAB-1", entry("b.wmv", 10, &[]));
        assert!(matches!(
            result,
            Err(IndexError::DuplicateEntry { ref existing, ref container, .. })
                if existing == "a.wmv" && container == "b.wmv"
        ));
        assert_eq!(index.get("CAB-1").unwrap().container_path, "a.wmv");
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut index = Index::new();
        for id in ["CAB-c", "CAB-a", "CAB-b"] {
            index.insert(id, entry("x.wmv", 0, &[])).unwrap();
        }
        let ids: Vec<_> = index.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["CAB-a", "CAB-b", "CAB-c"]);
    }

    #[test]
    fn test_lookup_by_path_fragment() {
        let mut index = Index::new();
        index.insert("X", entry("data/bundle0.wmv", 0, &[])).unwrap();
        index.insert("Y", entry("data/bundle01.wmv", 0, &[])).unwrap();
        index.insert("Z", entry("data/other.wmv", 0, &[])).unwrap();

        assert_eq!(index.lookup_by_path_fragment("bundle0"), vec!["X", "Y"]);
        assert_eq!(index.lookup_by_path_fragment("bundle01"), vec!["Y"]);
        assert!(index.lookup_by_path_fragment("missing").is_empty());
    }

    #[test]
    fn test_closure_follows_chain() {
        let index = chain();
        assert_eq!(index.dependency_closure("A"), vec!["A", "B", "C"]);
        assert_eq!(index.dependency_closure("C"), vec!["C"]);
        assert!(index.dependency_closure("nope").is_empty());
    }

    #[test]
    fn test_closure_skips_missing() {
        let mut index = Index::new();
        index
            .insert("A", entry("a.wmv", 0, &["GONE", "B"]))
            .unwrap();
        index.insert("B", entry("b.wmv", 0, &["GONE"])).unwrap();

        assert_eq!(index.dependency_closure("A"), vec!["A", "B"]);
    }

    #[test]
    fn test_closure_terminates_on_cycle() {
        let mut index = Index::new();
        index.insert("A", entry("a.wmv", 0, &["B"])).unwrap();
        index.insert("B", entry("b.wmv", 0, &["C"])).unwrap();
        index.insert("C", entry("c.wmv", 0, &["A", "C"])).unwrap();

        assert_eq!(index.dependency_closure("B"), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_missing_dependencies_and_stats() {
        let mut index = chain();
        index
            .insert("E", entry("d.wmv", 64, &["GONE", "A"]))
            .unwrap();
        index.insert("F", entry("d.wmv", 64, &["GONE"])).unwrap();

        let missing = index.missing_dependencies();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing["GONE"], vec!["E", "F"]);

        let stats = index.stats();
        assert_eq!(
            stats,
            IndexStats {
                entries: 6,
                containers: 4,
                bundles: 5,
                dependency_refs: 5,
                missing_refs: 2,
            }
        );
    }

    #[test]
    fn test_index_file_conversion() {
        let index = chain();
        let file = index.to_index_file();
        let keys: Vec<_> = file.records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C", "D"]);

        assert_eq!(Index::from_index_file(file).unwrap(), index);
    }

    #[test]
    fn test_duplicate_records_rejected() {
        let mut file = chain().to_index_file();
        file.records.push(file.records[0].clone());
        assert!(Index::from_index_file(file).is_err());
    }
}
