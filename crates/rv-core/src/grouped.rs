//! Two-level insertion-ordered grouping container.

use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered map of primary key → ordered map of secondary key → records.
///
/// Both levels preserve insertion order, which is how the backend's sort
/// order survives into the serialized response.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct GroupedMap<K1, K2, V> {
    inner: IndexMap<K1, IndexMap<K2, Vec<V>>>,
}

impl<K1, K2, V> Default for GroupedMap<K1, K2, V> {
    fn default() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }
}

impl<K1, K2, V> GroupedMap<K1, K2, V>
where
    K1: Hash + Eq,
    K2: Hash + Eq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed run of records under `(primary, secondary)`.
    /// Returns `false` (and inserts nothing) when the secondary key is
    /// already present under that primary key.
    pub fn insert_run(&mut self, primary: K1, secondary: K2, run: Vec<V>) -> bool {
        let groups = self.inner.entry(primary).or_default();
        if groups.contains_key(&secondary) {
            return false;
        }
        groups.insert(secondary, run);
        true
    }

    pub fn get(&self, primary: &K1) -> Option<&IndexMap<K2, Vec<V>>> {
        self.inner.get(primary)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total number of records across all runs.
    pub fn total_records(&self) -> usize {
        self.inner
            .values()
            .flat_map(|groups| groups.values())
            .map(Vec::len)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K1, &IndexMap<K2, Vec<V>>)> {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_insertion_order() {
        let mut map = GroupedMap::new();
        map.insert_run(2, 10, vec!["a"]);
        map.insert_run(1, 20, vec!["b", "c"]);
        map.insert_run(2, 30, vec!["d"]);

        let primaries: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(primaries, vec![2, 1]);
        let secondaries: Vec<_> = map.get(&2).unwrap().keys().copied().collect();
        assert_eq!(secondaries, vec![10, 30]);
    }

    #[test]
    fn test_rejects_duplicate_secondary() {
        let mut map = GroupedMap::new();
        assert!(map.insert_run(1, 10, vec!["a"]));
        assert!(!map.insert_run(1, 10, vec!["b"]));
        assert_eq!(map.get(&1).unwrap()[&10], vec!["a"]);
    }

    #[test]
    fn test_total_records() {
        let mut map = GroupedMap::new();
        map.insert_run(1, 10, vec!["a", "b"]);
        map.insert_run(1, 11, vec!["c"]);
        map.insert_run(2, 10, vec!["d", "e", "f"]);
        assert_eq!(map.total_records(), 6);
    }

    #[test]
    fn test_value_type_needs_no_comparison_traits() {
        struct Opaque;
        let mut map = GroupedMap::new();
        map.insert_run(1, 10, vec![Opaque, Opaque]);
        map.insert_run(1, 11, vec![Opaque]);
        assert_eq!(map.total_records(), 3);
    }

    #[test]
    fn test_serializes_as_nested_maps() {
        let mut map = GroupedMap::new();
        map.insert_run(1, 10, vec!["a"]);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"1": {"10": ["a"]}}));
    }
}
