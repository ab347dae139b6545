//! In-memory row store
//!
//! A `RowStore` is an ordered list of records in file line order. It is built
//! once by the codec and never edited afterwards: loads and reloads swap in a
//! whole new store through [`SharedStore`], so a reader holding an old
//! `Arc<RowStore>` always sees a complete snapshot.

use std::sync::{Arc, PoisonError, RwLock};

/// One line of the file, split into fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(Vec<String>);

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Join the fields with `separator`
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Ordered, immutable collection of records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStore {
    records: Vec<Record>,
}

impl RowStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records in insertion order. Each call starts from the first record.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a RowStore {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for RowStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Shared cell holding the current snapshot
///
/// Cloning the handle shares the cell. The lock is held only long enough to
/// clone or swap the `Arc`, never while a store is being decoded or printed.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    current: Arc<RwLock<Arc<RowStore>>>,
}

impl SharedStore {
    pub fn new(store: RowStore) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(store))),
        }
    }

    /// The latest complete snapshot
    pub fn snapshot(&self) -> Arc<RowStore> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new store. Readers holding the old snapshot keep it.
    pub fn replace(&self, store: RowStore) {
        let next = Arc::new(store);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(rows: &[&[&str]]) -> RowStore {
        rows.iter()
            .map(|row| row.iter().copied().collect::<Record>())
            .collect()
    }

    #[test]
    fn test_iter_preserves_insertion_order() {
        let s = store(&[&["1", "a"], &["2", "b"], &["3", "c"]]);
        let firsts: Vec<_> = s.iter().map(|r| r.fields()[0].as_str()).collect();
        assert_eq!(firsts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_iter_is_restartable() {
        let s = store(&[&["x"], &["y"]]);
        assert_eq!(s.iter().count(), 2);
        assert_eq!(s.iter().count(), 2);
    }

    #[test]
    fn test_duplicate_rows_allowed() {
        let s = store(&[&["a", "b"], &["a", "b"]]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.records()[0], s.records()[1]);
    }

    #[test]
    fn test_record_join() {
        let r: Record = ["a", "", "c", ""].into_iter().collect();
        assert_eq!(r.len(), 4);
        assert_eq!(r.join(" | "), "a |  | c | ");
    }

    #[test]
    fn test_shared_store_replace_keeps_old_snapshot_intact() {
        let shared = SharedStore::new(store(&[&["old"]]));
        let before = shared.snapshot();

        shared.replace(store(&[&["new"], &["rows"]]));

        assert_eq!(before.len(), 1);
        assert_eq!(before.records()[0].fields()[0], "old");
        assert_eq!(shared.snapshot().len(), 2);
    }

    #[test]
    fn test_shared_store_clones_share_cell() {
        let shared = SharedStore::new(RowStore::default());
        let other = shared.clone();

        other.replace(store(&[&["a"]]));

        assert_eq!(shared.snapshot().len(), 1);
    }

    #[test]
    fn test_shared_store_replace_across_threads() {
        let shared = SharedStore::new(RowStore::default());
        let writer = shared.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                let rows = (0..i).map(|n| Record::new(vec![n.to_string()])).collect();
                writer.replace(rows);
            }
        });

        // Every snapshot observed is complete: row n holds the string n.
        for _ in 0..100 {
            let snap = shared.snapshot();
            for (n, record) in snap.iter().enumerate() {
                assert_eq!(record.fields()[0], n.to_string());
            }
        }

        handle.join().expect("writer thread panicked");
        assert_eq!(shared.snapshot().len(), 99);
    }
}
