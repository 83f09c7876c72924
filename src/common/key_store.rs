//! Key/value records owned by a node.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::common::Id;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
/// Mapping from key identifier to an opaque value.
pub struct KeyStore {
    records: BTreeMap<Id, Bytes>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Id, value: Bytes) -> Option<Bytes> {
        self.records.insert(id, value)
    }

    /// Bulk insert, overwriting existing values for the same ids.
    pub fn extend<I: IntoIterator<Item = (Id, Bytes)>>(&mut self, records: I) {
        self.records.extend(records)
    }

    /// Removes and returns every record whose id satisfies `predicate`.
    pub fn extract_matching<F>(&mut self, mut predicate: F) -> BTreeMap<Id, Bytes>
    where
        F: FnMut(&Id) -> bool,
    {
        let records = std::mem::take(&mut self.records);
        let (extracted, kept): (BTreeMap<Id, Bytes>, BTreeMap<Id, Bytes>) =
            records.into_iter().partition(|(id, _)| predicate(id));

        self.records = kept;

        extracted
    }

    /// Returns the value stored for `id`, or [Error::NotFound].
    pub fn get(&self, id: &Id) -> Result<Bytes> {
        self.records.get(id).cloned().ok_or(Error::NotFound(*id))
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.records.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ids: &[u64]) -> KeyStore {
        let mut store = KeyStore::new();
        store.extend(
            ids.iter()
                .map(|id| (Id::from(*id), Bytes::from(format!("value-{}", id)))),
        );
        store
    }

    #[test]
    fn get_missing_key() {
        let store = store(&[1, 2]);

        assert_eq!(store.get(&Id::from(1u64)).unwrap(), Bytes::from("value-1"));
        match store.get(&Id::from(3u64)) {
            Err(Error::NotFound(id)) => assert_eq!(id, Id::from(3u64)),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn insert_overwrites() {
        let mut store = store(&[1]);

        let previous = store.insert(Id::from(1u64), Bytes::from("other"));

        assert_eq!(previous, Some(Bytes::from("value-1")));
        assert_eq!(store.get(&Id::from(1u64)).unwrap(), Bytes::from("other"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn extract_matching_partitions_the_store() {
        let ids: Vec<u64> = (0..50).map(|i| i * 7 % 64).collect();
        let mut store = store(&ids);
        let before = store.clone();

        // Keys a node at 40 owns once its predecessor is 10: (10, 40]
        let owned = |id: &Id| id.in_half_open_right(&Id::from(10u64), &Id::from(40u64));
        let extracted = store.extract_matching(owned);

        assert!(extracted.keys().all(owned));
        assert!(store.ids().all(|id| !owned(id)));

        assert_eq!(extracted.len() + store.len(), before.len());
        for id in before.ids() {
            assert!(extracted.contains_key(id) ^ store.contains(id));
            let value = extracted
                .get(id)
                .cloned()
                .unwrap_or_else(|| store.get(id).unwrap());
            assert_eq!(value, before.get(id).unwrap());
        }
    }

    #[test]
    fn extract_nothing() {
        let mut store = store(&[1, 2, 3]);

        assert!(store.extract_matching(|_| false).is_empty());
        assert_eq!(store.len(), 3);

        assert_eq!(store.extract_matching(|_| true).len(), 3);
        assert!(store.is_empty());
    }
}
