//! In-memory `RawStore`, mainly for tests and small embedded repositories.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::RwLock;

use crate::{Key, RawStore, StoreError};

/// A `RawStore` backed by a `HashMap` guarded by an `RwLock`.
///
/// `store` replaces the map entry under a write lock; a concurrent
/// `load` takes a read lock and clones out the bytes it finds, so it
/// always observes either the old or the new value in full.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Key, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawStore for MemoryStore {
    fn store(&self, key: &Key, reader: &mut dyn Read) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let mut entries = self.entries.write().unwrap();
        entries.entry(key.clone()).or_insert(buf);
        Ok(())
    }

    fn load(&self, key: &Key) -> Result<Option<Box<dyn Read + Send>>, StoreError> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .get(key)
            .map(|bytes| Box::new(Cursor::new(bytes.clone())) as Box<dyn Read + Send>))
    }

    fn has(&self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.entries.read().unwrap().contains_key(key))
    }

    fn delete(&self, key: &Key) -> Result<bool, StoreError> {
        Ok(self.entries.write().unwrap().remove(key).is_some())
    }

    fn keys(&self) -> Result<Box<dyn Iterator<Item = Result<Key, StoreError>>>, StoreError> {
        let mut keys: Vec<Key> = self.entries.read().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(Box::new(keys.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    fn key(s: &str) -> Key {
        Key::new(s).unwrap()
    }

    #[test]
    fn store_then_load_roundtrips() {
        let store = MemoryStore::new();
        let k = key("ab1234567890");
        store.store(&k, &mut IoCursor::new(b"hello".to_vec())).unwrap();

        let mut out = Vec::new();
        store.load(&k).unwrap().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
        assert!(store.has(&k).unwrap());
    }

    #[test]
    fn missing_key_load_is_none() {
        let store = MemoryStore::new();
        assert!(store.load(&key("deadbeef0000")).unwrap().is_none());
        assert!(!store.has(&key("deadbeef0000")).unwrap());
    }

    #[test]
    fn store_is_idempotent_first_write_wins() {
        let store = MemoryStore::new();
        let k = key("ab1234567890");
        store.store(&k, &mut IoCursor::new(b"first".to_vec())).unwrap();
        store.store(&k, &mut IoCursor::new(b"second".to_vec())).unwrap();

        let mut out = Vec::new();
        store.load(&k).unwrap().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"first");
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryStore::new();
        let k = key("ab1234567890");
        assert!(!store.delete(&k).unwrap());
        store.store(&k, &mut IoCursor::new(b"x".to_vec())).unwrap();
        assert!(store.delete(&k).unwrap());
        assert!(!store.has(&k).unwrap());
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryStore::new();
        store.store(&key("ffaa00000000"), &mut IoCursor::new(vec![])).unwrap();
        store.store(&key("001100000000"), &mut IoCursor::new(vec![])).unwrap();
        let keys: Vec<_> = store.keys().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(keys, vec![key("001100000000"), key("ffaa00000000")]);
    }
}
