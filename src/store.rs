//! In-process key-value store backing the ledger, anchors, and revocations.
//!
//! A real deployment would swap this for a durable backend; the trait is the
//! seam. Keys are plain strings so the lexicographic `ledger:<ts>:<id>`
//! layout gives chronological ordering for free under a `BTreeMap`.

use std::collections::BTreeMap;

use parking_lot::RwLock;

pub trait KvStore: Send + Sync {
    fn put(&self, key: String, value: String);
    fn get(&self, key: &str) -> Option<String>;
    fn delete(&self, key: &str) -> Option<String>;
    /// All values whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Vec<(String, String)>;
}

#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<BTreeMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemStore {
    fn put(&self, key: String, value: String) {
        self.inner.write().insert(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    fn delete(&self, key: &str) -> Option<String> {
        self.inner.write().remove(key)
    }

    fn scan_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.inner
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = MemStore::new();
        store.put("a".into(), "1".into());
        assert_eq!(store.get("a"), Some("1".to_string()));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn scan_prefix_returns_only_matching_keys_in_order() {
        let store = MemStore::new();
        store.put("ledger:2024-01-02:b".into(), "2".into());
        store.put("ledger:2024-01-01:a".into(), "1".into());
        store.put("revocation:o1".into(), "r".into());

        let entries = store.scan_prefix("ledger:");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "ledger:2024-01-01:a");
        assert_eq!(entries[1].0, "ledger:2024-01-02:b");
    }

    #[test]
    fn delete_removes_the_key() {
        let store = MemStore::new();
        store.put("k".into(), "v".into());
        assert_eq!(store.delete("k"), Some("v".to_string()));
        assert_eq!(store.get("k"), None);
    }
}
