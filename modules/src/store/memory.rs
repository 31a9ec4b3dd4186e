use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::ics02_client::height::Height;
use crate::store::KvStore;
use crate::timestamp::Timestamp;

pub type Namespace = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory multi-store, one ordered map per namespace.
#[derive(Debug, Default)]
pub struct MemStore {
    stores: RwLock<BTreeMap<String, Namespace>>,
    host: RwLock<(Height, Timestamp)>,
}

impl MemStore {
    pub fn new(height: Height, timestamp: Timestamp) -> Self {
        Self {
            stores: RwLock::new(BTreeMap::new()),
            host: RwLock::new((height, timestamp)),
        }
    }

    pub fn set_host(&self, height: Height, timestamp: Timestamp) {
        let mut host = self.host.write().unwrap_or_else(PoisonError::into_inner);
        *host = (height, timestamp);
    }

    /// Creates the namespace if it does not exist yet, so that it shows up in snapshots.
    pub fn mount(&self, namespace: &str) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.entry(namespace.to_string()).or_default();
    }

    /// A consistent copy of every namespace, used to commit a block.
    pub fn snapshot(&self) -> BTreeMap<String, Namespace> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        let host = *self.host.read().unwrap_or_else(PoisonError::into_inner);
        Self {
            stores: RwLock::new(self.snapshot()),
            host: RwLock::new(host),
        }
    }
}

impl KvStore for MemStore {
    fn get(&self, namespace: &str, key: &[u8]) -> Option<Vec<u8>> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.get(namespace).and_then(|s| s.get(key)).cloned()
    }

    fn set(&self, namespace: &str, key: Vec<u8>, value: Vec<u8>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores
            .entry(namespace.to_string())
            .or_default()
            .insert(key, value);
    }

    fn delete(&self, namespace: &str, key: &[u8]) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get_mut(namespace) {
            store.remove(key);
        }
    }

    fn current_height(&self) -> Height {
        self.host.read().unwrap_or_else(PoisonError::into_inner).0
    }

    fn current_timestamp(&self) -> Timestamp {
        self.host.read().unwrap_or_else(PoisonError::into_inner).1
    }
}

#[cfg(test)]
mod tests {
    use super::MemStore;
    use crate::ics02_client::height::Height;
    use crate::store::KvStore;
    use crate::timestamp::Timestamp;

    #[test]
    fn namespaces_are_isolated() {
        let store = MemStore::new(Height::new(0, 1), Timestamp::from_seconds(1));
        store.set("ibc", b"key".to_vec(), b"ibc-value".to_vec());
        store.set("bank", b"key".to_vec(), b"bank-value".to_vec());

        assert_eq!(store.get("ibc", b"key"), Some(b"ibc-value".to_vec()));
        assert_eq!(store.get("bank", b"key"), Some(b"bank-value".to_vec()));

        store.delete("ibc", b"key");
        assert_eq!(store.get("ibc", b"key"), None);
        assert_eq!(store.get("bank", b"key"), Some(b"bank-value".to_vec()));

        let snapshot = store.snapshot();
        assert!(snapshot["ibc"].is_empty());
        assert_eq!(snapshot["bank"].len(), 1);
    }
}
