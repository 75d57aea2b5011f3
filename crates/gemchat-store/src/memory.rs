use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::kv::KeyValueStore;

/// Process-local store, used by tests and by callers that do not want
/// anything written to disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // a panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("theme", "dark").unwrap();
        assert_eq!(store.get::<String>("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(store.len(), 1);

        assert!(store.remove("theme").unwrap());
        assert!(store.get::<String>("theme").unwrap().is_none());
    }

    #[test]
    fn shared_through_rc() {
        let store = std::rc::Rc::new(MemoryStore::new());
        let other = store.clone();

        other.set("k", &[1, 2, 3]).unwrap();
        assert_eq!(store.get::<Vec<u8>>("k").unwrap(), Some(vec![1, 2, 3]));
    }
}
