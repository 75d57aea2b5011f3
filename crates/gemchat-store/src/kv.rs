//! The persistent key-value collaborator.
//!
//! Values are opaque JSON text keyed by fixed string constants (see
//! `gemchat_shared::constants`).  Two backends ship with the crate: the
//! SQLite-backed [`Database`](crate::Database) and the in-memory
//! [`MemoryStore`](crate::MemoryStore).

use std::rc::Rc;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// String-keyed JSON get/set/remove.
pub trait KeyValueStore {
    /// Raw JSON text stored under `key`, if any.
    fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Replace the JSON text stored under `key`.
    fn set_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`.  Returns `true` if a value was present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Decode the value stored under `key`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Decode the value stored under `key`, falling back to `default` when absent.
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T>
    where
        Self: Sized,
    {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Encode `value` as JSON and store it under `key`.
    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key)
    }
}
