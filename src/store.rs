//! Key store: the insertion-ordered registry of sensor keys
//!
//! Each store owns its own mutex, constructed with the store. A protocol
//! transaction or a sensor update takes the guard once and performs every
//! lookup and mutation through it, so no caller can observe a half-applied
//! write.

use crate::error::{Result, SmcError};
use crate::key::{FourCc, Key, DEFAULT_TYPE};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The key table behind a store's lock.
///
/// Append-only: positional indices are stable for the store's lifetime.
#[derive(Debug, Default)]
pub struct KeyTable {
    keys: Vec<Key>,
}

impl KeyTable {
    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Look up a key by name (byte-exact, case-sensitive).
    pub fn key(&self, name: FourCc) -> Option<&Key> {
        self.keys.iter().find(|k| k.name() == name)
    }

    /// Mutable lookup by name.
    pub fn key_mut(&mut self, name: FourCc) -> Option<&mut Key> {
        self.keys.iter_mut().find(|k| k.name() == name)
    }

    /// Look up a key by zero-based creation order.
    pub fn key_at(&self, index: usize) -> Option<&Key> {
        self.keys.get(index)
    }

    /// Iterate keys in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Create a new key with a declared size and initial payload.
    ///
    /// `data_type` of `None` assigns the `ch8*` placeholder. Creating a
    /// name that already exists fails with [`SmcError::KeyAlreadyExists`];
    /// updates go through [`Key::set_value`] instead.
    pub fn add_key_with_value(
        &mut self,
        name: FourCc,
        data_type: Option<FourCc>,
        size: usize,
        bytes: &[u8],
    ) -> Result<()> {
        if self.key(name).is_some() {
            return Err(SmcError::KeyAlreadyExists(name.to_string()));
        }
        let key = Key::new(name, data_type.unwrap_or(DEFAULT_TYPE), size, bytes)?;
        debug!(
            "added key {} type {} size {}",
            key.name(),
            key.data_type(),
            key.size()
        );
        self.keys.push(key);
        Ok(())
    }
}

/// A synchronized key store for one provider instance.
#[derive(Debug, Default)]
pub struct KeyStore {
    table: Mutex<KeyTable>,
}

impl KeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store's lock for the duration of a transaction.
    ///
    /// A poisoned lock is recovered: the table is append-only and key
    /// writes are all-or-nothing, so a panicking holder cannot leave it
    /// structurally inconsistent.
    pub fn lock(&self) -> MutexGuard<'_, KeyTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Register a sensor key at back-end initialization time.
    ///
    /// Takes the lock for the single insertion; back-ends batching several
    /// operations should use [`KeyStore::lock`] directly.
    pub fn register_key(
        &self,
        name: FourCc,
        data_type: FourCc,
        size: usize,
        bytes: &[u8],
    ) -> Result<()> {
        self.lock()
            .add_key_with_value(name, Some(data_type), size, bytes)?;
        Ok(())
    }

    /// Push a fresh reading into an existing key.
    pub fn update_value(&self, name: FourCc, bytes: &[u8]) -> Result<()> {
        let mut table = self.lock();
        let key = table
            .key_mut(name)
            .ok_or_else(|| SmcError::NotFound(name.to_string()))?;
        key.set_value(bytes)
    }

    /// Copy out a key's current value.
    pub fn read_value(&self, name: FourCc) -> Result<Vec<u8>> {
        let table = self.lock();
        let key = table
            .key(name)
            .ok_or_else(|| SmcError::NotFound(name.to_string()))?;
        Ok(key.value().to_vec())
    }
}
