//! InMemoryBackend - HashMap-backed adapter for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::{Backend, Capabilities};
use crate::context::Context;
use crate::error::BackendError;
use crate::key::Key;
use crate::update::{apply_updates, Update};

/// In-memory store keyed by [`Key`]; documents are kept as JSON bytes.
///
/// Clone-friendly via Arc: clones share the same storage. Native batches run
/// under a single lock acquisition, so they are atomic.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    storage: Arc<RwLock<HashMap<Key, Vec<u8>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn encode(value: &Value) -> Result<Vec<u8>, BackendError> {
        serde_json::to_vec(value).map_err(|e| BackendError::Codec(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<Value, BackendError> {
        serde_json::from_slice(bytes).map_err(|e| BackendError::Codec(e.to_string()))
    }
}

impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_batch: true,
            atomic_batch: true,
        }
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, BackendError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| BackendError::LockPoisoned("read"))?;

        storage.get(key).map(|bytes| Self::decode(bytes)).transpose()
    }

    fn insert(&self, key: &Key, value: &Value) -> Result<bool, BackendError> {
        let bytes = Self::encode(value)?;
        let mut storage = self
            .storage
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        if storage.contains_key(key) {
            return Ok(false);
        }
        storage.insert(key.clone(), bytes);
        Ok(true)
    }

    fn set(&self, key: &Key, value: &Value) -> Result<(), BackendError> {
        let bytes = Self::encode(value)?;
        let mut storage = self
            .storage
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        storage.insert(key.clone(), bytes);
        Ok(())
    }

    fn update(&self, key: &Key, updates: &[Update]) -> Result<bool, BackendError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        let Some(bytes) = storage.get_mut(key) else {
            return Ok(false);
        };
        let mut doc = Self::decode(bytes)?;
        apply_updates(&mut doc, updates)?;
        *bytes = Self::encode(&doc)?;
        Ok(true)
    }

    fn delete(&self, key: &Key) -> Result<bool, BackendError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        Ok(storage.remove(key).is_some())
    }

    fn get_batch(&self, _ctx: &Context, keys: &[&Key]) -> Result<Vec<Option<Value>>, BackendError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| BackendError::LockPoisoned("read"))?;

        keys.iter()
            .map(|key| storage.get(*key).map(|bytes| Self::decode(bytes)).transpose())
            .collect()
    }

    fn set_batch(&self, ctx: &Context, entries: &[(&Key, &Value)]) -> Result<(), BackendError> {
        let encoded = entries
            .iter()
            .map(|(key, value)| Ok(((*key).clone(), Self::encode(value)?)))
            .collect::<Result<Vec<_>, BackendError>>()?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        // Nothing has been written yet; a done context drops the whole batch.
        if ctx.is_done() {
            return Err(BackendError::Rejected("batch cancelled before commit".into()));
        }
        storage.extend(encoded);
        Ok(())
    }

    fn delete_batch(&self, ctx: &Context, keys: &[&Key]) -> Result<(), BackendError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| BackendError::LockPoisoned("write"))?;

        if ctx.is_done() {
            return Err(BackendError::Rejected("batch cancelled before commit".into()));
        }
        for key in keys {
            storage.remove(*key);
        }
        Ok(())
    }
}
