//! Fault-injecting backend wrapped around `InMemoryBackend`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use dalgo_rust::{
    Backend, BackendError, Capabilities, Context, InMemoryBackend, Key, Update,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Backend whose batch transport is all-or-nothing and not atomic: one bad
/// key fails the whole native batch call.
#[derive(Default)]
pub struct FlakyBackend {
    inner: InMemoryBackend,
    failing: Mutex<HashSet<Key>>,
    offline: AtomicBool,
    native_batch: bool,
    pub single_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub closed: AtomicBool,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl FlakyBackend {
    pub fn monolithic() -> Self {
        Self {
            native_batch: true,
            ..Self::default()
        }
    }

    pub fn per_element() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Every call touching `key` fails with `PermissionDenied`.
    pub fn fail_key(&self, key: &Key) {
        self.failing.lock().unwrap().insert(key.clone());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Cancel `token` once `calls` single-element calls have been served.
    pub fn cancel_after(&self, calls: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((calls, token));
    }

    fn single(&self, key: &Key) -> Result<(), BackendError> {
        let served = self.single_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if served >= *after {
                token.cancel();
            }
        }
        self.check(std::iter::once(key))
    }

    fn batch<'a>(&self, keys: impl Iterator<Item = &'a Key>) -> Result<(), BackendError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.check(keys)
    }

    fn check<'a>(&self, mut keys: impl Iterator<Item = &'a Key>) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("flaky backend is offline".into()));
        }
        let failing = self.failing.lock().unwrap();
        match keys.find(|key| failing.contains(*key)) {
            Some(key) => Err(BackendError::PermissionDenied(key.to_string())),
            None => Ok(()),
        }
    }
}

impl Backend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            native_batch: self.native_batch,
            atomic_batch: false,
        }
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, BackendError> {
        self.single(key)?;
        self.inner.get(key)
    }

    fn insert(&self, key: &Key, value: &Value) -> Result<bool, BackendError> {
        self.single(key)?;
        self.inner.insert(key, value)
    }

    fn set(&self, key: &Key, value: &Value) -> Result<(), BackendError> {
        self.single(key)?;
        self.inner.set(key, value)
    }

    fn update(&self, key: &Key, updates: &[Update]) -> Result<bool, BackendError> {
        self.single(key)?;
        self.inner.update(key, updates)
    }

    fn delete(&self, key: &Key) -> Result<bool, BackendError> {
        self.single(key)?;
        self.inner.delete(key)
    }

    fn get_batch(&self, ctx: &Context, keys: &[&Key]) -> Result<Vec<Option<Value>>, BackendError> {
        if !self.native_batch {
            return Err(BackendError::Unsupported("get_batch"));
        }
        self.batch(keys.iter().copied())?;
        self.inner.get_batch(ctx, keys)
    }

    fn set_batch(&self, ctx: &Context, entries: &[(&Key, &Value)]) -> Result<(), BackendError> {
        if !self.native_batch {
            return Err(BackendError::Unsupported("set_batch"));
        }
        self.batch(entries.iter().map(|(key, _)| *key))?;
        self.inner.set_batch(ctx, entries)
    }

    fn delete_batch(&self, ctx: &Context, keys: &[&Key]) -> Result<(), BackendError> {
        if !self.native_batch {
            return Err(BackendError::Unsupported("delete_batch"));
        }
        self.batch(keys.iter().copied())?;
        self.inner.delete_batch(ctx, keys)
    }

    fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
