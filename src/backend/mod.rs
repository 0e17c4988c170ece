//! Backend adapters - the seam between the database layer and a concrete store.
//!
//! An adapter implements keyed single-record primitives and, when the store
//! supports it, native batch calls. Everything above the seam (validation,
//! ordering, per-record outcomes, degraded batch mode, cancellation) lives in
//! [`Database`](crate::Database), so adapters stay thin.
//!
//! Documents cross the seam as `serde_json::Value`; how they are encoded on
//! the wire is the adapter's business.

mod in_memory;

use serde_json::Value;

use crate::context::Context;
use crate::error::BackendError;
use crate::key::Key;
use crate::update::Update;

pub use in_memory::InMemoryBackend;

/// What an adapter can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `get_batch`, `set_batch` and `delete_batch` are implemented.
    pub native_batch: bool,
    /// A native batch call applies all of its elements or none of them.
    pub atomic_batch: bool,
}

/// Storage adapter.
///
/// Single-record methods are expected to be atomic per key. Batch methods
/// default to `Unsupported`; adapters that override them must set
/// [`Capabilities::native_batch`].
pub trait Backend: Send + Sync {
    /// Short name used in errors and logs (e.g. "memory", "firestore").
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &Key) -> Result<Option<Value>, BackendError>;

    /// Create-only write. Returns `false` without writing when the key is occupied.
    fn insert(&self, key: &Key, value: &Value) -> Result<bool, BackendError>;

    /// Create or fully replace.
    fn set(&self, key: &Key, value: &Value) -> Result<(), BackendError>;

    /// Apply every update to the stored document atomically.
    /// Returns `false` when the key is absent.
    fn update(&self, key: &Key, updates: &[Update]) -> Result<bool, BackendError>;

    /// Returns `true` if the key existed.
    fn delete(&self, key: &Key) -> Result<bool, BackendError>;

    /// One result per key, in key order.
    fn get_batch(
        &self,
        _ctx: &Context,
        _keys: &[&Key],
    ) -> Result<Vec<Option<Value>>, BackendError> {
        Err(BackendError::Unsupported("get_batch"))
    }

    /// Entries are applied in order, so a repeated key ends with its last value.
    /// Atomic adapters must discard the batch when `ctx` is done before commit.
    fn set_batch(&self, _ctx: &Context, _entries: &[(&Key, &Value)]) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("set_batch"))
    }

    /// Absent keys are not an error.
    fn delete_batch(&self, _ctx: &Context, _keys: &[&Key]) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("delete_batch"))
    }

    /// Release connections and sessions. Called once by `Database::close`.
    fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn get(&self, key: &Key) -> Result<Option<Value>, BackendError> {
        (**self).get(key)
    }

    fn insert(&self, key: &Key, value: &Value) -> Result<bool, BackendError> {
        (**self).insert(key, value)
    }

    fn set(&self, key: &Key, value: &Value) -> Result<(), BackendError> {
        (**self).set(key, value)
    }

    fn update(&self, key: &Key, updates: &[Update]) -> Result<bool, BackendError> {
        (**self).update(key, updates)
    }

    fn delete(&self, key: &Key) -> Result<bool, BackendError> {
        (**self).delete(key)
    }

    fn get_batch(&self, ctx: &Context, keys: &[&Key]) -> Result<Vec<Option<Value>>, BackendError> {
        (**self).get_batch(ctx, keys)
    }

    fn set_batch(&self, ctx: &Context, entries: &[(&Key, &Value)]) -> Result<(), BackendError> {
        (**self).set_batch(ctx, entries)
    }

    fn delete_batch(&self, ctx: &Context, keys: &[&Key]) -> Result<(), BackendError> {
        (**self).delete_batch(ctx, keys)
    }

    fn close(&self) -> Result<(), BackendError> {
        (**self).close()
    }
}
