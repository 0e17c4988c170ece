//! Database - uniform CRUD surface over a [`Backend`].
//!
//! Single-record operations live here; the Multi variants and their
//! dispatch/aggregation logic live in `batch`.
//!
//! ## Example
//!
//! ```ignore
//! use dalgo_rust::{Context, Database, InMemoryBackend, Key, Record};
//!
//! let db = Database::new(InMemoryBackend::new());
//! let ctx = Context::background();
//! let key = Key::with_str_id("E2ETest1", "r0")?;
//!
//! db.insert(&ctx, &mut Record::with_data(key.clone(), data))?;
//! let mut record = Record::new(key);
//! match db.get(&ctx, &mut record) {
//!     Ok(()) => println!("{:?}", record.data()),
//!     Err(err) if err.is_not_found() => println!("gone"),
//!     Err(err) => return Err(err),
//! }
//! ```

mod batch;

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::config::{DatabaseOptions, IdGenerator};
use crate::context::Context;
use crate::error::{BackendError, DalError};
use crate::key::Key;
use crate::record::{Payload, Record};
use crate::update::Update;

/// Keyed CRUD and batch operations over one backend.
///
/// Safe to share between threads; every operation takes `&self`. The backend's
/// resources are released by [`Database::close`] or when the database is dropped.
pub struct Database<B: Backend> {
    backend: B,
    options: DatabaseOptions,
    closed: AtomicBool,
}

impl<B: Backend> Database<B> {
    /// Open with default options.
    pub fn new(backend: B) -> Self {
        info!(backend = backend.name(), "database opened");
        Self {
            backend,
            options: DatabaseOptions::default(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn open(backend: B, options: DatabaseOptions) -> Result<Self, DalError> {
        options.validate()?;
        info!(backend = backend.name(), ?options, "database opened");
        Ok(Self {
            backend,
            options,
            closed: AtomicBool::new(false),
        })
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the backend. Only the first call reaches the backend; every
    /// operation afterwards fails with [`DalError::Closed`].
    pub fn close(&self) -> Result<(), DalError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(backend = self.backend.name(), "database closing");
        self.backend
            .close()
            .map_err(|err| DalError::backend(self.backend.name(), err))
    }

    // ========================================================================
    // Single-record operations
    // ========================================================================

    /// Fetch `record.key()`.
    ///
    /// A missing record is resolved as NotFound and the same error is
    /// returned from the call.
    pub fn get(&self, ctx: &Context, record: &mut Record) -> Result<(), DalError> {
        self.ensure_open()?;
        ensure_unresolved(record, 0)?;
        ctx.check()?;
        debug!(key = %record.key(), "get");
        self.get_one(record);
        result_of(record)
    }

    /// Bound form of [`Database::get`]: on success the stored document is
    /// copied into `target`.
    pub fn get_into<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        key: &Key,
        target: &mut T,
    ) -> Result<(), DalError> {
        let mut record = Record::new(key.clone());
        self.get(ctx, &mut record)?;
        *target = record.data_to()?;
        Ok(())
    }

    pub fn exists(&self, ctx: &Context, key: &Key) -> Result<bool, DalError> {
        self.ensure_open()?;
        ctx.check()?;
        self.backend
            .get(key)
            .map(|value| value.is_some())
            .map_err(|err| self.backend_err(err))
    }

    /// Create a record. Fails with `AlreadyExists` when the key is occupied.
    pub fn insert(&self, ctx: &Context, record: &mut Record) -> Result<(), DalError> {
        self.ensure_open()?;
        ensure_unresolved(record, 0)?;
        ctx.check()?;
        let value = encode_for_write(record, 0)?;
        debug!(key = %record.key(), "insert");
        match self.backend.insert(record.key(), &value) {
            Ok(true) => record.resolve_found(value),
            Ok(false) => {
                let err = DalError::AlreadyExists {
                    key: record.key().clone(),
                };
                record.resolve_failed(err);
            }
            Err(err) => {
                let err = self.element_err(record.key(), err);
                record.resolve_failed(err);
            }
        }
        result_of(record)
    }

    /// Insert under a key synthesized by the configured [`IdGenerator`].
    ///
    /// The payload is validated once; collisions are retried up to
    /// `max_id_attempts` times.
    pub fn insert_with_generated_id(
        &self,
        ctx: &Context,
        collection: &str,
        payload: Payload,
    ) -> Result<Record, DalError> {
        self.ensure_open()?;
        let value = payload.encode()?;
        let mut last_key = None;
        for attempt in 1..=self.options.max_id_attempts {
            ctx.check()?;
            let key = self.generate_key(collection)?;
            match self.backend.insert(&key, &value) {
                Ok(true) => {
                    debug!(key = %key, attempt, "inserted with generated id");
                    let mut record = Record::with_payload(key, payload);
                    record.resolve_found(value);
                    return Ok(record);
                }
                Ok(false) => {
                    debug!(key = %key, attempt, "generated id collided");
                    last_key = Some(key);
                }
                Err(err) => return Err(self.backend_err(err)),
            }
        }
        match last_key {
            Some(key) => Err(DalError::AlreadyExists { key }),
            None => Err(DalError::InvalidArgument("max_id_attempts is zero".into())),
        }
    }

    /// Create or fully replace a record.
    pub fn set(&self, ctx: &Context, record: &mut Record) -> Result<(), DalError> {
        self.ensure_open()?;
        ensure_unresolved(record, 0)?;
        ctx.check()?;
        let value = encode_for_write(record, 0)?;
        debug!(key = %record.key(), "set");
        self.set_one(record, value);
        result_of(record)
    }

    /// Patch an existing record. Fails with `NotFound` when it is absent.
    pub fn update(&self, ctx: &Context, key: &Key, updates: &[Update]) -> Result<(), DalError> {
        self.ensure_open()?;
        validate_updates(updates)?;
        ctx.check()?;
        debug!(key = %key, fields = updates.len(), "update");
        self.update_one(key, updates)
    }

    /// Remove a record. Deleting an absent key succeeds.
    pub fn delete(&self, ctx: &Context, key: &Key) -> Result<(), DalError> {
        self.ensure_open()?;
        ctx.check()?;
        debug!(key = %key, "delete");
        self.delete_one(key)
    }

    // ========================================================================
    // Per-element primitives shared with the batch algorithm
    // ========================================================================

    fn get_one(&self, record: &mut Record) {
        match self.backend.get(record.key()) {
            Ok(value) => record.resolve_read(value),
            Err(err) => {
                let err = self.element_err(record.key(), err);
                record.resolve_failed(err);
            }
        }
    }

    fn set_one(&self, record: &mut Record, value: Value) {
        match self.backend.set(record.key(), &value) {
            Ok(()) => record.resolve_found(value),
            Err(err) => {
                let err = self.element_err(record.key(), err);
                record.resolve_failed(err);
            }
        }
    }

    fn update_one(&self, key: &Key, updates: &[Update]) -> Result<(), DalError> {
        match self.backend.update(key, updates) {
            Ok(true) => Ok(()),
            Ok(false) => Err(DalError::not_found(key)),
            Err(err) => Err(self.element_err(key, err)),
        }
    }

    fn delete_one(&self, key: &Key) -> Result<(), DalError> {
        match self.backend.delete(key) {
            Ok(existed) => {
                if !existed {
                    debug!(key = %key, "delete of absent key");
                }
                Ok(())
            }
            Err(err) => Err(self.element_err(key, err)),
        }
    }

    fn ensure_open(&self) -> Result<(), DalError> {
        if self.is_closed() {
            return Err(DalError::Closed);
        }
        Ok(())
    }

    fn backend_err(&self, err: BackendError) -> DalError {
        DalError::backend(self.backend.name(), err)
    }

    fn element_err(&self, key: &Key, err: BackendError) -> DalError {
        warn!(backend = self.backend.name(), key = %key, error = %err, "backend call failed");
        self.backend_err(err)
    }

    fn generate_key(&self, collection: &str) -> Result<Key, DalError> {
        let key = match self.options.id_generator {
            IdGenerator::Uuid => Key::with_str_id(collection, Uuid::new_v4().to_string())?,
            IdGenerator::RandomInt => {
                Key::with_int_id(collection, rand::thread_rng().gen_range(1..=i64::MAX))?
            }
        };
        Ok(key)
    }
}

impl<B: Backend> Drop for Database<B> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close database on drop");
        }
    }
}

fn result_of(record: &Record) -> Result<(), DalError> {
    match record.error() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

fn ensure_unresolved(record: &Record, index: usize) -> Result<(), DalError> {
    if record.is_unresolved() {
        return Ok(());
    }
    Err(DalError::InvalidArgument(format!(
        "record #{} ({}) was already resolved; records are single-use",
        index,
        record.key()
    )))
}

/// Validate and serialize a record's payload before anything reaches the backend.
///
/// A missing payload is a malformed argument and leaves the record untouched;
/// a failed self-check or codec error resolves the record as failed.
fn encode_for_write(record: &mut Record, index: usize) -> Result<Value, DalError> {
    let encoded = match record.payload() {
        Some(payload) => payload.encode(),
        None => {
            return Err(DalError::InvalidArgument(format!(
                "record #{} ({}) has no payload to write",
                index,
                record.key()
            )))
        }
    };
    encoded.map_err(|err| {
        debug!(key = %record.key(), error = %err, "payload rejected before dispatch");
        record.resolve_failed(err.clone());
        err
    })
}

fn validate_updates(updates: &[Update]) -> Result<(), DalError> {
    if updates.is_empty() {
        return Err(DalError::InvalidArgument("no updates given".into()));
    }
    if let Some(bad) = updates.iter().find(|u| u.path().is_none()) {
        return Err(DalError::InvalidArgument(format!(
            "invalid update field path {:?}",
            bad.field
        )));
    }
    Ok(())
}
