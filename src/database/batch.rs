//! Multi operations.
//!
//! Every Multi call follows the same shape:
//!
//! 1. reject malformed arguments (resolved records, missing payloads, bad
//!    patches) before anything is dispatched;
//! 2. validate and encode payloads, attaching failures to their records;
//! 3. dispatch in chunks of `max_batch_size`, through the backend's native
//!    batch call when it has one, or element by element otherwise;
//! 4. when a native batch fails for an element-level reason, re-run that
//!    chunk one element at a time (degraded mode) so one bad element cannot
//!    sink its neighbours.
//!
//! The returned error is reserved for failures of the batch as a whole:
//! closed database, cancellation, malformed arguments, lost connectivity.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, warn};

use super::{encode_for_write, ensure_unresolved, validate_updates, Database};
use crate::backend::Backend;
use crate::context::Context;
use crate::error::{DalError, KeyFailure};
use crate::key::Key;
use crate::record::Record;
use crate::update::Update;

impl<B: Backend> Database<B> {
    /// Fetch every record. Missing keys resolve their record as NotFound and
    /// do not fail the call.
    pub fn get_multi(&self, ctx: &Context, records: &mut [Record]) -> Result<(), DalError> {
        self.ensure_open()?;
        for (index, record) in records.iter().enumerate() {
            ensure_unresolved(record, index)?;
        }
        ctx.check()?;
        debug!(count = records.len(), "get_multi");

        let parallel = self.options.parallel;
        if !self.native_batch() {
            return self.fan_out(ctx, records, parallel, |record| self.get_one(record));
        }

        for chunk in records.chunks_mut(self.options.max_batch_size) {
            ctx.check()?;
            let keys: Vec<&Key> = chunk.iter().map(Record::key).collect();
            match self.backend.get_batch(ctx, &keys) {
                Ok(values) if values.len() == chunk.len() => {
                    for (record, value) in chunk.iter_mut().zip(values) {
                        record.resolve_read(value);
                    }
                    continue;
                }
                Ok(values) => warn!(
                    backend = self.backend.name(),
                    expected = chunk.len(),
                    got = values.len(),
                    "get_batch returned a wrong number of results, retrying one by one"
                ),
                Err(err) if err.is_dispatch_level() => return Err(self.backend_err(err)),
                Err(err) => warn!(
                    backend = self.backend.name(),
                    error = %err,
                    "get_batch failed, retrying one by one"
                ),
            }
            self.fan_out(ctx, chunk, parallel, |record| self.get_one(record))?;
        }
        Ok(())
    }

    /// Create or fully replace every record.
    ///
    /// Payloads failing their self-check are resolved as failed and skipped;
    /// the rest are written. Repeated keys end with the last record's data.
    pub fn set_multi(&self, ctx: &Context, records: &mut [Record]) -> Result<(), DalError> {
        self.ensure_open()?;
        for (index, record) in records.iter().enumerate() {
            ensure_unresolved(record, index)?;
            if record.payload().is_none() {
                return Err(DalError::InvalidArgument(format!(
                    "record #{} ({}) has no payload to write",
                    index,
                    record.key()
                )));
            }
        }
        ctx.check()?;
        debug!(count = records.len(), "set_multi");

        let mut pending: Vec<(&mut Record, Value)> = Vec::with_capacity(records.len());
        for (index, record) in records.iter_mut().enumerate() {
            if let Ok(value) = encode_for_write(record, index) {
                pending.push((record, value));
            }
        }

        // Parallel writes to one key would lose the input order.
        let parallel = self.options.parallel
            && !has_duplicates(pending.iter().map(|(record, _)| record.key()));

        if !self.native_batch() {
            return self.fan_out(ctx, &mut pending, parallel, |(record, value)| {
                self.set_one(record, std::mem::take(value))
            });
        }

        for chunk in pending.chunks_mut(self.options.max_batch_size) {
            ctx.check()?;
            let entries: Vec<(&Key, &Value)> =
                chunk.iter().map(|(record, value)| (record.key(), value)).collect();
            match self.backend.set_batch(ctx, &entries) {
                Ok(()) => {
                    for (record, value) in chunk.iter_mut() {
                        record.resolve_found(std::mem::take(value));
                    }
                    continue;
                }
                Err(err) if err.is_dispatch_level() => return Err(self.backend_err(err)),
                Err(err) => warn!(
                    backend = self.backend.name(),
                    error = %err,
                    "set_batch failed, retrying one by one"
                ),
            }
            self.fan_out(ctx, chunk, parallel, |(record, value)| {
                self.set_one(record, std::mem::take(value))
            })?;
        }
        Ok(())
    }

    /// Apply the same patch to every key.
    ///
    /// Existing records are patched. Keys that are absent (or whose patch the
    /// backend refused) fail the call with [`DalError::Batch`], listing one
    /// failure per key in input order; it is `is_not_found()` when every key
    /// was simply absent.
    pub fn update_multi(
        &self,
        ctx: &Context,
        keys: &[Key],
        updates: &[Update],
    ) -> Result<(), DalError> {
        self.ensure_open()?;
        validate_updates(updates)?;
        ctx.check()?;
        debug!(count = keys.len(), fields = updates.len(), "update_multi");

        let parallel = self.options.parallel && !has_duplicates(keys.iter());
        let mut outcomes: Vec<(&Key, Option<DalError>)> =
            keys.iter().map(|key| (key, None)).collect();
        self.fan_out(ctx, &mut outcomes, parallel, |(key, failure)| {
            *failure = self.update_one(key, updates).err();
        })?;

        into_batch_result(outcomes)
    }

    /// Remove every key. Absent keys are not failures.
    pub fn delete_multi(&self, ctx: &Context, keys: &[Key]) -> Result<(), DalError> {
        self.ensure_open()?;
        ctx.check()?;
        debug!(count = keys.len(), "delete_multi");

        let parallel = self.options.parallel;
        if !self.native_batch() {
            return self.delete_each(ctx, keys, parallel);
        }

        let mut failures = Vec::new();
        for chunk in keys.chunks(self.options.max_batch_size) {
            ctx.check()?;
            let refs: Vec<&Key> = chunk.iter().collect();
            match self.backend.delete_batch(ctx, &refs) {
                Ok(()) => continue,
                Err(err) if err.is_dispatch_level() => return Err(self.backend_err(err)),
                Err(err) => warn!(
                    backend = self.backend.name(),
                    error = %err,
                    "delete_batch failed, retrying one by one"
                ),
            }
            if let Err(err) = self.delete_each(ctx, chunk, parallel) {
                match err {
                    DalError::Batch { failures: chunk_failures } => failures.extend(chunk_failures),
                    other => return Err(other),
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DalError::Batch { failures })
        }
    }

    fn delete_each(&self, ctx: &Context, keys: &[Key], parallel: bool) -> Result<(), DalError> {
        let mut outcomes: Vec<(&Key, Option<DalError>)> =
            keys.iter().map(|key| (key, None)).collect();
        self.fan_out(ctx, &mut outcomes, parallel, |(key, failure)| {
            *failure = self.delete_one(key).err();
        })?;
        into_batch_result(outcomes)
    }

    fn native_batch(&self) -> bool {
        use crate::config::BatchMode;

        self.options.batch_mode == BatchMode::Auto && self.backend.capabilities().native_batch
    }

    /// Run `op` on every item, in order or across the rayon pool.
    ///
    /// Each item is handed to exactly one task. Once `ctx` is done, remaining
    /// items are left untouched and the context's error is returned.
    fn fan_out<T, F>(
        &self,
        ctx: &Context,
        items: &mut [T],
        parallel: bool,
        op: F,
    ) -> Result<(), DalError>
    where
        T: Send,
        F: Fn(&mut T) + Send + Sync,
    {
        if parallel && items.len() > 1 {
            let skipped = AtomicBool::new(false);
            items.par_iter_mut().for_each(|item| {
                if ctx.is_done() {
                    skipped.store(true, Ordering::Relaxed);
                    return;
                }
                op(item);
            });
            if skipped.load(Ordering::Relaxed) {
                return Err(ctx.err().unwrap_or(DalError::Cancelled));
            }
            return Ok(());
        }

        for item in items.iter_mut() {
            ctx.check()?;
            op(item);
        }
        Ok(())
    }
}

fn has_duplicates<'a>(keys: impl Iterator<Item = &'a Key>) -> bool {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return true;
        }
    }
    false
}

fn into_batch_result(outcomes: Vec<(&Key, Option<DalError>)>) -> Result<(), DalError> {
    let failures: Vec<KeyFailure> = outcomes
        .into_iter()
        .filter_map(|(key, failure)| {
            failure.map(|error| KeyFailure {
                key: key.clone(),
                error,
            })
        })
        .collect();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(DalError::Batch { failures })
    }
}
