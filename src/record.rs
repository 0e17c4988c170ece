//! Records - a key, an optional payload to write, and the outcome of the last
//! operation applied to it.
//!
//! A record starts `Unresolved` and is resolved exactly once by a database
//! operation into `Found`, `NotFound` or `Failed`. Records are single-use:
//! handing a resolved record to another operation is rejected.
//!
//! ## Example
//!
//! ```ignore
//! use dalgo_rust::{Context, Record};
//!
//! let mut record = Record::new(key);
//! db.get(&ctx, &mut record)?;
//! let data: TestData = record.data_to()?;
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DalError;
use crate::key::Key;
use crate::validation::{Validate, ValidationError};

trait ErasedPayload: Send + Sync {
    fn check(&self) -> Result<(), ValidationError>;
    fn to_value(&self) -> Result<Value, serde_json::Error>;
}

impl<T: Serialize + Validate + Send + Sync> ErasedPayload for T {
    fn check(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Data to be written by Insert or Set-family operations.
///
/// Every payload type implements [`Validate`], so its self-check always runs
/// before the write. Types without rules derive an empty `Validate`.
pub struct Payload {
    inner: Box<dyn ErasedPayload>,
}

impl Payload {
    pub fn new<T>(data: T) -> Self
    where
        T: Serialize + Validate + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(data),
        }
    }

    /// Run the self-check, then serialize.
    pub(crate) fn encode(&self) -> Result<Value, DalError> {
        self.inner.check()?;
        self.inner
            .to_value()
            .map_err(|e| DalError::Codec(e.to_string()))
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// Result of the last operation applied to a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Outcome {
    #[default]
    Unresolved,
    /// The record exists; holds the stored (or just written) document.
    Found(Value),
    /// `DalError::NotFound` for a missing record, any other error otherwise.
    Failed(DalError),
}

impl Outcome {
    pub fn exists(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn error(&self) -> Option<&DalError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn state(&self) -> RecordState {
        match self {
            Outcome::Unresolved => RecordState::Unresolved,
            Outcome::Found(_) => RecordState::Found,
            Outcome::Failed(err) if err.is_not_found() => RecordState::NotFound,
            Outcome::Failed(_) => RecordState::Failed,
        }
    }
}

/// Where a record sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Unresolved,
    Found,
    NotFound,
    Failed,
}

/// A key plus an optional payload and the outcome of the operation applied to it.
#[derive(Debug)]
pub struct Record {
    key: Key,
    payload: Option<Payload>,
    outcome: Outcome,
}

impl Record {
    /// A record without payload, for reads and existence checks.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            payload: None,
            outcome: Outcome::Unresolved,
        }
    }

    pub fn with_payload(key: Key, payload: Payload) -> Self {
        Self {
            key,
            payload: Some(payload),
            outcome: Outcome::Unresolved,
        }
    }

    /// A record carrying `data` to write; its [`Validate`] check runs first.
    pub fn with_data<T>(key: Key, data: T) -> Self
    where
        T: Serialize + Validate + Send + Sync + 'static,
    {
        Self::with_payload(key, Payload::new(data))
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn exists(&self) -> bool {
        self.outcome.exists()
    }

    pub fn error(&self) -> Option<&DalError> {
        self.outcome.error()
    }

    pub fn state(&self) -> RecordState {
        self.outcome.state()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }

    /// Raw stored document, when the record was found.
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Copy the captured document into a typed value.
    pub fn data_to<T: DeserializeOwned>(&self) -> Result<T, DalError> {
        match &self.outcome {
            Outcome::Found(value) => {
                T::deserialize(value).map_err(|e| DalError::Codec(e.to_string()))
            }
            Outcome::Failed(err) => Err(err.clone()),
            Outcome::Unresolved => Err(DalError::InvalidArgument(format!(
                "record {} has not been resolved by any operation",
                self.key
            ))),
        }
    }

    pub(crate) fn is_unresolved(&self) -> bool {
        matches!(self.outcome, Outcome::Unresolved)
    }

    pub(crate) fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub(crate) fn resolve_found(&mut self, value: Value) {
        self.outcome = Outcome::Found(value);
    }

    pub(crate) fn resolve_failed(&mut self, err: DalError) {
        self.outcome = Outcome::Failed(err);
    }

    /// Resolve from a backend read: `None` means the key is absent.
    pub(crate) fn resolve_read(&mut self, value: Option<Value>) {
        match value {
            Some(value) => self.resolve_found(value),
            None => {
                let err = DalError::not_found(&self.key);
                self.resolve_failed(err);
            }
        }
    }
}
