//! Error taxonomy shared by single and batch operations.
//!
//! The same [`DalError`] value is returned from single-record calls and
//! attached to individual records inside a batch, so callers branch with one
//! predicate: `if err.is_not_found() { .. }`.

use std::fmt;

use thiserror::Error;

use crate::key::{Key, KeyError};
use crate::validation::ValidationError;

/// Failure reported by a backend adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connectivity to the store was lost or never established.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The store refused the request (size limits, invalid patch target, ...).
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("codec error: {0}")]
    Codec(String),
    /// The adapter has no native implementation of the named operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    #[error("backend lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl BackendError {
    /// True when the failure is about the transport as a whole rather than one
    /// element, so retrying the elements one by one cannot help.
    pub fn is_dispatch_level(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable(_) | BackendError::LockPoisoned(_)
        )
    }
}

/// A key-only batch element that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFailure {
    pub key: Key,
    pub error: DalError,
}

impl fmt::Display for KeyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.error)
    }
}

/// Error returned by database operations and attached to records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DalError {
    #[error("record not found: {key}")]
    NotFound { key: Key },

    #[error("record already exists: {key}")]
    AlreadyExists { key: Key },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{backend} backend failure: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("payload codec error: {0}")]
    Codec(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("database is closed")]
    Closed,

    #[error("{} batch element(s) failed: {}", .failures.len(), join_failures(.failures))]
    Batch { failures: Vec<KeyFailure> },
}

fn join_failures(failures: &[KeyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DalError {
    pub(crate) fn backend(backend: &'static str, source: BackendError) -> Self {
        DalError::Backend { backend, source }
    }

    pub(crate) fn not_found(key: &Key) -> Self {
        DalError::NotFound { key: key.clone() }
    }

    /// True for a missing record, or for a batch whose every failure is a
    /// missing record.
    pub fn is_not_found(&self) -> bool {
        match self {
            DalError::NotFound { .. } => true,
            DalError::Batch { failures } => {
                !failures.is_empty() && failures.iter().all(|f| f.error.is_not_found())
            }
            _ => false,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, DalError::AlreadyExists { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DalError::Validation(_))
    }

    /// Cancelled or timed out.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DalError::Cancelled | DalError::DeadlineExceeded)
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, DalError::Backend { .. } | DalError::Codec(_))
    }

    /// Per-key failures of a key-only batch, in input order.
    pub fn failures(&self) -> &[KeyFailure] {
        match self {
            DalError::Batch { failures } => failures,
            _ => &[],
        }
    }
}

/// Free-standing form of [`DalError::is_not_found`].
pub fn is_not_found(err: &DalError) -> bool {
    err.is_not_found()
}
