//! dalgo_rust - a database abstraction layer.
//!
//! Application code builds [`Key`]s, wraps them in [`Record`]s and calls a
//! [`Database`]. The database runs on any [`Backend`] adapter and gives the
//! same guarantees everywhere: Multi operations keep input order, elements
//! fail independently, deletes are idempotent, and "not found" is always told
//! apart from other failures with [`DalError::is_not_found`].

mod backend;
mod config;
mod context;
mod database;
mod error;
mod key;
mod record;
mod update;
mod validation;

pub use backend::{Backend, Capabilities, InMemoryBackend};
pub use config::{BatchMode, DatabaseOptions, IdGenerator};
pub use context::Context;
pub use database::Database;
pub use error::{is_not_found, BackendError, DalError, KeyFailure};
pub use key::{Identifier, Key, KeyError};
pub use record::{Outcome, Payload, Record, RecordState};
pub use update::{apply_updates, Update};
pub use validation::{Required, Validate, ValidationError, ValidationErrorKind};

// Derive macro for `Validate`; shares the trait's name like serde's derives.
pub use dalgo_rust_macros::Validate;
