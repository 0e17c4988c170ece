//! Keys - location of a record inside a backing store.
//!
//! A key is a collection (table, kind, key prefix) plus an identifier that is
//! either a string or an integer. Keys may be nested under a parent key for
//! stores with sub-collections.
//!
//! ## Example
//!
//! ```ignore
//! use dalgo_rust::Key;
//!
//! let user = Key::with_str_id("users", "u1")?;
//! let order = user.child("orders", 42)?;
//! assert_eq!(order.to_string(), "users/u1/orders/42");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a key cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key collection must not be empty")]
    EmptyCollection,
    #[error("key collection {0:?} must not contain '/'")]
    InvalidCollection(String),
    #[error("string identifier in collection {0:?} must not be empty")]
    EmptyId(String),
}

/// Record identifier: exactly one of a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Identifier {
    Str(String),
    Int(i64),
}

impl Identifier {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Identifier::Str(s) => Some(s),
            Identifier::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Identifier::Int(i) => Some(*i),
            Identifier::Str(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Str(s) => f.write_str(s),
            Identifier::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Str(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Str(value.to_string())
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Identifier::Int(value.into())
    }
}

/// Immutable location of a record.
///
/// Deserialized keys pass the same checks as the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KeyParts")]
pub struct Key {
    parent: Option<Box<Key>>,
    collection: String,
    id: Identifier,
}

#[derive(Deserialize)]
struct KeyParts {
    parent: Option<Box<Key>>,
    collection: String,
    id: Identifier,
}

impl TryFrom<KeyParts> for Key {
    type Error = KeyError;

    fn try_from(parts: KeyParts) -> Result<Self, Self::Error> {
        Key::build(parts.parent, parts.collection, parts.id)
    }
}

impl Key {
    /// Build a top-level key.
    pub fn new(collection: impl Into<String>, id: impl Into<Identifier>) -> Result<Self, KeyError> {
        Self::build(None, collection.into(), id.into())
    }

    pub fn with_str_id(
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Self, KeyError> {
        Self::new(collection, Identifier::Str(id.into()))
    }

    pub fn with_int_id(collection: impl Into<String>, id: i64) -> Result<Self, KeyError> {
        Self::new(collection, Identifier::Int(id))
    }

    /// Build a key nested under `self`.
    pub fn child(
        &self,
        collection: impl Into<String>,
        id: impl Into<Identifier>,
    ) -> Result<Self, KeyError> {
        Self::build(Some(Box::new(self.clone())), collection.into(), id.into())
    }

    fn build(
        parent: Option<Box<Key>>,
        collection: String,
        id: Identifier,
    ) -> Result<Self, KeyError> {
        if collection.is_empty() {
            return Err(KeyError::EmptyCollection);
        }
        if collection.contains('/') {
            return Err(KeyError::InvalidCollection(collection));
        }
        if let Identifier::Str(s) = &id {
            if s.is_empty() {
                return Err(KeyError::EmptyId(collection));
            }
        }
        Ok(Self {
            parent,
            collection,
            id,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// Number of keys in the chain, counting `self`.
    pub fn level(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.level())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{}/", parent)?;
        }
        write!(f, "{}/{}", self.collection, self.id)
    }
}
