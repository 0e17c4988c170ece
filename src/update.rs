//! Field-level patches applied by Update and UpdateMulti.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BackendError;

/// Replace one field of a stored document.
///
/// `field` is a dot-separated path; `"address.city"` sets `city` inside the
/// `address` object, creating the object when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub field: String,
    pub value: Value,
}

impl Update {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Path segments, or `None` when the path is empty or has an empty segment.
    pub fn path(&self) -> Option<Vec<&str>> {
        let segments: Vec<&str> = self.field.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            None
        } else {
            Some(segments)
        }
    }

    fn apply(&self, doc: &mut Value) -> Result<(), BackendError> {
        let path = self
            .path()
            .ok_or_else(|| BackendError::Rejected(format!("invalid field path {:?}", self.field)))?;
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| BackendError::Rejected("empty field path".into()))?;

        let mut target = doc;
        for segment in parents {
            let object = as_object(target, &self.field)?;
            target = object
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        as_object(target, &self.field)?.insert(last.to_string(), self.value.clone());
        Ok(())
    }
}

fn as_object<'a>(
    value: &'a mut Value,
    field: &str,
) -> Result<&'a mut Map<String, Value>, BackendError> {
    value
        .as_object_mut()
        .ok_or_else(|| {
            BackendError::Rejected(format!("cannot set {:?} on a non-object value", field))
        })
}

/// Apply a whole patch to a document.
///
/// Works on a copy: either every update lands or `doc` is left untouched.
pub fn apply_updates(doc: &mut Value, updates: &[Update]) -> Result<(), BackendError> {
    let mut patched = doc.clone();
    for update in updates {
        update.apply(&mut patched)?;
    }
    *doc = patched;
    Ok(())
}
