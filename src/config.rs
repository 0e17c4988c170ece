//! Database options.
//!
//! ```ignore
//! let options = DatabaseOptions::from_json(r#"{"batch_mode": "fan_out", "parallel": true}"#)?;
//! let db = Database::open(InMemoryBackend::new(), options)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DalError;

/// How Multi operations reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Native batch calls when the backend has them, single calls otherwise.
    #[default]
    Auto,
    /// Always one backend call per element.
    FanOut,
}

/// How `insert_with_generated_id` synthesizes identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdGenerator {
    /// Random UUID v4 as a string identifier.
    #[default]
    Uuid,
    /// Random positive integer identifier.
    RandomInt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    pub batch_mode: BatchMode,
    /// Fan out elements across the rayon pool instead of in sequence.
    pub parallel: bool,
    /// Largest number of elements sent in one native batch call.
    pub max_batch_size: usize,
    pub id_generator: IdGenerator,
    /// Attempts before `insert_with_generated_id` gives up on collisions.
    pub max_id_attempts: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            batch_mode: BatchMode::Auto,
            parallel: false,
            max_batch_size: 500,
            id_generator: IdGenerator::Uuid,
            max_id_attempts: 5,
        }
    }
}

impl DatabaseOptions {
    /// Parse options from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, DalError> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| DalError::InvalidArgument(format!("database options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), DalError> {
        if self.max_batch_size == 0 {
            return Err(DalError::InvalidArgument(
                "max_batch_size must be greater than zero".into(),
            ));
        }
        if self.max_id_attempts == 0 {
            return Err(DalError::InvalidArgument(
                "max_id_attempts must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn fan_out() -> Self {
        Self {
            batch_mode: BatchMode::FanOut,
            ..Self::default()
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn id_generator(mut self, generator: IdGenerator) -> Self {
        self.id_generator = generator;
        self
    }
}
