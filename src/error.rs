//! Error taxonomy.
//!
//! Unknown subscription ids and unknown collection keys are not errors:
//! those operations return `false`/`None` so teardown cascades stay simple.

use thiserror::Error;

use crate::types::Cid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No class (or plugin class) is registered under this name.
    #[error("class not found: {name}")]
    ClassNotFound { name: String },

    /// An item with this id is already stored in the collection.
    #[error("duplicate key: {id}")]
    DuplicateKey { id: Cid },

    /// Event records need a non-empty type.
    #[error("event record requires a non-empty type")]
    InvalidEventType,

    /// An init hook of `class` failed while constructing an instance.
    #[error("constructor for {class} failed: {reason}")]
    ConstructorFailed { class: String, reason: String },

    #[error("{class} has no method `{method}`")]
    MethodNotFound { class: String, method: String },

    /// Configuration could not be parsed.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("`{operation}` requires an initialized object")]
    NotInitialized { operation: &'static str },
}

impl Error {
    pub fn class_not_found(name: impl Into<String>) -> Self {
        Self::ClassNotFound { name: name.into() }
    }

    pub fn invalid_config(reason: impl ToString) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }

    pub fn constructor_failed(class: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConstructorFailed {
            class: class.into(),
            reason: reason.to_string(),
        }
    }
}
