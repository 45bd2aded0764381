//! Error types for form sessions and snapshot stores.

use thiserror::Error;

/// Errors surfaced by [`crate::form::MultiStepForm`].
///
/// Validation problems are never errors: they live in step states and the
/// error map. Only construction mistakes and save failures come back here.
#[derive(Debug, Error)]
pub enum FormError {
    /// A form needs at least one step
    #[error("form has no steps")]
    NoSteps,

    /// Step ids must be unique within a form
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    /// Initial or typed data did not serialize to a JSON object
    #[error("form data must be a JSON object, got {0}")]
    NotAnObject(String),

    /// Typed conversion failed
    #[error("form data conversion failed: {0}")]
    Conversion(#[from] serde_json::Error),

    /// The caller's save handler failed; the session is unchanged
    #[error("save failed: {0}")]
    Save(#[source] anyhow::Error),
}

/// Errors raised by a [`crate::persistence::KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage quota exceeded writing '{key}' ({needed} bytes needed, {limit} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            key: key.into(),
            source,
        }
    }

    /// Whether the failure was the store running out of room
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}
