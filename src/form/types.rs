//! Core data types for multi-step forms

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::validator::StepValidator;
use crate::error::FormError;

/// Field name reported by a step that failed as a whole
/// (validator error, panic, or an invalid result without field errors).
pub const STEP_FIELD: &str = "_step";

/// Working copy of form values.
///
/// A JSON object whose keys are field names. Callers define the shape; use
/// [`FormData::to_typed`] / [`FormData::from_typed`] to move between this and
/// a concrete struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(Map<String, Value>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build form data from any value that serializes to a JSON object
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, FormError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FormError::NotAnObject(json_kind(&other).to_string())),
        }
    }

    /// Deserialize the current values into a caller-defined struct
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, FormError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String value of a field, trimmed; `None` for missing, null, or non-strings
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str).map(str::trim)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Shallow merge: every key in `partial` overwrites the current value
    pub fn merge(&mut self, partial: FormData) {
        for (field, value) in partial.0 {
            self.0.insert(field, value);
        }
    }

    /// Whether `field` holds a different value than in `baseline`.
    /// A missing field and an explicit `null` count as the same.
    pub fn field_changed(&self, baseline: &FormData, field: &str) -> bool {
        let current = self.0.get(field).unwrap_or(&Value::Null);
        let original = baseline.0.get(field).unwrap_or(&Value::Null);
        current != original
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

impl From<Map<String, Value>> for FormData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A single field-level message from a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating one step against the current form data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
}

impl StepValidationResult {
    /// A passing result with no messages
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Result derived from collected issues: valid iff there are no errors
    pub fn from_issues(errors: Vec<FieldIssue>, warnings: Vec<FieldIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Result for a step whose validator failed outright
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            errors: vec![FieldIssue::new(STEP_FIELD, message)],
            warnings: Vec::new(),
        }
    }

    /// Make `is_valid` agree with the error list.
    ///
    /// An invalid result without errors gains a step-level error; a "valid"
    /// result that carries errors becomes invalid.
    pub(crate) fn normalized(mut self) -> Self {
        if !self.is_valid && self.errors.is_empty() {
            self.errors
                .push(FieldIssue::new(STEP_FIELD, "Step is not valid"));
        }
        self.is_valid = self.errors.is_empty();
        self
    }
}

/// Derived per-step status, owned by the step tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub completed: bool,
    pub has_errors: bool,
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub has_changes: bool,
}

impl Default for StepState {
    /// Incomplete, valid, no counts
    fn default() -> Self {
        Self {
            completed: false,
            has_errors: false,
            is_valid: true,
            error_count: 0,
            warning_count: 0,
            has_changes: false,
        }
    }
}

/// Static step descriptor
#[derive(Clone)]
pub struct FormStep {
    pub id: String,
    pub label: String,
    pub description: String,
    /// Opaque icon token for the presentation layer
    pub icon: Option<String>,
    pub required: bool,
    /// Fields whose changes mark this step as edited.
    /// Empty means "any field in the form".
    pub watched_fields: BTreeSet<String>,
    pub validator: Option<Arc<dyn StepValidator>>,
}

impl FormStep {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            icon: None,
            required: false,
            watched_fields: BTreeSet::new(),
            validator: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn watch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watched_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn validator(mut self, validator: impl StepValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Whether any watched field differs between `current` and `baseline`
    pub fn has_changes(&self, current: &FormData, baseline: &FormData) -> bool {
        if self.watched_fields.is_empty() {
            return current != baseline;
        }
        self.watched_fields
            .iter()
            .any(|field| current.field_changed(baseline, field))
    }
}

impl fmt::Debug for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStep")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("required", &self.required)
            .field("watched_fields", &self.watched_fields)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}
