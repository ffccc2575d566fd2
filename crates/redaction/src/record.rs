//! Records as seen by the evaluator: named fields, each with a classification
//! and a value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sanctuary_auth::FieldType;

/// Value of one field, before or after redaction.
///
/// `Redacted` (withheld) and `Unset` (no value on file) are different
/// answers and must stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Unset,
    Text(String),
    /// Partially or generically masked text.
    Masked(String),
    /// One-way digest of the original text.
    Hashed(String),
    Redacted,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, FieldValue::Redacted)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Unset)
    }
}

/// A value plus its classification. `None` means unclassified, which the
/// policy treats with the caller's default level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedField {
    pub field_type: Option<FieldType>,
    pub value: FieldValue,
}

/// Field name → classified value, iterated in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassifiedRecord {
    fields: BTreeMap<String, ClassifiedField>,
}

/// A redacted projection has the same shape as its source.
pub type RedactedRecord = ClassifiedRecord;

impl ClassifiedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a classified field.
    pub fn with(mut self, name: impl Into<String>, field_type: FieldType, value: impl Into<FieldValue>) -> Self {
        self.insert(name, Some(field_type), value.into());
        self
    }

    /// Builder-style insert of a field with no classification.
    pub fn with_unclassified(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, None, value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, field_type: Option<FieldType>, value: FieldValue) {
        self.fields.insert(name.into(), ClassifiedField { field_type, value });
    }

    pub fn get(&self, name: &str) -> Option<&ClassifiedField> {
        self.fields.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ClassifiedField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Domain types that can present themselves to the evaluator.
pub trait Classified {
    fn classify(&self) -> ClassifiedRecord;
}
