//! `sanctuary-redaction` — field access evaluator.
//!
//! Applies a [`RedactionPermission`](sanctuary_auth::RedactionPermission) to a
//! concrete record and produces a new, redacted copy. The source record is
//! never touched.

pub mod config;
pub mod evaluator;
pub mod mask;
pub mod record;

pub use config::{ConfigError, MIN_HASH_KEY_LEN, RedactionConfig};
pub use evaluator::{Redactor, redaction_plan};
pub use mask::{IdentifierHasher, PARTIAL_PLACEHOLDER, mask_minimal};
pub use record::{Classified, ClassifiedField, ClassifiedRecord, FieldValue, RedactedRecord};
