//! Field access evaluator.
//!
//! `redact` never mutates its input. Every field gets exactly one level from
//! the permission and exactly one masking strategy for that level. A value
//! that arrives already obscured is re-obscured at the requested level, so the
//! output is never more revealing than that level allows.

use std::collections::BTreeMap;

use sanctuary_auth::{RedactionLevel, RedactionPermission};

use crate::config::RedactionConfig;
use crate::mask::{PARTIAL_PLACEHOLDER, mask_minimal};
use crate::record::{ClassifiedRecord, FieldValue, RedactedRecord};

/// Applies permissions to records using a fixed [`RedactionConfig`].
#[derive(Debug, Clone)]
pub struct Redactor {
    config: RedactionConfig,
}

impl Redactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    pub fn redact(&self, record: &ClassifiedRecord, permission: &RedactionPermission) -> RedactedRecord {
        let plan = redaction_plan(record, permission);

        if plan.values().all(|level| *level == RedactionLevel::NoRedaction) {
            tracing::debug!(fields = record.len(), "redaction skipped: full access");
            return record.clone();
        }

        let mut out = ClassifiedRecord::new();
        let mut withheld = 0usize;
        for (name, field) in record.fields() {
            let level = plan
                .get(name)
                .copied()
                .unwrap_or(RedactionLevel::FullRedaction);
            let value = self.apply(level, &field.value);
            if value != field.value {
                withheld += 1;
            }
            out.insert(name, field.field_type, value);
        }

        tracing::debug!(fields = record.len(), withheld, "record redacted");
        out
    }

    fn apply(&self, level: RedactionLevel, value: &FieldValue) -> FieldValue {
        use FieldValue::*;

        match (level, value) {
            (RedactionLevel::NoRedaction, v) => v.clone(),
            (RedactionLevel::FullRedaction, _) => Redacted,
            (_, Unset) => Unset,
            (_, Redacted) => Redacted,

            (RedactionLevel::Minimal, Text(t) | Masked(t)) => {
                Masked(mask_minimal(t, self.config.minimal_visible_suffix))
            }
            (RedactionLevel::Minimal, Hashed(h)) => Hashed(h.clone()),

            (RedactionLevel::Partial, _) => Masked(PARTIAL_PLACEHOLDER.to_string()),

            (RedactionLevel::HashOnly, Text(t) | Masked(t)) => Hashed(self.config.hasher().digest(t)),
            (RedactionLevel::HashOnly, Hashed(h)) => Hashed(h.clone()),
        }
    }
}

/// Level each field of `record` would receive, keyed by field name.
pub fn redaction_plan(
    record: &ClassifiedRecord,
    permission: &RedactionPermission,
) -> BTreeMap<String, RedactionLevel> {
    record
        .fields()
        .map(|(name, field)| (name.to_string(), permission.level_for_field(field.field_type)))
        .collect()
}
