//! Field classification and redaction levels.

use serde::{Deserialize, Serialize};

/// Classification of a data field for redaction purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Name, SSN, date of birth, client number.
    DirectIdentifier,
    /// Abuse history, safety plans, abuser details.
    SensitiveDvNote,
    MedicalInfo,
    LegalInfo,
    /// Address, phone, email (a survivor's location is protected).
    ContactInfo,
    /// Ordinary service data (dates, program names, counts). Never gated.
    ServiceData,
}

impl FieldType {
    pub const ALL: [FieldType; 6] = [
        FieldType::DirectIdentifier,
        FieldType::SensitiveDvNote,
        FieldType::MedicalInfo,
        FieldType::LegalInfo,
        FieldType::ContactInfo,
        FieldType::ServiceData,
    ];
}

/// How much of a value a caller may see.
///
/// `Ord` follows visibility: `FullRedaction < HashOnly < Partial < Minimal <
/// NoRedaction`, so `min` picks the more restrictive of two levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedactionLevel {
    FullRedaction,
    HashOnly,
    Partial,
    Minimal,
    NoRedaction,
}

impl RedactionLevel {
    pub fn reveals_plaintext(self) -> bool {
        self == RedactionLevel::NoRedaction
    }
}
