//! Derived consent views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sanctuary_core::{ClientId, ConsentId};

/// Category of a consent grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    InformationSharing,
    HmisParticipation,
    ReleaseOfInformation,
    Research,
    CourtDisclosure,
    MedicalCoordination,
}

impl ConsentType {
    pub const ALL: [ConsentType; 6] = [
        ConsentType::InformationSharing,
        ConsentType::HmisParticipation,
        ConsentType::ReleaseOfInformation,
        ConsentType::Research,
        ConsentType::CourtDisclosure,
        ConsentType::MedicalCoordination,
    ];

    /// Operation keywords this kind of consent covers. An operation is
    /// covered when its name contains one of them.
    pub fn operation_keywords(self) -> &'static [&'static str] {
        match self {
            ConsentType::InformationSharing => &["share", "export"],
            ConsentType::HmisParticipation => &["hmis", "report"],
            ConsentType::ReleaseOfInformation => &["referral", "transfer"],
            ConsentType::Research => &["research", "evaluation"],
            ConsentType::CourtDisclosure => &["court", "legal"],
            ConsentType::MedicalCoordination => &["medical", "health"],
        }
    }

    pub fn covers_operation(self, operation: &str) -> bool {
        let operation = operation.to_ascii_lowercase();
        self.operation_keywords()
            .iter()
            .any(|keyword| operation.contains(keyword))
    }
}

/// Effective status of one consent at a point in time.
///
/// Exactly one status describes a consent at any instant. `Revoked` and
/// `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    /// No grant exists.
    #[serde(rename = "NONE")]
    NotGranted,
    Granted,
    Revoked,
    Expired,
}

impl ConsentStatus {
    /// Whether data may be shared under this status.
    pub fn is_active(self) -> bool {
        self == ConsentStatus::Granted
    }
}

/// Current state of one consent, folded from the ledger's events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub consent_id: ConsentId,
    pub client_id: ClientId,
    pub consent_type: ConsentType,
    pub purpose: String,
    pub recipient_organization: String,
    pub recipient_contact: Option<String>,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub revocation_reason: Option<String>,
    /// Set only when an explicit expiry fact was recorded.
    pub expired_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_vawa_protected: bool,
    pub limitations: Option<String>,
}

impl ConsentRecord {
    /// Status of this grant as of `as_of`.
    ///
    /// A recorded revocation wins over everything, including an `expires_at`
    /// that has already passed. A recorded expiry comes next, then the
    /// computed one (`expires_at` strictly before `as_of`).
    pub fn effective_status(&self, as_of: DateTime<Utc>) -> ConsentStatus {
        if self.revoked_at.is_some() {
            return ConsentStatus::Revoked;
        }
        if self.expired_at.is_some() {
            return ConsentStatus::Expired;
        }
        match self.expires_at {
            Some(expires_at) if expires_at < as_of => ConsentStatus::Expired,
            _ => ConsentStatus::Granted,
        }
    }

    /// Whether data may be shared under this grant at `as_of`.
    pub fn is_valid_for_use(&self, as_of: DateTime<Utc>) -> bool {
        self.effective_status(as_of).is_active()
    }

    /// Whether this grant covers `operation` towards `recipient_organization`
    /// at `as_of`. Recipient names compare case-insensitively.
    pub fn authorizes(&self, operation: &str, recipient_organization: &str, as_of: DateTime<Utc>) -> bool {
        self.is_valid_for_use(as_of)
            && self
                .recipient_organization
                .trim()
                .eq_ignore_ascii_case(recipient_organization.trim())
            && self.consent_type.covers_operation(operation)
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Revoked or explicitly expired: no further transitions are accepted.
    pub fn is_terminal(&self) -> bool {
        self.revoked_at.is_some() || self.expired_at.is_some()
    }
}

/// Answer to "what is this client's consent for a purpose, as of when?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentStatusView {
    pub status: ConsentStatus,
    /// The grant the status was derived from (for display), if any.
    pub record: Option<ConsentRecord>,
}

impl ConsentStatusView {
    pub fn not_granted() -> Self {
        Self {
            status: ConsentStatus::NotGranted,
            record: None,
        }
    }

    pub fn of(record: &ConsentRecord, as_of: DateTime<Utc>) -> Self {
        Self {
            status: record.effective_status(as_of),
            record: Some(record.clone()),
        }
    }
}
