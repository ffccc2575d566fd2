//! Consent facts.
//!
//! Each variant carries the subject (`client_id`), the business time
//! (`occurred_at`) and its payload. Fields are read-only outside this crate:
//! a fact is built through its validating constructor, and `validate` runs the
//! same field-level rules again before a fact is folded, appended or replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sanctuary_core::{AggregateId, ClientId, ConsentId, DomainError, DomainResult, require_non_blank};
use sanctuary_events::Event;

use crate::ledger::GrantConsent;
use crate::record::ConsentType;

/// Event: ConsentGranted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentGranted {
    pub(crate) client_id: ClientId,
    pub(crate) consent_id: ConsentId,
    pub(crate) consent_type: ConsentType,
    pub(crate) purpose: String,
    pub(crate) recipient_organization: String,
    pub(crate) recipient_contact: Option<String>,
    pub(crate) granted_by: String,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) is_vawa_protected: bool,
    pub(crate) limitations: Option<String>,
    pub(crate) occurred_at: DateTime<Utc>,
}

/// Event: ConsentUpdated (side-transition; status is unchanged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentUpdated {
    pub(crate) client_id: ClientId,
    pub(crate) consent_id: ConsentId,
    pub(crate) recipient_contact: Option<String>,
    pub(crate) limitations: Option<String>,
    pub(crate) updated_by: String,
    pub(crate) occurred_at: DateTime<Utc>,
}

/// Event: ConsentExtended (side-transition; moves `expires_at` later).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentExtended {
    pub(crate) client_id: ClientId,
    pub(crate) consent_id: ConsentId,
    pub(crate) previous_expires_at: Option<DateTime<Utc>>,
    pub(crate) new_expires_at: DateTime<Utc>,
    pub(crate) extended_by: String,
    pub(crate) occurred_at: DateTime<Utc>,
}

/// Event: ConsentRevoked (terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRevoked {
    pub(crate) client_id: ClientId,
    pub(crate) consent_id: ConsentId,
    pub(crate) revoked_by: String,
    #[serde(default)]
    pub(crate) reason: Option<String>,
    pub(crate) occurred_at: DateTime<Utc>,
}

/// Event: ConsentExpired (terminal, recorded explicitly).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentExpired {
    pub(crate) client_id: ClientId,
    pub(crate) consent_id: ConsentId,
    pub(crate) occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentEvent {
    ConsentGranted(ConsentGranted),
    ConsentUpdated(ConsentUpdated),
    ConsentExtended(ConsentExtended),
    ConsentRevoked(ConsentRevoked),
    ConsentExpired(ConsentExpired),
}

/// Blank optional text is treated as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConsentGranted {
    /// Build the grant fact for `grant`. Purpose and recipient are trimmed.
    pub fn new(grant: &GrantConsent) -> DomainResult<Self> {
        let event = Self {
            client_id: grant.client_id,
            consent_id: grant.consent_id,
            consent_type: grant.consent_type,
            purpose: grant.purpose.trim().to_string(),
            recipient_organization: grant.recipient_organization.trim().to_string(),
            recipient_contact: non_blank(grant.recipient_contact.clone()),
            granted_by: grant.granted_by.clone(),
            expires_at: grant.expires_at,
            is_vawa_protected: grant.is_vawa_protected,
            limitations: non_blank(grant.limitations.clone()),
            occurred_at: grant.occurred_at,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("purpose", &self.purpose)?;
        require_non_blank("granted_by", &self.granted_by)?;
        require_non_blank("recipient_organization", &self.recipient_organization)?;
        if let Some(expires_at) = self.expires_at {
            if expires_at <= self.occurred_at {
                return Err(DomainError::validation(
                    "expires_at must be later than the grant time",
                ));
            }
        }
        Ok(())
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn consent_id(&self) -> ConsentId {
        self.consent_id
    }

    pub fn consent_type(&self) -> ConsentType {
        self.consent_type
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn recipient_organization(&self) -> &str {
        &self.recipient_organization
    }

    pub fn recipient_contact(&self) -> Option<&str> {
        self.recipient_contact.as_deref()
    }

    pub fn granted_by(&self) -> &str {
        &self.granted_by
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_vawa_protected(&self) -> bool {
        self.is_vawa_protected
    }

    pub fn limitations(&self) -> Option<&str> {
        self.limitations.as_deref()
    }
}

impl ConsentUpdated {
    pub fn new(
        client_id: ClientId,
        consent_id: ConsentId,
        recipient_contact: Option<String>,
        limitations: Option<String>,
        updated_by: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let event = Self {
            client_id,
            consent_id,
            recipient_contact: non_blank(recipient_contact),
            limitations: non_blank(limitations),
            updated_by: updated_by.into(),
            occurred_at,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("updated_by", &self.updated_by)?;
        if self.recipient_contact.is_none() && self.limitations.is_none() {
            return Err(DomainError::validation(
                "update must change recipient_contact or limitations",
            ));
        }
        Ok(())
    }

    pub fn recipient_contact(&self) -> Option<&str> {
        self.recipient_contact.as_deref()
    }

    pub fn limitations(&self) -> Option<&str> {
        self.limitations.as_deref()
    }

    pub fn updated_by(&self) -> &str {
        &self.updated_by
    }
}

impl ConsentExtended {
    pub fn new(
        client_id: ClientId,
        consent_id: ConsentId,
        previous_expires_at: Option<DateTime<Utc>>,
        new_expires_at: DateTime<Utc>,
        extended_by: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let event = Self {
            client_id,
            consent_id,
            previous_expires_at,
            new_expires_at,
            extended_by: extended_by.into(),
            occurred_at,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("extended_by", &self.extended_by)?;
        if self.new_expires_at <= self.occurred_at {
            return Err(DomainError::validation(
                "new expiration date cannot be in the past",
            ));
        }
        Ok(())
    }

    pub fn previous_expires_at(&self) -> Option<DateTime<Utc>> {
        self.previous_expires_at
    }

    pub fn new_expires_at(&self) -> DateTime<Utc> {
        self.new_expires_at
    }

    pub fn extended_by(&self) -> &str {
        &self.extended_by
    }
}

impl ConsentRevoked {
    /// A blank `reason` is recorded as no reason.
    pub fn new(
        client_id: ClientId,
        consent_id: ConsentId,
        revoked_by: impl Into<String>,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let event = Self {
            client_id,
            consent_id,
            revoked_by: revoked_by.into(),
            reason: non_blank(reason),
            occurred_at,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> DomainResult<()> {
        require_non_blank("revoked_by", &self.revoked_by)
    }

    pub fn revoked_by(&self) -> &str {
        &self.revoked_by
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl ConsentExpired {
    pub fn new(client_id: ClientId, consent_id: ConsentId, occurred_at: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            client_id,
            consent_id,
            occurred_at,
        })
    }
}

impl ConsentEvent {
    pub fn client_id(&self) -> ClientId {
        match self {
            ConsentEvent::ConsentGranted(e) => e.client_id,
            ConsentEvent::ConsentUpdated(e) => e.client_id,
            ConsentEvent::ConsentExtended(e) => e.client_id,
            ConsentEvent::ConsentRevoked(e) => e.client_id,
            ConsentEvent::ConsentExpired(e) => e.client_id,
        }
    }

    pub fn consent_id(&self) -> ConsentId {
        match self {
            ConsentEvent::ConsentGranted(e) => e.consent_id,
            ConsentEvent::ConsentUpdated(e) => e.consent_id,
            ConsentEvent::ConsentExtended(e) => e.consent_id,
            ConsentEvent::ConsentRevoked(e) => e.consent_id,
            ConsentEvent::ConsentExpired(e) => e.consent_id,
        }
    }

    /// Field-level validation; says nothing about whether the transition is
    /// legal for a particular ledger.
    pub fn validate(&self) -> DomainResult<()> {
        match self {
            ConsentEvent::ConsentGranted(e) => e.validate(),
            ConsentEvent::ConsentUpdated(e) => e.validate(),
            ConsentEvent::ConsentExtended(e) => e.validate(),
            ConsentEvent::ConsentRevoked(e) => e.validate(),
            ConsentEvent::ConsentExpired(_) => Ok(()),
        }
    }
}

impl Event for ConsentEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "consent.granted",
        "consent.updated",
        "consent.extended",
        "consent.revoked",
        "consent.expired",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            ConsentEvent::ConsentGranted(_) => "consent.granted",
            ConsentEvent::ConsentUpdated(_) => "consent.updated",
            ConsentEvent::ConsentExtended(_) => "consent.extended",
            ConsentEvent::ConsentRevoked(_) => "consent.revoked",
            ConsentEvent::ConsentExpired(_) => "consent.expired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn subject_id(&self) -> AggregateId {
        self.client_id().into()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ConsentEvent::ConsentGranted(e) => e.occurred_at,
            ConsentEvent::ConsentUpdated(e) => e.occurred_at,
            ConsentEvent::ConsentExtended(e) => e.occurred_at,
            ConsentEvent::ConsentRevoked(e) => e.occurred_at,
            ConsentEvent::ConsentExpired(e) => e.occurred_at,
        }
    }
}
