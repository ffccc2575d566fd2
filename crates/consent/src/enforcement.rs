//! Consent enforcement queries over one client's ledger.
//!
//! Everything here is read-only and takes `as_of` explicitly.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use sanctuary_core::ConsentId;

use crate::ledger::ConsentLedger;
use crate::record::{ConsentRecord, ConsentType};

/// Consents expiring within this many days need renewal.
pub const RENEWAL_WINDOW_DAYS: i64 = 30;

/// Outcome of checking an operation against the client's consents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConsentValidation {
    Allowed {
        /// Grants that satisfied each required consent type, in order.
        consent_ids: Vec<ConsentId>,
    },
    Denied {
        missing: ConsentType,
        reason: String,
    },
}

impl ConsentValidation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ConsentValidation::Allowed { .. })
    }
}

/// Counts and lists describing a client's consents at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentSummary {
    pub total: usize,
    pub active: Vec<ConsentRecord>,
    pub expiring: Vec<ConsentRecord>,
    pub has_vawa_protected: bool,
}

impl ConsentLedger {
    /// Check that `operation` towards `recipient_organization` is covered by
    /// a valid grant of every type in `required`.
    ///
    /// An empty `required` list means the operation needs no consent.
    pub fn validate_operation(
        &self,
        operation: &str,
        recipient_organization: &str,
        required: &[ConsentType],
        as_of: DateTime<Utc>,
    ) -> ConsentValidation {
        let mut consent_ids = Vec::with_capacity(required.len());
        for kind in required {
            let found = self
                .records()
                .rev()
                .filter(|r| r.consent_type == *kind)
                .find(|r| r.authorizes(operation, recipient_organization, as_of));
            match found {
                Some(record) => consent_ids.push(record.consent_id),
                None => {
                    return ConsentValidation::Denied {
                        missing: *kind,
                        reason: format!(
                            "missing valid {kind:?} consent for '{operation}' to {recipient_organization}"
                        ),
                    };
                }
            }
        }
        ConsentValidation::Allowed { consent_ids }
    }

    /// Active grants of `kind` at `as_of`, for any recipient.
    pub fn has_active(&self, kind: ConsentType, as_of: DateTime<Utc>) -> bool {
        self.records()
            .any(|r| r.consent_type == kind && r.is_valid_for_use(as_of))
    }

    /// Active grants whose `expires_at` falls within `window` after `as_of`.
    pub fn requiring_renewal(&self, as_of: DateTime<Utc>, window: Duration) -> Vec<&ConsentRecord> {
        let horizon = as_of + window;
        self.records()
            .filter(|r| r.is_valid_for_use(as_of))
            .filter(|r| matches!(r.expires_at, Some(at) if at <= horizon))
            .collect()
    }

    /// Grants past `expires_at` at `as_of` with no expiry fact recorded yet.
    pub fn overdue(&self, as_of: DateTime<Utc>) -> Vec<ConsentId> {
        self.records()
            .filter(|r| !r.is_terminal())
            .filter(|r| matches!(r.expires_at, Some(at) if at < as_of))
            .map(|r| r.consent_id)
            .collect()
    }

    pub fn has_vawa_protected(&self, as_of: DateTime<Utc>) -> bool {
        self.records()
            .any(|r| r.is_vawa_protected && r.is_valid_for_use(as_of))
    }

    pub fn summary(&self, as_of: DateTime<Utc>) -> ConsentSummary {
        let active: Vec<ConsentRecord> = self.active_consents(as_of).into_iter().cloned().collect();
        let expiring = self
            .requiring_renewal(as_of, Duration::days(RENEWAL_WINDOW_DAYS))
            .into_iter()
            .cloned()
            .collect();
        ConsentSummary {
            total: self.records().count(),
            has_vawa_protected: active.iter().any(|r| r.is_vawa_protected),
            active,
            expiring,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sanctuary_core::{Aggregate, ClientId};

    use crate::ledger::{ConsentCommand, GrantConsent, RevokeConsent};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::days(n)
    }

    fn grant(
        client_id: ClientId,
        kind: ConsentType,
        recipient: &str,
        expires_at: Option<DateTime<Utc>>,
        vawa: bool,
    ) -> (ConsentId, ConsentCommand) {
        let consent_id = ConsentId::new();
        let cmd = ConsentCommand::Grant(GrantConsent {
            client_id,
            consent_id,
            consent_type: kind,
            purpose: format!("{kind:?}"),
            recipient_organization: recipient.to_string(),
            recipient_contact: None,
            granted_by: "client".to_string(),
            expires_at,
            is_vawa_protected: vawa,
            limitations: None,
            occurred_at: day(0),
        });
        (consent_id, cmd)
    }

    fn run(ledger: &mut ConsentLedger, cmd: ConsentCommand) {
        for e in ledger.handle(&cmd).unwrap() {
            ledger.apply(&e);
        }
    }

    #[test]
    fn operation_needs_every_required_type() {
        let client = ClientId::new();
        let mut ledger = ConsentLedger::empty(client);
        let (hmis, cmd) = grant(client, ConsentType::HmisParticipation, "HMIS", None, false);
        run(&mut ledger, cmd);

        let denied = ledger.validate_operation(
            "hmis export",
            "HMIS",
            &[ConsentType::HmisParticipation, ConsentType::InformationSharing],
            day(1),
        );
        assert!(matches!(
            denied,
            ConsentValidation::Denied { missing: ConsentType::InformationSharing, .. }
        ));

        let (sharing, cmd) = grant(client, ConsentType::InformationSharing, "hmis", None, false);
        run(&mut ledger, cmd);
        let allowed = ledger.validate_operation(
            "hmis export",
            "HMIS",
            &[ConsentType::HmisParticipation, ConsentType::InformationSharing],
            day(1),
        );
        assert_eq!(allowed, ConsentValidation::Allowed { consent_ids: vec![hmis, sharing] });
    }

    #[test]
    fn no_required_types_is_allowed() {
        let ledger = ConsentLedger::empty(ClientId::new());
        assert!(ledger.validate_operation("view", "anyone", &[], day(0)).is_allowed());
    }

    #[test]
    fn revoked_grant_no_longer_authorizes() {
        let client = ClientId::new();
        let mut ledger = ConsentLedger::empty(client);
        let (court, cmd) = grant(client, ConsentType::CourtDisclosure, "County Court", None, true);
        run(&mut ledger, cmd);
        assert!(ledger.has_active(ConsentType::CourtDisclosure, day(1)));

        run(
            &mut ledger,
            ConsentCommand::Revoke(RevokeConsent {
                client_id: client,
                consent_id: court,
                revoked_by: "client".to_string(),
                reason: None,
                occurred_at: day(2),
            }),
        );
        let outcome = ledger.validate_operation("court testimony", "County Court", &[ConsentType::CourtDisclosure], day(3));
        assert!(!outcome.is_allowed());
        assert!(!ledger.has_active(ConsentType::CourtDisclosure, day(3)));
        assert!(!ledger.has_vawa_protected(day(3)));
    }

    #[test]
    fn renewal_and_overdue_windows() {
        let client = ClientId::new();
        let mut ledger = ConsentLedger::empty(client);
        let (soon, cmd) = grant(client, ConsentType::Research, "State University", Some(day(20)), false);
        run(&mut ledger, cmd);
        let (_later, cmd) = grant(client, ConsentType::Research, "State University", Some(day(90)), false);
        run(&mut ledger, cmd);
        let (_open, cmd) = grant(client, ConsentType::InformationSharing, "Harbor", None, true);
        run(&mut ledger, cmd);

        let renew: Vec<_> = ledger
            .requiring_renewal(day(1), Duration::days(RENEWAL_WINDOW_DAYS))
            .iter()
            .map(|r| r.consent_id)
            .collect();
        assert_eq!(renew, vec![soon]);

        assert!(ledger.overdue(day(20)).is_empty());
        assert_eq!(ledger.overdue(day(21)), vec![soon]);
    }

    #[test]
    fn summary_counts_active_expiring_and_vawa() {
        let client = ClientId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant(client, ConsentType::Research, "Uni", Some(day(10)), false).1);
        run(&mut ledger, grant(client, ConsentType::CourtDisclosure, "Court", None, true).1);

        let summary = ledger.summary(day(1));
        assert_eq!(summary.total, 2);
        assert_eq!(summary.active.len(), 2);
        assert_eq!(summary.expiring.len(), 1);
        assert!(summary.has_vawa_protected);

        let later = ledger.summary(day(11));
        assert_eq!(later.active.len(), 1);
        assert!(later.expiring.is_empty());
    }
}
