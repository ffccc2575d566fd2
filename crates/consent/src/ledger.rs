use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sanctuary_core::{Aggregate, AggregateRoot, ClientId, ConsentId, DomainError};

use crate::event::{
    ConsentEvent, ConsentExpired, ConsentExtended, ConsentGranted, ConsentRevoked, ConsentUpdated,
};
use crate::record::{ConsentRecord, ConsentStatus, ConsentStatusView, ConsentType};

/// Stream type recorded alongside every stored consent event.
pub const AGGREGATE_TYPE: &str = "consent.ledger";

/// Aggregate root: one client's consent ledger.
///
/// Every field is derived by folding events; nothing is set directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentLedger {
    client_id: ClientId,
    consents: BTreeMap<ConsentId, ConsentRecord>,
    /// Consent ids in grant order (most recent last).
    grant_order: Vec<ConsentId>,
    version: u64,
}

impl ConsentLedger {
    /// Create an empty ledger for rehydration.
    pub fn empty(client_id: ClientId) -> Self {
        Self {
            client_id,
            consents: BTreeMap::new(),
            grant_order: Vec::new(),
            version: 0,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn record(&self, consent_id: ConsentId) -> Option<&ConsentRecord> {
        self.consents.get(&consent_id)
    }

    /// All grants, oldest first.
    pub fn records(&self) -> impl DoubleEndedIterator<Item = &ConsentRecord> {
        self.grant_order.iter().filter_map(|id| self.consents.get(id))
    }

    /// Status of one consent; `NotGranted` when the ledger has never seen it.
    pub fn status_of(&self, consent_id: ConsentId, as_of: DateTime<Utc>) -> ConsentStatus {
        self.record(consent_id)
            .map(|r| r.effective_status(as_of))
            .unwrap_or(ConsentStatus::NotGranted)
    }

    /// Status of the most recent grant for `purpose`.
    pub fn status_for_purpose(&self, purpose: &str, as_of: DateTime<Utc>) -> ConsentStatusView {
        self.latest_matching(|r| same_text(&r.purpose, purpose))
            .map(|r| ConsentStatusView::of(r, as_of))
            .unwrap_or_else(ConsentStatusView::not_granted)
    }

    /// Status of the most recent grant for `purpose` naming `recipient_organization`.
    pub fn status_for_recipient(
        &self,
        purpose: &str,
        recipient_organization: &str,
        as_of: DateTime<Utc>,
    ) -> ConsentStatusView {
        self.latest_matching(|r| {
            same_text(&r.purpose, purpose)
                && same_text(&r.recipient_organization, recipient_organization)
        })
        .map(|r| ConsentStatusView::of(r, as_of))
        .unwrap_or_else(ConsentStatusView::not_granted)
    }

    /// Grants in effect at `as_of`.
    pub fn active_consents(&self, as_of: DateTime<Utc>) -> Vec<&ConsentRecord> {
        self.records()
            .filter(|r| r.effective_status(as_of).is_active())
            .collect()
    }

    fn latest_matching(&self, pred: impl Fn(&ConsentRecord) -> bool) -> Option<&ConsentRecord> {
        self.grant_order
            .iter()
            .rev()
            .filter_map(|id| self.consents.get(id))
            .find(|r| pred(*r))
    }
}

/// Purpose/recipient comparison: surrounding whitespace and case are ignored.
fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl AggregateRoot for ConsentLedger {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.client_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: GrantConsent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConsent {
    pub client_id: ClientId,
    pub consent_id: ConsentId,
    pub consent_type: ConsentType,
    pub purpose: String,
    pub recipient_organization: String,
    pub recipient_contact: Option<String>,
    pub granted_by: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_vawa_protected: bool,
    pub limitations: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RevokeConsent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeConsent {
    pub client_id: ClientId,
    pub consent_id: ConsentId,
    pub revoked_by: String,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateConsent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConsent {
    pub client_id: ClientId,
    pub consent_id: ConsentId,
    /// New recipient contact (if None, keep existing).
    pub recipient_contact: Option<String>,
    /// New limitations (if None, keep existing).
    pub limitations: Option<String>,
    pub updated_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ExtendConsent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendConsent {
    pub client_id: ClientId,
    pub consent_id: ConsentId,
    pub new_expires_at: DateTime<Utc>,
    pub extended_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ExpireConsent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireConsent {
    pub client_id: ClientId,
    pub consent_id: ConsentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentCommand {
    Grant(GrantConsent),
    Revoke(RevokeConsent),
    Update(UpdateConsent),
    Extend(ExtendConsent),
    Expire(ExpireConsent),
}

impl ConsentCommand {
    pub fn client_id(&self) -> ClientId {
        match self {
            ConsentCommand::Grant(c) => c.client_id,
            ConsentCommand::Revoke(c) => c.client_id,
            ConsentCommand::Update(c) => c.client_id,
            ConsentCommand::Extend(c) => c.client_id,
            ConsentCommand::Expire(c) => c.client_id,
        }
    }
}

impl Aggregate for ConsentLedger {
    type Command = ConsentCommand;
    type Event = ConsentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ConsentEvent::ConsentGranted(e) => {
                self.consents.insert(
                    e.consent_id,
                    ConsentRecord {
                        consent_id: e.consent_id,
                        client_id: e.client_id,
                        consent_type: e.consent_type,
                        purpose: e.purpose.clone(),
                        recipient_organization: e.recipient_organization.clone(),
                        recipient_contact: e.recipient_contact.clone(),
                        granted_by: e.granted_by.clone(),
                        granted_at: e.occurred_at,
                        expires_at: e.expires_at,
                        revoked_at: None,
                        revoked_by: None,
                        revocation_reason: None,
                        expired_at: None,
                        updated_at: None,
                        is_vawa_protected: e.is_vawa_protected,
                        limitations: e.limitations.clone(),
                    },
                );
                self.grant_order.push(e.consent_id);
            }
            ConsentEvent::ConsentUpdated(e) => {
                if let Some(record) = self.consents.get_mut(&e.consent_id) {
                    if let Some(contact) = &e.recipient_contact {
                        record.recipient_contact = Some(contact.clone());
                    }
                    if let Some(limitations) = &e.limitations {
                        record.limitations = Some(limitations.clone());
                    }
                    record.updated_at = Some(e.occurred_at);
                }
            }
            ConsentEvent::ConsentRevoked(e) => {
                if let Some(record) = self.consents.get_mut(&e.consent_id) {
                    record.revoked_at = Some(e.occurred_at);
                    record.revoked_by = Some(e.revoked_by.clone());
                    record.revocation_reason = e.reason.clone();
                }
            }
            ConsentEvent::ConsentExtended(e) => {
                if let Some(record) = self.consents.get_mut(&e.consent_id) {
                    record.expires_at = Some(e.new_expires_at);
                    record.updated_at = Some(e.occurred_at);
                }
            }
            ConsentEvent::ConsentExpired(e) => {
                if let Some(record) = self.consents.get_mut(&e.consent_id) {
                    record.expired_at = Some(e.occurred_at);
                }
            }
        }

        // +1 per applied event.
        self.version += 1;
    }

    fn ensure_applicable(&self, event: &Self::Event) -> Result<(), Self::Error> {
        event.validate()?;
        if event.client_id() != self.client_id {
            return Err(DomainError::invariant("client_id mismatch"));
        }

        match event {
            ConsentEvent::ConsentGranted(e) => {
                if self.consents.contains_key(&e.consent_id) {
                    return Err(DomainError::conflict("consent already granted"));
                }
                Ok(())
            }
            ConsentEvent::ConsentUpdated(e) => {
                let record = self.existing(e.consent_id)?;
                if record.effective_status(e.occurred_at) != ConsentStatus::Granted {
                    return Err(DomainError::conflict("only a granted consent can be updated"));
                }
                ensure_not_before_grant(record, e.occurred_at)
            }
            ConsentEvent::ConsentExtended(e) => {
                let record = self.existing(e.consent_id)?;
                if record.effective_status(e.occurred_at) != ConsentStatus::Granted {
                    return Err(DomainError::conflict("only a granted consent can be extended"));
                }
                if record.expires_at != e.previous_expires_at {
                    return Err(DomainError::conflict("extension was decided against a stale expiry"));
                }
                ensure_not_before_grant(record, e.occurred_at)
            }
            ConsentEvent::ConsentRevoked(e) => {
                let record = self.existing(e.consent_id)?;
                if record.is_revoked() {
                    return Err(DomainError::conflict("consent is already revoked"));
                }
                if record.expired_at.is_some() {
                    return Err(DomainError::conflict("consent has already expired"));
                }
                ensure_not_before_grant(record, e.occurred_at)
            }
            ConsentEvent::ConsentExpired(e) => {
                let record = self.existing(e.consent_id)?;
                if record.is_terminal() {
                    return Err(DomainError::conflict("consent is no longer granted"));
                }
                match record.expires_at {
                    Some(expires_at) if expires_at <= e.occurred_at => Ok(()),
                    Some(_) => Err(DomainError::invariant("consent has not reached expires_at")),
                    None => Err(DomainError::invariant("consent has no expiry date")),
                }
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let event = match command {
            ConsentCommand::Grant(cmd) => ConsentEvent::ConsentGranted(ConsentGranted::new(cmd)?),
            ConsentCommand::Revoke(cmd) => ConsentEvent::ConsentRevoked(ConsentRevoked::new(
                cmd.client_id,
                cmd.consent_id,
                cmd.revoked_by.clone(),
                cmd.reason.clone(),
                cmd.occurred_at,
            )?),
            ConsentCommand::Update(cmd) => ConsentEvent::ConsentUpdated(ConsentUpdated::new(
                cmd.client_id,
                cmd.consent_id,
                cmd.recipient_contact.clone(),
                cmd.limitations.clone(),
                cmd.updated_by.clone(),
                cmd.occurred_at,
            )?),
            ConsentCommand::Extend(cmd) => {
                let previous = self.consents.get(&cmd.consent_id).and_then(|r| r.expires_at);
                ConsentEvent::ConsentExtended(ConsentExtended::new(
                    cmd.client_id,
                    cmd.consent_id,
                    previous,
                    cmd.new_expires_at,
                    cmd.extended_by.clone(),
                    cmd.occurred_at,
                )?)
            }
            ConsentCommand::Expire(cmd) => ConsentEvent::ConsentExpired(ConsentExpired::new(
                cmd.client_id,
                cmd.consent_id,
                cmd.occurred_at,
            )?),
        };

        self.ensure_applicable(&event)?;
        Ok(vec![event])
    }
}

impl ConsentLedger {
    fn existing(&self, consent_id: ConsentId) -> Result<&ConsentRecord, DomainError> {
        self.consents.get(&consent_id).ok_or_else(DomainError::not_found)
    }
}

fn ensure_not_before_grant(record: &ConsentRecord, at: DateTime<Utc>) -> Result<(), DomainError> {
    if at < record.granted_at {
        return Err(DomainError::invariant("transition predates the grant"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use sanctuary_core::reconstruct;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(n)
    }

    fn grant_cmd(client_id: ClientId, consent_id: ConsentId, expires_at: Option<DateTime<Utc>>) -> ConsentCommand {
        ConsentCommand::Grant(GrantConsent {
            client_id,
            consent_id,
            consent_type: ConsentType::ReleaseOfInformation,
            purpose: "housing referral".to_string(),
            recipient_organization: "Riverside Housing".to_string(),
            recipient_contact: Some("referrals@riverside.example".to_string()),
            granted_by: "client".to_string(),
            expires_at,
            is_vawa_protected: true,
            limitations: None,
            occurred_at: day(0),
        })
    }

    fn revoke_cmd(client_id: ClientId, consent_id: ConsentId, at: DateTime<Utc>) -> ConsentCommand {
        ConsentCommand::Revoke(RevokeConsent {
            client_id,
            consent_id,
            revoked_by: "client".to_string(),
            reason: Some("client request".to_string()),
            occurred_at: at,
        })
    }

    fn run(ledger: &mut ConsentLedger, cmd: ConsentCommand) -> Result<Vec<ConsentEvent>, DomainError> {
        let events = ledger.handle(&cmd)?;
        for e in &events {
            ledger.apply(e);
        }
        Ok(events)
    }

    #[test]
    fn grant_emits_event_and_creates_record() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);

        let events = run(&mut ledger, grant_cmd(client, consent, None)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ConsentEvent::ConsentGranted(_)));

        let record = ledger.record(consent).unwrap();
        assert_eq!(record.granted_at, day(0));
        assert_eq!(ledger.status_of(consent, day(1)), ConsentStatus::Granted);
        assert_eq!(ledger.version(), 1);
    }

    #[test]
    fn grant_rejects_blank_purpose() {
        let client = ClientId::new();
        let ledger = ConsentLedger::empty(client);
        let mut cmd = grant_cmd(client, ConsentId::new(), None);
        if let ConsentCommand::Grant(g) = &mut cmd {
            g.purpose = "   ".to_string();
        }

        let err = ledger.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn grant_rejects_duplicate_consent_id() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();

        let err = ledger.handle(&grant_cmd(client, consent, None)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn command_for_another_client_is_rejected() {
        let ledger = ConsentLedger::empty(ClientId::new());
        let err = ledger
            .handle(&grant_cmd(ClientId::new(), ConsentId::new(), None))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn grant_then_expiry_without_revoke_is_expired() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, Some(day(30)))).unwrap();

        let view = ledger.status_for_purpose("housing referral", day(31));
        assert_eq!(view.status, ConsentStatus::Expired);
        assert_eq!(view.record.unwrap().consent_id, consent);
    }

    #[test]
    fn revoke_takes_precedence_over_expiry() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, Some(day(30)))).unwrap();
        run(&mut ledger, revoke_cmd(client, consent, day(5))).unwrap();

        assert_eq!(ledger.status_of(consent, day(10)), ConsentStatus::Revoked);
        assert_eq!(ledger.status_of(consent, day(45)), ConsentStatus::Revoked);

        let record = ledger.record(consent).unwrap();
        assert_eq!(record.revocation_reason.as_deref(), Some("client request"));
        assert_eq!(record.revoked_at, Some(day(5)));
    }

    #[test]
    fn revoking_twice_is_rejected() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();
        run(&mut ledger, revoke_cmd(client, consent, day(5))).unwrap();

        let err = ledger.handle(&revoke_cmd(client, consent, day(6))).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn revoking_a_never_granted_consent_is_rejected() {
        let client = ClientId::new();
        let ledger = ConsentLedger::empty(client);
        let err = ledger
            .handle(&revoke_cmd(client, ConsentId::new(), day(1)))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn revoke_requires_identity() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();

        let cmd = ConsentCommand::Revoke(RevokeConsent {
            client_id: client,
            consent_id: consent,
            revoked_by: " ".to_string(),
            reason: Some("client request".to_string()),
            occurred_at: day(2),
        });
        assert!(matches!(ledger.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn revoke_without_reason_is_accepted() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();

        let cmd = ConsentCommand::Revoke(RevokeConsent {
            client_id: client,
            consent_id: consent,
            revoked_by: "client".to_string(),
            reason: None,
            occurred_at: day(2),
        });
        run(&mut ledger, cmd).unwrap();
        let record = ledger.record(consent).unwrap();
        assert_eq!(record.revocation_reason, None);
        assert_eq!(ledger.status_of(consent, day(3)), ConsentStatus::Revoked);
    }

    fn extend_cmd(client_id: ClientId, consent_id: ConsentId, to: i64, at: i64) -> ConsentCommand {
        ConsentCommand::Extend(ExtendConsent {
            client_id,
            consent_id,
            new_expires_at: day(to),
            extended_by: "advocate".to_string(),
            occurred_at: day(at),
        })
    }

    #[test]
    fn extend_moves_expiry_and_keeps_consent_granted() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, Some(day(30)))).unwrap();

        let events = run(&mut ledger, extend_cmd(client, consent, 120, 25)).unwrap();
        match &events[0] {
            ConsentEvent::ConsentExtended(e) => {
                assert_eq!(e.previous_expires_at(), Some(day(30)));
                assert_eq!(e.new_expires_at(), day(120));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(ledger.status_of(consent, day(60)), ConsentStatus::Granted);
        assert_eq!(ledger.record(consent).unwrap().expires_at, Some(day(120)));
    }

    #[test]
    fn extend_is_refused_unless_granted_and_in_the_future() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, Some(day(30)))).unwrap();

        // New date already passed.
        assert!(matches!(
            ledger.handle(&extend_cmd(client, consent, 10, 12)),
            Err(DomainError::Validation(_))
        ));
        // Lapsed consents cannot be revived by extension.
        assert!(matches!(
            ledger.handle(&extend_cmd(client, consent, 90, 31)),
            Err(DomainError::Conflict(_))
        ));

        run(&mut ledger, revoke_cmd(client, consent, day(5))).unwrap();
        assert!(matches!(
            ledger.handle(&extend_cmd(client, consent, 90, 6)),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(
            ledger.handle(&extend_cmd(client, ConsentId::new(), 90, 6)).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn update_changes_limitations_without_changing_status() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();

        run(
            &mut ledger,
            ConsentCommand::Update(UpdateConsent {
                client_id: client,
                consent_id: consent,
                recipient_contact: None,
                limitations: Some("no address disclosure".to_string()),
                updated_by: "advocate".to_string(),
                occurred_at: day(3),
            }),
        )
        .unwrap();

        let record = ledger.record(consent).unwrap();
        assert_eq!(record.limitations.as_deref(), Some("no address disclosure"));
        assert_eq!(
            record.recipient_contact.as_deref(),
            Some("referrals@riverside.example")
        );
        assert_eq!(ledger.status_of(consent, day(4)), ConsentStatus::Granted);
    }

    #[test]
    fn update_after_revoke_is_rejected() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();
        run(&mut ledger, revoke_cmd(client, consent, day(1))).unwrap();

        let cmd = ConsentCommand::Update(UpdateConsent {
            client_id: client,
            consent_id: consent,
            recipient_contact: Some("new@riverside.example".to_string()),
            limitations: None,
            updated_by: "advocate".to_string(),
            occurred_at: day(2),
        });
        assert!(matches!(ledger.handle(&cmd), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn explicit_expiry_requires_reached_expiry_date() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, Some(day(30)))).unwrap();

        let early = ConsentCommand::Expire(ExpireConsent {
            client_id: client,
            consent_id: consent,
            occurred_at: day(10),
        });
        assert!(ledger.handle(&early).is_err());

        let on_time = ConsentCommand::Expire(ExpireConsent {
            client_id: client,
            consent_id: consent,
            occurred_at: day(30),
        });
        run(&mut ledger, on_time).unwrap();
        assert_eq!(ledger.status_of(consent, day(30)), ConsentStatus::Expired);

        // Terminal: no revoke after a recorded expiry.
        assert!(ledger.handle(&revoke_cmd(client, consent, day(31))).is_err());
    }

    #[test]
    fn most_recent_grant_for_purpose_wins() {
        let client = ClientId::new();
        let first = ConsentId::new();
        let second = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, first, None)).unwrap();
        run(&mut ledger, revoke_cmd(client, first, day(2))).unwrap();
        run(&mut ledger, grant_cmd(client, second, None)).unwrap();

        let view = ledger.status_for_purpose("Housing Referral ", day(3));
        assert_eq!(view.status, ConsentStatus::Granted);
        assert_eq!(view.record.unwrap().consent_id, second);
        assert_eq!(ledger.active_consents(day(3)).len(), 1);
    }

    #[test]
    fn unknown_purpose_is_not_granted() {
        let ledger = ConsentLedger::empty(ClientId::new());
        let view = ledger.status_for_recipient("research", "State University", day(0));
        assert_eq!(view, ConsentStatusView::not_granted());
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let client = ClientId::new();
        let consent = ConsentId::new();
        let mut ledger = ConsentLedger::empty(client);
        run(&mut ledger, grant_cmd(client, consent, None)).unwrap();
        let before = ledger.clone();

        let _ = ledger.handle(&revoke_cmd(client, consent, day(1))).unwrap();
        assert_eq!(ledger, before);
    }

    #[test]
    fn replay_rejects_revoke_without_grant() {
        let client = ClientId::new();
        let history = vec![ConsentEvent::ConsentRevoked(
            ConsentRevoked::new(client, ConsentId::new(), "client", Some("client request".into()), day(1)).unwrap(),
        )];
        assert!(reconstruct(ConsentLedger::empty(client), &history).is_err());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Grant(u8, Option<i64>),
        Revoke(u8, i64),
        Update(u8, i64),
        Extend(u8, i64, i64),
        Expire(u8, i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, prop::option::of(1i64..60)).prop_map(|(slot, exp)| Op::Grant(slot, exp)),
            (0u8..4, 0i64..90).prop_map(|(slot, at)| Op::Revoke(slot, at)),
            (0u8..4, 0i64..90).prop_map(|(slot, at)| Op::Update(slot, at)),
            (0u8..4, 0i64..90, 1i64..90).prop_map(|(slot, at, by)| Op::Extend(slot, at, by)),
            (0u8..4, 0i64..90).prop_map(|(slot, at)| Op::Expire(slot, at)),
        ]
    }

    fn to_command(client: ClientId, ids: &[ConsentId], op: &Op) -> ConsentCommand {
        match *op {
            Op::Grant(slot, exp) => {
                grant_cmd(client, ids[slot as usize], exp.map(day))
            }
            Op::Revoke(slot, at) => revoke_cmd(client, ids[slot as usize], day(at)),
            Op::Update(slot, at) => ConsentCommand::Update(UpdateConsent {
                client_id: client,
                consent_id: ids[slot as usize],
                recipient_contact: None,
                limitations: Some(format!("limit-{at}")),
                updated_by: "advocate".to_string(),
                occurred_at: day(at),
            }),
            Op::Extend(slot, at, by) => extend_cmd(client, ids[slot as usize], at + by, at),
            Op::Expire(slot, at) => ConsentCommand::Expire(ExpireConsent {
                client_id: client,
                consent_id: ids[slot as usize],
                occurred_at: day(at),
            }),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: replaying the accepted history twice yields equal ledgers,
        /// both equal to the ledger the history was produced from.
        #[test]
        fn reconstruction_is_deterministic(ops in prop::collection::vec(op_strategy(), 0..24)) {
            let client = ClientId::new();
            let ids: Vec<ConsentId> = (0..4).map(|_| ConsentId::new()).collect();
            let mut live = ConsentLedger::empty(client);
            let mut history = Vec::new();

            for op in &ops {
                if let Ok(events) = run(&mut live, to_command(client, &ids, op)) {
                    history.extend(events);
                }
            }

            let a = reconstruct(ConsentLedger::empty(client), &history).unwrap();
            let b = reconstruct(ConsentLedger::empty(client), &history).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a, &live);
            prop_assert_eq!(a.version(), history.len() as u64);
        }

        /// Property: once revoked, a consent reports REVOKED at every later instant.
        #[test]
        fn revoked_stays_revoked(revoke_day in 0i64..30, query_offset in 0i64..400, exp in prop::option::of(1i64..60)) {
            let client = ClientId::new();
            let consent = ConsentId::new();
            let mut ledger = ConsentLedger::empty(client);
            run(&mut ledger, grant_cmd(client, consent, exp.map(day))).unwrap();
            run(&mut ledger, revoke_cmd(client, consent, day(revoke_day))).unwrap();

            prop_assert_eq!(
                ledger.status_of(consent, day(revoke_day + query_offset)),
                ConsentStatus::Revoked
            );
        }
    }
}
