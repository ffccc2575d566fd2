//! Application service over per-client consent ledgers.
//!
//! Writes go through the [`CommandDispatcher`]; a concurrency conflict is
//! retried by reloading the ledger and re-deciding, up to
//! `max_conflict_retries` times. Reads always rebuild the ledger from the
//! stream.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;

use sanctuary_auth::{Claims, validate_claims};
use sanctuary_consent::{
    ConsentCommand, ConsentEvent, ConsentLedger, ConsentRecord, ConsentStatusView,
    ConsentSummary, ConsentType, ConsentValidation, ExpireConsent, ExtendConsent, GrantConsent,
    RENEWAL_WINDOW_DAYS, RevokeConsent, UpdateConsent,
};
use sanctuary_core::{ClientId, Clock, DomainError, SystemClock, TenantId};
use sanctuary_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::disclosure::{ConsentBackedPermission, DisclosureError, consent_backed_permission};
use crate::event_store::{EventStore, StoredEvent, StreamId};

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentServiceConfig {
    /// Extra attempts after the first when an append loses a version race.
    pub max_conflict_retries: u32,
}

impl Default for ConsentServiceConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

#[derive(Debug)]
pub struct ConsentService<S, B, C = SystemClock> {
    dispatcher: CommandDispatcher<S, B>,
    clock: C,
    config: ConsentServiceConfig,
}

impl<S, B> ConsentService<S, B, SystemClock> {
    pub fn new(store: S, bus: B) -> Self {
        Self::with_clock(store, bus, SystemClock, ConsentServiceConfig::default())
    }
}

impl<S, B, C> ConsentService<S, B, C> {
    pub fn with_clock(store: S, bus: B, clock: C, config: ConsentServiceConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            clock,
            config,
        }
    }

    pub fn config(&self) -> ConsentServiceConfig {
        self.config
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }
}

impl<S, B, C> ConsentService<S, B, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    C: Clock,
{
    /// Append an already-built consent event to the client's ledger.
    ///
    /// The event is admitted against the current ledger first, so illegal
    /// transitions (revoking twice, updating a revoked consent) are refused.
    pub fn record_consent_event(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        event: ConsentEvent,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        if event.client_id() != client_id {
            return Err(DomainError::invariant("event belongs to a different client").into());
        }
        self.with_retry("record", || {
            self.dispatcher.append_event(
                StreamId::consent_ledger(tenant_id, client_id),
                event.clone(),
                ConsentLedger::empty(client_id),
            )
        })
    }

    /// Rebuild the client's ledger from its stream.
    pub fn ledger(&self, tenant_id: TenantId, client_id: ClientId) -> Result<ConsentLedger, DispatchError> {
        let sourced = self
            .dispatcher
            .load(StreamId::consent_ledger(tenant_id, client_id), ConsentLedger::empty(client_id))?;
        Ok(sourced.into_aggregate())
    }

    /// Status of the most recent grant for `purpose` as of `as_of`.
    pub fn current_consent_status(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        purpose: &str,
        as_of: DateTime<Utc>,
    ) -> Result<ConsentStatusView, DispatchError> {
        let view = self.ledger(tenant_id, client_id)?.status_for_purpose(purpose, as_of);
        tracing::debug!(
            tenant_id = %tenant_id,
            client_id = %client_id,
            status = ?view.status,
            "consent status resolved"
        );
        Ok(view)
    }

    /// [`current_consent_status`](Self::current_consent_status) at the
    /// service clock's current time.
    pub fn consent_status_now(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        purpose: &str,
    ) -> Result<ConsentStatusView, DispatchError> {
        self.current_consent_status(tenant_id, client_id, purpose, self.clock.now())
    }

    pub fn grant(&self, tenant_id: TenantId, command: GrantConsent) -> Result<Vec<StoredEvent>, DispatchError> {
        self.execute(tenant_id, ConsentCommand::Grant(command))
    }

    pub fn revoke(&self, tenant_id: TenantId, command: RevokeConsent) -> Result<Vec<StoredEvent>, DispatchError> {
        self.execute(tenant_id, ConsentCommand::Revoke(command))
    }

    pub fn update(&self, tenant_id: TenantId, command: UpdateConsent) -> Result<Vec<StoredEvent>, DispatchError> {
        self.execute(tenant_id, ConsentCommand::Update(command))
    }

    pub fn extend(&self, tenant_id: TenantId, command: ExtendConsent) -> Result<Vec<StoredEvent>, DispatchError> {
        self.execute(tenant_id, ConsentCommand::Extend(command))
    }

    pub fn expire(&self, tenant_id: TenantId, command: ExpireConsent) -> Result<Vec<StoredEvent>, DispatchError> {
        self.execute(tenant_id, ConsentCommand::Expire(command))
    }

    /// The caller's permission for one client's record, with every scope
    /// the client's ledger does not back at `as_of` removed.
    ///
    /// Claims are checked against `as_of` first; a ledger that cannot be
    /// rebuilt yields an error, never a wider permission.
    pub fn effective_permission(
        &self,
        claims: &Claims,
        client_id: ClientId,
        as_of: DateTime<Utc>,
    ) -> Result<ConsentBackedPermission, DisclosureError> {
        validate_claims(claims, as_of)?;
        let ledger = self.ledger(claims.tenant_id, client_id)?;
        let backed = consent_backed_permission(claims, &ledger, as_of);
        tracing::debug!(
            tenant_id = %claims.tenant_id,
            client_id = %client_id,
            unbacked = backed.unbacked_scopes.len(),
            default_level = ?backed.build.permission.default_redaction_level(),
            "consent-backed permission computed"
        );
        Ok(backed)
    }

    /// Check an outbound operation against the client's consents.
    pub fn validate_operation(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        operation: &str,
        recipient_organization: &str,
        required: &[ConsentType],
        as_of: DateTime<Utc>,
    ) -> Result<ConsentValidation, DispatchError> {
        let outcome = self
            .ledger(tenant_id, client_id)?
            .validate_operation(operation, recipient_organization, required, as_of);
        if let ConsentValidation::Denied { missing, .. } = &outcome {
            tracing::info!(
                tenant_id = %tenant_id,
                client_id = %client_id,
                operation,
                missing = ?missing,
                "operation denied for missing consent"
            );
        }
        Ok(outcome)
    }

    /// Active consents that lapse within the renewal window of now.
    pub fn consents_requiring_renewal(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
    ) -> Result<Vec<ConsentRecord>, DispatchError> {
        let ledger = self.ledger(tenant_id, client_id)?;
        Ok(ledger
            .requiring_renewal(self.clock.now(), Duration::days(RENEWAL_WINDOW_DAYS))
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn consent_summary(&self, tenant_id: TenantId, client_id: ClientId) -> Result<ConsentSummary, DispatchError> {
        Ok(self.ledger(tenant_id, client_id)?.summary(self.clock.now()))
    }

    /// Record an expiry fact for every consent already past `expires_at`.
    ///
    /// Returns the committed events; a consent revoked or expired by a
    /// concurrent writer in the meantime is skipped.
    pub fn expire_overdue(&self, tenant_id: TenantId, client_id: ClientId) -> Result<Vec<StoredEvent>, DispatchError> {
        let now = self.clock.now();
        let overdue = self.ledger(tenant_id, client_id)?.overdue(now);

        let mut committed = Vec::new();
        for consent_id in overdue {
            let command = ExpireConsent {
                client_id,
                consent_id,
                occurred_at: now,
            };
            match self.expire(tenant_id, command) {
                Ok(events) => committed.extend(events),
                Err(DispatchError::Domain(DomainError::Conflict(reason))) => {
                    tracing::debug!(consent_id = %consent_id, reason, "overdue consent already closed");
                }
                Err(e) => return Err(e),
            }
        }
        if !committed.is_empty() {
            tracing::info!(
                tenant_id = %tenant_id,
                client_id = %client_id,
                expired = committed.len(),
                "overdue consents expired"
            );
        }
        Ok(committed)
    }

    fn execute(&self, tenant_id: TenantId, command: ConsentCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        let client_id = command.client_id();
        self.with_retry("command", || {
            self.dispatcher.dispatch(
                StreamId::consent_ledger(tenant_id, client_id),
                &command,
                ConsentLedger::empty(client_id),
            )
        })
    }

    fn with_retry<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, DispatchError>,
    ) -> Result<T, DispatchError> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(e) if e.is_retryable() && retries < self.config.max_conflict_retries => {
                    retries += 1;
                    tracing::warn!(operation, retries, "consent ledger conflict, retrying");
                }
                other => return other,
            }
        }
    }
}
