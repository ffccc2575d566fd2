//! Consent-backed permissions.
//!
//! A scope on the caller's claims only counts while the client's ledger holds
//! an active grant of the matching consent type. Scopes without one are
//! dropped before the permission is computed, so a revoked or lapsed consent
//! always moves the caller towards more redaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use sanctuary_auth::{Claims, ConsentScope, PermissionBuild, TokenValidationError, build_permission};
use sanctuary_consent::{ConsentLedger, ConsentType};

use crate::command_dispatcher::DispatchError;

/// Consent type a client must have granted for a scope to take effect.
pub fn required_consent(scope: ConsentScope) -> ConsentType {
    match scope {
        ConsentScope::DvView => ConsentType::InformationSharing,
        ConsentScope::LegalView | ConsentScope::CourtTestimony => ConsentType::CourtDisclosure,
        ConsentScope::MedicalView => ConsentType::MedicalCoordination,
        ConsentScope::HmisExport => ConsentType::HmisParticipation,
        ConsentScope::ResearchView => ConsentType::Research,
    }
}

#[derive(Debug, Error)]
pub enum DisclosureError {
    #[error("claims rejected: {0}")]
    Claims(#[from] TokenValidationError),

    #[error(transparent)]
    Ledger(#[from] DispatchError),
}

/// A permission narrowed to what the client's consents currently allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentBackedPermission {
    pub build: PermissionBuild,
    /// Scopes the caller holds that no active consent backs.
    pub unbacked_scopes: Vec<ConsentScope>,
}

/// Narrow `claims` against `ledger` as of `as_of`.
pub fn consent_backed_permission(
    claims: &Claims,
    ledger: &ConsentLedger,
    as_of: DateTime<Utc>,
) -> ConsentBackedPermission {
    let requested = claims.permission();

    let (backed, unbacked): (BTreeSet<ConsentScope>, BTreeSet<ConsentScope>) = requested
        .permission
        .scopes()
        .iter()
        .copied()
        .partition(|scope| ledger.has_active(required_consent(*scope), as_of));

    for scope in &unbacked {
        tracing::info!(
            client_id = %ledger.client_id(),
            scope = %scope,
            "scope not backed by an active consent"
        );
    }

    let mut build = build_permission(
        requested.permission.roles().iter().copied(),
        backed.iter().map(|s| s.as_str()),
    );
    build.unrecognized_scopes = requested.unrecognized_scopes;
    build.unrecognized_roles = requested.unrecognized_roles;

    ConsentBackedPermission {
        build,
        unbacked_scopes: unbacked.into_iter().collect(),
    }
}
