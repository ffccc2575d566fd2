use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sanctuary_core::TenantId;

use crate::permission::{PermissionBuild, build_permission_from_strings};

/// Claims resolved by the external authentication/authorization layer.
///
/// Roles and consent scopes arrive as raw strings; turning them into a
/// permission is this crate's job, including flagging anything unrecognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (staff member or service account) identifier.
    pub sub: String,

    /// Organization the request acts within.
    pub tenant_id: TenantId,

    pub roles: Vec<String>,

    pub consent_scopes: Vec<String>,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Compute the caller's redaction permission.
    pub fn permission(&self) -> PermissionBuild {
        build_permission_from_strings(&self.roles, &self.consent_scopes)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("claims have expired")]
    Expired,

    #[error("claims not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid claims time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("claims have a blank subject")]
    BlankSubject,
}

/// Deterministically validate claims against an injected `now`.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.sub.trim().is_empty() {
        return Err(TokenValidationError::BlankSubject);
    }
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Resolves an incoming request into claims.
///
/// Implemented by the (external) authentication layer.
pub trait ClaimsProvider: Send + Sync {
    type Request: ?Sized;
    type Error: core::fmt::Debug + core::fmt::Display;

    fn resolve(&self, request: &Self::Request) -> Result<Claims, Self::Error>;
}
