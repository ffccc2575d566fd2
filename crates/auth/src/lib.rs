//! `sanctuary-auth` — redaction policy engine.
//!
//! Pure authorization boundary: roles and consent scopes come in already
//! resolved (see [`Claims`]); a [`RedactionPermission`] comes out. No HTTP, no
//! storage, no clock reads.

pub mod claims;
pub mod field;
pub mod permission;
pub mod roles;
pub mod scopes;

pub use claims::{Claims, ClaimsProvider, TokenValidationError, validate_claims};
pub use field::{FieldType, RedactionLevel};
pub use permission::{
    LevelExplanation, PermissionBuild, PolicyError, RedactionPermission, Rule, build_permission,
    build_permission_from_strings, build_permission_strict,
};
pub use roles::{Capability, UnknownRole, UserRole, capabilities_of};
pub use scopes::{ConsentScope, ParsedScopes, UnknownScope, parse_scopes};
