//! Redaction policy engine.
//!
//! `build_permission` turns a resolved role set and raw consent-scope strings
//! into an immutable [`RedactionPermission`]. The permission answers, for every
//! [`FieldType`], exactly one [`RedactionLevel`]; the decision tables live in
//! `decide_default` and `RedactionPermission::decide` and nowhere else.
//!
//! No IO, no clock, no hidden state: equal inputs give equal permissions.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::field::{FieldType, RedactionLevel};
use crate::roles::{Capability, UnknownRole, UserRole, capabilities_of};
use crate::scopes::{ConsentScope, parse_scopes};

/// Which row of the policy tables produced a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // Default-level precedence.
    ExternalPartnerDefault,
    ClinicalWithDvView,
    LegalWithLegalView,
    MedicalWithMedicalView,
    AdministrativeDefault,
    FallbackDefault,

    // Per-field rules.
    FullPiiAccess,
    ExternalPartnerHashed,
    IdentifierMasked,
    DvCapableWithDvView,
    DvNoteWithheld,
    ExternalPartnerCeiling,
    MedicalWithMedicalViewField,
    MedicalAdjacentRole,
    MedicalWithheld,
    LegalWithLegalViewField,
    LegalAdjacentRole,
    LegalWithheld,
    ContactMasked,
    ServiceDataOpen,
}

/// Immutable redaction decision for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactionPermission {
    roles: BTreeSet<UserRole>,
    capabilities: BTreeSet<Capability>,
    scopes: BTreeSet<ConsentScope>,
    default_level: RedactionLevel,
    default_rule: Rule,
}

impl RedactionPermission {
    fn new(roles: BTreeSet<UserRole>, scopes: BTreeSet<ConsentScope>) -> Self {
        let capabilities = capabilities_of(&roles);
        let (default_level, default_rule) = decide_default(&capabilities, &scopes);
        Self {
            roles,
            capabilities,
            scopes,
            default_level,
            default_rule,
        }
    }

    pub fn roles(&self) -> &BTreeSet<UserRole> {
        &self.roles
    }

    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    pub fn scopes(&self) -> &BTreeSet<ConsentScope> {
        &self.scopes
    }

    /// Level for data that carries no field classification.
    pub fn default_redaction_level(&self) -> RedactionLevel {
        self.default_level
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn has_scope(&self, scope: ConsentScope) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn is_external_partner(&self) -> bool {
        self.has(Capability::ExternalPartner)
    }

    /// Not an external partner, holds a clinical, legal or medical role, and
    /// holds at least one of `DV_VIEW`, `LEGAL_VIEW`, `MEDICAL_VIEW`.
    pub fn can_view_full_pii(&self) -> bool {
        !self.is_external_partner()
            && (self.has(Capability::Clinical)
                || self.has(Capability::Legal)
                || self.has(Capability::Medical))
            && (self.has_scope(ConsentScope::DvView)
                || self.has_scope(ConsentScope::LegalView)
                || self.has_scope(ConsentScope::MedicalView))
    }

    /// Level for a classified field.
    pub fn level_for(&self, field: FieldType) -> RedactionLevel {
        self.decide(field).0
    }

    /// Level for a field that may be unclassified; unclassified data falls
    /// back to the default level.
    pub fn level_for_field(&self, field: Option<FieldType>) -> RedactionLevel {
        match field {
            Some(field) => self.level_for(field),
            None => self.default_level,
        }
    }

    /// Whether every classified field type is delivered unredacted.
    pub fn grants_everything(&self) -> bool {
        FieldType::ALL
            .iter()
            .all(|f| self.level_for(*f) == RedactionLevel::NoRedaction)
    }

    /// Audit view of how the level for `field` was reached.
    pub fn explain(&self, field: Option<FieldType>) -> LevelExplanation {
        let (level, rule) = match field {
            Some(field) => self.decide(field),
            None => (self.default_level, self.default_rule),
        };
        LevelExplanation {
            field_type: field,
            level,
            rule,
            roles: self.roles.iter().copied().collect(),
            capabilities: self.capabilities.iter().copied().collect(),
            scopes: self.scopes.iter().copied().collect(),
        }
    }

    /// Per-field decision table. External partners never receive plaintext
    /// or role-based partial views of DV, medical or legal data.
    fn decide(&self, field: FieldType) -> (RedactionLevel, Rule) {
        use RedactionLevel::*;

        let external = self.is_external_partner();
        let clinical = self.has(Capability::Clinical);
        let legal = self.has(Capability::Legal);
        let medical = self.has(Capability::Medical);
        let administrative = self.has(Capability::Administrative);

        match field {
            FieldType::DirectIdentifier => {
                if self.can_view_full_pii() {
                    (NoRedaction, Rule::FullPiiAccess)
                } else if external {
                    (HashOnly, Rule::ExternalPartnerHashed)
                } else {
                    (Partial, Rule::IdentifierMasked)
                }
            }
            FieldType::SensitiveDvNote => {
                if external {
                    (FullRedaction, Rule::ExternalPartnerCeiling)
                } else if clinical && self.has_scope(ConsentScope::DvView) {
                    (NoRedaction, Rule::DvCapableWithDvView)
                } else {
                    (FullRedaction, Rule::DvNoteWithheld)
                }
            }
            FieldType::MedicalInfo => {
                if external {
                    (FullRedaction, Rule::ExternalPartnerCeiling)
                } else if medical && self.has_scope(ConsentScope::MedicalView) {
                    (NoRedaction, Rule::MedicalWithMedicalViewField)
                } else if clinical || legal {
                    (Partial, Rule::MedicalAdjacentRole)
                } else {
                    (FullRedaction, Rule::MedicalWithheld)
                }
            }
            FieldType::LegalInfo => {
                if external {
                    (FullRedaction, Rule::ExternalPartnerCeiling)
                } else if legal && self.has_scope(ConsentScope::LegalView) {
                    (NoRedaction, Rule::LegalWithLegalViewField)
                } else if clinical || administrative {
                    (Partial, Rule::LegalAdjacentRole)
                } else {
                    (FullRedaction, Rule::LegalWithheld)
                }
            }
            FieldType::ContactInfo => {
                if self.can_view_full_pii() {
                    (NoRedaction, Rule::FullPiiAccess)
                } else {
                    (Partial, Rule::ContactMasked)
                }
            }
            FieldType::ServiceData => (NoRedaction, Rule::ServiceDataOpen),
        }
    }
}

/// Default-level precedence; first match wins.
fn decide_default(
    capabilities: &BTreeSet<Capability>,
    scopes: &BTreeSet<ConsentScope>,
) -> (RedactionLevel, Rule) {
    let has = |c: Capability| capabilities.contains(&c);
    let scoped = |s: ConsentScope| scopes.contains(&s);

    if has(Capability::ExternalPartner) {
        (RedactionLevel::FullRedaction, Rule::ExternalPartnerDefault)
    } else if has(Capability::Clinical) && scoped(ConsentScope::DvView) {
        (RedactionLevel::Minimal, Rule::ClinicalWithDvView)
    } else if has(Capability::Legal) && scoped(ConsentScope::LegalView) {
        (RedactionLevel::Minimal, Rule::LegalWithLegalView)
    } else if has(Capability::Medical) && scoped(ConsentScope::MedicalView) {
        (RedactionLevel::Minimal, Rule::MedicalWithMedicalView)
    } else if has(Capability::Administrative) {
        (RedactionLevel::Partial, Rule::AdministrativeDefault)
    } else {
        (RedactionLevel::Partial, Rule::FallbackDefault)
    }
}

/// Serializable explanation of one level decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelExplanation {
    /// `None` for unclassified data (default level).
    pub field_type: Option<FieldType>,
    pub level: RedactionLevel,
    pub rule: Rule,
    pub roles: Vec<UserRole>,
    pub capabilities: Vec<Capability>,
    pub scopes: Vec<ConsentScope>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unrecognized consent scopes: {0:?}")]
    UnrecognizedScopes(Vec<String>),

    #[error("unrecognized roles: {0:?}")]
    UnrecognizedRoles(Vec<String>),
}

/// A computed permission plus everything that could not be understood while
/// computing it.
///
/// Unrecognized inputs grant nothing, so the permission is never more
/// permissive than the recognized inputs alone would allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionBuild {
    pub permission: RedactionPermission,
    pub unrecognized_scopes: Vec<String>,
    pub unrecognized_roles: Vec<String>,
}

impl PermissionBuild {
    /// No input was ignored.
    pub fn is_clean(&self) -> bool {
        self.unrecognized_scopes.is_empty() && self.unrecognized_roles.is_empty()
    }

    /// Refuse the permission if any input was ignored.
    pub fn into_strict(self) -> Result<RedactionPermission, PolicyError> {
        if !self.unrecognized_roles.is_empty() {
            return Err(PolicyError::UnrecognizedRoles(self.unrecognized_roles));
        }
        if !self.unrecognized_scopes.is_empty() {
            return Err(PolicyError::UnrecognizedScopes(self.unrecognized_scopes));
        }
        Ok(self.permission)
    }
}

/// Compute a permission from typed roles and raw scope strings.
///
/// Unrecognized scopes are logged and returned in the build result.
pub fn build_permission<R, S>(roles: R, scopes: S) -> PermissionBuild
where
    R: IntoIterator<Item = UserRole>,
    S: IntoIterator,
    S::Item: AsRef<str>,
{
    let roles: BTreeSet<UserRole> = roles.into_iter().collect();
    let parsed = parse_scopes(scopes);

    for raw in &parsed.unrecognized {
        tracing::warn!(scope = %raw, "unrecognized consent scope ignored");
    }

    let permission = RedactionPermission::new(roles, parsed.scopes);
    tracing::debug!(
        default_level = ?permission.default_level,
        rule = ?permission.default_rule,
        "redaction permission computed"
    );

    PermissionBuild {
        permission,
        unrecognized_scopes: parsed.unrecognized,
        unrecognized_roles: Vec::new(),
    }
}

/// Like [`build_permission`], but any unrecognized scope is an error.
pub fn build_permission_strict<R, S>(roles: R, scopes: S) -> Result<RedactionPermission, PolicyError>
where
    R: IntoIterator<Item = UserRole>,
    S: IntoIterator,
    S::Item: AsRef<str>,
{
    build_permission(roles, scopes).into_strict()
}

/// Compute a permission from raw role and scope strings (as carried on claims).
pub fn build_permission_from_strings<R, S>(roles: R, scopes: S) -> PermissionBuild
where
    R: IntoIterator,
    R::Item: AsRef<str>,
    S: IntoIterator,
    S::Item: AsRef<str>,
{
    let mut typed = Vec::new();
    let mut unrecognized_roles = Vec::new();
    for raw in roles {
        match raw.as_ref().parse::<UserRole>() {
            Ok(role) => typed.push(role),
            Err(UnknownRole(raw)) => {
                tracing::warn!(role = %raw, "unrecognized role ignored");
                unrecognized_roles.push(raw);
            }
        }
    }

    let mut build = build_permission(typed, scopes);
    build.unrecognized_roles = unrecognized_roles;
    build
}
