//! Roles and the static role → capability table.

use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Staff role, as resolved by the external authorization context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    Admin,
    Supervisor,
    CaseManager,
    /// DV counselor/advocate; the only clinical role.
    DvAdvocate,
    LegalAdvocate,
    MedicalProvider,
    ExternalPartner,
    AdministrativeStaff,
}

/// What a role is allowed to be treated as by the redaction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Clinical / DV-capable.
    Clinical,
    Legal,
    Medical,
    ExternalPartner,
    Administrative,
}

impl UserRole {
    pub const ALL: [UserRole; 8] = [
        UserRole::Admin,
        UserRole::Supervisor,
        UserRole::CaseManager,
        UserRole::DvAdvocate,
        UserRole::LegalAdvocate,
        UserRole::MedicalProvider,
        UserRole::ExternalPartner,
        UserRole::AdministrativeStaff,
    ];

    /// The single source of truth for role capabilities.
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            UserRole::Admin => &[Capability::Administrative],
            UserRole::Supervisor => &[Capability::Administrative],
            UserRole::CaseManager => &[],
            UserRole::DvAdvocate => &[Capability::Clinical],
            UserRole::LegalAdvocate => &[Capability::Legal],
            UserRole::MedicalProvider => &[Capability::Medical],
            UserRole::ExternalPartner => &[Capability::ExternalPartner],
            UserRole::AdministrativeStaff => &[Capability::Administrative],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Supervisor => "supervisor",
            UserRole::CaseManager => "case-manager",
            UserRole::DvAdvocate => "dv-advocate",
            UserRole::LegalAdvocate => "legal-advocate",
            UserRole::MedicalProvider => "medical-provider",
            UserRole::ExternalPartner => "external-partner",
            UserRole::AdministrativeStaff => "administrative-staff",
        }
    }

    pub fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn is_clinical(self) -> bool {
        self.has(Capability::Clinical)
    }

    pub fn is_legal(self) -> bool {
        self.has(Capability::Legal)
    }

    pub fn is_medical(self) -> bool {
        self.has(Capability::Medical)
    }

    pub fn is_external_partner(self) -> bool {
        self.has(Capability::ExternalPartner)
    }

    pub fn is_administrative(self) -> bool {
        self.has(Capability::Administrative)
    }
}

/// Union of the capabilities of `roles`.
pub fn capabilities_of<'a>(roles: impl IntoIterator<Item = &'a UserRole>) -> BTreeSet<Capability> {
    roles
        .into_iter()
        .flat_map(|role| role.capabilities().iter().copied())
        .collect()
}

impl core::fmt::Display for UserRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    /// Accepts the kebab-case names, case-insensitively, with `_` read as `-`.
    /// `dv-counselor` is an alias of `dv-advocate` and `medical` of
    /// `medical-provider`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let role = match normalized.as_str() {
            "admin" => UserRole::Admin,
            "supervisor" => UserRole::Supervisor,
            "case-manager" => UserRole::CaseManager,
            "dv-advocate" | "dv-counselor" => UserRole::DvAdvocate,
            "legal-advocate" => UserRole::LegalAdvocate,
            "medical-provider" | "medical" => UserRole::MedicalProvider,
            "external-partner" => UserRole::ExternalPartner,
            "administrative-staff" => UserRole::AdministrativeStaff,
            _ => return Err(UnknownRole(s.to_string())),
        };
        Ok(role)
    }
}
